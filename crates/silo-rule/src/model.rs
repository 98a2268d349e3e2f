use serde::{Deserialize, Serialize};
use silo_types::{AlertLevel, CandidateAlert, Reading, ReadingField};

/// 阈值规则定义
///
/// 规则是数据而不是代码：一条规则把筒仓配置中的一个阈值键绑定到读数字段，
/// 超过阈值时产生固定级别与消息的候选告警。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// 筒仓配置中的阈值键（如 `temp_threshold`）
    pub setting: String,

    /// 被检查的读数字段
    pub field: ReadingField,

    /// 告警级别
    pub level: AlertLevel,

    /// 告警消息
    pub message: String,
}

impl ThresholdRule {
    pub fn new(
        setting: impl Into<String>,
        field: ReadingField,
        level: AlertLevel,
        message: impl Into<String>,
    ) -> Self {
        Self {
            setting: setting.into(),
            field,
            level,
            message: message.into(),
        }
    }

    /// 用给定阈值检查读数，严格大于才告警
    pub fn evaluate(&self, reading: &Reading, threshold: f64) -> Option<CandidateAlert> {
        let value = reading.measurement(self.field)?;

        (value > threshold).then(|| CandidateAlert::new(self.level, self.message.clone(), value))
    }
}

/// 默认规则表，顺序即评估顺序
pub fn default_rules() -> Vec<ThresholdRule> {
    vec![
        ThresholdRule::new(
            "temp_threshold",
            ReadingField::Temperature,
            AlertLevel::Warning,
            "Temperatura acima do limite",
        ),
        ThresholdRule::new(
            "co2_threshold",
            ReadingField::Co2Estimate,
            AlertLevel::Critical,
            "CO2 acima do limite",
        ),
        ThresholdRule::new(
            "mq2_threshold",
            ReadingField::GasRaw,
            AlertLevel::Warning,
            "MQ2 alto",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use silo_types::ReadingPayload;

    #[test]
    fn test_default_rule_table() {
        let rules = default_rules();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[0].setting, "temp_threshold");
        assert_eq!(rules[1].level, AlertLevel::Critical);
        assert_eq!(rules[2].field, ReadingField::GasRaw);
    }

    #[test]
    fn test_strictly_greater() {
        let rule = &default_rules()[0];
        let at = ReadingPayload::new("d", Utc::now())
            .with_temperature(35.0)
            .into_reading();
        let above = ReadingPayload::new("d", Utc::now())
            .with_temperature(35.1)
            .into_reading();

        assert!(rule.evaluate(&at, 35.0).is_none());

        let alert = rule.evaluate(&above, 35.0).unwrap();
        assert_eq!(alert.value, 35.1);
        assert_eq!(alert.message, "Temperatura acima do limite");
    }

    #[test]
    fn test_rule_serialization() {
        let rule = default_rules().remove(1);
        let json = serde_json::to_string(&rule).unwrap();
        let deserialized: ThresholdRule = serde_json::from_str(&json).unwrap();

        assert_eq!(rule, deserialized);
    }
}
