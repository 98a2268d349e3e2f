use crate::model::{default_rules, ThresholdRule};
use silo_types::{CandidateAlert, Reading, SiloSettings};
use tracing::debug;

/// 阈值规则引擎
///
/// 引擎本身不会失败：字段缺失、阈值不可转换都视为该规则无告警。
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<ThresholdRule>,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleEngine {
    /// 使用默认规则表
    pub fn new() -> Self {
        Self::with_rules(default_rules())
    }

    pub fn with_rules(rules: Vec<ThresholdRule>) -> Self {
        Self { rules }
    }

    /// 追加规则（排在已有规则之后）
    pub fn register(&mut self, rule: ThresholdRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[ThresholdRule] {
        &self.rules
    }

    /// 评估读数，返回按规则顺序排列的候选告警（不去重）
    pub fn evaluate(
        &self,
        reading: &Reading,
        settings: Option<&SiloSettings>,
    ) -> Vec<CandidateAlert> {
        let Some(settings) = settings else {
            return Vec::new();
        };

        let alerts: Vec<CandidateAlert> = self
            .rules
            .iter()
            .filter_map(|rule| {
                let threshold = settings.threshold(&rule.setting)?;
                rule.evaluate(reading, threshold)
            })
            .collect();

        debug!(
            reading_id = %reading.id,
            alerts = alerts.len(),
            "Threshold rules evaluated"
        );

        alerts
    }
}
