use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// 将 JSON 值强制转换为数值：数字或可解析的数字字符串
pub fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

fn default_alert_interval() -> Option<u32> {
    Some(5)
}

/// 筒仓阈值配置
///
/// 命名阈值之外的键保存在 `extra` 中，新增规则只需要在规则表中引用对应的键。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiloSettings {
    #[serde(default)]
    pub temp_threshold: Option<f64>,
    #[serde(default)]
    pub co2_threshold: Option<f64>,
    #[serde(default)]
    pub mq2_threshold: Option<f64>,
    /// 告警间隔提示（分钟）
    #[serde(default = "default_alert_interval")]
    pub alert_interval_min: Option<u32>,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl Default for SiloSettings {
    fn default() -> Self {
        Self {
            temp_threshold: None,
            co2_threshold: None,
            mq2_threshold: None,
            alert_interval_min: default_alert_interval(),
            extra: HashMap::new(),
        }
    }
}

impl SiloSettings {
    /// 按配置键查找阈值
    pub fn threshold(&self, key: &str) -> Option<f64> {
        match key {
            "temp_threshold" => self.temp_threshold,
            "co2_threshold" => self.co2_threshold,
            "mq2_threshold" => self.mq2_threshold,
            other => self.extra.get(other).and_then(coerce_f64),
        }
    }

    pub fn with_temp_threshold(mut self, value: f64) -> Self {
        self.temp_threshold = Some(value);
        self
    }

    pub fn with_co2_threshold(mut self, value: f64) -> Self {
        self.co2_threshold = Some(value);
        self
    }

    pub fn with_mq2_threshold(mut self, value: f64) -> Self {
        self.mq2_threshold = Some(value);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// 责任人绑定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Responsible {
    #[serde(default)]
    pub telegram_chat_id: Option<String>,
}

/// 筒仓
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Silo {
    pub id: String,
    pub name: String,
    pub device_id: String,
    #[serde(default)]
    pub location: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub settings: SiloSettings,
    #[serde(default)]
    pub responsible: Responsible,
}

impl Silo {
    pub fn new(name: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            id: crate::new_id(),
            name: name.into(),
            device_id: device_id.into(),
            location: None,
            settings: SiloSettings::default(),
            responsible: Responsible::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_settings(mut self, settings: SiloSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_telegram_chat(mut self, chat_id: impl Into<String>) -> Self {
        self.responsible.telegram_chat_id = Some(chat_id.into());
        self
    }

    /// 聊天渠道绑定
    pub fn chat_channel(&self) -> Option<&str> {
        self.responsible
            .telegram_chat_id
            .as_deref()
            .filter(|id| !id.is_empty())
    }
}
