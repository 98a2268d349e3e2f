use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 已训练的异常检测模型（不透明二进制）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyModelRecord {
    pub name: String,
    pub model: Vec<u8>,
    pub trained_at: DateTime<Utc>,
}

impl AnomalyModelRecord {
    pub fn new(name: impl Into<String>, model: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            model,
            trained_at: Utc::now(),
        }
    }
}
