use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 告警级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Critical => "critical",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "warning" => Some(AlertLevel::Warning),
            "critical" => Some(AlertLevel::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 规则或异常检测产生的候选告警，尚未入库
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateAlert {
    pub level: AlertLevel,
    pub message: String,
    pub value: f64,
}

impl CandidateAlert {
    pub fn new(level: AlertLevel, message: impl Into<String>, value: f64) -> Self {
        Self {
            level,
            message: message.into(),
            value,
        }
    }
}

/// 已入库的告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub silo_id: String,
    pub level: AlertLevel,
    pub message: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(default)]
    pub ack_by: Option<String>,
    #[serde(default)]
    pub ack_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// 由候选告警生成新告警：分配 ID 与时间戳，未确认
    pub fn from_candidate(silo_id: impl Into<String>, candidate: CandidateAlert) -> Self {
        Self {
            id: crate::new_id(),
            silo_id: silo_id.into(),
            level: candidate.level,
            message: candidate.message,
            value: candidate.value,
            timestamp: Utc::now(),
            acknowledged: false,
            ack_by: None,
            ack_at: None,
        }
    }

    pub fn acknowledge(&mut self, principal_id: impl Into<String>) {
        self.acknowledged = true;
        self.ack_by = Some(principal_id.into());
        self.ack_at = Some(Utc::now());
    }
}
