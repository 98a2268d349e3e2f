use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Operator,
}

/// 已认证的调用方（由外部身份系统签发）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role }
    }
}

/// 读数来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReadingOrigin {
    /// 通过 API 手动提交
    Manual { principal: Principal },
    /// 由遥测轮询产生
    Polled { channel: String },
}

impl ReadingOrigin {
    pub fn manual(principal: Principal) -> Self {
        ReadingOrigin::Manual { principal }
    }

    pub fn polled(channel: impl Into<String>) -> Self {
        ReadingOrigin::Polled {
            channel: channel.into(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReadingOrigin::Manual { .. } => "manual",
            ReadingOrigin::Polled { .. } => "polled",
        }
    }
}
