use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Web Push 密钥材料
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushKeys {
    #[serde(default)]
    pub p256dh: String,
    #[serde(default)]
    pub auth: String,
}

/// 浏览器推送订阅，endpoint 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: String,
    pub endpoint: String,
    #[serde(default)]
    pub keys: PushKeys,
    #[serde(default)]
    pub user_id: Option<String>,
    /// 关注的筒仓，None 表示全局订阅
    #[serde(default)]
    pub silo_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PushSubscription {
    pub fn new(endpoint: impl Into<String>, keys: PushKeys) -> Self {
        Self {
            id: crate::new_id(),
            endpoint: endpoint.into(),
            keys,
            user_id: None,
            silo_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn scoped_to(mut self, silo_id: impl Into<String>) -> Self {
        self.silo_id = Some(silo_id.into());
        self
    }

    pub fn owned_by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// 订阅是否关心该筒仓的告警
    pub fn matches_silo(&self, silo_id: &str) -> bool {
        match &self.silo_id {
            Some(scope) => scope == silo_id,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silo_filter() {
        let global = PushSubscription::new("https://push.example/a", PushKeys::default());
        let scoped = PushSubscription::new("https://push.example/b", PushKeys::default())
            .scoped_to("silo-1");

        assert!(global.matches_silo("silo-1"));
        assert!(global.matches_silo("silo-2"));
        assert!(scoped.matches_silo("silo-1"));
        assert!(!scoped.matches_silo("silo-2"));
    }
}
