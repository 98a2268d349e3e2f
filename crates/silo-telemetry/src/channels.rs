use std::collections::{BTreeSet, HashMap};

/// 系统内筒仓键到遥测通道的绑定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBinding {
    /// 系统内的键
    pub key: String,
    /// 提供方通道 ID
    pub channel_id: Option<String>,
    /// 读取密钥（公开通道可以没有）
    pub read_key: Option<String>,
}

/// 通道配置
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMap {
    channels: HashMap<String, String>,
    read_keys: HashMap<String, String>,
}

impl ChannelMap {
    pub fn new(channels: HashMap<String, String>, read_keys: HashMap<String, String>) -> Self {
        Self {
            channels,
            read_keys,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty() && self.read_keys.is_empty()
    }

    /// 两个映射中所有键的并集，按键排序
    pub fn bindings(&self) -> Vec<ChannelBinding> {
        let keys: BTreeSet<&String> = self.channels.keys().chain(self.read_keys.keys()).collect();

        keys.into_iter()
            .map(|key| self.binding(key))
            .collect()
    }

    fn binding(&self, key: &str) -> ChannelBinding {
        ChannelBinding {
            key: key.to_string(),
            channel_id: self.channels.get(key).filter(|c| !c.is_empty()).cloned(),
            read_key: self.read_keys.get(key).filter(|k| !k.is_empty()).cloned(),
        }
    }

    /// 按键查找绑定
    pub fn get(&self, key: &str) -> Option<ChannelBinding> {
        (self.channels.contains_key(key) || self.read_keys.contains_key(key))
            .then(|| self.binding(key))
    }
}
