use crate::error::{ChatError, PushError};
use async_trait::async_trait;
use silo_types::PushSubscription;

/// 聊天通道（Telegram 等）
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// 发送文本消息到指定会话
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), ChatError>;

    /// 通道名称
    fn name(&self) -> &str;

    /// 是否已配置
    fn is_enabled(&self) -> bool {
        true
    }
}

/// 浏览器推送通道
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// 向订阅端点投递载荷，失败时区分端点失效与临时错误
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError>;

    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool {
        true
    }
}
