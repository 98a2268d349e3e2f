use thiserror::Error;

/// 聊天通道错误
#[derive(Error, Debug)]
pub enum ChatError {
    /// 未配置 bot token
    #[error("Chat transport not configured")]
    NotConfigured,

    /// HTTP 错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 远端返回非成功状态
    #[error("Chat API rejected message: status={status}, body={body}")]
    Rejected { status: u16, body: String },
}

/// 推送错误
///
/// 只有 `EndpointGone` 会触发订阅清理。
#[derive(Error, Debug)]
pub enum PushError {
    /// 未配置 VAPID 密钥
    #[error("Push transport not configured")]
    NotConfigured,

    /// 端点永久失效（404/410）
    #[error("Push endpoint gone: {0}")]
    EndpointGone(String),

    /// 其他可重试的失败
    #[error("Push delivery failed: {0}")]
    Transient(String),
}

impl PushError {
    pub fn is_gone(&self) -> bool {
        matches!(self, PushError::EndpointGone(_))
    }
}
