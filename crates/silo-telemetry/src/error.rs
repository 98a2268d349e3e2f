use silo_store::StoreError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

/// 遥测错误类型
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// HTTP 错误
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 远端返回非成功状态
    #[error("Telemetry provider returned status {status} for channel {channel}")]
    Status { channel: String, status: u16 },

    /// 通道映射缺失
    #[error("No provider channel configured for key: {0}")]
    MissingChannel(String),

    /// 时间戳格式错误
    #[error("Invalid feed timestamp: {0}")]
    InvalidTimestamp(String),

    /// 存储错误
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// 调度器错误
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
