use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StoreError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 存储的数据无法还原为领域模型
    #[error("Corrupted record {id}: {reason}")]
    Corrupted { id: String, reason: String },

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn corrupted(id: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::Corrupted {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// 存储结果类型
pub type Result<T> = std::result::Result<T, StoreError>;
