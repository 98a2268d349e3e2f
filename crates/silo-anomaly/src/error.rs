use silo_store::StoreError;
use thiserror::Error;

/// 异常检测错误类型
#[derive(Error, Debug)]
pub enum AnomalyError {
    /// 存储错误
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// 模型序列化错误
    #[error("Model serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 训练集为空
    #[error("Training set is empty")]
    EmptyTrainingSet,

    /// 参数无效
    #[error("Invalid forest parameters: {0}")]
    InvalidParams(String),

    /// 评分失败
    #[error("Scoring failed: {0}")]
    Scoring(String),

    /// 训练任务失败
    #[error("Training failed: {0}")]
    Training(String),
}

pub type Result<T> = std::result::Result<T, AnomalyError>;
