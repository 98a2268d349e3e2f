use thiserror::Error;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置源解析失败
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// 旧版环境变量格式错误
    #[error("Invalid {var}: {reason}")]
    Legacy { var: String, reason: String },

    /// 配置值无效
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
