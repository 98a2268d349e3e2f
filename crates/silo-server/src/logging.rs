use anyhow::{anyhow, Result};
use silo_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// 安装全局日志订阅器；`RUST_LOG` 优先于配置中的级别
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", config.level, e))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
