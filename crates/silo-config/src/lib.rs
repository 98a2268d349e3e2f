pub mod app;
pub mod error;
pub mod loader;

pub use app::{
    AnomalyConfig, AppConfig, DatabaseConfig, LoggingConfig, NotifyConfig, TelemetryConfig,
};
pub use error::{ConfigError, Result};
pub use loader::ConfigLoader;
