use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 数据库配置；url 为空时使用内存存储
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_thingspeak_base")]
    pub base_url: String,

    /// 筒仓键 -> ThingSpeak 通道 ID
    #[serde(default)]
    pub channels: HashMap<String, String>,

    /// 筒仓键 -> 读取密钥
    #[serde(default)]
    pub read_keys: HashMap<String, String>,

    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// cron 表达式（含秒）
    #[serde(default = "default_schedule")]
    pub schedule: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct NotifyConfig {
    #[serde(default)]
    pub telegram_bot_token: Option<String>,

    #[serde(default = "default_telegram_api_base")]
    pub telegram_api_base: String,

    #[serde(default)]
    pub vapid_public_key: Option<String>,

    #[serde(default)]
    pub vapid_private_key: Option<String>,

    #[serde(default = "default_vapid_subject")]
    pub vapid_subject: String,

    /// 单条告警的推送并发数
    #[serde(default = "default_push_concurrency")]
    pub push_concurrency: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AnomalyConfig {
    #[serde(default = "default_training_window_days")]
    pub training_window_days: i64,

    #[serde(default = "default_contamination")]
    pub contamination: f64,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    #[serde(default = "default_min_training_samples")]
    pub min_training_samples: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON 格式输出
    #[serde(default)]
    pub json: bool,
}

// 默认值函数
fn default_thingspeak_base() -> String {
    "https://api.thingspeak.com".to_string()
}

fn default_interval_secs() -> u64 {
    300
}

fn default_retry_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_schedule() -> String {
    "0 */5 * * * *".to_string()
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_vapid_subject() -> String {
    "mailto:no-reply@example.com".to_string()
}

fn default_push_concurrency() -> usize {
    4
}

fn default_training_window_days() -> i64 {
    30
}

fn default_contamination() -> f64 {
    0.01
}

fn default_n_estimators() -> usize {
    100
}

fn default_min_training_samples() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

// Default trait 实现
impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            base_url: default_thingspeak_base(),
            channels: HashMap::new(),
            read_keys: HashMap::new(),
            interval_secs: default_interval_secs(),
            retry_secs: default_retry_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            schedule: default_schedule(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            telegram_bot_token: None,
            telegram_api_base: default_telegram_api_base(),
            vapid_public_key: None,
            vapid_private_key: None,
            vapid_subject: default_vapid_subject(),
            push_concurrency: default_push_concurrency(),
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            training_window_days: default_training_window_days(),
            contamination: default_contamination(),
            n_estimators: default_n_estimators(),
            min_training_samples: default_min_training_samples(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
