use crate::app::AppConfig;
use crate::error::{ConfigError, Result};
use config::{Config, Environment, File, FileFormat};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 环境变量前缀：`SILO__TELEMETRY__INTERVAL_SECS=60`
pub const ENV_PREFIX: &str = "SILO";

/// 配置加载器
///
/// 优先级：环境变量 > 配置文件 > 默认值。旧版环境变量
/// （`THINGSPEAK_CHANNELS` 等）只填补仍为空的配置项。
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 配置文件（TOML，可不存在）
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// 用给定的变量表代替进程环境
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// 加载配置
    pub fn load(&self) -> Result<AppConfig> {
        let env = self
            .env
            .clone()
            .unwrap_or_else(|| std::env::vars().collect());

        let mut builder = Config::builder();
        if let Some(path) = &self.path {
            let path = path.to_str().ok_or_else(|| {
                ConfigError::Invalid(format!("Invalid config path: {}", path.display()))
            })?;
            builder = builder.add_source(File::new(path, FileFormat::Toml).required(false));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone())),
        );

        let mut app: AppConfig = builder.build()?.try_deserialize()?;
        apply_legacy_env(&mut app, &env)?;
        validate(&app)?;

        debug!(
            channels = app.telemetry.channels.len(),
            telegram = app.notify.telegram_bot_token.is_some(),
            vapid = app.notify.vapid_private_key.is_some(),
            "Configuration loaded"
        );
        Ok(app)
    }
}

/// 解析 `{"silo_a": 3082805}` 形式的 JSON 对象，数字值转为字符串
fn parse_legacy_map(var: &str, raw: &str) -> Result<HashMap<String, String>> {
    let legacy = |reason: String| ConfigError::Legacy {
        var: var.to_string(),
        reason,
    };

    let object: HashMap<String, Value> =
        serde_json::from_str(raw).map_err(|e| legacy(e.to_string()))?;

    object
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            Value::Number(n) => Ok((key, n.to_string())),
            other => Err(legacy(format!("unsupported value for '{}': {}", key, other))),
        })
        .collect()
}

fn non_empty<'a>(env: &'a HashMap<String, String>, var: &str) -> Option<&'a str> {
    env.get(var).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn apply_legacy_env(app: &mut AppConfig, env: &HashMap<String, String>) -> Result<()> {
    if let Some(raw) = non_empty(env, "THINGSPEAK_CHANNELS") {
        for (key, channel) in parse_legacy_map("THINGSPEAK_CHANNELS", raw)? {
            app.telemetry.channels.entry(key).or_insert(channel);
        }
    }
    if let Some(raw) = non_empty(env, "THINGSPEAK_API_KEYS") {
        for (key, read_key) in parse_legacy_map("THINGSPEAK_API_KEYS", raw)? {
            app.telemetry.read_keys.entry(key).or_insert(read_key);
        }
    }

    let fill = |slot: &mut Option<String>, var: &str| {
        if slot.as_deref().map_or(true, |v| v.trim().is_empty()) {
            if let Some(value) = non_empty(env, var) {
                *slot = Some(value.to_string());
            }
        }
    };
    fill(&mut app.notify.telegram_bot_token, "TELEGRAM_BOT_TOKEN");
    fill(&mut app.notify.vapid_public_key, "VAPID_PUBLIC_KEY");
    fill(&mut app.notify.vapid_private_key, "VAPID_PRIVATE_KEY");

    Ok(())
}

fn validate(app: &AppConfig) -> Result<()> {
    if app.telemetry.interval_secs == 0 || app.telemetry.retry_secs == 0 {
        return Err(ConfigError::Invalid(
            "telemetry.interval_secs and telemetry.retry_secs must be greater than 0".to_string(),
        ));
    }

    let contamination = app.anomaly.contamination;
    if !(contamination > 0.0 && contamination <= 0.5) {
        return Err(ConfigError::Invalid(format!(
            "anomaly.contamination must be in (0, 0.5], got {}",
            contamination
        )));
    }

    if app.anomaly.n_estimators == 0 {
        return Err(ConfigError::Invalid(
            "anomaly.n_estimators must be greater than 0".to_string(),
        ));
    }

    if app.notify.push_concurrency == 0 {
        return Err(ConfigError::Invalid(
            "notify.push_concurrency must be greater than 0".to_string(),
        ));
    }

    Ok(())
}
