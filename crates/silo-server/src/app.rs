use anyhow::{Context, Result};
use silo_anomaly::{AnomalyScorer, ForestParams, ModelTrainer};
use silo_config::AppConfig;
use silo_notify::{
    ChatTransport, NotificationDispatcher, TelegramNotifier, VapidConfig, WebPushNotifier,
};
use silo_pipeline::{AlertSink, ReadingIntake};
use silo_rule::RuleEngine;
use silo_store::{MemoryStore, SharedStore, SqlStore};
use silo_telemetry::{ChannelMap, ChannelSweep, SiloResolution, ThingSpeakClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 组装好的服务组件
pub struct App {
    pub config: AppConfig,
    pub store: SharedStore,
    pub intake: Arc<ReadingIntake>,
}

impl App {
    /// 按配置创建存储并组装读数处理链
    pub async fn build(config: AppConfig) -> Result<Self> {
        let store = open_store(&config).await?;
        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: AppConfig, store: SharedStore) -> Self {
        let dispatcher = Arc::new(build_dispatcher(&config, store.clone()));
        let sink = AlertSink::new(store.clone(), dispatcher);
        let scorer = Arc::new(AnomalyScorer::new(store.clone()));
        let intake = Arc::new(ReadingIntake::new(
            store.clone(),
            RuleEngine::new(),
            scorer,
            sink,
        ));

        Self {
            config,
            store,
            intake,
        }
    }

    /// 等待后台告警分发完成；每个子命令退出前调用
    pub async fn drain(&self) {
        self.intake.drain().await;
    }

    pub fn channels(&self) -> ChannelMap {
        ChannelMap::new(
            self.config.telemetry.channels.clone(),
            self.config.telemetry.read_keys.clone(),
        )
    }

    pub fn telemetry_client(&self) -> Result<ThingSpeakClient> {
        let telemetry = &self.config.telemetry;
        ThingSpeakClient::new(
            telemetry.base_url.clone(),
            Duration::from_secs(telemetry.request_timeout_secs),
        )
        .context("Failed to build telemetry client")
    }

    /// 通道遍历器；轮询器按键解析筒仓，定时任务按名称解析
    pub fn sweep(&self, resolution: SiloResolution) -> Result<Arc<ChannelSweep>> {
        let client = Arc::new(self.telemetry_client()?);
        let sweep = ChannelSweep::new(
            client,
            self.intake.clone(),
            self.store.clone(),
            self.channels(),
        )
        .with_resolution(resolution);
        Ok(Arc::new(sweep))
    }

    pub fn trainer(&self) -> ModelTrainer {
        let anomaly = &self.config.anomaly;
        let params = ForestParams {
            n_estimators: anomaly.n_estimators,
            contamination: anomaly.contamination,
            ..Default::default()
        };

        ModelTrainer::new(self.store.clone())
            .with_params(params)
            .with_min_samples(anomaly.min_training_samples)
    }
}

async fn open_store(config: &AppConfig) -> Result<SharedStore> {
    let url = config.database.url.trim();
    if url.is_empty() {
        warn!("No database configured, using in-memory store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = SqlStore::connect(url)
        .await
        .context("Failed to connect to database")?;
    store
        .setup_schema()
        .await
        .context("Failed to prepare database schema")?;
    Ok(Arc::new(store))
}

/// 未配置的通道静默跳过
fn build_dispatcher(config: &AppConfig, store: SharedStore) -> NotificationDispatcher {
    let notify = &config.notify;
    let mut dispatcher =
        NotificationDispatcher::new(store).with_push_concurrency(notify.push_concurrency);

    let telegram = TelegramNotifier::new(notify.telegram_bot_token.clone())
        .with_api_base(notify.telegram_api_base.clone());
    if telegram.is_enabled() {
        info!("Telegram notifications enabled");
        dispatcher = dispatcher.with_chat(Arc::new(telegram));
    }

    let vapid = VapidConfig {
        public_key: notify.vapid_public_key.clone(),
        private_key: notify.vapid_private_key.clone(),
        subject: notify.vapid_subject.clone(),
    };
    if vapid.is_complete() {
        match WebPushNotifier::new(vapid) {
            Ok(push) => {
                info!("Web push notifications enabled");
                dispatcher = dispatcher.with_push(Arc::new(push));
            }
            Err(e) => warn!(error = %e, "Web push client unavailable, push notifications disabled"),
        }
    }

    dispatcher
}
