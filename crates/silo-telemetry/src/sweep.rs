use crate::channels::{ChannelBinding, ChannelMap};
use crate::client::TelemetrySource;
use crate::error::{Result, TelemetryError};
use silo_pipeline::ReadingIntake;
use silo_store::SharedStore;
use silo_types::ReadingOrigin;
use std::sync::Arc;
use tracing::{debug, error, info};

/// 通道键到筒仓的解析方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiloResolution {
    /// 键即筒仓 ID（轮询器）
    #[default]
    Key,
    /// 按名称查找筒仓（定时任务）；找不到时读数不关联筒仓
    ByName,
}

/// 单轮汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub ingested: usize,
    /// 通道没有采样
    pub empty: usize,
    /// `(key, error)`
    pub failed: Vec<(String, String)>,
}

/// 遍历所有通道一次，逐个抓取最新采样并送入读数入口
///
/// 单个通道失败不影响其余通道。
pub struct ChannelSweep {
    source: Arc<dyn TelemetrySource>,
    intake: Arc<ReadingIntake>,
    store: SharedStore,
    channels: ChannelMap,
    resolution: SiloResolution,
}

impl ChannelSweep {
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        intake: Arc<ReadingIntake>,
        store: SharedStore,
        channels: ChannelMap,
    ) -> Self {
        Self {
            source,
            intake,
            store,
            channels,
            resolution: SiloResolution::default(),
        }
    }

    pub fn with_resolution(mut self, resolution: SiloResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub async fn run(&self) -> SweepReport {
        let mut report = SweepReport::default();

        for binding in self.channels.bindings() {
            match self.sweep_channel(&binding).await {
                Ok(true) => report.ingested += 1,
                Ok(false) => report.empty += 1,
                Err(e) => {
                    error!(key = %binding.key, error = %e, "Failed to process telemetry channel");
                    report.failed.push((binding.key.clone(), e.to_string()));
                }
            }
        }

        info!(
            ingested = report.ingested,
            empty = report.empty,
            failed = report.failed.len(),
            "Telemetry sweep finished"
        );
        report
    }

    /// 处理单个通道，返回是否写入了读数
    async fn sweep_channel(&self, binding: &ChannelBinding) -> Result<bool> {
        let channel_id = binding
            .channel_id
            .as_deref()
            .ok_or_else(|| TelemetryError::MissingChannel(binding.key.clone()))?;

        let Some(feed) = self
            .source
            .latest(channel_id, binding.read_key.as_deref())
            .await?
        else {
            debug!(key = %binding.key, channel = %channel_id, "Channel has no feeds");
            return Ok(false);
        };

        let (silo_id, device_id) = self.resolve(&binding.key).await?;
        let payload = feed.to_payload(&device_id, silo_id.as_deref())?;

        self.intake
            .ingest(payload, ReadingOrigin::polled(binding.key.clone()))
            .await?;
        Ok(true)
    }

    /// 返回 `(silo_id, device_id)`
    async fn resolve(&self, key: &str) -> Result<(Option<String>, String)> {
        match self.resolution {
            SiloResolution::Key => Ok((Some(key.to_string()), key.to_string())),
            SiloResolution::ByName => match self.store.silo_by_name(key).await? {
                Some(silo) => Ok((Some(silo.id), silo.device_id)),
                None => {
                    debug!(key = %key, "No silo named after channel key");
                    Ok((None, key.to_string()))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{feed_at, intake_for, FakeSource};
    use silo_store::{DocumentStore, MemoryStore};
    use silo_types::{Silo, SiloSettings};
    use std::collections::HashMap;

    fn channels(pairs: &[(&str, &str)]) -> ChannelMap {
        let channels: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ChannelMap::new(channels, HashMap::new())
    }

    #[tokio::test]
    async fn test_first_channel_failure_does_not_block_second() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(
            FakeSource::default()
                .failing("100")
                .with_feed("200", feed_at("2024-05-01T12:00:00Z", "22.0")),
        );
        let sweep = ChannelSweep::new(
            source.clone(),
            intake_for(store.clone()),
            store.clone(),
            channels(&[("silo_a", "100"), ("silo_b", "200")]),
        );

        let report = sweep.run().await;

        assert_eq!(report.ingested, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "silo_a");
        assert_eq!(source.calls(), vec!["100".to_string(), "200".to_string()]);

        let readings = store.list_readings("silo_b", 10).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].temp_c, Some(22.0));
        assert_eq!(store.reading_count().await, 1);
    }

    #[tokio::test]
    async fn test_missing_channel_id_and_empty_feed() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::default());
        let read_keys: HashMap<String, String> =
            HashMap::from([("orphan".to_string(), "KEY".to_string())]);
        let channels = ChannelMap::new(
            HashMap::from([("silo_a".to_string(), "100".to_string())]),
            read_keys,
        );
        let sweep = ChannelSweep::new(source, intake_for(store.clone()), store.clone(), channels);

        let report = sweep.run().await;

        assert_eq!(report.empty, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "orphan");
        assert_eq!(store.reading_count().await, 0);
    }

    #[tokio::test]
    async fn test_by_name_resolution() {
        let store = Arc::new(MemoryStore::new());
        let silo = Silo::new("silo_a", "esp32-07")
            .with_settings(SiloSettings::default().with_temp_threshold(30.0));
        store.insert_silo(&silo).await.unwrap();

        let source = Arc::new(
            FakeSource::default()
                .with_feed("100", feed_at("2024-05-01T12:00:00Z", "31.0"))
                .with_feed("200", feed_at("2024-05-01T12:00:00Z", "31.0")),
        );
        let sweep = ChannelSweep::new(
            source,
            intake_for(store.clone()),
            store.clone(),
            channels(&[("silo_a", "100"), ("unknown", "200")]),
        )
        .with_resolution(SiloResolution::ByName);

        let report = sweep.run().await;
        assert_eq!(report.ingested, 2);

        let readings = store.list_readings(&silo.id, 10).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].device_id, "esp32-07");

        // 只有解析到筒仓的读数会产生告警
        let alerts = store.list_alerts(10).await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].silo_id, silo.id);
    }
}
