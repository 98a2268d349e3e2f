use crate::channels::ChannelBinding;
use crate::client::TelemetrySource;
use crate::error::{Result, TelemetryError};
use silo_store::SharedStore;
use tracing::{info, warn};

/// 历史导入汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// 导入通道全部历史采样
///
/// 只写入读数，不触发规则、异常检测与通知。键同时作为筒仓 ID 和设备 ID。
pub async fn import_history(
    source: &dyn TelemetrySource,
    store: &SharedStore,
    binding: &ChannelBinding,
) -> Result<ImportReport> {
    let channel_id = binding
        .channel_id
        .as_deref()
        .ok_or_else(|| TelemetryError::MissingChannel(binding.key.clone()))?;

    let feeds = source
        .history(channel_id, binding.read_key.as_deref())
        .await?;
    info!(
        key = %binding.key,
        channel = %channel_id,
        feeds = feeds.len(),
        "Importing telemetry history"
    );

    let mut report = ImportReport::default();
    for feed in feeds {
        let reading = match feed.to_payload(&binding.key, Some(&binding.key)) {
            Ok(payload) => payload.into_reading(),
            Err(e) => {
                warn!(entry_id = ?feed.entry_id, error = %e, "Skipping historical feed");
                report.skipped += 1;
                continue;
            }
        };

        match store.insert_reading(&reading).await {
            Ok(()) => report.imported += 1,
            Err(e) => {
                warn!(entry_id = ?feed.entry_id, error = %e, "Failed to store historical reading");
                report.skipped += 1;
            }
        }
    }

    info!(
        key = %binding.key,
        imported = report.imported,
        skipped = report.skipped,
        "Telemetry history imported"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Feed;
    use crate::testing::{feed_at, FakeSource};
    use silo_store::{DocumentStore, MemoryStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_imports_readings_without_alerts() {
        let store = Arc::new(MemoryStore::new());
        let shared: SharedStore = store.clone();
        let source = FakeSource::default()
            .with_feed("100", feed_at("2024-05-01T12:00:00Z", "90.0"))
            .with_feed("100", Feed::default())
            .with_feed("100", feed_at("2024-05-01T12:15:00Z", "21.0"));
        let binding = ChannelBinding {
            key: "silo_a".to_string(),
            channel_id: Some("100".to_string()),
            read_key: None,
        };

        let report = import_history(&source, &shared, &binding).await.unwrap();

        assert_eq!(report, ImportReport { imported: 2, skipped: 1 });
        assert_eq!(store.list_readings("silo_a", 10).await.unwrap().len(), 2);
        assert_eq!(store.alert_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_channel() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let binding = ChannelBinding {
            key: "silo_a".to_string(),
            channel_id: None,
            read_key: Some("KEY".to_string()),
        };

        let result = import_history(&FakeSource::default(), &store, &binding).await;
        assert!(matches!(result, Err(TelemetryError::MissingChannel(_))));
    }
}
