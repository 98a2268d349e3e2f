use crate::sweep::ChannelSweep;
use silo_shutdown::ShutdownReceiver;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// 遥测轮询器
///
/// 长期运行的后台循环：每轮遍历所有通道，之后等待固定间隔。
/// 轮次级失败改用较短的重试间隔；关闭信号只在两轮之间生效。
pub struct TelemetryPoller {
    sweep: Arc<ChannelSweep>,
    interval: Duration,
    retry: Duration,
}

impl TelemetryPoller {
    pub fn new(sweep: Arc<ChannelSweep>) -> Self {
        Self {
            sweep,
            interval: Duration::from_secs(300),
            retry: Duration::from_secs(60),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = retry;
        self
    }

    /// 运行直到收到关闭信号
    pub async fn run(self, mut shutdown: ShutdownReceiver) {
        info!(
            interval_secs = self.interval.as_secs(),
            retry_secs = self.retry.as_secs(),
            "Telemetry poller started"
        );

        loop {
            let delay = self.cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                signal = shutdown.recv() => {
                    match signal {
                        Ok(signal) => info!(signal = %signal, "Telemetry poller stopping"),
                        Err(e) => {
                            warn!(error = %e, "Shutdown channel closed, telemetry poller stopping")
                        }
                    }
                    break;
                }
            }
        }

        info!("Telemetry poller stopped");
    }

    /// 执行一轮并返回下一轮前的等待时间
    async fn cycle(&self) -> Duration {
        if self.sweep.is_empty() {
            warn!("No telemetry channels configured");
            return self.interval;
        }

        // 在独立任务中执行，轮次内的 panic 不会终止轮询器
        let sweep = Arc::clone(&self.sweep);
        match tokio::spawn(async move { sweep.run().await }).await {
            Ok(_) => self.interval,
            Err(e) => {
                error!(error = %e, retry_secs = self.retry.as_secs(), "Telemetry cycle failed");
                self.retry
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::ChannelMap;
    use crate::testing::{feed_at, intake_for, FakeSource};
    use silo_shutdown::SignalHandler;
    use silo_store::MemoryStore;
    use std::collections::HashMap;

    fn sweep_over(
        source: Arc<FakeSource>,
        store: Arc<MemoryStore>,
        channels: ChannelMap,
    ) -> Arc<ChannelSweep> {
        Arc::new(ChannelSweep::new(
            source,
            intake_for(store.clone()),
            store,
            channels,
        ))
    }

    fn single_channel() -> ChannelMap {
        ChannelMap::new(
            HashMap::from([("silo_a".to_string(), "100".to_string())]),
            HashMap::new(),
        )
    }

    #[tokio::test]
    async fn test_stops_between_cycles_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(
            FakeSource::default().with_feed("100", feed_at("2024-05-01T12:00:00Z", "20.0")),
        );
        let sweep = sweep_over(source.clone(), store.clone(), single_channel());
        let poller = TelemetryPoller::new(sweep).with_interval(Duration::from_secs(3600));

        let (handler, rx) = SignalHandler::new();
        let task = tokio::spawn(poller.run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        handler.trigger_shutdown();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("poller did not stop")
            .unwrap();

        assert_eq!(source.calls().len(), 1);
        assert_eq!(store.reading_count().await, 1);
    }

    #[tokio::test]
    async fn test_cycle_panic_retries_after_short_delay() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(
            FakeSource::default()
                .with_feed("100", feed_at("2024-05-01T12:00:00Z", "20.0"))
                .panicking(1),
        );
        let sweep = sweep_over(source.clone(), store.clone(), single_channel());
        let poller = TelemetryPoller::new(sweep)
            .with_interval(Duration::from_secs(3600))
            .with_retry(Duration::from_millis(20));

        let (handler, rx) = SignalHandler::new();
        let task = tokio::spawn(poller.run(rx));

        tokio::time::sleep(Duration::from_millis(300)).await;
        handler.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("poller did not stop")
            .unwrap();

        assert_eq!(source.calls().len(), 2);
        assert_eq!(store.reading_count().await, 1);
    }

    #[tokio::test]
    async fn test_no_channels_waits_full_interval() {
        let store = Arc::new(MemoryStore::new());
        let source = Arc::new(FakeSource::default());
        let poller = TelemetryPoller::new(sweep_over(source.clone(), store, ChannelMap::default()))
            .with_interval(Duration::from_secs(3600))
            .with_retry(Duration::from_millis(1));

        let (handler, rx) = SignalHandler::new();
        let task = tokio::spawn(poller.run(rx));

        tokio::time::sleep(Duration::from_millis(50)).await;
        handler.trigger_shutdown();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("poller did not stop")
            .unwrap();

        assert!(source.calls().is_empty());
    }
}
