use silo_notify::NotificationDispatcher;
use silo_store::{Result, SharedStore};
use silo_types::{Alert, CandidateAlert};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

/// 告警分发方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// 在当前任务内等待分发完成
    Inline,
    /// 另起任务分发，不阻塞读数处理
    #[default]
    Detached,
}

/// 告警落库并触发通知
///
/// 落库与分发是顺序执行而非事务：分发失败不会回滚已保存的告警。
/// 克隆共享同一组后台分发任务，进程退出前需调用 [`AlertSink::drain`]。
#[derive(Clone)]
pub struct AlertSink {
    store: SharedStore,
    dispatcher: Arc<NotificationDispatcher>,
    mode: DispatchMode,
    tasks: TaskTracker,
}

impl AlertSink {
    pub fn new(store: SharedStore, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            mode: DispatchMode::default(),
            tasks: TaskTracker::new(),
        }
    }

    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// 保存候选告警并分发，返回已保存的告警
    pub async fn record(&self, silo_id: &str, candidate: CandidateAlert) -> Result<Alert> {
        let alert = Alert::from_candidate(silo_id, candidate);
        self.store.insert_alert(&alert).await?;

        info!(
            alert_id = %alert.id,
            silo_id = %alert.silo_id,
            level = %alert.level,
            value = alert.value,
            "Alert recorded"
        );

        match self.mode {
            DispatchMode::Inline => {
                self.dispatcher.dispatch(&alert).await;
            }
            DispatchMode::Detached => {
                let dispatcher = Arc::clone(&self.dispatcher);
                let detached = alert.clone();
                self.tasks.spawn(async move {
                    dispatcher.dispatch(&detached).await;
                });
                debug!(alert_id = %alert.id, "Alert dispatch detached");
            }
        }

        Ok(alert)
    }

    /// 尚未完成的后台分发数
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// 等待所有后台分发完成
    pub async fn drain(&self) {
        let pending = self.tasks.len();
        if pending > 0 {
            info!(pending, "Waiting for alert dispatches to finish");
        }

        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use silo_notify::{ChatError, ChatTransport};
    use silo_store::{DocumentStore, MemoryStore};
    use silo_types::{AlertLevel, Silo};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_record_persists_unacknowledged_alert() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(store.clone()));
        let sink = AlertSink::new(store.clone(), dispatcher).with_mode(DispatchMode::Inline);

        let candidate = CandidateAlert::new(AlertLevel::Critical, "CO2 acima do limite", 1500.0);
        let alert = sink.record("silo-1", candidate).await.unwrap();

        assert!(!alert.acknowledged);
        assert!(alert.ack_by.is_none());
        assert_eq!(alert.silo_id, "silo-1");

        let stored = store.list_alerts(10).await.unwrap();
        assert_eq!(stored, vec![alert]);
    }

    #[tokio::test]
    async fn test_detached_dispatch_still_persists() {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = Arc::new(NotificationDispatcher::new(store.clone()));
        let sink = AlertSink::new(store.clone(), dispatcher);

        let candidate = CandidateAlert::new(AlertLevel::Warning, "MQ2 alto", 600.0);
        sink.record("silo-1", candidate).await.unwrap();

        assert_eq!(store.alert_count().await, 1);
    }

    #[derive(Default)]
    struct SlowChat {
        sent: AtomicUsize,
    }

    #[async_trait]
    impl ChatTransport for SlowChat {
        async fn send(&self, _channel_id: &str, _text: &str) -> std::result::Result<(), ChatError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.sent.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    #[tokio::test]
    async fn test_drain_waits_for_detached_dispatch() {
        let store = Arc::new(MemoryStore::new());
        let silo = Silo::new("Silo Sul", "esp32-02")
            .with_id("silo-1")
            .with_telegram_chat("-1002");
        store.insert_silo(&silo).await.unwrap();

        let chat = Arc::new(SlowChat::default());
        let dispatcher =
            Arc::new(NotificationDispatcher::new(store.clone()).with_chat(chat.clone()));
        let sink = AlertSink::new(store.clone(), dispatcher);

        let candidate = CandidateAlert::new(AlertLevel::Warning, "MQ2 alto", 600.0);
        sink.record("silo-1", candidate).await.unwrap();
        assert_eq!(chat.sent.load(Ordering::SeqCst), 0);
        assert_eq!(sink.pending(), 1);

        sink.drain().await;
        assert_eq!(chat.sent.load(Ordering::SeqCst), 1);
        assert_eq!(sink.pending(), 0);

        // drain 之后仍可继续分发
        let candidate = CandidateAlert::new(AlertLevel::Warning, "MQ2 alto", 650.0);
        sink.clone().record("silo-1", candidate).await.unwrap();
        sink.drain().await;
        assert_eq!(chat.sent.load(Ordering::SeqCst), 2);
    }
}
