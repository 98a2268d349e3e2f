use crate::error::{ChatError, PushError};
use crate::message::{alert_text, push_payload};
use crate::transport::{ChatTransport, PushTransport};
use futures::stream::{self, StreamExt};
use silo_store::SharedStore;
use silo_types::{Alert, PushSubscription, Silo};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 聊天通道投递结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatOutcome {
    Sent,
    /// 未配置通道或筒仓没有绑定会话
    Skipped,
    Failed(String),
}

/// 单次分发的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub chat: ChatOutcome,
    pub push_attempted: usize,
    pub push_delivered: usize,
    pub push_failed: usize,
    /// 因端点失效被删除的订阅 ID
    pub pruned: Vec<String>,
}

impl DispatchReport {
    fn new() -> Self {
        Self {
            chat: ChatOutcome::Skipped,
            push_attempted: 0,
            push_delivered: 0,
            push_failed: 0,
            pruned: Vec::new(),
        }
    }
}

/// 通知分发器
///
/// 所有投递错误都在这里记录并吸收，不向调用方抛出。
pub struct NotificationDispatcher {
    store: SharedStore,
    chat: Option<Arc<dyn ChatTransport>>,
    push: Option<Arc<dyn PushTransport>>,
    push_concurrency: usize,
}

impl NotificationDispatcher {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            chat: None,
            push: None,
            push_concurrency: 4,
        }
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatTransport>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_push(mut self, push: Arc<dyn PushTransport>) -> Self {
        self.push = Some(push);
        self
    }

    pub fn with_push_concurrency(mut self, concurrency: usize) -> Self {
        self.push_concurrency = concurrency.max(1);
        self
    }

    /// 分发一条已持久化的告警
    pub async fn dispatch(&self, alert: &Alert) -> DispatchReport {
        let mut report = DispatchReport::new();

        let silo = match self.store.silo_by_id(&alert.silo_id).await {
            Ok(silo) => silo,
            Err(e) => {
                warn!(
                    alert_id = %alert.id,
                    silo_id = %alert.silo_id,
                    error = %e,
                    "Failed to load silo for alert"
                );
                None
            }
        };
        let text = alert_text(alert, silo.as_ref().map(|s| s.name.as_str()));

        report.chat = self.send_chat(alert, silo.as_ref(), &text).await;
        self.send_push(alert, &text, &mut report).await;

        info!(
            alert_id = %alert.id,
            chat = ?report.chat,
            push_delivered = report.push_delivered,
            push_failed = report.push_failed,
            pruned = report.pruned.len(),
            "Alert dispatched"
        );

        report
    }

    async fn send_chat(&self, alert: &Alert, silo: Option<&Silo>, text: &str) -> ChatOutcome {
        let Some(chat) = self.chat.as_ref().filter(|c| c.is_enabled()) else {
            debug!(alert_id = %alert.id, "Chat transport not configured, skipping");
            return ChatOutcome::Skipped;
        };
        let Some(channel_id) = silo.and_then(|s| s.chat_channel()) else {
            debug!(alert_id = %alert.id, "No chat channel bound to silo, skipping");
            return ChatOutcome::Skipped;
        };

        match chat.send(channel_id, text).await {
            Ok(()) => ChatOutcome::Sent,
            Err(ChatError::NotConfigured) => ChatOutcome::Skipped,
            Err(e) => {
                warn!(
                    alert_id = %alert.id,
                    transport = chat.name(),
                    error = %e,
                    "Chat notification failed"
                );
                ChatOutcome::Failed(e.to_string())
            }
        }
    }

    async fn send_push(&self, alert: &Alert, text: &str, report: &mut DispatchReport) {
        let Some(push) = self.push.as_ref().filter(|p| p.is_enabled()) else {
            debug!(alert_id = %alert.id, "Push transport not configured, skipping");
            return;
        };

        let subscriptions = match self.store.push_subscriptions_for_silo(&alert.silo_id).await {
            Ok(subscriptions) => subscriptions,
            Err(e) => {
                error!(alert_id = %alert.id, error = %e, "Failed to load push subscriptions");
                return;
            }
        };
        if subscriptions.is_empty() {
            return;
        }

        let payload = push_payload(text);
        report.push_attempted = subscriptions.len();

        // 各订阅独立投递，单个失败不影响其余
        let results: Vec<(PushSubscription, Result<(), PushError>)> = stream::iter(subscriptions)
            .map(|subscription| {
                let push = Arc::clone(push);
                let payload = payload.as_slice();
                async move {
                    let result = push.send(&subscription, payload).await;
                    (subscription, result)
                }
            })
            .buffer_unordered(self.push_concurrency)
            .collect()
            .await;

        for (subscription, result) in results {
            match result {
                Ok(()) => report.push_delivered += 1,
                Err(e) if e.is_gone() => {
                    report.push_failed += 1;
                    self.prune(&subscription, &e, report).await;
                }
                Err(e) => {
                    report.push_failed += 1;
                    warn!(
                        subscription_id = %subscription.id,
                        transport = push.name(),
                        error = %e,
                        "Push notification failed"
                    );
                }
            }
        }
    }

    /// 端点确认失效后删除订阅
    async fn prune(
        &self,
        subscription: &PushSubscription,
        cause: &PushError,
        report: &mut DispatchReport,
    ) {
        match self.store.delete_push_subscription(&subscription.id).await {
            Ok(_) => {
                info!(
                    subscription_id = %subscription.id,
                    endpoint = %subscription.endpoint,
                    cause = %cause,
                    "Pruned dead push subscription"
                );
                report.pruned.push(subscription.id.clone());
            }
            Err(e) => {
                error!(
                    subscription_id = %subscription.id,
                    error = %e,
                    "Failed to prune push subscription"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use silo_store::{DocumentStore, MemoryStore};
    use silo_types::{AlertLevel, CandidateAlert, PushKeys};
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// 记录所有发送的假聊天通道
    #[derive(Default)]
    pub struct FakeChat {
        pub sent: Mutex<Vec<(String, String)>>,
        pub fail: bool,
    }

    #[async_trait]
    impl ChatTransport for FakeChat {
        async fn send(&self, channel_id: &str, text: &str) -> Result<(), ChatError> {
            if self.fail {
                return Err(ChatError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.sent
                .lock()
                .unwrap()
                .push((channel_id.to_string(), text.to_string()));
            Ok(())
        }

        fn name(&self) -> &str {
            "fake-chat"
        }
    }

    /// 按 endpoint 决定失败方式的假推送通道
    #[derive(Default)]
    pub struct FakePush {
        pub attempts: Mutex<Vec<String>>,
        pub gone: HashSet<String>,
        pub transient: HashSet<String>,
    }

    #[async_trait]
    impl PushTransport for FakePush {
        async fn send(
            &self,
            subscription: &PushSubscription,
            _payload: &[u8],
        ) -> Result<(), PushError> {
            self.attempts
                .lock()
                .unwrap()
                .push(subscription.endpoint.clone());
            if self.gone.contains(&subscription.endpoint) {
                return Err(PushError::EndpointGone("410 Gone".to_string()));
            }
            if self.transient.contains(&subscription.endpoint) {
                return Err(PushError::Transient("503".to_string()));
            }
            Ok(())
        }

        fn name(&self) -> &str {
            "fake-push"
        }
    }

    fn alert_for(silo_id: &str) -> Alert {
        Alert::from_candidate(
            silo_id,
            CandidateAlert::new(AlertLevel::Warning, "Temperatura acima do limite", 40.0),
        )
    }

    async fn seeded_store() -> (Arc<MemoryStore>, Silo) {
        let store = Arc::new(MemoryStore::new());
        let silo = Silo::new("Silo Norte", "esp32-01").with_telegram_chat("-1001");
        store.insert_silo(&silo).await.unwrap();
        (store, silo)
    }

    #[tokio::test]
    async fn test_prunes_gone_scoped_subscription_keeps_global() {
        let (store, silo) = seeded_store().await;
        let scoped = PushSubscription::new("https://push.example/scoped", PushKeys::default())
            .scoped_to(&silo.id);
        let global = PushSubscription::new("https://push.example/global", PushKeys::default());
        store.upsert_push_subscription(&scoped).await.unwrap();
        store.upsert_push_subscription(&global).await.unwrap();

        let push = Arc::new(FakePush {
            gone: HashSet::from([scoped.endpoint.clone()]),
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(store.clone()).with_push(push.clone());

        let report = dispatcher.dispatch(&alert_for(&silo.id)).await;

        let mut attempts = push.attempts.lock().unwrap().clone();
        attempts.sort();
        assert_eq!(attempts, vec![global.endpoint.clone(), scoped.endpoint.clone()]);
        assert_eq!(report.push_attempted, 2);
        assert_eq!(report.push_delivered, 1);
        assert_eq!(report.pruned, vec![scoped.id.clone()]);

        let remaining = store.list_push_subscriptions(100).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].endpoint, global.endpoint);
    }

    #[tokio::test]
    async fn test_transient_failure_keeps_subscription_and_continues() {
        let (store, silo) = seeded_store().await;
        let endpoints = [
            "https://push.example/a",
            "https://push.example/b",
            "https://push.example/c",
        ];
        for endpoint in endpoints {
            store
                .upsert_push_subscription(&PushSubscription::new(endpoint, PushKeys::default()))
                .await
                .unwrap();
        }

        let push = Arc::new(FakePush {
            transient: HashSet::from(["https://push.example/a".to_string()]),
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(store.clone())
            .with_push(push.clone())
            .with_push_concurrency(1);

        let report = dispatcher.dispatch(&alert_for(&silo.id)).await;

        assert_eq!(push.attempts.lock().unwrap().len(), 3);
        assert_eq!(report.push_delivered, 2);
        assert_eq!(report.push_failed, 1);
        assert!(report.pruned.is_empty());
        assert_eq!(store.list_push_subscriptions(100).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_subscriptions_for_other_silos_ignored() {
        let (store, silo) = seeded_store().await;
        store
            .upsert_push_subscription(
                &PushSubscription::new("https://push.example/other", PushKeys::default())
                    .scoped_to("another-silo"),
            )
            .await
            .unwrap();

        let push = Arc::new(FakePush::default());
        let dispatcher = NotificationDispatcher::new(store).with_push(push.clone());
        let report = dispatcher.dispatch(&alert_for(&silo.id)).await;

        assert_eq!(report.push_attempted, 0);
        assert!(push.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_message_sent_to_bound_channel() {
        let (store, silo) = seeded_store().await;
        let chat = Arc::new(FakeChat::default());
        let dispatcher = NotificationDispatcher::new(store).with_chat(chat.clone());

        let report = dispatcher.dispatch(&alert_for(&silo.id)).await;

        assert_eq!(report.chat, ChatOutcome::Sent);
        assert_eq!(
            chat.sent.lock().unwrap().as_slice(),
            &[(
                "-1001".to_string(),
                "[WARNING] Silo Norte: Temperatura acima do limite (valor=40)".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_chat_skipped_without_binding_or_silo() {
        let store = Arc::new(MemoryStore::new());
        let unbound = Silo::new("Silo Sul", "esp32-02");
        store.insert_silo(&unbound).await.unwrap();

        let chat = Arc::new(FakeChat::default());
        let dispatcher = NotificationDispatcher::new(store).with_chat(chat.clone());

        assert_eq!(dispatcher.dispatch(&alert_for(&unbound.id)).await.chat, ChatOutcome::Skipped);
        assert_eq!(dispatcher.dispatch(&alert_for("missing")).await.chat, ChatOutcome::Skipped);
        assert!(chat.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_failure_is_absorbed() {
        let (store, silo) = seeded_store().await;
        let chat = Arc::new(FakeChat {
            fail: true,
            ..Default::default()
        });
        let dispatcher = NotificationDispatcher::new(store).with_chat(chat);

        let report = dispatcher.dispatch(&alert_for(&silo.id)).await;
        assert!(matches!(report.chat, ChatOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_no_transports_is_silent() {
        let (store, silo) = seeded_store().await;
        let dispatcher = NotificationDispatcher::new(store);

        let report = dispatcher.dispatch(&alert_for(&silo.id)).await;
        assert_eq!(report.chat, ChatOutcome::Skipped);
        assert_eq!(report.push_attempted, 0);
    }
}
