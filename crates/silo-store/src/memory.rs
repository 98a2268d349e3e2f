use crate::store::DocumentStore;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use silo_types::{Alert, AnomalyModelRecord, PushSubscription, Reading, Silo};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 内存存储实现（测试与无数据库部署使用）
#[derive(Clone, Default)]
pub struct MemoryStore {
    silos: Arc<RwLock<HashMap<String, Silo>>>,
    readings: Arc<RwLock<HashMap<String, Reading>>>,
    alerts: Arc<RwLock<HashMap<String, Alert>>>,
    subscriptions: Arc<RwLock<HashMap<String, PushSubscription>>>,
    models: Arc<RwLock<HashMap<String, AnomalyModelRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn reading_count(&self) -> usize {
        self.readings.read().await.len()
    }

    pub async fn alert_count(&self) -> usize {
        self.alerts.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_silo(&self, silo: &Silo) -> Result<()> {
        let mut silos = self.silos.write().await;
        silos.insert(silo.id.clone(), silo.clone());
        Ok(())
    }

    async fn silo_by_id(&self, id: &str) -> Result<Option<Silo>> {
        let silos = self.silos.read().await;
        Ok(silos.get(id).cloned())
    }

    async fn silo_by_name(&self, name: &str) -> Result<Option<Silo>> {
        let silos = self.silos.read().await;
        Ok(silos.values().find(|s| s.name == name).cloned())
    }

    async fn insert_reading(&self, reading: &Reading) -> Result<()> {
        let mut readings = self.readings.write().await;
        readings.insert(reading.id.clone(), reading.clone());
        Ok(())
    }

    async fn list_readings(&self, silo_id: &str, limit: u64) -> Result<Vec<Reading>> {
        let readings = self.readings.read().await;
        let mut filtered: Vec<_> = readings
            .values()
            .filter(|r| r.silo_id.as_deref() == Some(silo_id))
            .cloned()
            .collect();

        filtered.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        filtered.truncate(limit as usize);
        Ok(filtered)
    }

    async fn list_readings_since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>> {
        let readings = self.readings.read().await;
        let mut filtered: Vec<_> = readings
            .values()
            .filter(|r| r.timestamp >= since)
            .cloned()
            .collect();

        filtered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(filtered)
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<()> {
        let mut alerts = self.alerts.write().await;
        alerts.insert(alert.id.clone(), alert.clone());
        Ok(())
    }

    async fn list_alerts(&self, limit: u64) -> Result<Vec<Alert>> {
        let alerts = self.alerts.read().await;
        let mut all: Vec<_> = alerts.values().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn acknowledge_alert(&self, alert_id: &str, principal_id: &str) -> Result<bool> {
        let mut alerts = self.alerts.write().await;
        match alerts.get_mut(alert_id) {
            Some(alert) => {
                alert.acknowledge(principal_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_push_subscription(&self, subscription: &PushSubscription) -> Result<()> {
        let mut subscriptions = self.subscriptions.write().await;

        // 同一 endpoint 覆盖原记录并沿用原 ID
        let existing_id = subscriptions
            .values()
            .find(|s| s.endpoint == subscription.endpoint)
            .map(|s| s.id.clone());

        let mut record = subscription.clone();
        if let Some(id) = existing_id {
            record.id = id;
        }

        subscriptions.insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete_push_subscription(&self, id: &str) -> Result<bool> {
        let mut subscriptions = self.subscriptions.write().await;
        Ok(subscriptions.remove(id).is_some())
    }

    async fn delete_push_subscription_by_endpoint(&self, endpoint: &str) -> Result<bool> {
        let mut subscriptions = self.subscriptions.write().await;
        let before = subscriptions.len();
        subscriptions.retain(|_, s| s.endpoint != endpoint);
        Ok(subscriptions.len() < before)
    }

    async fn push_subscriptions_for_silo(&self, silo_id: &str) -> Result<Vec<PushSubscription>> {
        let subscriptions = self.subscriptions.read().await;
        Ok(subscriptions
            .values()
            .filter(|s| s.matches_silo(silo_id))
            .cloned()
            .collect())
    }

    async fn list_push_subscriptions(&self, limit: u64) -> Result<Vec<PushSubscription>> {
        let subscriptions = self.subscriptions.read().await;
        let mut all: Vec<_> = subscriptions.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit as usize);
        Ok(all)
    }

    async fn load_model(&self, name: &str) -> Result<Option<AnomalyModelRecord>> {
        let models = self.models.read().await;
        Ok(models.get(name).cloned())
    }

    async fn save_model(&self, record: &AnomalyModelRecord) -> Result<()> {
        let mut models = self.models.write().await;
        models.insert(record.name.clone(), record.clone());
        Ok(())
    }
}
