use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use silo_types::{Alert, AnomalyModelRecord, PushSubscription, Reading, Silo};
use std::sync::Arc;

/// 文档存储抽象
///
/// 管道只依赖这个接口，每次写入要么针对新生成的 ID，要么是按自然唯一键的幂等 upsert，
/// 因此并发调用不需要进程内加锁。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ---- 筒仓 ----

    /// 写入筒仓（按 ID 覆盖）
    async fn insert_silo(&self, silo: &Silo) -> Result<()>;

    async fn silo_by_id(&self, id: &str) -> Result<Option<Silo>>;

    async fn silo_by_name(&self, name: &str) -> Result<Option<Silo>>;

    // ---- 读数 ----

    async fn insert_reading(&self, reading: &Reading) -> Result<()>;

    /// 按筒仓查询读数，时间倒序，最多 `limit` 条
    async fn list_readings(&self, silo_id: &str, limit: u64) -> Result<Vec<Reading>>;

    /// 查询某时间点之后的全部读数（训练窗口）
    async fn list_readings_since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>>;

    // ---- 告警 ----

    async fn insert_alert(&self, alert: &Alert) -> Result<()>;

    /// 告警列表，时间倒序
    async fn list_alerts(&self, limit: u64) -> Result<Vec<Alert>>;

    /// 确认告警，返回告警是否存在
    async fn acknowledge_alert(&self, alert_id: &str, principal_id: &str) -> Result<bool>;

    // ---- 推送订阅 ----

    /// 按 endpoint upsert：同一 endpoint 只保留一条记录
    async fn upsert_push_subscription(&self, subscription: &PushSubscription) -> Result<()>;

    async fn delete_push_subscription(&self, id: &str) -> Result<bool>;

    async fn delete_push_subscription_by_endpoint(&self, endpoint: &str) -> Result<bool>;

    /// `silo_id == X OR silo_id IS NULL`
    async fn push_subscriptions_for_silo(&self, silo_id: &str) -> Result<Vec<PushSubscription>>;

    /// 全部订阅，按创建时间倒序
    async fn list_push_subscriptions(&self, limit: u64) -> Result<Vec<PushSubscription>>;

    // ---- 异常模型 ----

    async fn load_model(&self, name: &str) -> Result<Option<AnomalyModelRecord>>;

    /// 按名称 upsert（仅训练任务调用）
    async fn save_model(&self, record: &AnomalyModelRecord) -> Result<()>;
}

pub type SharedStore = Arc<dyn DocumentStore>;
