pub mod converter;
pub mod entity;

use crate::store::DocumentStore;
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use converter::{
    alert_from_model, silo_from_model, silo_to_active, subscription_from_model,
    subscription_to_active,
};
use entity::{alert, ml_model, push_subscription, reading, silo};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectOptions, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Schema,
};
use silo_types::{Alert, AnomalyModelRecord, PushSubscription, Reading, Silo};
use std::sync::Arc;
use tracing::{debug, info};

/// 基于 sea-orm 的文档存储（SQLite / PostgreSQL）
pub struct SqlStore {
    db: Arc<DatabaseConnection>,
}

impl SqlStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// 连接数据库
    ///
    /// 内存 SQLite 每个连接都是独立的库，因此固定为单连接。
    pub async fn connect(url: &str) -> Result<Self> {
        let mut options = ConnectOptions::new(url.to_string());
        if url.contains(":memory:") {
            options.max_connections(1).min_connections(1);
        }
        options.sqlx_logging(false);

        let db = Database::connect(options).await?;
        info!(url = %redact(url), "Document store connected");

        Ok(Self::new(Arc::new(db)))
    }

    /// 创建表结构（已存在则跳过）
    pub async fn setup_schema(&self) -> Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut tables = vec![
            schema.create_table_from_entity(silo::Entity),
            schema.create_table_from_entity(reading::Entity),
            schema.create_table_from_entity(alert::Entity),
            schema.create_table_from_entity(push_subscription::Entity),
            schema.create_table_from_entity(ml_model::Entity),
        ];
        for stmt in tables.iter_mut() {
            stmt.if_not_exists();
            self.db.execute(backend.build(&*stmt)).await?;
        }

        let mut indexes = schema.create_index_from_entity(reading::Entity);
        indexes.extend(schema.create_index_from_entity(alert::Entity));
        for stmt in indexes.iter_mut() {
            stmt.if_not_exists();
            self.db.execute(backend.build(&*stmt)).await?;
        }

        debug!("Document store schema ready");
        Ok(())
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// 日志中隐藏连接串里的密码
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            format!("{}://***{}", &url[..scheme], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl DocumentStore for SqlStore {
    async fn insert_silo(&self, s: &Silo) -> Result<()> {
        silo::Entity::insert(silo_to_active(s)?)
            .on_conflict(
                OnConflict::column(silo::Column::Id)
                    .update_columns([
                        silo::Column::Name,
                        silo::Column::DeviceId,
                        silo::Column::Location,
                        silo::Column::Settings,
                        silo::Column::Responsible,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    async fn silo_by_id(&self, id: &str) -> Result<Option<Silo>> {
        silo::Entity::find_by_id(id.to_string())
            .one(&*self.db)
            .await?
            .map(silo_from_model)
            .transpose()
    }

    async fn silo_by_name(&self, name: &str) -> Result<Option<Silo>> {
        silo::Entity::find()
            .filter(silo::Column::Name.eq(name))
            .one(&*self.db)
            .await?
            .map(silo_from_model)
            .transpose()
    }

    async fn insert_reading(&self, r: &Reading) -> Result<()> {
        reading::Entity::insert(reading::ActiveModel::from(r))
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    async fn list_readings(&self, silo_id: &str, limit: u64) -> Result<Vec<Reading>> {
        let models = reading::Entity::find()
            .filter(reading::Column::SiloId.eq(silo_id))
            .order_by_desc(reading::Column::Timestamp)
            .limit(limit)
            .all(&*self.db)
            .await?;

        Ok(models.into_iter().map(Reading::from).collect())
    }

    async fn list_readings_since(&self, since: DateTime<Utc>) -> Result<Vec<Reading>> {
        let models = reading::Entity::find()
            .filter(reading::Column::Timestamp.gte(since))
            .order_by_asc(reading::Column::Timestamp)
            .all(&*self.db)
            .await?;

        Ok(models.into_iter().map(Reading::from).collect())
    }

    async fn insert_alert(&self, a: &Alert) -> Result<()> {
        alert::Entity::insert(alert::ActiveModel::from(a))
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    async fn list_alerts(&self, limit: u64) -> Result<Vec<Alert>> {
        let models = alert::Entity::find()
            .order_by_desc(alert::Column::Timestamp)
            .limit(limit)
            .all(&*self.db)
            .await?;

        models.into_iter().map(alert_from_model).collect()
    }

    async fn acknowledge_alert(&self, alert_id: &str, principal_id: &str) -> Result<bool> {
        let result = alert::Entity::update_many()
            .col_expr(alert::Column::Acknowledged, Expr::value(true))
            .col_expr(alert::Column::AckBy, Expr::value(principal_id.to_string()))
            .col_expr(alert::Column::AckAt, Expr::value(Utc::now()))
            .filter(alert::Column::Id.eq(alert_id))
            .exec(&*self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn upsert_push_subscription(&self, sub: &PushSubscription) -> Result<()> {
        push_subscription::Entity::insert(subscription_to_active(sub)?)
            .on_conflict(
                OnConflict::column(push_subscription::Column::Endpoint)
                    .update_columns([
                        push_subscription::Column::Keys,
                        push_subscription::Column::UserId,
                        push_subscription::Column::SiloId,
                        push_subscription::Column::CreatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }

    async fn delete_push_subscription(&self, id: &str) -> Result<bool> {
        let result = push_subscription::Entity::delete_by_id(id.to_string())
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_push_subscription_by_endpoint(&self, endpoint: &str) -> Result<bool> {
        let result = push_subscription::Entity::delete_many()
            .filter(push_subscription::Column::Endpoint.eq(endpoint))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn push_subscriptions_for_silo(&self, silo_id: &str) -> Result<Vec<PushSubscription>> {
        let models = push_subscription::Entity::find()
            .filter(
                Condition::any()
                    .add(push_subscription::Column::SiloId.eq(silo_id))
                    .add(push_subscription::Column::SiloId.is_null()),
            )
            .all(&*self.db)
            .await?;

        models.into_iter().map(subscription_from_model).collect()
    }

    async fn list_push_subscriptions(&self, limit: u64) -> Result<Vec<PushSubscription>> {
        let models = push_subscription::Entity::find()
            .order_by_desc(push_subscription::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?;

        models.into_iter().map(subscription_from_model).collect()
    }

    async fn load_model(&self, name: &str) -> Result<Option<AnomalyModelRecord>> {
        let model = ml_model::Entity::find_by_id(name.to_string())
            .one(&*self.db)
            .await?;
        Ok(model.map(AnomalyModelRecord::from))
    }

    async fn save_model(&self, record: &AnomalyModelRecord) -> Result<()> {
        ml_model::Entity::insert(ml_model::ActiveModel::from(record))
            .on_conflict(
                OnConflict::column(ml_model::Column::Name)
                    .update_columns([ml_model::Column::Model, ml_model::Column::TrainedAt])
                    .to_owned(),
            )
            .exec_without_returning(&*self.db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_credentials() {
        assert_eq!(
            redact("postgres://silo:secret@db:5432/silo"),
            "postgres://***@db:5432/silo"
        );
        assert_eq!(redact("sqlite::memory:"), "sqlite::memory:");
    }
}
