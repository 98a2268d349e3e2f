use super::entity::{alert, ml_model, push_subscription, reading, silo};
use crate::{Result, StoreError};
use sea_orm::ActiveValue::Set;
use silo_types::{Alert, AlertLevel, AnomalyModelRecord, PushSubscription, Reading, Silo};

/// Silo 模型与数据库实体的转换
pub(crate) fn silo_to_active(silo: &Silo) -> Result<silo::ActiveModel> {
    let location = match &silo.location {
        Some(location) => Some(serde_json::to_value(location)?),
        None => None,
    };

    Ok(silo::ActiveModel {
        id: Set(silo.id.clone()),
        name: Set(silo.name.clone()),
        device_id: Set(silo.device_id.clone()),
        location: Set(location),
        settings: Set(serde_json::to_value(&silo.settings)?),
        responsible: Set(serde_json::to_value(&silo.responsible)?),
    })
}

pub(crate) fn silo_from_model(model: silo::Model) -> Result<Silo> {
    let location = match model.location {
        Some(value) if !value.is_null() => Some(serde_json::from_value(value)?),
        _ => None,
    };

    Ok(Silo {
        id: model.id,
        name: model.name,
        device_id: model.device_id,
        location,
        settings: serde_json::from_value(model.settings)?,
        responsible: serde_json::from_value(model.responsible)?,
    })
}

/// Reading 模型与数据库实体的转换
impl From<&Reading> for reading::ActiveModel {
    fn from(r: &Reading) -> Self {
        Self {
            id: Set(r.id.clone()),
            device_id: Set(r.device_id.clone()),
            silo_id: Set(r.silo_id.clone()),
            timestamp: Set(r.timestamp),
            temp_c: Set(r.temp_c),
            rh_pct: Set(r.rh_pct),
            co2_ppm_est: Set(r.co2_ppm_est),
            mq2_raw: Set(r.mq2_raw),
            device_status: Set(r.device_status.clone()),
        }
    }
}

impl From<reading::Model> for Reading {
    fn from(model: reading::Model) -> Self {
        Self {
            id: model.id,
            device_id: model.device_id,
            silo_id: model.silo_id,
            timestamp: model.timestamp,
            temp_c: model.temp_c,
            rh_pct: model.rh_pct,
            co2_ppm_est: model.co2_ppm_est,
            mq2_raw: model.mq2_raw,
            device_status: model.device_status,
        }
    }
}

/// Alert 模型与数据库实体的转换
impl From<&Alert> for alert::ActiveModel {
    fn from(a: &Alert) -> Self {
        Self {
            id: Set(a.id.clone()),
            silo_id: Set(a.silo_id.clone()),
            level: Set(a.level.as_str().to_string()),
            message: Set(a.message.clone()),
            value: Set(a.value),
            timestamp: Set(a.timestamp),
            acknowledged: Set(a.acknowledged),
            ack_by: Set(a.ack_by.clone()),
            ack_at: Set(a.ack_at),
        }
    }
}

pub(crate) fn alert_from_model(model: alert::Model) -> Result<Alert> {
    let level = AlertLevel::from_str(&model.level).ok_or_else(|| {
        StoreError::corrupted(&model.id, format!("unknown alert level '{}'", model.level))
    })?;

    Ok(Alert {
        id: model.id,
        silo_id: model.silo_id,
        level,
        message: model.message,
        value: model.value,
        timestamp: model.timestamp,
        acknowledged: model.acknowledged,
        ack_by: model.ack_by,
        ack_at: model.ack_at,
    })
}

/// PushSubscription 模型与数据库实体的转换
pub(crate) fn subscription_to_active(
    sub: &PushSubscription,
) -> Result<push_subscription::ActiveModel> {
    Ok(push_subscription::ActiveModel {
        id: Set(sub.id.clone()),
        endpoint: Set(sub.endpoint.clone()),
        keys: Set(serde_json::to_value(&sub.keys)?),
        user_id: Set(sub.user_id.clone()),
        silo_id: Set(sub.silo_id.clone()),
        created_at: Set(sub.created_at),
    })
}

pub(crate) fn subscription_from_model(model: push_subscription::Model) -> Result<PushSubscription> {
    Ok(PushSubscription {
        id: model.id,
        endpoint: model.endpoint,
        keys: serde_json::from_value(model.keys)?,
        user_id: model.user_id,
        silo_id: model.silo_id,
        created_at: model.created_at,
    })
}

/// AnomalyModelRecord 与数据库实体的转换
impl From<&AnomalyModelRecord> for ml_model::ActiveModel {
    fn from(record: &AnomalyModelRecord) -> Self {
        Self {
            name: Set(record.name.clone()),
            model: Set(record.model.clone()),
            trained_at: Set(record.trained_at),
        }
    }
}

impl From<ml_model::Model> for AnomalyModelRecord {
    fn from(model: ml_model::Model) -> Self {
        Self {
            name: model.name,
            model: model.model,
            trained_at: model.trained_at,
        }
    }
}
