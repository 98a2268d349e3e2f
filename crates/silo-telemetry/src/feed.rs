use crate::error::{Result, TelemetryError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use silo_types::{coerce_f64, ReadingPayload};

/// `feeds.json` 响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub feeds: Vec<Feed>,
}

/// 单个采样
///
/// 字段映射固定：field1 温度、field2 湿度、field3 CO₂ 估算、field4 气体原始值。
/// 字段值可能是字符串、数字或 null。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub entry_id: Option<u64>,
    #[serde(default)]
    pub field1: Option<Value>,
    #[serde(default)]
    pub field2: Option<Value>,
    #[serde(default)]
    pub field3: Option<Value>,
    #[serde(default)]
    pub field4: Option<Value>,
}

fn number(field: &Option<Value>) -> Option<f64> {
    field.as_ref().and_then(coerce_f64)
}

impl Feed {
    /// RFC 3339 时间戳（`2024-05-01T12:00:00Z`）
    pub fn timestamp(&self) -> Result<DateTime<Utc>> {
        let raw = self
            .created_at
            .as_deref()
            .ok_or_else(|| TelemetryError::InvalidTimestamp("missing created_at".to_string()))?;

        DateTime::parse_from_rfc3339(raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| TelemetryError::InvalidTimestamp(format!("{}: {}", raw, e)))
    }

    /// 映射为读数载荷；缺失或非数值字段视为无信号
    pub fn to_payload(&self, device_id: &str, silo_id: Option<&str>) -> Result<ReadingPayload> {
        let mut payload = ReadingPayload::new(device_id, self.timestamp()?);
        payload.temp_c = number(&self.field1);
        payload.rh_pct = number(&self.field2);
        payload.co2_ppm_est = number(&self.field3);
        payload.mq2_raw = number(&self.field4).map(|v| v.round() as i64);
        payload.silo_id = silo_id.map(str::to_string);

        Ok(payload)
    }
}
