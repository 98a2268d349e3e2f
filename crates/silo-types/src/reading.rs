use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 读数中可被规则检查的数值字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingField {
    /// 温度（摄氏度）
    Temperature,
    /// 相对湿度（%）
    Humidity,
    /// CO₂ 估算值（ppm）
    Co2Estimate,
    /// 气体传感器原始值
    GasRaw,
}

impl ReadingField {
    /// 特征向量中的固定顺序
    pub const ALL: [ReadingField; 4] = [
        ReadingField::Temperature,
        ReadingField::Humidity,
        ReadingField::Co2Estimate,
        ReadingField::GasRaw,
    ];

    /// 文档中的字段名
    pub fn key(&self) -> &'static str {
        match self {
            ReadingField::Temperature => "temp_C",
            ReadingField::Humidity => "rh_pct",
            ReadingField::Co2Estimate => "co2_ppm_est",
            ReadingField::GasRaw => "mq2_raw",
        }
    }
}

/// 已入库的传感器读数，写入后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub device_id: String,
    #[serde(default)]
    pub silo_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "temp_C", default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub rh_pct: Option<f64>,
    #[serde(default)]
    pub co2_ppm_est: Option<f64>,
    #[serde(default)]
    pub mq2_raw: Option<i64>,
    pub device_status: String,
}

impl Reading {
    /// 读取数值字段；缺失或非有限值视为无信号
    pub fn measurement(&self, field: ReadingField) -> Option<f64> {
        let value = match field {
            ReadingField::Temperature => self.temp_c,
            ReadingField::Humidity => self.rh_pct,
            ReadingField::Co2Estimate => self.co2_ppm_est,
            ReadingField::GasRaw => self.mq2_raw.map(|v| v as f64),
        }?;

        value.is_finite().then_some(value)
    }

    /// 异常检测使用的四维特征向量，缺失值补 0
    pub fn feature_vector(&self) -> [f64; 4] {
        ReadingField::ALL.map(|field| self.measurement(field).unwrap_or(0.0))
    }
}

fn default_device_status() -> String {
    "ok".to_string()
}

/// 入站读数（已由上游完成 schema 校验）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "temp_C", default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub rh_pct: Option<f64>,
    #[serde(default)]
    pub co2_ppm_est: Option<f64>,
    #[serde(default)]
    pub mq2_raw: Option<i64>,
    #[serde(default = "default_device_status")]
    pub device_status: String,
    #[serde(default)]
    pub silo_id: Option<String>,
}

impl ReadingPayload {
    pub fn new(device_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            device_id: device_id.into(),
            timestamp,
            temp_c: None,
            rh_pct: None,
            co2_ppm_est: None,
            mq2_raw: None,
            device_status: default_device_status(),
            silo_id: None,
        }
    }

    pub fn with_silo(mut self, silo_id: impl Into<String>) -> Self {
        self.silo_id = Some(silo_id.into());
        self
    }

    pub fn with_temperature(mut self, value: f64) -> Self {
        self.temp_c = Some(value);
        self
    }

    pub fn with_humidity(mut self, value: f64) -> Self {
        self.rh_pct = Some(value);
        self
    }

    pub fn with_co2(mut self, value: f64) -> Self {
        self.co2_ppm_est = Some(value);
        self
    }

    pub fn with_gas_raw(mut self, value: i64) -> Self {
        self.mq2_raw = Some(value);
        self
    }

    /// 转换为读数，没有 ID 时生成新的 ID
    pub fn into_reading(self) -> Reading {
        Reading {
            id: self.id.unwrap_or_else(crate::new_id),
            device_id: self.device_id,
            silo_id: self.silo_id,
            timestamp: self.timestamp,
            temp_c: self.temp_c,
            rh_pct: self.rh_pct,
            co2_ppm_est: self.co2_ppm_est,
            mq2_raw: self.mq2_raw,
            device_status: self.device_status,
        }
    }
}
