use crate::error::{AnomalyError, Result};
use crate::forest::{ForestParams, IsolationForest};
use crate::scorer::MODEL_NAME;
use chrono::{Duration, Utc};
use silo_store::SharedStore;
use silo_types::AnomalyModelRecord;
use tracing::{info, warn};

/// 训练结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    /// 已训练并写入存储
    Trained { samples: usize },
    /// 窗口内样本不足
    NotEnoughData { samples: usize },
}

/// 异常模型训练任务（批处理）
pub struct ModelTrainer {
    store: SharedStore,
    params: ForestParams,
    min_samples: usize,
}

impl ModelTrainer {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            params: ForestParams::default(),
            min_samples: 10,
        }
    }

    pub fn with_params(mut self, params: ForestParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// 使用最近 `window_days` 天的读数重新训练
    pub async fn retrain(&self, window_days: i64) -> Result<TrainOutcome> {
        let since = Utc::now() - Duration::days(window_days);
        let readings = self.store.list_readings_since(since).await?;
        let samples: Vec<[f64; 4]> = readings.iter().map(|r| r.feature_vector()).collect();

        if samples.len() < self.min_samples {
            warn!(
                samples = samples.len(),
                required = self.min_samples,
                "Not enough data to train anomaly model"
            );
            return Ok(TrainOutcome::NotEnoughData {
                samples: samples.len(),
            });
        }

        let params = self.params.clone();
        let count = samples.len();
        let forest = tokio::task::spawn_blocking(move || IsolationForest::fit(&samples, &params))
            .await
            .map_err(|e| AnomalyError::Training(e.to_string()))??;

        let record = AnomalyModelRecord::new(MODEL_NAME, forest.to_bytes()?);
        self.store.save_model(&record).await?;

        info!(
            model = MODEL_NAME,
            samples = count,
            offset = forest.offset(),
            "Anomaly model trained"
        );

        Ok(TrainOutcome::Trained { samples: count })
    }
}
