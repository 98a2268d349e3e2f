use crate::error::{AnomalyError, Result};
use crate::forest::IsolationForest;
use async_trait::async_trait;
use silo_store::SharedStore;
use silo_types::Reading;
use std::fmt;
use tracing::{debug, warn};

/// 存储中的模型名称
pub const MODEL_NAME: &str = "isolation_v1";

/// 单条读数的评分结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyScore {
    pub is_anomaly: bool,
    /// 决策分数，越低越异常
    pub score: f64,
}

/// 异常检测接口
///
/// `Ok(None)` 表示没有已训练的模型（冷启动），不是错误。
#[async_trait]
pub trait AnomalyDetector: Send + Sync {
    async fn detect(&self, reading: &Reading) -> Result<Option<AnomalyScore>>;
}

/// 基于存储中孤立森林模型的评分器
///
/// 每次评分都重新读取模型，训练任务写入新模型后立即生效。
pub struct AnomalyScorer {
    store: SharedStore,
    model_name: String,
}

impl AnomalyScorer {
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            model_name: MODEL_NAME.to_string(),
        }
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    async fn load(&self) -> Result<Option<IsolationForest>> {
        let Some(record) = self.store.load_model(&self.model_name).await? else {
            return Ok(None);
        };

        let forest = IsolationForest::from_bytes(&record.model)?;
        debug!(model = %record.name, trained_at = %record.trained_at, "Anomaly model loaded");
        Ok(Some(forest))
    }
}

#[async_trait]
impl AnomalyDetector for AnomalyScorer {
    async fn detect(&self, reading: &Reading) -> Result<Option<AnomalyScore>> {
        let Some(forest) = self.load().await? else {
            return Ok(None);
        };

        let features = reading.feature_vector();
        let score = forest.decision_function(&features);
        if !score.is_finite() {
            return Err(AnomalyError::Scoring(format!(
                "non-finite decision score for reading {}",
                reading.id
            )));
        }

        Ok(Some(AnomalyScore {
            is_anomaly: score < 0.0,
            score,
        }))
    }
}

/// 异常检测的三种结果
///
/// 调用方把 `NoModel` 和 `Failed` 都当作"无异常"，但日志中区分三者。
#[derive(Debug, Clone, PartialEq)]
pub enum AnomalyOutcome {
    Scored(AnomalyScore),
    NoModel,
    Failed(String),
}

impl AnomalyOutcome {
    /// 执行检测并吸收错误
    pub async fn evaluate(detector: &dyn AnomalyDetector, reading: &Reading) -> Self {
        match detector.detect(reading).await {
            Ok(Some(score)) => {
                debug!(
                    reading_id = %reading.id,
                    score = score.score,
                    anomalous = score.is_anomaly,
                    "Anomaly scored"
                );
                AnomalyOutcome::Scored(score)
            }
            Ok(None) => {
                debug!(reading_id = %reading.id, "No anomaly model stored, skipping");
                AnomalyOutcome::NoModel
            }
            Err(e) => {
                warn!(reading_id = %reading.id, error = %e, "Anomaly detection failed");
                AnomalyOutcome::Failed(e.to_string())
            }
        }
    }

    pub fn is_anomaly(&self) -> bool {
        matches!(self, AnomalyOutcome::Scored(s) if s.is_anomaly)
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            AnomalyOutcome::Scored(s) => Some(s.score),
            _ => None,
        }
    }

    /// `(is_anomaly, score)` 形式
    pub fn as_pair(&self) -> (bool, Option<f64>) {
        (self.is_anomaly(), self.score())
    }
}

impl fmt::Display for AnomalyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyOutcome::Scored(s) => write!(f, "scored({:.4})", s.score),
            AnomalyOutcome::NoModel => write!(f, "no model"),
            AnomalyOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forest::ForestParams;
    use chrono::Utc;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use silo_store::{DocumentStore, MemoryStore};
    use silo_types::{AnomalyModelRecord, ReadingPayload};
    use std::sync::Arc;

    fn reading(temp: f64, rh: f64, co2: f64, gas: i64) -> Reading {
        ReadingPayload::new("esp32-01", Utc::now())
            .with_temperature(temp)
            .with_humidity(rh)
            .with_co2(co2)
            .with_gas_raw(gas)
            .into_reading()
    }

    async fn store_with_model() -> Arc<MemoryStore> {
        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<[f64; 4]> = (0..300)
            .map(|_| {
                [
                    25.0 + rng.gen_range(-2.0..2.0),
                    60.0 + rng.gen_range(-5.0..5.0),
                    400.0 + rng.gen_range(-30.0..30.0),
                    200.0 + rng.gen_range(-20.0..20.0),
                ]
            })
            .collect();
        let forest = IsolationForest::fit(&samples, &ForestParams::default()).unwrap();

        let store = Arc::new(MemoryStore::new());
        store
            .save_model(&AnomalyModelRecord::new(MODEL_NAME, forest.to_bytes().unwrap()))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_no_model_returns_absent() {
        let scorer = AnomalyScorer::new(Arc::new(MemoryStore::new()));

        for r in [reading(20.0, 50.0, 400.0, 100), reading(90.0, 0.0, 9000.0, 5000)] {
            let outcome = AnomalyOutcome::evaluate(&scorer, &r).await;
            assert_eq!(outcome, AnomalyOutcome::NoModel);
            assert_eq!(outcome.as_pair(), (false, None));
        }
    }

    #[tokio::test]
    async fn test_scores_outlier_as_anomalous() {
        let scorer = AnomalyScorer::new(store_with_model().await);

        let outlier = scorer
            .detect(&reading(80.0, 5.0, 5000.0, 4000))
            .await
            .unwrap()
            .unwrap();
        assert!(outlier.is_anomaly);
        assert!(outlier.score < 0.0);

        let typical = scorer
            .detect(&reading(25.0, 60.0, 400.0, 200))
            .await
            .unwrap()
            .unwrap();
        assert!(!typical.is_anomaly);
    }

    #[tokio::test]
    async fn test_corrupted_model_is_failure_not_panic() {
        let store = Arc::new(MemoryStore::new());
        store
            .save_model(&AnomalyModelRecord::new(MODEL_NAME, b"not a model".to_vec()))
            .await
            .unwrap();
        let scorer = AnomalyScorer::new(store);

        let outcome = AnomalyOutcome::evaluate(&scorer, &reading(20.0, 50.0, 400.0, 100)).await;
        assert!(matches!(outcome, AnomalyOutcome::Failed(_)));
        assert_eq!(outcome.as_pair(), (false, None));
    }
}
