use crate::sink::AlertSink;
use silo_anomaly::{AnomalyDetector, AnomalyOutcome};
use silo_rule::RuleEngine;
use silo_store::{Result, SharedStore};
use silo_types::{Alert, AlertLevel, CandidateAlert, ReadingOrigin, ReadingPayload, Silo};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 异常告警消息
pub const ANOMALY_MESSAGE: &str = "Anomalia detectada";

/// 单条读数的处理结果
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub reading_id: String,
    pub origin: ReadingOrigin,
    /// 成功保存的告警
    pub alerts: Vec<Alert>,
    pub anomaly: AnomalyOutcome,
}

/// 读数入口
///
/// 处理顺序固定：保存读数 → 阈值规则 → 异常检测 → 合并告警 → 交给告警落库。
/// 只有读数保存失败会返回错误，下游失败只记录日志。
pub struct ReadingIntake {
    store: SharedStore,
    rules: RuleEngine,
    detector: Arc<dyn AnomalyDetector>,
    sink: AlertSink,
}

impl ReadingIntake {
    pub fn new(
        store: SharedStore,
        rules: RuleEngine,
        detector: Arc<dyn AnomalyDetector>,
        sink: AlertSink,
    ) -> Self {
        Self {
            store,
            rules,
            detector,
            sink,
        }
    }

    pub async fn ingest(
        &self,
        payload: ReadingPayload,
        origin: ReadingOrigin,
    ) -> Result<IngestReport> {
        let reading = payload.into_reading();

        // 先落库，后续评估失败也不会丢读数
        self.store.insert_reading(&reading).await?;
        debug!(
            reading_id = %reading.id,
            device_id = %reading.device_id,
            origin = origin.label(),
            "Reading stored"
        );

        let silo = self.resolve_silo(reading.silo_id.as_deref()).await;
        let mut candidates = self
            .rules
            .evaluate(&reading, silo.as_ref().map(|s| &s.settings));

        let anomaly = AnomalyOutcome::evaluate(self.detector.as_ref(), &reading).await;
        if let AnomalyOutcome::Scored(score) = &anomaly {
            if score.is_anomaly {
                candidates.push(CandidateAlert::new(
                    AlertLevel::Warning,
                    ANOMALY_MESSAGE,
                    score.score,
                ));
            }
        }

        let mut alerts = Vec::with_capacity(candidates.len());
        if let Some(silo) = &silo {
            for candidate in candidates {
                match self.sink.record(&silo.id, candidate).await {
                    Ok(alert) => alerts.push(alert),
                    Err(e) => {
                        error!(
                            reading_id = %reading.id,
                            silo_id = %silo.id,
                            error = %e,
                            "Failed to record alert"
                        );
                    }
                }
            }
        } else if !candidates.is_empty() {
            warn!(
                reading_id = %reading.id,
                dropped = candidates.len(),
                "Reading has no resolvable silo, alerts dropped"
            );
        }

        info!(
            reading_id = %reading.id,
            origin = origin.label(),
            alerts = alerts.len(),
            anomaly = %anomaly,
            "Reading ingested"
        );

        Ok(IngestReport {
            reading_id: reading.id,
            origin,
            alerts,
            anomaly,
        })
    }

    /// 查找筒仓；找不到或查询失败都视为无阈值
    /// 等待已脱离的告警分发完成（进程退出前调用）
    pub async fn drain(&self) {
        self.sink.drain().await;
    }

    async fn resolve_silo(&self, silo_id: Option<&str>) -> Option<Silo> {
        let silo_id = silo_id?;
        match self.store.silo_by_id(silo_id).await {
            Ok(Some(silo)) => Some(silo),
            Ok(None) => {
                debug!(silo_id = %silo_id, "Silo not found, threshold rules skipped");
                None
            }
            Err(e) => {
                warn!(
                    silo_id = %silo_id,
                    error = %e,
                    "Failed to load silo, threshold rules skipped"
                );
                None
            }
        }
    }
}
