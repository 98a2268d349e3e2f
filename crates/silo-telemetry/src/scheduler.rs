use crate::error::Result;
use crate::sweep::ChannelSweep;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

/// 默认 cron 表达式：每 5 分钟
pub const DEFAULT_SCHEDULE: &str = "0 */5 * * * *";

/// 由 cron 触发的单轮遍历
///
/// 与轮询器使用同一套通道处理逻辑，区别只在于由调度器负责重复触发。
pub struct ScheduledSweep {
    sweep: Arc<ChannelSweep>,
    schedule: String,
    scheduler: Arc<RwLock<Option<JobScheduler>>>,
}

impl ScheduledSweep {
    pub fn new(sweep: Arc<ChannelSweep>, schedule: impl Into<String>) -> Self {
        Self {
            sweep,
            schedule: schedule.into(),
            scheduler: Arc::new(RwLock::new(None)),
        }
    }

    /// 启动调度器并注册任务
    pub async fn start(&self) -> Result<()> {
        let scheduler = JobScheduler::new().await?;

        let sweep = Arc::clone(&self.sweep);
        let job = Job::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let sweep = Arc::clone(&sweep);
            Box::pin(async move {
                info!("Executing scheduled telemetry sweep");
                sweep.run().await;
            })
        })?;

        scheduler.add(job).await?;
        scheduler.start().await?;

        *self.scheduler.write().await = Some(scheduler);

        info!(schedule = %self.schedule, "Telemetry scheduler started");
        Ok(())
    }

    /// 停止调度器
    pub async fn stop(&self) -> Result<()> {
        if let Some(mut scheduler) = self.scheduler.write().await.take() {
            scheduler.shutdown().await?;
        }

        info!("Telemetry scheduler stopped");
        Ok(())
    }

    /// 立即执行一轮（外部作业调用）
    pub async fn run_once(&self) -> crate::sweep::SweepReport {
        self.sweep.run().await
    }

    pub fn schedule(&self) -> &str {
        &self.schedule
    }
}
