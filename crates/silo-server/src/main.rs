use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use silo_config::ConfigLoader;
use silo_server::{logging, App};
use silo_shutdown::SignalHandler;
use silo_telemetry::{import_history, ScheduledSweep, SiloResolution, TelemetryPoller};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 持续轮询遥测通道，直到收到 SIGTERM/SIGINT
    Run,
    /// 执行一轮遥测遍历后退出
    PollOnce,
    /// 按 cron 表达式定时遍历
    Schedule,
    /// 用最近的读数重新训练异常检测模型
    Retrain {
        /// 训练窗口（天），缺省取配置值
        #[arg(long)]
        days: Option<i64>,
    },
    /// 导入某个通道的历史数据（不触发告警）
    ImportHistory {
        /// 通道键
        key: String,
    },
    /// 确认告警
    AckAlert {
        alert_id: String,
        /// 确认人 ID
        #[arg(long)]
        by: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigLoader::new()
        .with_file(&args.config)
        .load()
        .context("Failed to load configuration")?;
    logging::init(&config.logging)?;

    info!(config = %args.config, "Silo monitor starting");
    let app = App::build(config).await?;

    let result = execute(&app, args.command.unwrap_or(Command::Run)).await;
    app.drain().await;
    result
}

async fn execute(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Run => run(app).await,
        Command::PollOnce => {
            let sweep = app.sweep(SiloResolution::ByName)?;
            let report = ScheduledSweep::new(sweep, app.config.telemetry.schedule.clone())
                .run_once()
                .await;
            info!(
                ingested = report.ingested,
                empty = report.empty,
                failed = report.failed.len(),
                "Telemetry sweep finished"
            );
            Ok(())
        }
        Command::Schedule => schedule(app).await,
        Command::Retrain { days } => {
            let days = days.unwrap_or(app.config.anomaly.training_window_days);
            let outcome = app.trainer().retrain(days).await?;
            info!(outcome = ?outcome, window_days = days, "Retrain finished");
            Ok(())
        }
        Command::ImportHistory { key } => {
            let Some(binding) = app.channels().get(&key) else {
                bail!("No telemetry channel configured for key '{}'", key);
            };
            let client = app.telemetry_client()?;
            let report = import_history(&client, &app.store, &binding).await?;
            info!(
                key = %key,
                imported = report.imported,
                skipped = report.skipped,
                "History import finished"
            );
            Ok(())
        }
        Command::AckAlert { alert_id, by } => {
            if app.store.acknowledge_alert(&alert_id, &by).await? {
                info!(alert_id = %alert_id, by = %by, "Alert acknowledged");
                Ok(())
            } else {
                bail!("Alert '{}' not found", alert_id)
            }
        }
    }
}

async fn run(app: &App) -> Result<()> {
    let telemetry = &app.config.telemetry;
    let poller = TelemetryPoller::new(app.sweep(SiloResolution::Key)?)
        .with_interval(Duration::from_secs(telemetry.interval_secs))
        .with_retry(Duration::from_secs(telemetry.retry_secs));

    let (handler, shutdown_rx) = SignalHandler::new();
    let poller_handle = tokio::spawn(poller.run(shutdown_rx));

    match handler.wait_for_system_signal().await {
        Ok(signal) => info!(signal = %signal, "Stopping telemetry poller"),
        Err(e) => {
            error!(error = %e, "Failed to listen for shutdown signals");
            handler.trigger_shutdown();
        }
    }

    if let Err(e) = poller_handle.await {
        warn!(error = %e, "Telemetry poller task ended abnormally");
    }
    info!("Silo monitor stopped");
    Ok(())
}

async fn schedule(app: &App) -> Result<()> {
    let sweep = app.sweep(SiloResolution::ByName)?;
    let scheduled = ScheduledSweep::new(sweep, app.config.telemetry.schedule.clone());
    scheduled.start().await?;

    let (handler, _shutdown_rx) = SignalHandler::new();
    if let Err(e) = handler.wait_for_system_signal().await {
        error!(error = %e, "Failed to listen for shutdown signals");
    }

    scheduled.stop().await?;
    info!("Scheduler stopped");
    Ok(())
}
