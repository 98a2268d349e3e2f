use std::fmt;
use std::io;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

/// 关闭信号类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGTERM
    Term,

    /// SIGINT - Ctrl+C
    Interrupt,

    /// 手动触发
    Manual,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Term => write!(f, "SIGTERM"),
            ShutdownSignal::Interrupt => write!(f, "SIGINT"),
            ShutdownSignal::Manual => write!(f, "manual"),
        }
    }
}

pub type ShutdownReceiver = broadcast::Receiver<ShutdownSignal>;

/// 信号处理器：把系统信号广播给轮询器等后台任务
pub struct SignalHandler {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
}

impl SignalHandler {
    pub fn new() -> (Self, ShutdownReceiver) {
        let (tx, rx) = broadcast::channel(16);
        (Self { shutdown_tx: tx }, rx)
    }

    /// 等待系统信号并广播
    #[cfg(unix)]
    pub async fn wait_for_system_signal(&self) -> io::Result<ShutdownSignal> {
        use signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        let received = tokio::select! {
            _ = sigterm.recv() => ShutdownSignal::Term,
            _ = sigint.recv() => ShutdownSignal::Interrupt,
        };

        info!(signal = %received, "Shutdown signal received");
        let _ = self.shutdown_tx.send(received);
        Ok(received)
    }

    #[cfg(not(unix))]
    pub async fn wait_for_system_signal(&self) -> io::Result<ShutdownSignal> {
        signal::ctrl_c().await?;
        info!(signal = %ShutdownSignal::Interrupt, "Shutdown signal received");
        let _ = self.shutdown_tx.send(ShutdownSignal::Interrupt);
        Ok(ShutdownSignal::Interrupt)
    }

    /// 手动触发关闭
    pub fn trigger_shutdown(&self) {
        info!("Manual shutdown triggered");
        let _ = self.shutdown_tx.send(ShutdownSignal::Manual);
    }

    /// 订阅关闭信号
    pub fn subscribe(&self) -> ShutdownReceiver {
        self.shutdown_tx.subscribe()
    }
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new().0
    }
}
