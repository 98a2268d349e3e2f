//! 测试辅助：假数据源与读数入口

use crate::client::TelemetrySource;
use crate::error::{Result, TelemetryError};
use crate::feed::Feed;
use async_trait::async_trait;
use silo_anomaly::AnomalyScorer;
use silo_notify::NotificationDispatcher;
use silo_pipeline::{AlertSink, DispatchMode, ReadingIntake};
use silo_rule::RuleEngine;
use silo_store::SharedStore;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// 按通道 ID 返回预设采样的数据源
#[derive(Default)]
pub struct FakeSource {
    feeds: HashMap<String, Vec<Feed>>,
    failing: HashSet<String>,
    /// 前 N 次调用直接 panic
    panics: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn with_feed(mut self, channel_id: &str, feed: Feed) -> Self {
        self.feeds.entry(channel_id.to_string()).or_default().push(feed);
        self
    }

    pub fn failing(mut self, channel_id: &str) -> Self {
        self.failing.insert(channel_id.to_string());
        self
    }

    pub fn panicking(self, times: usize) -> Self {
        self.panics.store(times, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, channel_id: &str) -> Result<()> {
        self.calls.lock().unwrap().push(channel_id.to_string());

        let remaining = self.panics.load(Ordering::SeqCst);
        if remaining > 0 {
            self.panics.store(remaining - 1, Ordering::SeqCst);
            panic!("source exploded");
        }
        if self.failing.contains(channel_id) {
            return Err(TelemetryError::Status {
                channel: channel_id.to_string(),
                status: 500,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TelemetrySource for FakeSource {
    async fn latest(&self, channel_id: &str, _read_key: Option<&str>) -> Result<Option<Feed>> {
        self.record(channel_id)?;
        Ok(self.feeds.get(channel_id).and_then(|f| f.last().cloned()))
    }

    async fn history(&self, channel_id: &str, _read_key: Option<&str>) -> Result<Vec<Feed>> {
        self.record(channel_id)?;
        Ok(self.feeds.get(channel_id).cloned().unwrap_or_default())
    }
}

pub fn feed_at(created_at: &str, temperature: &str) -> Feed {
    Feed {
        created_at: Some(created_at.to_string()),
        field1: Some(serde_json::Value::String(temperature.to_string())),
        ..Default::default()
    }
}

pub fn intake_for(store: SharedStore) -> Arc<ReadingIntake> {
    let dispatcher = Arc::new(NotificationDispatcher::new(store.clone()));
    let sink = AlertSink::new(store.clone(), dispatcher).with_mode(DispatchMode::Inline);
    let scorer = Arc::new(AnomalyScorer::new(store.clone()));

    Arc::new(ReadingIntake::new(store, RuleEngine::new(), scorer, sink))
}
