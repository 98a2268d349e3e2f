use crate::error::{Result, TelemetryError};
use crate::feed::{Feed, FeedResponse};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// ThingSpeak API 默认地址
pub const THINGSPEAK_API_BASE: &str = "https://api.thingspeak.com";

/// 遥测数据源
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// 最新一条采样；通道没有数据时返回 `None`
    async fn latest(&self, channel_id: &str, read_key: Option<&str>) -> Result<Option<Feed>>;

    /// 通道的全部历史采样
    async fn history(&self, channel_id: &str, read_key: Option<&str>) -> Result<Vec<Feed>>;
}

/// ThingSpeak HTTP 客户端
pub struct ThingSpeakClient {
    base_url: String,
    client: reqwest::Client,
}

impl ThingSpeakClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch(
        &self,
        channel_id: &str,
        read_key: Option<&str>,
        results: Option<u32>,
    ) -> Result<FeedResponse> {
        let url = format!("{}/channels/{}/feeds.json", self.base_url, channel_id);

        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(key) = read_key.filter(|k| !k.is_empty()) {
            query.push(("api_key", key.to_string()));
        }
        if let Some(results) = results {
            query.push(("results", results.to_string()));
        }

        let response = self.client.get(&url).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TelemetryError::Status {
                channel: channel_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body: FeedResponse = response.json().await?;
        debug!(channel = %channel_id, feeds = body.feeds.len(), "Telemetry feed fetched");
        Ok(body)
    }
}

#[async_trait]
impl TelemetrySource for ThingSpeakClient {
    async fn latest(&self, channel_id: &str, read_key: Option<&str>) -> Result<Option<Feed>> {
        let response = self.fetch(channel_id, read_key, Some(1)).await?;
        Ok(response.feeds.into_iter().last())
    }

    async fn history(&self, channel_id: &str, read_key: Option<&str>) -> Result<Vec<Feed>> {
        let response = self.fetch(channel_id, read_key, None).await?;
        Ok(response.feeds)
    }
}
