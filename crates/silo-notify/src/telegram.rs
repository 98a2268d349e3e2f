use crate::error::ChatError;
use crate::transport::ChatTransport;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Telegram Bot API 默认地址
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram 通知器
pub struct TelegramNotifier {
    token: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramNotifier {
    /// token 为空时通知器处于未启用状态
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.trim().is_empty()),
            api_base: TELEGRAM_API_BASE.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl ChatTransport for TelegramNotifier {
    async fn send(&self, channel_id: &str, text: &str) -> Result<(), ChatError> {
        let token = self.token.as_deref().ok_or(ChatError::NotConfigured)?;
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "chat_id": channel_id, "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(chat_id = %channel_id, "Telegram message sent");
        Ok(())
    }

    fn name(&self) -> &str {
        "telegram"
    }

    fn is_enabled(&self) -> bool {
        self.token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_disables_notifier() {
        assert!(!TelegramNotifier::new(None).is_enabled());
        assert!(!TelegramNotifier::new(Some("  ".to_string())).is_enabled());
        assert!(TelegramNotifier::new(Some("123:abc".to_string())).is_enabled());
    }

    #[tokio::test]
    async fn test_send_without_token_fails_fast() {
        let notifier = TelegramNotifier::new(None);
        let result = notifier.send("42", "hello").await;

        assert!(matches!(result, Err(ChatError::NotConfigured)));
    }
}
