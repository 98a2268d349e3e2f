use crate::error::PushError;
use crate::transport::PushTransport;
use async_trait::async_trait;
use silo_types::PushSubscription;
use tracing::debug;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder, URL_SAFE_NO_PAD,
};

/// VAPID 签名配置
#[derive(Debug, Clone, Default)]
pub struct VapidConfig {
    pub public_key: Option<String>,
    pub private_key: Option<String>,
    /// `mailto:` 或 `https:` 联系方式
    pub subject: String,
}

impl VapidConfig {
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().map_or(false, |s| !s.trim().is_empty());
        present(&self.public_key) && present(&self.private_key)
    }
}

/// Web Push 通知器
pub struct WebPushNotifier {
    vapid: VapidConfig,
    client: IsahcWebPushClient,
}

impl WebPushNotifier {
    pub fn new(vapid: VapidConfig) -> Result<Self, PushError> {
        let client = IsahcWebPushClient::new().map_err(classify)?;
        Ok(Self { vapid, client })
    }
}

/// 将库错误归类为端点失效或临时失败
fn classify(error: WebPushError) -> PushError {
    match error.short_description() {
        "endpoint_not_valid" | "endpoint_not_found" => PushError::EndpointGone(error.to_string()),
        _ => PushError::Transient(error.to_string()),
    }
}

#[async_trait]
impl PushTransport for WebPushNotifier {
    async fn send(&self, subscription: &PushSubscription, payload: &[u8]) -> Result<(), PushError> {
        let private_key = match self.vapid.private_key.as_deref() {
            Some(key) if self.vapid.is_complete() => key,
            _ => return Err(PushError::NotConfigured),
        };

        let info = SubscriptionInfo::new(
            subscription.endpoint.clone(),
            subscription.keys.p256dh.clone(),
            subscription.keys.auth.clone(),
        );

        let mut signature = VapidSignatureBuilder::from_base64(private_key, URL_SAFE_NO_PAD, &info)
            .map_err(classify)?;
        signature.add_claim("sub", self.vapid.subject.as_str());
        let signature = signature.build().map_err(classify)?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload);
        builder.set_vapid_signature(signature);
        let message = builder.build().map_err(classify)?;

        self.client.send(message).await.map_err(classify)?;

        debug!(subscription_id = %subscription.id, "Web push delivered");
        Ok(())
    }

    fn name(&self) -> &str {
        "webpush"
    }

    fn is_enabled(&self) -> bool {
        self.vapid.is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vapid_completeness() {
        let mut vapid = VapidConfig::default();
        assert!(!vapid.is_complete());

        vapid.public_key = Some("BPub".to_string());
        vapid.private_key = Some(" ".to_string());
        assert!(!vapid.is_complete());

        vapid.private_key = Some("priv".to_string());
        assert!(vapid.is_complete());
    }

    #[test]
    fn test_rejected_endpoint_is_gone() {
        assert!(classify(WebPushError::EndpointNotValid).is_gone());
        assert!(classify(WebPushError::EndpointNotFound).is_gone());
    }

    #[test]
    fn test_unspecified_error_is_transient() {
        assert!(matches!(
            classify(WebPushError::Unspecified),
            PushError::Transient(_)
        ));
    }

    #[tokio::test]
    async fn test_send_without_keys_is_not_configured() {
        let notifier = WebPushNotifier::new(VapidConfig::default()).unwrap();
        let subscription = PushSubscription::new("https://push.example/x", Default::default());

        let result = notifier.send(&subscription, b"{}").await;
        assert!(matches!(result, Err(PushError::NotConfigured)));
    }
}
