//! Web Push delivery.
//!
//! Implements `PushTransport` on top of the `web-push` crate: each stored
//! subscription blob is parsed into a `SubscriptionInfo`, the payload is
//! encrypted with aes128gcm and the request is signed with the server's VAPID
//! key before being handed to the push service.

use std::path::Path;

use async_trait::async_trait;
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushMessageBuilder,
};

use pushcast_common::transport::{DeliveryError, PushTransport};

/// VAPID-signed Web Push transport.
pub struct WebPushTransport {
    client: IsahcWebPushClient,
    /// PEM-encoded P-256 private key
    vapid_pem: Vec<u8>,
    /// VAPID `sub` claim
    subject: String,
    ttl_seconds: u32,
}

impl WebPushTransport {
    pub fn new(vapid_pem: Vec<u8>, subject: String, ttl_seconds: u32) -> anyhow::Result<Self> {
        let client = IsahcWebPushClient::new()
            .map_err(|e| anyhow::anyhow!("failed to create push client: {}", e))?;
        Ok(Self {
            client,
            vapid_pem,
            subject,
            ttl_seconds,
        })
    }

    /// Build a transport whose VAPID key is read from a PEM file.
    pub async fn from_pem_file(
        path: impl AsRef<Path>,
        subject: String,
        ttl_seconds: u32,
    ) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let vapid_pem = tokio::fs::read(path).await.map_err(|e| {
            anyhow::anyhow!("failed to read VAPID key {}: {}", path.display(), e)
        })?;

        tracing::info!(path = %path.display(), "Loaded VAPID private key");
        Self::new(vapid_pem, subject, ttl_seconds)
    }

    fn parse_subscription(subscription: &str) -> Result<SubscriptionInfo, DeliveryError> {
        serde_json::from_str(subscription)
            .map_err(|e| DeliveryError::InvalidSubscription(e.to_string()))
    }
}

#[async_trait]
impl PushTransport for WebPushTransport {
    async fn deliver(&self, subscription: &str, payload: &str) -> Result<(), DeliveryError> {
        let info = Self::parse_subscription(subscription)?;

        let mut sig_builder = VapidSignatureBuilder::from_pem(self.vapid_pem.as_slice(), &info)
            .map_err(|e| DeliveryError::Signature(e.to_string()))?;
        sig_builder.add_claim("sub", self.subject.clone());
        let signature = sig_builder
            .build()
            .map_err(|e| DeliveryError::Signature(e.to_string()))?;

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
        builder.set_ttl(self.ttl_seconds);
        builder.set_vapid_signature(signature);
        let message = builder
            .build()
            .map_err(|e| DeliveryError::Rejected(e.to_string()))?;

        self.client
            .send(message)
            .await
            .map_err(|e| DeliveryError::Rejected(e.to_string()))?;

        tracing::debug!(endpoint = %info.endpoint, "Push message accepted");
        Ok(())
    }
}
