//! Push delivery capability consumed by the dispatcher.
//!
//! The engine never speaks a push protocol itself; it hands the opaque
//! subscription blob and the serialized payload to a `PushTransport` and only
//! cares whether delivery succeeded.

use async_trait::async_trait;
use thiserror::Error;

/// Why a single delivery attempt failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The stored subscription blob is not a usable push subscription.
    #[error("Invalid push subscription: {0}")]
    InvalidSubscription(String),

    /// The request could not be signed for the push service.
    #[error("Signature error: {0}")]
    Signature(String),

    /// The push service refused the message or could not be reached.
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// Outbound push delivery: `deliver(subscription, payload) -> success | failure`.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn deliver(&self, subscription: &str, payload: &str) -> Result<(), DeliveryError>;
}
