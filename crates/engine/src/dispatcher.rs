//! Notification dispatch pipeline.
//!
//! For each notify call:
//! 1. Build the push payload once
//! 2. Select targeted subscribers from a registry snapshot (via `SubscriberMatcher`)
//! 3. Deliver to each one in turn through the `PushTransport`
//! 4. Prune every subscriber whose delivery failed, then persist
//!
//! Individual delivery failures never fail the call; only persistence errors do.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use pushcast_common::error::AppError;
use pushcast_common::transport::PushTransport;
use pushcast_common::types::{ActionUrls, NotificationPayload, NotifyRequest};

use crate::matcher::SubscriberMatcher;
use crate::registry::Registry;

/// Outcome counters for one notify call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub matched: usize,
    pub delivered: usize,
    pub pruned: usize,
}

/// Fans a notification out to matched subscribers.
pub struct Dispatcher {
    registry: Arc<Registry>,
    transport: Arc<dyn PushTransport>,
    matcher: SubscriberMatcher,
    action_urls: ActionUrls,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<Registry>,
        transport: Arc<dyn PushTransport>,
        action_urls: ActionUrls,
    ) -> Self {
        Self {
            registry,
            transport,
            matcher: SubscriberMatcher::new(),
            action_urls,
        }
    }

    /// Deliver `request` to every subscriber it targets.
    pub async fn notify(&self, request: &NotifyRequest) -> Result<DispatchReport, AppError> {
        let payload = NotificationPayload::new(
            request,
            &self.action_urls,
            Utc::now().timestamp_millis(),
        );
        let body = serde_json::to_string(&payload)?;

        let filter = request.filter();
        let targets = self.matcher.select(&filter, self.registry.list().await);

        let mut report = DispatchReport {
            matched: targets.len(),
            ..Default::default()
        };

        // First persistence failure; fan-out still reaches every target.
        let mut persist_error: Option<AppError> = None;

        for record in targets {
            let key = record.key();

            tracing::info!(
                key = %key,
                store_id = ?filter.store_id,
                user_id = ?filter.user_id,
                "Sending notification"
            );

            match self
                .transport
                .deliver(&record.push_subscription, &body)
                .await
            {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::error!(key = %key, error = %e, "Delivery failed, pruning subscriber");
                    match self.registry.remove_by_key(&key).await {
                        Ok(Some(_)) => report.pruned += 1,
                        Ok(None) => {}
                        Err(e) => {
                            // The in-memory removal already happened.
                            report.pruned += 1;
                            tracing::error!(key = %key, error = %e, "Failed to persist prune");
                            persist_error.get_or_insert(e);
                        }
                    }
                }
            }
        }

        if let Err(e) = self.registry.persist().await {
            persist_error.get_or_insert(e);
        }
        if let Some(e) = persist_error {
            return Err(e);
        }

        tracing::info!(
            matched = report.matched,
            delivered = report.delivered,
            pruned = report.pruned,
            "Notification dispatched"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pushcast_common::transport::DeliveryError;
    use pushcast_common::types::SubscriberRecord;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    /// Records every delivery and rejects subscriptions listed in `reject`.
    #[derive(Default)]
    struct ScriptedTransport {
        reject: Vec<String>,
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl PushTransport for ScriptedTransport {
        async fn deliver(&self, subscription: &str, payload: &str) -> Result<(), DeliveryError> {
            if self.reject.iter().any(|r| r == subscription) {
                return Err(DeliveryError::Rejected("410 Gone".to_string()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((subscription.to_string(), payload.to_string()));
            Ok(())
        }
    }

    fn record(user: &str, store: &str, fp: &str) -> SubscriberRecord {
        SubscriberRecord {
            user_id: user.into(),
            store_id: store.into(),
            fingerprint: fp.to_string(),
            push_subscription: format!("sub-{}", fp),
        }
    }

    async fn setup(
        records: Vec<SubscriberRecord>,
        reject: &[&str],
    ) -> (Arc<Registry>, Arc<ScriptedTransport>, Dispatcher) {
        let registry = Arc::new(Registry::new(Arc::new(MemoryStore::new())));
        for r in records {
            registry.upsert(r).await.unwrap();
        }
        let transport = Arc::new(ScriptedTransport {
            reject: reject.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(registry.clone(), transport.clone(), ActionUrls::default());
        (registry, transport, dispatcher)
    }

    fn notify_store(store: &str) -> NotifyRequest {
        NotifyRequest {
            store_id: Some(store.to_string()),
            user_id: Some(String::new()),
            title: Some("Title".to_string()),
            message: Some("Body".to_string()),
            actions: None,
        }
    }

    #[tokio::test]
    async fn test_failed_delivery_prunes_only_that_subscriber() {
        let (registry, transport, dispatcher) = setup(
            vec![record("1", "10", "a"), record("2", "10", "b")],
            &["sub-a"],
        )
        .await;

        let report = dispatcher.notify(&notify_store("10")).await.unwrap();

        assert_eq!(
            report,
            DispatchReport {
                matched: 2,
                delivered: 1,
                pruned: 1
            }
        );
        assert!(registry.get("1-10-a").await.is_none());
        assert!(registry.get("2-10-b").await.is_some());
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_payload_is_shared_across_subscribers() {
        let (_registry, transport, dispatcher) =
            setup(vec![record("1", "10", "a"), record("2", "10", "b")], &[]).await;

        dispatcher.notify(&notify_store("10")).await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].1, sent[1].1);

        let payload: serde_json::Value = serde_json::from_str(&sent[0].1).unwrap();
        assert_eq!(payload["notification"]["title"], "Title");
        assert_eq!(payload["notification"]["body"], "Body");
        assert_eq!(payload["storeId"], "10");
        assert!(payload["timestamp"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_no_filter_sends_nothing() {
        let (registry, transport, dispatcher) = setup(vec![record("1", "10", "a")], &[]).await;

        let report = dispatcher.notify(&NotifyRequest::default()).await.unwrap();

        assert_eq!(report, DispatchReport::default());
        assert!(transport.sent.lock().unwrap().is_empty());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_unmatched_failing_subscriber_is_left_alone() {
        let (registry, _transport, dispatcher) = setup(
            vec![record("1", "10", "a"), record("2", "20", "b")],
            &["sub-b"],
        )
        .await;

        dispatcher.notify(&notify_store("10")).await.unwrap();

        assert!(registry.get("2-20-b").await.is_some());
    }

    /// Store whose writes always fail.
    struct FailingStore;

    #[async_trait]
    impl crate::store::SnapshotStore for FailingStore {
        async fn load(&self) -> Result<Option<crate::store::Snapshot>, AppError> {
            Ok(None)
        }

        async fn save(&self, _snapshot: &crate::store::Snapshot) -> Result<(), AppError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    /// Rejects every delivery and counts the attempts.
    #[derive(Default)]
    struct RejectAllTransport {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl PushTransport for RejectAllTransport {
        async fn deliver(&self, _subscription: &str, _payload: &str) -> Result<(), DeliveryError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(DeliveryError::Rejected("410 Gone".to_string()))
        }
    }

    #[tokio::test]
    async fn test_prune_write_failure_still_reaches_every_subscriber() {
        let registry = Arc::new(Registry::new(Arc::new(FailingStore)));
        for fp in ["a", "b", "c"] {
            // The write fails but the record is kept in memory
            assert!(registry.upsert(record("1", "10", fp)).await.is_err());
        }
        let transport = Arc::new(RejectAllTransport::default());
        let dispatcher = Dispatcher::new(registry.clone(), transport.clone(), ActionUrls::default());

        let result = dispatcher.notify(&notify_store("10")).await;

        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);
        assert!(registry.is_empty().await);
    }

    /// Holds every delivery until `release` is signalled.
    #[derive(Default)]
    struct ParkedTransport {
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PushTransport for ParkedTransport {
        async fn deliver(&self, _subscription: &str, _payload: &str) -> Result<(), DeliveryError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_hung_delivery_does_not_block_registry() {
        let registry = Arc::new(Registry::new(Arc::new(MemoryStore::new())));
        registry.upsert(record("1", "10", "a")).await.unwrap();
        let transport = Arc::new(ParkedTransport::default());
        let dispatcher = Arc::new(Dispatcher::new(
            registry.clone(),
            transport.clone(),
            ActionUrls::default(),
        ));

        let handle = tokio::spawn({
            let dispatcher = dispatcher.clone();
            async move { dispatcher.notify(&notify_store("10")).await }
        });
        transport.started.notified().await;

        let limit = Duration::from_secs(1);
        timeout(limit, registry.upsert(record("2", "20", "b")))
            .await
            .expect("subscribe blocked by in-flight delivery")
            .unwrap();
        let removed = timeout(limit, registry.remove("2", "20", "b"))
            .await
            .expect("unsubscribe blocked by in-flight delivery")
            .unwrap();
        assert!(removed);
        assert_eq!(timeout(limit, registry.list()).await.unwrap().count(), 1);
        assert!(!handle.is_finished());

        transport.release.notify_one();
        let report = handle.await.unwrap().unwrap();
        assert_eq!(report.delivered, 1);
    }
}
