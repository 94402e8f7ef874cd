//! Subscriber registry: the process-wide set of push subscriptions.
//!
//! Records are keyed by `userId-storeId-fingerprint`. Every mutation holds the
//! registry lock until the full snapshot has been written, so concurrent
//! subscribe/unsubscribe/prune calls are serialized and the durable copy never
//! lags behind a mutation that was acknowledged.
//!
//! A failed write leaves the in-memory change applied; the next successful
//! write brings the file back in sync.

use std::sync::Arc;

use tokio::sync::Mutex;

use pushcast_common::error::AppError;
use pushcast_common::types::{SubscriberRecord, composite_key};

use crate::store::{Snapshot, SnapshotStore};

/// In-memory subscriber map mirrored to a `SnapshotStore`.
pub struct Registry {
    records: Mutex<Snapshot>,
    store: Arc<dyn SnapshotStore>,
}

impl Registry {
    /// Create an empty registry without consulting the store.
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            records: Mutex::new(Snapshot::new()),
            store,
        }
    }

    /// Restore the registry from its store.
    ///
    /// A missing or unreadable snapshot yields an empty registry; startup never
    /// fails on persistence.
    pub async fn load(store: Arc<dyn SnapshotStore>) -> Self {
        let records = match store.load().await {
            Ok(Some(snapshot)) => rekey(snapshot),
            Ok(None) => {
                tracing::debug!("No subscriber snapshot found, starting empty");
                Snapshot::new()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load subscriber snapshot, starting empty");
                Snapshot::new()
            }
        };

        tracing::info!(subscribers = records.len(), "Subscriber registry loaded");

        Self {
            records: Mutex::new(records),
            store,
        }
    }

    /// Insert a record, replacing any previous record with the same composite key.
    pub async fn upsert(&self, record: SubscriberRecord) -> Result<(), AppError> {
        let key = record.key();
        let mut records = self.records.lock().await;
        let replaced = records.insert(key.clone(), record).is_some();

        tracing::info!(key = %key, replaced, "Subscriber registered");

        self.store.save(&records).await
    }

    /// Remove the record for `(user_id, store_id, fingerprint)`.
    /// Returns whether a record was present.
    pub async fn remove(
        &self,
        user_id: &str,
        store_id: &str,
        fingerprint: &str,
    ) -> Result<bool, AppError> {
        let key = composite_key(user_id, store_id, fingerprint);
        Ok(self.remove_by_key(&key).await?.is_some())
    }

    /// Remove a record by its already-derived composite key.
    pub async fn remove_by_key(&self, key: &str) -> Result<Option<SubscriberRecord>, AppError> {
        let mut records = self.records.lock().await;
        let removed = records.remove(key);

        if removed.is_some() {
            tracing::info!(key = %key, "Subscriber removed");
        } else {
            tracing::debug!(key = %key, "Remove requested for unknown subscriber");
        }

        self.store.save(&records).await?;
        Ok(removed)
    }

    /// Point-in-time copy of every record.
    ///
    /// The iterator owns its snapshot: mutations made while it is being consumed
    /// are not observed. Call again for a fresh view.
    pub async fn list(&self) -> std::vec::IntoIter<SubscriberRecord> {
        let records = self.records.lock().await;
        records.values().cloned().collect::<Vec<_>>().into_iter()
    }

    pub async fn get(&self, key: &str) -> Option<SubscriberRecord> {
        self.records.lock().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Write the current state to the store.
    pub async fn persist(&self) -> Result<(), AppError> {
        let records = self.records.lock().await;
        self.store.save(&records).await
    }
}

/// Key every loaded record by its derived composite key, so pruning by
/// `SubscriberRecord::key` always hits.
fn rekey(snapshot: Snapshot) -> Snapshot {
    snapshot
        .into_iter()
        .map(|(stored_key, record)| {
            let key = record.key();
            if key != stored_key {
                tracing::warn!(
                    stored_key = %stored_key,
                    key = %key,
                    "Snapshot key does not match record, re-keying"
                );
            }
            (key, record)
        })
        .collect()
}
