//! In-memory result store.
//!
//! Each batch is created empty, filled by the request that created it, and
//! then only ever read or discarded whole. The map is bounded two ways:
//! inserting past `max_batches` evicts the oldest batch, and
//! [`ResultStore::evict_expired`] drops batches older than the TTL.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use imageforged_common::{ArtifactId, BatchId, Error, Result};
use parking_lot::RwLock;

use crate::config::StoreConfig;

/// One converted image held by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub id: ArtifactId,
    pub filename: String,
    pub data: Bytes,
    pub mime_type: String,
}

#[derive(Debug)]
struct BatchEntry {
    created_at: DateTime<Utc>,
    artifacts: Vec<Arc<Artifact>>,
}

#[derive(Debug, Default)]
struct Inner {
    batches: HashMap<BatchId, BatchEntry>,
    /// Insertion order, oldest first.
    order: VecDeque<BatchId>,
}

/// Thread-safe batch store shared by all request handlers.
#[derive(Debug)]
pub struct ResultStore {
    inner: RwLock<Inner>,
    max_batches: usize,
    ttl: Duration,
}

impl ResultStore {
    /// Create a store holding at most `max_batches` batches, each for at most `ttl`.
    pub fn new(max_batches: usize, ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_batches: max_batches.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.max_batches, Duration::from_secs(config.batch_ttl_secs))
    }

    /// Register a fresh, empty batch and return its id.
    ///
    /// Evicts the oldest batches first if the store is at capacity.
    pub fn create_batch(&self) -> BatchId {
        let batch_id = BatchId::new();
        let mut inner = self.inner.write();

        while inner.batches.len() >= self.max_batches {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            if let Some(entry) = inner.batches.remove(&oldest) {
                tracing::debug!(
                    batch_id = %oldest,
                    artifacts = entry.artifacts.len(),
                    "Evicted batch at capacity"
                );
            }
        }

        inner.batches.insert(
            batch_id,
            BatchEntry {
                created_at: Utc::now(),
                artifacts: Vec::new(),
            },
        );
        inner.order.push_back(batch_id);

        batch_id
    }

    /// Append an artifact to a batch.
    ///
    /// Fails with `NotFound` if the batch is gone and `Conflict` if the
    /// artifact id is already present in the batch.
    pub fn append(&self, batch_id: BatchId, artifact: Artifact) -> Result<()> {
        let mut inner = self.inner.write();
        let entry = inner
            .batches
            .get_mut(&batch_id)
            .ok_or_else(|| Error::not_found(format!("batch {batch_id}")))?;

        if entry.artifacts.iter().any(|a| a.id == artifact.id) {
            return Err(Error::conflict(format!(
                "artifact {} already exists in batch {batch_id}",
                artifact.id
            )));
        }

        entry.artifacts.push(Arc::new(artifact));
        Ok(())
    }

    /// All artifacts of a batch, in insertion order.
    pub fn get(&self, batch_id: BatchId) -> Result<Vec<Arc<Artifact>>> {
        self.inner
            .read()
            .batches
            .get(&batch_id)
            .map(|entry| entry.artifacts.clone())
            .ok_or_else(|| Error::not_found(format!("batch {batch_id}")))
    }

    /// One artifact of a batch.
    pub fn find_artifact(
        &self,
        batch_id: BatchId,
        artifact_id: ArtifactId,
    ) -> Result<Arc<Artifact>> {
        let inner = self.inner.read();
        let entry = inner
            .batches
            .get(&batch_id)
            .ok_or_else(|| Error::not_found(format!("batch {batch_id}")))?;

        entry
            .artifacts
            .iter()
            .find(|a| a.id == artifact_id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("artifact {artifact_id}")))
    }

    /// Discard a batch. Returns whether it existed.
    pub fn remove(&self, batch_id: BatchId) -> bool {
        let mut inner = self.inner.write();
        let existed = inner.batches.remove(&batch_id).is_some();
        if existed {
            inner.order.retain(|id| *id != batch_id);
        }
        existed
    }

    /// Drop every batch older than the TTL. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);

        let mut inner = self.inner.write();
        let before = inner.batches.len();
        inner.batches.retain(|batch_id, entry| {
            let age = now - entry.created_at;
            if age >= ttl {
                tracing::debug!(
                    batch_id = %batch_id,
                    age_secs = age.num_seconds(),
                    "Expired batch removed"
                );
                false
            } else {
                true
            }
        });

        let Inner { batches, order } = &mut *inner;
        order.retain(|id| batches.contains_key(id));

        before - batches.len()
    }

    /// Number of live batches.
    pub fn len(&self) -> usize {
        self.inner.read().batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().batches.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_batches
    }
}

impl Default for ResultStore {
    fn default() -> Self {
        Self::from_config(&StoreConfig::default())
    }
}

/// Start a background task that periodically removes expired batches.
pub fn start_sweep_task(
    store: Arc<ResultStore>,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let removed = store.evict_expired();
            if removed > 0 {
                tracing::info!(removed, remaining = store.len(), "Swept expired batches");
            }
        }
    })
}
