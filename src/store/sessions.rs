//! Session → batch bindings.
//!
//! Each caller carries an opaque session token (see the server's session
//! cookie). The binding points at the batch produced by that caller's most
//! recent conversion; it is a lookup key only and never keeps a batch alive.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use imageforged_common::{BatchId, SessionId};
use std::sync::Arc;
use std::time::Duration;

/// The batch a session currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SessionBinding {
    batch_id: BatchId,
    /// When the binding was last overwritten by a conversion.
    bound_at: DateTime<Utc>,
}

/// Thread-safe map of session tokens to their current batch.
#[derive(Clone)]
pub struct SessionBindings {
    bindings: Arc<DashMap<SessionId, SessionBinding>>,
    /// Duration after which an untouched binding is forgotten.
    expiry_duration: Duration,
}

impl SessionBindings {
    /// Create an empty binding table.
    ///
    /// # Arguments
    /// * `expiry_secs` - Seconds after the last conversion before a binding expires.
    pub fn new(expiry_secs: u64) -> Self {
        Self {
            bindings: Arc::new(DashMap::new()),
            expiry_duration: Duration::from_secs(expiry_secs),
        }
    }

    /// Point `session_id` at `batch_id`, replacing any previous binding.
    ///
    /// # Returns
    /// The batch the session pointed at before, if any.
    pub fn bind(&self, session_id: SessionId, batch_id: BatchId) -> Option<BatchId> {
        let previous = self.bindings.insert(
            session_id,
            SessionBinding {
                batch_id,
                bound_at: Utc::now(),
            },
        );

        tracing::debug!(
            session_id = %session_id,
            batch_id = %batch_id,
            replaced = previous.is_some(),
            "Bound session to batch"
        );

        previous.map(|b| b.batch_id)
    }

    /// The batch currently bound to `session_id`.
    pub fn current(&self, session_id: SessionId) -> Option<BatchId> {
        self.bindings.get(&session_id).map(|entry| entry.batch_id)
    }

    /// Remove bindings older than the expiry duration.
    ///
    /// # Returns
    /// The number of bindings that were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let expiry = chrono::Duration::from_std(self.expiry_duration)
            .unwrap_or_else(|_| chrono::Duration::hours(24));

        let mut removed_count = 0;
        self.bindings.retain(|session_id, binding| {
            let elapsed = now - binding.bound_at;
            if elapsed > expiry {
                tracing::debug!(
                    session_id = %session_id,
                    inactive_secs = elapsed.num_seconds(),
                    "Expired session binding removed"
                );
                removed_count += 1;
                false
            } else {
                true
            }
        });

        if removed_count > 0 {
            tracing::debug!(removed = removed_count, "Cleaned up expired session bindings");
        }

        removed_count
    }

    /// Get the number of live bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Check if there are any live bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for SessionBindings {
    fn default() -> Self {
        // Default: 24 hour expiry
        Self::new(24 * 3600)
    }
}

/// Start a background task that periodically drops expired bindings.
///
/// # Arguments
/// * `bindings` - The binding table to clean up.
/// * `interval_secs` - How often to run cleanup.
pub fn start_cleanup_task(
    bindings: SessionBindings,
    interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            bindings.cleanup_expired();
        }
    })
}
