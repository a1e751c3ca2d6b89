//! Best-effort persistence of verification and lockout records
//!
//! Store failures never block the user: they are logged and the in-memory
//! channel state stays authoritative for the session.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::domain::entities::Channel;
use crate::domain::value_objects::VerificationRecord;

use super::budget::ResendBudget;
use super::traits::{LockoutStore, VerificationStore};

/// Reads and merges the verification record of one identity
pub struct VerificationRecordKeeper {
    store: Arc<dyn VerificationStore>,
    key: String,
    ttl: Duration,
    // Serializes read-modify-write so concurrent channel completions merge
    write: Mutex<()>,
}

impl VerificationRecordKeeper {
    pub fn new(store: Arc<dyn VerificationStore>, key: String, ttl: Duration) -> Self {
        Self {
            store,
            key,
            ttl,
            write: Mutex::new(()),
        }
    }

    /// Current record, empty when missing or unreadable
    pub async fn load(&self) -> VerificationRecord {
        match self.store.read_verification(&self.key).await {
            Ok(record) => record.unwrap_or_default(),
            Err(e) => {
                warn!(
                    key = %self.key,
                    error = %e,
                    event = "verification_record_read_failed",
                    "Failed to read verification record"
                );
                VerificationRecord::default()
            }
        }
    }

    /// Merge `channel` into the stored record
    pub async fn mark_verified(&self, channel: Channel) {
        let _write = self.write.lock().await;
        let record = self.load().await.with_verified(channel);
        match self
            .store
            .persist_verification(&self.key, &record, self.ttl)
            .await
        {
            Ok(()) => debug!(
                channel = %channel,
                event = "verification_record_written",
                "Verification record updated"
            ),
            Err(e) => warn!(
                channel = %channel,
                error = %e,
                event = "verification_record_write_failed",
                "Failed to persist verification record"
            ),
        }
    }

    /// Drop the record
    pub async fn clear(&self) -> Result<(), String> {
        let _write = self.write.lock().await;
        self.store.clear_verification(&self.key).await
    }
}

/// Lockout entries of one channel
pub struct LockoutTracker {
    store: Arc<dyn LockoutStore>,
    key: String,
    budget: ResendBudget,
}

impl LockoutTracker {
    pub fn new(store: Arc<dyn LockoutStore>, key: String, budget: ResendBudget) -> Self {
        Self { store, key, budget }
    }

    /// End of a still-active lock
    ///
    /// An entry whose lock already elapsed is purged and reported as none.
    pub async fn restore(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let locked_at = match self.store.read_lockout(&self.key).await {
            Ok(entry) => entry?,
            Err(e) => {
                warn!(
                    error = %e,
                    event = "lockout_read_failed",
                    "Failed to read lockout record"
                );
                return None;
            }
        };

        let until = self.budget.lock_end(locked_at);
        if until > now {
            return Some(until);
        }

        info!(event = "lockout_elapsed", "Purging elapsed lockout record");
        self.purge().await;
        None
    }

    /// Persist a lock that started at `locked_at`
    pub async fn record(&self, locked_at: DateTime<Utc>) {
        if let Err(e) = self.store.persist_lockout(&self.key, locked_at).await {
            warn!(
                error = %e,
                event = "lockout_write_failed",
                "Failed to persist lockout record"
            );
        }
    }

    /// Remove the lock entry
    pub async fn purge(&self) {
        if let Err(e) = self.store.clear_lockout(&self.key).await {
            warn!(
                error = %e,
                event = "lockout_clear_failed",
                "Failed to clear lockout record"
            );
        }
    }
}
