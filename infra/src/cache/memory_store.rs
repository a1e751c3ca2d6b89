//! In-memory verification store with expiry sweep
//!
//! Used in development and tests. Entries expire against the injected
//! clock; expired entries are hidden on read and removed by
//! [`MemoryVerificationStore::sweep_expired`], which a background task runs
//! every `cleanup_interval` seconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use vp_core::domain::VerificationRecord;
use vp_core::services::verification::{Clock, LockoutStore, VerificationStore};
use vp_shared::config::MemoryCacheConfig;

#[derive(Debug, Clone, Copy)]
struct Expiring<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct Entries {
    records: HashMap<String, Expiring<VerificationRecord>>,
    lockouts: HashMap<String, Expiring<DateTime<Utc>>>,
}

impl Entries {
    fn len(&self) -> usize {
        self.records.len() + self.lockouts.len()
    }

    fn remove_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.len();
        self.records.retain(|_, e| e.expires_at > now);
        self.lockouts.retain(|_, e| e.expires_at > now);
        before - self.len()
    }

    /// Drop the entry closest to expiry
    fn evict_one(&mut self) {
        let record = self
            .records
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, e)| (k.clone(), e.expires_at));
        let lockout = self
            .lockouts
            .iter()
            .min_by_key(|(_, e)| e.expires_at)
            .map(|(k, e)| (k.clone(), e.expires_at));

        match (record, lockout) {
            (Some((rk, re)), Some((_, le))) if re <= le => {
                self.records.remove(&rk);
            }
            (_, Some((lk, _))) => {
                self.lockouts.remove(&lk);
            }
            (Some((rk, _)), None) => {
                self.records.remove(&rk);
            }
            (None, None) => {}
        }
    }
}

/// Verification and lockout records kept in process memory
pub struct MemoryVerificationStore {
    entries: RwLock<Entries>,
    config: MemoryCacheConfig,
    lockout_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl MemoryVerificationStore {
    pub fn new(config: MemoryCacheConfig, lockout_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            config,
            lockout_ttl,
            clock,
        }
    }

    /// Number of stored entries, expired ones included until swept
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Remove every expired entry, returning how many were removed
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self.entries.write().await.remove_expired(now);
        if removed > 0 {
            debug!(removed = removed, "Swept expired verification entries");
        }
        removed
    }

    /// Run [`sweep_expired`](Self::sweep_expired) every `cleanup_interval` seconds
    ///
    /// The task stops once the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let period = Duration::from_secs(self.config.cleanup_interval.max(1));
        let store: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    break;
                };
                store.sweep_expired().await;
            }
        })
    }

    fn expiry(&self, ttl: Duration) -> Result<DateTime<Utc>, String> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| format!("Invalid TTL: {}", e))?;
        Ok(self.clock.now() + ttl)
    }

    /// Make room for `key` when the store is at capacity
    fn reserve(&self, entries: &mut Entries, key_exists: bool) {
        if key_exists || entries.len() < self.config.max_entries {
            return;
        }
        entries.remove_expired(self.clock.now());
        while entries.len() >= self.config.max_entries && entries.len() > 0 {
            warn!(max_entries = self.config.max_entries, "Verification store full, evicting oldest entry");
            entries.evict_one();
        }
    }
}

#[async_trait]
impl VerificationStore for MemoryVerificationStore {
    async fn persist_verification(
        &self,
        key: &str,
        record: &VerificationRecord,
        ttl: Duration,
    ) -> Result<(), String> {
        let expires_at = self.expiry(ttl)?;
        let mut entries = self.entries.write().await;
        let exists = entries.records.contains_key(key);
        self.reserve(&mut entries, exists);
        entries.records.insert(
            key.to_string(),
            Expiring {
                value: *record,
                expires_at,
            },
        );
        Ok(())
    }

    async fn read_verification(&self, key: &str) -> Result<Option<VerificationRecord>, String> {
        let now = self.clock.now();
        Ok(self
            .entries
            .read()
            .await
            .records
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.value))
    }

    async fn clear_verification(&self, key: &str) -> Result<(), String> {
        self.entries.write().await.records.remove(key);
        Ok(())
    }
}

#[async_trait]
impl LockoutStore for MemoryVerificationStore {
    async fn persist_lockout(&self, key: &str, locked_at: DateTime<Utc>) -> Result<(), String> {
        let ttl = chrono::Duration::from_std(self.lockout_ttl)
            .map_err(|e| format!("Invalid TTL: {}", e))?;
        let mut entries = self.entries.write().await;
        let exists = entries.lockouts.contains_key(key);
        self.reserve(&mut entries, exists);
        entries.lockouts.insert(
            key.to_string(),
            Expiring {
                value: locked_at,
                expires_at: locked_at + ttl,
            },
        );
        Ok(())
    }

    async fn read_lockout(&self, key: &str) -> Result<Option<DateTime<Utc>>, String> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        match entries.lockouts.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value)),
            Some(_) => {
                entries.lockouts.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn clear_lockout(&self, key: &str) -> Result<(), String> {
        self.entries.write().await.lockouts.remove(key);
        Ok(())
    }
}
