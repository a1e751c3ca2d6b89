//! Redis-backed verification store
//!
//! Key patterns (prefixed by `CacheConfig::key_prefix` when set):
//! - `verification:record:{digest}` - JSON `VerificationRecord`, expires with the record TTL
//! - `verification:lockout:{identity}` - RFC 3339 lock start, expires with the lockout window

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info};

use vp_core::domain::VerificationRecord;
use vp_core::services::verification::{LockoutStore, VerificationStore};
use vp_shared::config::CacheConfig;

use crate::cache::RedisClient;
use crate::InfrastructureError;

const RECORD_KEY_PREFIX: &str = "verification:record:";
const LOCKOUT_KEY_PREFIX: &str = "verification:lockout:";

/// Verification and lockout records stored in Redis
#[derive(Clone)]
pub struct RedisVerificationStore {
    redis_client: RedisClient,
    lockout_ttl: Duration,
}

impl RedisVerificationStore {
    /// Create a store whose lockout entries live for `lockout_ttl`
    pub fn new(redis_client: RedisClient, lockout_ttl: Duration) -> Self {
        Self {
            redis_client,
            lockout_ttl,
        }
    }

    fn record_key(&self, key: &str) -> String {
        format_record_key(self.redis_client.config(), key)
    }

    fn lockout_key(&self, key: &str) -> String {
        format_lockout_key(self.redis_client.config(), key)
    }

    async fn write_record(
        &self,
        key: &str,
        record: &VerificationRecord,
        ttl: Duration,
    ) -> Result<(), InfrastructureError> {
        let payload = serde_json::to_string(record)?;
        self.redis_client
            .set_with_expiry(&self.record_key(key), &payload, ttl.as_secs().max(1))
            .await
    }

    async fn load_record(&self, key: &str) -> Result<Option<VerificationRecord>, InfrastructureError> {
        match self.redis_client.get(&self.record_key(key)).await? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn load_lockout(&self, key: &str) -> Result<Option<DateTime<Utc>>, InfrastructureError> {
        let redis_key = self.lockout_key(key);
        let Some(raw) = self.redis_client.get(&redis_key).await? else {
            return Ok(None);
        };

        let locked_at = DateTime::parse_from_rfc3339(&raw)
            .map_err(|e| InfrastructureError::General(format!("Invalid lockout timestamp: {}", e)))?
            .with_timezone(&Utc);

        if is_lockout_stale(locked_at, self.lockout_ttl, Utc::now()) {
            info!(event = "lockout_pruned", "Pruning stale lockout entry");
            self.redis_client.delete(&redis_key).await?;
            return Ok(None);
        }
        Ok(Some(locked_at))
    }
}

#[async_trait]
impl VerificationStore for RedisVerificationStore {
    async fn persist_verification(
        &self,
        key: &str,
        record: &VerificationRecord,
        ttl: Duration,
    ) -> Result<(), String> {
        debug!(ttl_seconds = ttl.as_secs(), "Persisting verification record");
        self.write_record(key, record, ttl)
            .await
            .map_err(|e| e.to_string())
    }

    async fn read_verification(&self, key: &str) -> Result<Option<VerificationRecord>, String> {
        self.load_record(key).await.map_err(|e| e.to_string())
    }

    async fn clear_verification(&self, key: &str) -> Result<(), String> {
        self.redis_client
            .delete(&self.record_key(key))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl LockoutStore for RedisVerificationStore {
    async fn persist_lockout(&self, key: &str, locked_at: DateTime<Utc>) -> Result<(), String> {
        self.redis_client
            .set_with_expiry(
                &self.lockout_key(key),
                &locked_at.to_rfc3339(),
                self.lockout_ttl.as_secs().max(1),
            )
            .await
            .map_err(|e| e.to_string())
    }

    async fn read_lockout(&self, key: &str) -> Result<Option<DateTime<Utc>>, String> {
        self.load_lockout(key).await.map_err(|e| e.to_string())
    }

    async fn clear_lockout(&self, key: &str) -> Result<(), String> {
        self.redis_client
            .delete(&self.lockout_key(key))
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

pub(crate) fn format_record_key(config: &CacheConfig, key: &str) -> String {
    config.make_key(&format!("{}{}", RECORD_KEY_PREFIX, key))
}

pub(crate) fn format_lockout_key(config: &CacheConfig, key: &str) -> String {
    config.make_key(&format!("{}{}", LOCKOUT_KEY_PREFIX, key))
}

/// Whether a lock that started at `locked_at` has outlived `ttl`
pub(crate) fn is_lockout_stale(locked_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => locked_at + ttl <= now,
        Err(_) => false,
    }
}
