//! # Infrastructure Layer
//!
//! This crate implements the collaborators the Vowpath verification core
//! consumes through its traits:
//!
//! - **Cache**: Redis client plus Redis-backed and in-memory verification stores
//! - **Gateway**: REST client for the OTP backend and a mock backend for development
//! - **Config**: layered configuration loading and dependency wiring

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use vp_core::services::verification::{
    Clock, LockoutStore, OtpGateway, SystemClock, VerificationDeps, VerificationStore,
};
use vp_shared::config::{AppConfig, BackendProvider, CacheType};

// Re-export core types for convenience
pub use vp_core::errors::*;

/// Cache module - Redis client and verification stores
pub mod cache;

/// Gateway module - OTP backend clients
pub mod gateway;

use cache::{MemoryVerificationStore, RedisClient, RedisVerificationStore};
use gateway::{MockOtpGateway, RestOtpGateway};

/// Infrastructure service container
pub struct InfrastructureServices {
    /// Collaborators handed to every verification orchestrator
    pub deps: VerificationDeps,
    /// Expiry sweep of the in-memory store, when that store is in use
    pub sweeper: Option<JoinHandle<()>>,
}

/// Build the verification collaborators described by `config`
///
/// This function sets up:
/// - The verification and lockout store (Redis or in-memory)
/// - The OTP backend gateway (REST or mock)
pub async fn initialize(config: &AppConfig) -> Result<InfrastructureServices, InfrastructureError> {
    tracing::info!(
        environment = %config.environment,
        store = ?config.cache.cache_type,
        backend = ?config.backend.provider,
        "Initializing infrastructure services..."
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let lockout_ttl = std::time::Duration::from_secs(config.verification.lockout_seconds());

    let (records, lockouts, sweeper): (
        Arc<dyn VerificationStore>,
        Arc<dyn LockoutStore>,
        Option<JoinHandle<()>>,
    ) = match config.cache.cache_type {
        CacheType::Redis => {
            let client = RedisClient::new(config.cache.redis.clone()).await?;
            let store = Arc::new(RedisVerificationStore::new(client, lockout_ttl));
            (store.clone(), store, None)
        }
        CacheType::Memory => {
            let store = Arc::new(MemoryVerificationStore::new(
                config.cache.memory.clone(),
                lockout_ttl,
                Arc::clone(&clock),
            ));
            let sweeper = store.spawn_sweeper();
            (store.clone(), store, Some(sweeper))
        }
    };

    let gateway: Arc<dyn OtpGateway> = match config.backend.provider {
        BackendProvider::Rest => Arc::new(RestOtpGateway::new(config.backend.clone())?),
        BackendProvider::Mock => Arc::new(MockOtpGateway::new(config.backend.mock_code.clone())),
    };

    tracing::info!("Infrastructure services initialized successfully");

    Ok(InfrastructureServices {
        deps: VerificationDeps::new(gateway, records, lockouts, clock),
        sweeper,
    })
}

/// Load configuration from `.env`, an optional TOML file and the environment
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    AppConfig::load(path).map_err(|e| InfrastructureError::Config(e.to_string()))
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stored payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}
