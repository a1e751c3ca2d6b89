//! Shared utilities and common types for Vowpath
//!
//! This crate provides common functionality used across all workspace members:
//! - Configuration types (verification policy, backend, cache, logging)
//! - Identity field utilities (phone and email normalization, masking)
//! - The backend response envelope for OTP endpoints

pub mod config;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, BackendConfig, CacheConfig, CacheStrategyConfig, CacheType, Environment,
    LoggingConfig, MemoryCacheConfig, VerificationConfig,
};
pub use types::OtpApiResponse;
pub use utils::{email, phone};
