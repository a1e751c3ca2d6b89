//! Cache module for verification storage
//!
//! This module provides the stores backing verification records and lockouts:
//! a Redis client with retry logic, a Redis-backed store for deployments and
//! an in-memory store with expiry sweep for development.

pub mod memory_store;
pub mod redis_client;
pub mod verification_cache;


pub use memory_store::MemoryVerificationStore;
pub use redis_client::RedisClient;
pub use verification_cache::RedisVerificationStore;

// Re-export commonly used types
pub use vp_shared::config::{CacheConfig, MemoryCacheConfig};
