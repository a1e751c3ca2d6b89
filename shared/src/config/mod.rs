//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `verification` - OTP validity, resend budget, lockout and region policy
//! - `backend` - OTP backend endpoint and provider selection
//! - `cache` - Verification store selection and Redis/in-memory settings
//! - `environment` - Deployment environment and its log output

pub mod backend;
pub mod cache;
pub mod environment;
pub mod verification;

use std::path::Path;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use backend::{BackendConfig, BackendProvider};
pub use cache::{CacheConfig, CacheStrategyConfig, CacheType, MemoryCacheConfig};
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use verification::VerificationConfig;

/// Environment variable prefix for configuration overrides (`VP_BACKEND__BASE_URL`, ...)
pub const ENV_PREFIX: &str = "VP";

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Verification policy
    #[serde(default)]
    pub verification: VerificationConfig,

    /// OTP backend configuration
    #[serde(default)]
    pub backend: BackendConfig,

    /// Verification store configuration
    #[serde(default)]
    pub cache: CacheStrategyConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            verification: VerificationConfig::default(),
            backend: BackendConfig::default(),
            cache: CacheStrategyConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    ///
    /// Development talks to the mock OTP backend and keeps state in memory.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            verification: VerificationConfig::default(),
            backend: BackendConfig::mock(),
            cache: CacheStrategyConfig::memory(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            verification: VerificationConfig::default(),
            backend: BackendConfig::default(),
            cache: CacheStrategyConfig::redis(CacheConfig::default()),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Baseline configuration for the environment detected from the process environment
    pub fn from_env() -> Self {
        match Environment::from_env() {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => {
                let mut config = Self::production();
                config.environment = Environment::Staging;
                config.logging = LoggingConfig::for_environment(Environment::Staging);
                config
            }
        }
    }

    /// Load layered configuration
    ///
    /// Layers, lowest precedence first: environment baseline, optional TOML
    /// file, then `VP_*` environment variables (`__` separates nested keys, e.g.
    /// `VP_BACKEND__BASE_URL`).
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        let baseline = ::config::Config::try_from(&Self::from_env())?;

        let mut builder = ::config::Config::builder().add_source(baseline);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
