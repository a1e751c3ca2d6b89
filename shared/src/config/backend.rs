//! OTP backend configuration

use serde::{Deserialize, Serialize};

/// Which OTP backend implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// The platform's REST endpoints
    Rest,
    /// In-process mock accepting a fixed development code
    Mock,
}

/// OTP backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Base URL the `send-*-otp` / `verify-*-otp` endpoints live under
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Backend implementation
    #[serde(default = "default_provider")]
    pub provider: BackendProvider,

    /// Code accepted by the mock backend
    #[serde(default = "default_mock_code")]
    pub mock_code: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8080/api/v1/auth"),
            timeout_seconds: default_timeout(),
            provider: default_provider(),
            mock_code: default_mock_code(),
        }
    }
}

impl BackendConfig {
    /// Create a REST backend configuration for the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Mock backend configuration for development
    pub fn mock() -> Self {
        Self {
            provider: BackendProvider::Mock,
            ..Default::default()
        }
    }

    /// Build the URL of an endpoint below the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_provider() -> BackendProvider {
    BackendProvider::Rest
}

fn default_mock_code() -> String {
    String::from("123456")
}
