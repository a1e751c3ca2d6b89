//! Verification policy configuration

use serde::{Deserialize, Serialize};

/// OTP verification policy shared by both channels
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerificationConfig {
    /// Seconds a delivered code stays valid
    #[serde(default = "default_validity_seconds")]
    pub validity_seconds: u32,

    /// Seconds before another resend may be requested
    #[serde(default = "default_resend_cooldown_seconds")]
    pub resend_cooldown_seconds: u32,

    /// Maximum resends per channel, also the failed-verify threshold that locks a channel
    #[serde(default = "default_max_resend")]
    pub max_resend: u32,

    /// Hours a locked channel stays locked
    #[serde(default = "default_lockout_hours")]
    pub lockout_hours: i64,

    /// Hours a persisted verification record survives
    #[serde(default = "default_record_ttl_hours")]
    pub record_ttl_hours: i64,

    /// Dial code of the platform's home region; phone OTP is only required here
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Whether a phone number must be present to complete verification
    #[serde(default = "default_require_phone")]
    pub require_phone: bool,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            validity_seconds: default_validity_seconds(),
            resend_cooldown_seconds: default_resend_cooldown_seconds(),
            max_resend: default_max_resend(),
            lockout_hours: default_lockout_hours(),
            record_ttl_hours: default_record_ttl_hours(),
            default_region: default_region(),
            require_phone: default_require_phone(),
        }
    }
}

impl VerificationConfig {
    /// Set the home region dial code
    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    /// Lockout duration in seconds
    pub fn lockout_seconds(&self) -> u64 {
        self.lockout_hours.max(0) as u64 * 3600
    }

    /// Verification record TTL in seconds
    pub fn record_ttl_seconds(&self) -> u64 {
        self.record_ttl_hours.max(0) as u64 * 3600
    }
}

fn default_validity_seconds() -> u32 {
    180
}

fn default_resend_cooldown_seconds() -> u32 {
    60
}

fn default_max_resend() -> u32 {
    5
}

fn default_lockout_hours() -> i64 {
    24
}

fn default_record_ttl_hours() -> i64 {
    24
}

fn default_region() -> String {
    String::from("+91")
}

fn default_require_phone() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VerificationConfig::default();
        assert_eq!(config.validity_seconds, 180);
        assert_eq!(config.resend_cooldown_seconds, 60);
        assert_eq!(config.max_resend, 5);
        assert_eq!(config.lockout_seconds(), 86_400);
        assert_eq!(config.record_ttl_seconds(), 86_400);
        assert!(config.require_phone);
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let config: VerificationConfig =
            serde_json::from_str(r#"{"default_region": "+1", "max_resend": 3}"#).unwrap();
        assert_eq!(config.default_region, "+1");
        assert_eq!(config.max_resend, 3);
        assert_eq!(config.validity_seconds, 180);
    }
}
