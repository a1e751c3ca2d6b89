//! Configuration for the verification orchestrator

use std::time::Duration as StdDuration;

use chrono::Duration;
use vp_shared::VerificationConfig;

use crate::domain::entities::{
    LOCKOUT_HOURS, MAX_RESEND, OTP_VALIDITY_SECONDS, RESEND_COOLDOWN_SECONDS,
};

/// Runtime policy for both channels of one orchestrator
#[derive(Debug, Clone)]
pub struct VerificationServiceConfig {
    /// Seconds a delivered code stays valid
    pub validity_seconds: u32,
    /// Seconds before another resend may be requested
    pub resend_cooldown_seconds: u32,
    /// Resend budget, also the server-reported failure count that locks a channel
    pub max_resend: u32,
    /// How long a lock lasts
    pub lockout_duration: Duration,
    /// Lifetime of persisted records
    pub record_ttl: StdDuration,
    /// Dial code of the home region
    pub default_region: String,
    /// Whether a phone number is mandatory
    pub require_phone: bool,
}

impl Default for VerificationServiceConfig {
    fn default() -> Self {
        Self {
            validity_seconds: OTP_VALIDITY_SECONDS,
            resend_cooldown_seconds: RESEND_COOLDOWN_SECONDS,
            max_resend: MAX_RESEND,
            lockout_duration: Duration::hours(LOCKOUT_HOURS),
            record_ttl: StdDuration::from_secs(LOCKOUT_HOURS as u64 * 3600),
            default_region: "+91".to_string(),
            require_phone: true,
        }
    }
}

impl From<&VerificationConfig> for VerificationServiceConfig {
    fn from(config: &VerificationConfig) -> Self {
        Self {
            validity_seconds: config.validity_seconds,
            resend_cooldown_seconds: config.resend_cooldown_seconds,
            max_resend: config.max_resend,
            lockout_duration: Duration::seconds(config.lockout_seconds() as i64),
            record_ttl: StdDuration::from_secs(config.record_ttl_seconds()),
            default_region: config.default_region.clone(),
            require_phone: config.require_phone,
        }
    }
}

impl VerificationServiceConfig {
    /// Set the home region dial code
    pub fn with_default_region(mut self, region: impl Into<String>) -> Self {
        self.default_region = region.into();
        self
    }

    /// Allow signups without a phone number
    pub fn phone_optional(mut self) -> Self {
        self.require_phone = false;
        self
    }
}
