//! Persisted record of which channels an identity has already proven.

use serde::{Deserialize, Serialize};

use crate::domain::entities::Channel;

/// Channels proven for one identity, kept across reloads for a limited time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    #[serde(default)]
    pub email_verified: bool,
    #[serde(default)]
    pub phone_verified: bool,
}

impl VerificationRecord {
    /// Whether `channel` is recorded as verified
    pub fn is_verified(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email_verified,
            Channel::Phone => self.phone_verified,
        }
    }

    /// Copy of this record with `channel` marked verified
    pub fn with_verified(mut self, channel: Channel) -> Self {
        match channel {
            Channel::Email => self.email_verified = true,
            Channel::Phone => self.phone_verified = true,
        }
        self
    }

    /// Whether nothing is recorded
    pub fn is_empty(&self) -> bool {
        !self.email_verified && !self.phone_verified
    }
}
