//! Render state handed to the UI collaborator.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::{Channel, ChannelState, ChannelStatus};

/// What the UI needs to render one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub channel: Channel,
    pub status: ChannelStatus,
    /// Typed digits with `_` for empty boxes
    pub code: String,
    pub seconds_remaining: u32,
    pub resend_cooldown_seconds: u32,
    pub resend_attempts: u32,
    pub lock_until: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub can_resend: bool,
    pub can_verify: bool,
}

impl ChannelSnapshot {
    /// Build a snapshot from channel state and the resend budget verdict
    pub fn from_state(channel: Channel, state: &ChannelState, can_resend: bool) -> Self {
        Self {
            channel,
            status: state.status,
            code: state.code.to_string(),
            seconds_remaining: state.seconds_remaining,
            resend_cooldown_seconds: state.resend_cooldown_seconds,
            resend_attempts: state.resend_attempts,
            lock_until: state.lock_until,
            error_message: state.error_message.clone(),
            can_resend,
            can_verify: state.status == ChannelStatus::Sent && state.code.is_complete(),
        }
    }
}

/// Combined render state of both channels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationSnapshot {
    pub email: ChannelSnapshot,
    pub phone: ChannelSnapshot,
    pub requires_phone_otp: bool,
    pub ready: bool,
}

impl VerificationSnapshot {
    /// Snapshot of one channel
    pub fn channel(&self, channel: Channel) -> &ChannelSnapshot {
        match channel {
            Channel::Email => &self.email,
            Channel::Phone => &self.phone,
        }
    }
}
