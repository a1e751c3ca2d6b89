//! Per-channel countdown

use crate::domain::entities::{ChannelState, ChannelStatus};

/// Validity and cooldown countdown of one channel
///
/// Holds only the window lengths; the counters live in [`ChannelState`] so
/// the shared scheduler can tick every channel with one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTimer {
    validity_seconds: u32,
    cooldown_seconds: u32,
}

impl ChannelTimer {
    pub fn new(validity_seconds: u32, cooldown_seconds: u32) -> Self {
        Self {
            validity_seconds,
            cooldown_seconds,
        }
    }

    /// Restart both windows after a delivery
    pub fn arm(&self, state: &mut ChannelState) {
        state.seconds_remaining = self.validity_seconds;
        state.resend_cooldown_seconds = self.cooldown_seconds;
    }

    /// Stop both windows at zero
    pub fn freeze(&self, state: &mut ChannelState) {
        state.seconds_remaining = 0;
        state.resend_cooldown_seconds = 0;
    }

    /// Advance one second
    ///
    /// Only a `Sent` channel counts down its validity window; it becomes
    /// `Expired` when that window reaches zero. The cooldown keeps running
    /// after expiry so resend unlocks on schedule. Returns whether the
    /// channel expired on this tick.
    pub fn tick(&self, state: &mut ChannelState) -> bool {
        match state.status {
            ChannelStatus::Sent => {
                state.seconds_remaining = state.seconds_remaining.saturating_sub(1);
                state.resend_cooldown_seconds = state.resend_cooldown_seconds.saturating_sub(1);
                if state.seconds_remaining == 0 {
                    state.status = ChannelStatus::Expired;
                    return true;
                }
                false
            }
            ChannelStatus::Expired => {
                state.resend_cooldown_seconds = state.resend_cooldown_seconds.saturating_sub(1);
                false
            }
            _ => false,
        }
    }

    /// Whether the countdown has anything left to do
    pub fn is_running(state: &ChannelState) -> bool {
        match state.status {
            ChannelStatus::Sent => true,
            ChannelStatus::Expired => state.resend_cooldown_seconds > 0,
            _ => false,
        }
    }
}
