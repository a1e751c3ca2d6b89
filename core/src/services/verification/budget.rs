//! Resend budget and lockout decisions

use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::{Channel, ChannelState, ChannelStatus};
use crate::errors::VerificationError;

use super::timer::ChannelTimer;

/// Counts resends against a maximum and decides when a channel locks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendBudget {
    max_resend: u32,
    lockout: Duration,
}

impl ResendBudget {
    pub fn new(max_resend: u32, lockout: Duration) -> Self {
        Self { max_resend, lockout }
    }

    /// Resends still available
    pub fn remaining(&self, state: &ChannelState) -> u32 {
        self.max_resend.saturating_sub(state.resend_attempts)
    }

    /// Whether the resend button is enabled
    pub fn can_resend(&self, state: &ChannelState) -> bool {
        state.resend_attempts < self.max_resend
            && state.resend_cooldown_seconds == 0
            && state.status != ChannelStatus::Locked
    }

    /// Reason a resend is refused, if any
    pub fn check_resend(
        &self,
        channel: Channel,
        state: &ChannelState,
    ) -> Result<(), VerificationError> {
        if state.status == ChannelStatus::Locked {
            return Err(match state.lock_until {
                Some(until) => VerificationError::Locked { channel, until },
                None => VerificationError::TooManyAttempts { channel },
            });
        }
        if state.resend_attempts >= self.max_resend {
            return Err(VerificationError::TooManyAttempts { channel });
        }
        if state.resend_cooldown_seconds > 0 {
            return Err(VerificationError::CooldownActive {
                channel,
                seconds: state.resend_cooldown_seconds,
            });
        }
        Ok(())
    }

    /// Count a resend before the backend is called
    pub fn reserve_resend(&self, state: &mut ChannelState) {
        state.resend_attempts = (state.resend_attempts + 1).min(self.max_resend);
    }

    /// Give back a reserved resend after a transient failure
    pub fn refund_resend(&self, state: &mut ChannelState) {
        state.resend_attempts = state.resend_attempts.saturating_sub(1);
    }

    /// Apply a successful resend
    ///
    /// Restarts the timers and empties the code. Returns the one-time
    /// warning when this resend used up the budget.
    pub fn complete_resend(
        &self,
        channel: Channel,
        timer: &ChannelTimer,
        state: &mut ChannelState,
    ) -> Option<String> {
        timer.arm(state);
        state.code.clear();
        state.status = ChannelStatus::Sent;
        state.error_message = None;

        if state.resend_attempts >= self.max_resend && !state.exhaustion_warned {
            state.exhaustion_warned = true;
            return Some(VerificationError::TooManyAttempts { channel }.to_string());
        }
        None
    }

    /// Apply a backend-reported failure count
    ///
    /// Locks the channel when the count reaches the budget and returns the
    /// lock start so the caller can persist it.
    pub fn record_failed_verify(
        &self,
        state: &mut ChannelState,
        failed_attempts: Option<u32>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let count = failed_attempts?;
        state.failed_attempts = count;
        if count < self.max_resend || state.status == ChannelStatus::Verified {
            return None;
        }
        self.lock(state, now);
        Some(now)
    }

    /// Lock the channel starting at `locked_at`
    pub fn lock(&self, state: &mut ChannelState, locked_at: DateTime<Utc>) {
        state.status = ChannelStatus::Locked;
        state.lock_until = Some(locked_at + self.lockout);
        state.seconds_remaining = 0;
        state.resend_cooldown_seconds = 0;
        state.code.clear();
    }

    /// End of a lock that started at `locked_at`
    pub fn lock_end(&self, locked_at: DateTime<Utc>) -> DateTime<Utc> {
        locked_at + self.lockout
    }
}
