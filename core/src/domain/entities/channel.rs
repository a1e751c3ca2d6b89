//! Verification channel entity and its per-session state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of digits in a one-time password
pub const OTP_LENGTH: usize = 6;

/// Seconds a delivered code stays valid
pub const OTP_VALIDITY_SECONDS: u32 = 180;

/// Seconds before another resend may be requested
pub const RESEND_COOLDOWN_SECONDS: u32 = 60;

/// Maximum resend attempts per channel
pub const MAX_RESEND: u32 = 5;

/// Hours a channel stays locked once its budget is exhausted
pub const LOCKOUT_HOURS: i64 = 24;

/// One of the two independent verification paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Email,
    Phone,
}

impl Channel {
    /// Both channels in orchestration order
    pub const ALL: [Channel; 2] = [Channel::Email, Channel::Phone];

    /// User-facing label used in messages
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Email => "Email",
            Channel::Phone => "Mobile",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Email => write!(f, "email"),
            Channel::Phone => write!(f, "phone"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "email" | "mail" | "e" => Ok(Channel::Email),
            "phone" | "mobile" | "sms" | "p" => Ok(Channel::Phone),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}

/// Lifecycle status of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Nothing sent yet
    Idle,
    /// A code was delivered and the countdown is running
    Sent,
    /// A verify call is in flight
    Verifying,
    /// Terminal for this session
    Verified,
    /// The validity window elapsed; only resend is available
    Expired,
    /// Budget exhausted; nothing is allowed until the lock elapses
    Locked,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelStatus::Idle => "idle",
            ChannelStatus::Sent => "sent",
            ChannelStatus::Verifying => "verifying",
            ChannelStatus::Verified => "verified",
            ChannelStatus::Expired => "expired",
            ChannelStatus::Locked => "locked",
        };
        f.write_str(name)
    }
}

/// Rejected digit input
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeInputError {
    #[error("position {index} is outside the code")]
    OutOfRange { index: usize },

    #[error("only digits are accepted")]
    NotADigit,
}

/// Digit boxes of the code being typed, in display order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    digits: [Option<char>; OTP_LENGTH],
}

impl CodeBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `value` starting at `index`
    ///
    /// An empty value clears the box. A multi-digit value (a paste) fills
    /// consecutive boxes and is truncated at the last box. Nothing is
    /// written unless the whole value is valid.
    pub fn set(&mut self, index: usize, value: &str) -> Result<(), CodeInputError> {
        if index >= OTP_LENGTH {
            return Err(CodeInputError::OutOfRange { index });
        }

        let value = value.trim();
        if value.is_empty() {
            self.digits[index] = None;
            return Ok(());
        }
        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(CodeInputError::NotADigit);
        }

        for (slot, digit) in self.digits[index..].iter_mut().zip(value.chars()) {
            *slot = Some(digit);
        }
        Ok(())
    }

    /// Empty every box
    pub fn clear(&mut self) {
        self.digits = [None; OTP_LENGTH];
    }

    /// Whether every box holds a digit
    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    /// The full code, once every box is filled
    pub fn code(&self) -> Option<String> {
        self.digits.iter().copied().collect()
    }

    /// Digits in display order
    pub fn digits(&self) -> &[Option<char>; OTP_LENGTH] {
        &self.digits
    }
}

impl fmt::Display for CodeBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in &self.digits {
            write!(f, "{}", digit.unwrap_or('_'))?;
        }
        Ok(())
    }
}

/// Mutable per-session state of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelState {
    /// Current lifecycle status
    pub status: ChannelStatus,
    /// Code being typed
    pub code: CodeBuffer,
    /// Countdown of the validity window
    pub seconds_remaining: u32,
    /// Countdown until another resend is allowed
    pub resend_cooldown_seconds: u32,
    /// Resends performed this session, never above the configured maximum
    pub resend_attempts: u32,
    /// Failed attempts last reported by the backend
    pub failed_attempts: u32,
    /// End of the active lock, if any
    pub lock_until: Option<DateTime<Utc>>,
    /// Last error surfaced for this channel
    pub error_message: Option<String>,
    /// Whether the "no more resends" warning was already surfaced
    pub exhaustion_warned: bool,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    /// Fresh idle state
    pub fn new() -> Self {
        Self {
            status: ChannelStatus::Idle,
            code: CodeBuffer::new(),
            seconds_remaining: 0,
            resend_cooldown_seconds: 0,
            resend_attempts: 0,
            failed_attempts: 0,
            lock_until: None,
            error_message: None,
            exhaustion_warned: false,
        }
    }

    /// State of a channel already proven for this identity
    pub fn verified() -> Self {
        Self {
            status: ChannelStatus::Verified,
            ..Self::new()
        }
    }

    /// State of a channel locked until `until`
    pub fn locked(until: DateTime<Utc>) -> Self {
        Self {
            status: ChannelStatus::Locked,
            lock_until: Some(until),
            ..Self::new()
        }
    }

    /// Whether the channel reached its terminal state
    pub fn is_verified(&self) -> bool {
        self.status == ChannelStatus::Verified
    }

    /// Whether an active lock applies at `now`
    pub fn is_locked_at(&self, now: DateTime<Utc>) -> bool {
        self.status == ChannelStatus::Locked && self.lock_until.map_or(false, |until| until > now)
    }
}
