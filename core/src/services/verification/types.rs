//! Types for verification requests and operation results

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{Channel, Identity};
use crate::errors::ChannelFailure;

use super::traits::{Clock, LockoutStore, OtpGateway, VerificationStore};

/// Where the verification flow was entered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    /// A brand-new signup
    FreshSignup,
    /// A login that found the account still pending verification
    ResumedLogin,
}

impl Origin {
    /// Context string sent to the backend
    pub fn as_context(&self) -> &'static str {
        match self {
            Origin::FreshSignup => "signup",
            Origin::ResumedLogin => "login",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_context())
    }
}

/// The part of the identity a channel's backend call needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityFragment {
    Email(String),
    Phone { country_code: String, number: String },
}

impl IdentityFragment {
    /// Destination fragment for `channel`
    pub fn for_channel(identity: &Identity, channel: Channel) -> Self {
        match channel {
            Channel::Email => IdentityFragment::Email(identity.email.trim().to_string()),
            Channel::Phone => IdentityFragment::Phone {
                country_code: vp_shared::phone::normalize_dial_code(&identity.country_code),
                number: vp_shared::phone::normalize_phone_number(&identity.phone),
            },
        }
    }

    pub fn channel(&self) -> Channel {
        match self {
            IdentityFragment::Email(_) => Channel::Email,
            IdentityFragment::Phone { .. } => Channel::Phone,
        }
    }
}

/// Ask the backend to deliver a code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOtpRequest {
    pub fragment: IdentityFragment,
    pub context: Origin,
}

impl SendOtpRequest {
    pub fn channel(&self) -> Channel {
        self.fragment.channel()
    }
}

/// Ask the backend to check a typed code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyOtpRequest {
    pub fragment: IdentityFragment,
    pub code: String,
    pub context: Origin,
}

impl VerifyOtpRequest {
    pub fn channel(&self) -> Channel {
        self.fragment.channel()
    }
}

/// Result of a first send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The backend accepted the request
    Sent { message: String },
    /// The channel was already verified; nothing happened
    AlreadyVerified,
    /// The phone region is exempt from code entry; the channel was marked verified
    Bypassed,
}

/// Result of a resend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent {
        /// Resends used so far
        attempts: u32,
        /// Resends still available
        remaining: u32,
        /// One-time notice that the budget is now used up
        warning: Option<String>,
    },
    AlreadyVerified,
}

/// Result of a verify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    AlreadyVerified,
}

/// What one scheduler tick did to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to count down
    Idle,
    /// Counters moved
    Ticked,
    /// The validity window just elapsed
    Expired,
    /// An elapsed lock was released
    LockReleased,
    /// Still locked
    Locked,
}

/// Summary of orchestrator initialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// Channels restored as verified from the persisted record
    pub restored: Vec<Channel>,
    /// Channels restored as locked
    pub locked: Vec<Channel>,
    /// Whether the phone channel was bypassed
    pub bypassed: bool,
    /// Channels auto-sent on a resumed login
    pub auto_sent: Vec<Channel>,
    /// Auto-sends and phone bypasses that failed
    pub failures: Vec<ChannelFailure>,
}

/// Collaborators shared by both channels
#[derive(Clone)]
pub struct VerificationDeps {
    pub gateway: Arc<dyn OtpGateway>,
    pub records: Arc<dyn VerificationStore>,
    pub lockouts: Arc<dyn LockoutStore>,
    pub clock: Arc<dyn Clock>,
}

impl VerificationDeps {
    pub fn new(
        gateway: Arc<dyn OtpGateway>,
        records: Arc<dyn VerificationStore>,
        lockouts: Arc<dyn LockoutStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            records,
            lockouts,
            clock,
        }
    }
}
