//! Errors raised while driving OTP channels
//!
//! Every message here is user-facing: the orchestrator surfaces them
//! verbatim in the channel's error slot and in submit rejections.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::entities::{Channel, CodeInputError};

/// Failure reported by the OTP backend gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Transport failure; the backend never answered
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a 5xx status
    #[error("server error ({status})")]
    Server { status: u16 },

    /// The backend rejected the request (4xx or `success: false`)
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        failed_attempts: Option<u32>,
    },
}

impl GatewayError {
    /// Whether the failure says nothing about the user's input
    ///
    /// Transient failures never count against the resend budget.
    pub fn is_transient(&self) -> bool {
        match self {
            GatewayError::Network(_) => true,
            GatewayError::Server { status } => *status >= 500,
            GatewayError::Rejected { status, .. } => *status >= 500,
        }
    }

    /// Failed attempt count reported by the backend, if any
    pub fn failed_attempts(&self) -> Option<u32> {
        match self {
            GatewayError::Rejected { failed_attempts, .. } => *failed_attempts,
            _ => None,
        }
    }
}

/// Why a channel could not be completed during submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub message: String,
}

impl ChannelFailure {
    pub fn new(channel: Channel, message: impl Into<String>) -> Self {
        Self {
            channel,
            message: message.into(),
        }
    }
}

/// Verification errors surfaced to the UI
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("{} OTP service unavailable: {message}", .channel.label())]
    Transient { channel: Channel, message: String },

    #[error("{message}")]
    Rejected { channel: Channel, message: String },

    #[error("{message}")]
    InvalidCode { channel: Channel, message: String },

    #[error("{} OTP has expired. Please request a new code", .channel.label())]
    Expired { channel: Channel },

    #[error("{} OTP verification locked until {until}", .channel.label())]
    Locked {
        channel: Channel,
        until: DateTime<Utc>,
    },

    #[error("Too many attempts: no more {} OTP resends available", .channel.label())]
    TooManyAttempts { channel: Channel },

    #[error("Please wait {seconds}s before requesting another {} OTP", .channel.label())]
    CooldownActive { channel: Channel, seconds: u32 },

    #[error("Please enter the complete {} OTP", .channel.label())]
    IncompleteCode { channel: Channel },

    #[error("{} OTP has not been sent yet", .channel.label())]
    NotSent { channel: Channel },

    #[error("{} OTP was already sent. Use resend instead", .channel.label())]
    AlreadySent { channel: Channel },

    #[error("{} OTP request already in progress", .channel.label())]
    Busy { channel: Channel },

    #[error("Invalid {} OTP input: {reason}", .channel.label())]
    InvalidDigit {
        channel: Channel,
        reason: CodeInputError,
    },

    #[error("Field required: {field}")]
    MissingField { field: String },

    #[error("Invalid format: {field}")]
    InvalidFormat { field: String },

    #[error("Verification storage failed: {message}")]
    Persistence { message: String },

    #[error("Verification incomplete: {}", join_failures(.failures))]
    SubmitRejected { failures: Vec<ChannelFailure> },
}

fn join_failures(failures: &[ChannelFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.channel.label(), f.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl VerificationError {
    /// Channel the error belongs to, when it belongs to exactly one
    pub fn channel(&self) -> Option<Channel> {
        match self {
            VerificationError::Transient { channel, .. }
            | VerificationError::Rejected { channel, .. }
            | VerificationError::InvalidCode { channel, .. }
            | VerificationError::Expired { channel }
            | VerificationError::Locked { channel, .. }
            | VerificationError::TooManyAttempts { channel }
            | VerificationError::CooldownActive { channel, .. }
            | VerificationError::IncompleteCode { channel }
            | VerificationError::NotSent { channel }
            | VerificationError::AlreadySent { channel }
            | VerificationError::Busy { channel }
            | VerificationError::InvalidDigit { channel, .. } => Some(*channel),
            VerificationError::MissingField { .. }
            | VerificationError::InvalidFormat { .. }
            | VerificationError::Persistence { .. }
            | VerificationError::SubmitRejected { .. } => None,
        }
    }

    /// Whether retrying later may succeed without user action
    pub fn is_transient(&self) -> bool {
        matches!(self, VerificationError::Transient { .. })
    }

    /// Per-channel failures carried by a submit rejection
    pub fn failures(&self) -> &[ChannelFailure] {
        match self {
            VerificationError::SubmitRejected { failures } => failures,
            _ => &[],
        }
    }
}
