//! Unit tests for verification error types

use chrono::{TimeZone, Utc};

use crate::domain::entities::{Channel, CodeInputError};
use crate::errors::{ChannelFailure, DomainError, GatewayError, VerificationError};

#[test]
fn test_messages_use_channel_label() {
    let error = VerificationError::Expired {
        channel: Channel::Phone,
    };
    assert_eq!(error.to_string(), "Mobile OTP has expired. Please request a new code");

    let error = VerificationError::TooManyAttempts {
        channel: Channel::Email,
    };
    assert_eq!(
        error.to_string(),
        "Too many attempts: no more Email OTP resends available"
    );
}

#[test]
fn test_locked_message_carries_deadline() {
    let until = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let error = VerificationError::Locked {
        channel: Channel::Email,
        until,
    };
    let message = error.to_string();
    assert!(message.starts_with("Email OTP verification locked until"));
    assert!(message.contains("2026-01-02"));
}

#[test]
fn test_rejected_passes_backend_message_through() {
    let error = VerificationError::InvalidCode {
        channel: Channel::Email,
        message: "Invalid OTP".to_string(),
    };
    assert_eq!(error.to_string(), "Invalid OTP");
    assert_eq!(error.channel(), Some(Channel::Email));
    assert!(!error.is_transient());
}

#[test]
fn test_submit_rejected_lists_each_channel() {
    let error = VerificationError::SubmitRejected {
        failures: vec![
            ChannelFailure::new(Channel::Email, "Invalid OTP"),
            ChannelFailure::new(Channel::Phone, "Mobile OTP has expired. Please request a new code"),
        ],
    };
    let message = error.to_string();
    assert!(message.starts_with("Verification incomplete: "));
    assert!(message.contains("Email: Invalid OTP"));
    assert!(message.contains("Mobile: Mobile OTP has expired"));
    assert_eq!(error.failures().len(), 2);
    assert_eq!(error.channel(), None);
}

#[test]
fn test_invalid_digit_wraps_reason() {
    let error = VerificationError::InvalidDigit {
        channel: Channel::Phone,
        reason: CodeInputError::NotADigit,
    };
    assert!(error.to_string().contains("only digits are accepted"));
}

#[test]
fn test_gateway_transient_classification() {
    assert!(GatewayError::Network("timeout".into()).is_transient());
    assert!(GatewayError::Server { status: 503 }.is_transient());

    let rejected = GatewayError::Rejected {
        status: 400,
        message: "Invalid OTP".into(),
        failed_attempts: Some(2),
    };
    assert!(!rejected.is_transient());
    assert_eq!(rejected.failed_attempts(), Some(2));
    assert_eq!(rejected.to_string(), "Invalid OTP");
}

#[test]
fn test_domain_error_bridges_verification_error() {
    let error: DomainError = VerificationError::MissingField {
        field: "email".into(),
    }
    .into();
    assert_eq!(error.to_string(), "Field required: email");
}
