//! Unit tests for the resend budget

use chrono::{Duration, Utc};

use crate::domain::entities::{Channel, ChannelState, ChannelStatus, CodeBuffer};
use crate::errors::VerificationError;
use crate::services::verification::{ChannelTimer, ResendBudget};

fn budget() -> ResendBudget {
    ResendBudget::new(5, Duration::hours(24))
}

fn sent_state() -> ChannelState {
    let mut state = ChannelState::new();
    state.status = ChannelStatus::Sent;
    state
}

#[test]
fn test_can_resend_requires_budget_cooldown_and_no_lock() {
    let budget = budget();
    let mut state = sent_state();
    assert!(budget.can_resend(&state));

    state.resend_cooldown_seconds = 10;
    assert!(!budget.can_resend(&state));

    state.resend_cooldown_seconds = 0;
    state.resend_attempts = 5;
    assert!(!budget.can_resend(&state));

    state.resend_attempts = 0;
    state.status = ChannelStatus::Locked;
    assert!(!budget.can_resend(&state));
}

#[test]
fn test_check_resend_reports_most_severe_reason() {
    let budget = budget();
    let mut state = sent_state();
    state.resend_attempts = 5;
    state.resend_cooldown_seconds = 30;
    assert_eq!(
        budget.check_resend(Channel::Email, &state),
        Err(VerificationError::TooManyAttempts {
            channel: Channel::Email
        })
    );

    state.resend_attempts = 1;
    assert_eq!(
        budget.check_resend(Channel::Email, &state),
        Err(VerificationError::CooldownActive {
            channel: Channel::Email,
            seconds: 30
        })
    );

    let until = Utc::now() + Duration::hours(1);
    let locked = ChannelState::locked(until);
    assert_eq!(
        budget.check_resend(Channel::Phone, &locked),
        Err(VerificationError::Locked {
            channel: Channel::Phone,
            until
        })
    );
}

#[test]
fn test_reserve_never_exceeds_max() {
    let budget = budget();
    let mut state = sent_state();
    for _ in 0..10 {
        budget.reserve_resend(&mut state);
    }
    assert_eq!(state.resend_attempts, 5);
    assert_eq!(budget.remaining(&state), 0);
}

#[test]
fn test_refund_clamps_at_zero() {
    let budget = budget();
    let mut state = sent_state();
    budget.refund_resend(&mut state);
    assert_eq!(state.resend_attempts, 0);

    budget.reserve_resend(&mut state);
    budget.refund_resend(&mut state);
    assert_eq!(state.resend_attempts, 0);
}

#[test]
fn test_complete_resend_warns_once_when_exhausted() {
    let budget = budget();
    let timer = ChannelTimer::new(180, 60);
    let mut state = sent_state();
    state.status = ChannelStatus::Expired;
    state.code.set(0, "1234").unwrap();
    state.resend_attempts = 4;

    budget.reserve_resend(&mut state);
    let warning = budget.complete_resend(Channel::Email, &timer, &mut state);
    assert_eq!(
        warning.as_deref(),
        Some("Too many attempts: no more Email OTP resends available")
    );
    assert_eq!(state.status, ChannelStatus::Sent);
    assert_eq!(state.seconds_remaining, 180);
    assert_eq!(state.resend_cooldown_seconds, 60);
    assert_eq!(state.code, CodeBuffer::new());

    // Not a lock, and the warning is not repeated
    assert!(budget.complete_resend(Channel::Email, &timer, &mut state).is_none());
    assert_ne!(state.status, ChannelStatus::Locked);
}

#[test]
fn test_failed_verify_locks_on_server_count() {
    let budget = budget();
    let now = Utc::now();
    let mut state = sent_state();

    assert_eq!(budget.record_failed_verify(&mut state, Some(4), now), None);
    assert_eq!(state.failed_attempts, 4);
    assert_eq!(state.status, ChannelStatus::Sent);

    assert_eq!(budget.record_failed_verify(&mut state, None, now), None);
    assert_eq!(state.status, ChannelStatus::Sent);

    assert_eq!(budget.record_failed_verify(&mut state, Some(5), now), Some(now));
    assert_eq!(state.status, ChannelStatus::Locked);
    assert_eq!(state.lock_until, Some(now + Duration::hours(24)));
}

#[test]
fn test_local_resend_count_never_locks() {
    let budget = budget();
    let now = Utc::now();
    let mut state = sent_state();
    state.resend_attempts = 5;
    assert_eq!(budget.record_failed_verify(&mut state, Some(1), now), None);
    assert_eq!(state.status, ChannelStatus::Sent);
}
