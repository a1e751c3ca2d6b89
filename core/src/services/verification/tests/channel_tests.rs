//! Unit tests for the channel state machine

use std::time::Duration;

use crate::domain::entities::{Channel, ChannelStatus, Identity};
use crate::errors::VerificationError;
use crate::services::verification::{
    Clock, IdentityFragment, Origin, ResendOutcome, SendOutcome, TickOutcome, VerifyOutcome,
};

use super::mocks::{domestic_identity, rejected, server_error, Harness, VALID_CODE};

async fn sent(harness: &Harness, channel: Channel) {
    let outcome = harness.orchestrator.send_for(channel).await.unwrap();
    assert!(matches!(outcome, SendOutcome::Sent { .. }));
}

#[tokio::test]
async fn test_send_moves_idle_to_sent() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;

    let state = h.orchestrator.channel(Channel::Email).state().await;
    assert_eq!(state.status, ChannelStatus::Sent);
    assert_eq!(state.seconds_remaining, 180);
    assert_eq!(state.resend_cooldown_seconds, 60);
    assert_eq!(state.resend_attempts, 0);

    let requests = h.gateway.sends.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].fragment, IdentityFragment::Email("a@b.com".to_string()));
    assert_eq!(requests[0].context, Origin::FreshSignup);
}

#[tokio::test]
async fn test_send_twice_is_rejected() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;

    let err = h.orchestrator.send_for(Channel::Email).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::AlreadySent {
            channel: Channel::Email
        }
    );
    assert_eq!(h.gateway.send_count(Channel::Email), 1);
}

#[tokio::test]
async fn test_missing_phone_blocks_send() {
    let h = Harness::new(Identity::email_only("a@b.com"), Origin::FreshSignup);
    let err = h.orchestrator.send_for(Channel::Phone).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::MissingField {
            field: "phone".to_string()
        }
    );
    assert_eq!(h.gateway.send_count(Channel::Phone), 0);

    let snapshot = h.orchestrator.channel(Channel::Phone).snapshot().await;
    assert_eq!(snapshot.status, ChannelStatus::Idle);
    assert_eq!(snapshot.error_message.as_deref(), Some("Field required: phone"));
}

#[tokio::test]
async fn test_transient_send_failure_keeps_channel_idle() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    h.gateway.push_send(Channel::Email, server_error());

    let err = h.orchestrator.send_for(Channel::Email).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(h.orchestrator.channel(Channel::Email).status().await, ChannelStatus::Idle);

    // Retry is allowed
    sent(&h, Channel::Email).await;
}

#[tokio::test]
async fn test_verify_requires_complete_code() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.orchestrator.set_digit(Channel::Email, 0, "123").await.unwrap();

    let err = h.orchestrator.verify_for(Channel::Email).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::IncompleteCode {
            channel: Channel::Email
        }
    );
    assert_eq!(h.gateway.verify_count(Channel::Email), 0);
    assert_eq!(h.orchestrator.channel(Channel::Email).status().await, ChannelStatus::Sent);
}

#[tokio::test]
async fn test_set_digit_rules() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);

    let err = h.orchestrator.set_digit(Channel::Email, 0, "1").await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::NotSent {
            channel: Channel::Email
        }
    );

    sent(&h, Channel::Email).await;
    h.orchestrator.set_digit(Channel::Email, 2, "7").await.unwrap();
    assert!(matches!(
        h.orchestrator.set_digit(Channel::Email, 6, "1").await,
        Err(VerificationError::InvalidDigit { .. })
    ));
    assert!(matches!(
        h.orchestrator.set_digit(Channel::Email, 0, "a").await,
        Err(VerificationError::InvalidDigit { .. })
    ));

    // Paste from the fourth box is truncated at the last box
    h.orchestrator.set_digit(Channel::Email, 3, "98765").await.unwrap();
    let snapshot = h.orchestrator.channel(Channel::Email).snapshot().await;
    assert_eq!(snapshot.code, "__7987");
    assert!(!snapshot.can_verify);

    h.orchestrator.set_digit(Channel::Email, 2, "").await.unwrap();
    let snapshot = h.orchestrator.channel(Channel::Email).snapshot().await;
    assert_eq!(snapshot.code, "___987");
}

#[tokio::test]
async fn test_wrong_code_returns_to_sent_with_message() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.advance(10).await;
    h.type_code(Channel::Email, "000000").await;

    let err = h.orchestrator.verify_for(Channel::Email).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::InvalidCode {
            channel: Channel::Email,
            message: "Invalid OTP".to_string()
        }
    );

    let state = h.orchestrator.channel(Channel::Email).state().await;
    assert_eq!(state.status, ChannelStatus::Sent);
    assert_eq!(state.code.code().as_deref(), Some("000000"));
    assert_eq!(state.seconds_remaining, 170);
    assert_eq!(state.error_message.as_deref(), Some("Invalid OTP"));

    // Typing clears the message
    h.orchestrator.set_digit(Channel::Email, 0, "1").await.unwrap();
    assert!(h.orchestrator.channel(Channel::Email).state().await.error_message.is_none());
}

#[tokio::test]
async fn test_success_body_false_counts_as_rejection() {
    use crate::services::verification::OtpResponse;

    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Phone).await;
    h.gateway.push_verify(
        Channel::Phone,
        Ok(OtpResponse::failure("OTP mismatch").with_failed_attempts(2)),
    );
    h.type_code(Channel::Phone, VALID_CODE).await;

    let err = h.orchestrator.verify_for(Channel::Phone).await.unwrap_err();
    assert_eq!(err.to_string(), "OTP mismatch");
    let state = h.orchestrator.channel(Channel::Phone).state().await;
    assert_eq!(state.status, ChannelStatus::Sent);
    assert_eq!(state.failed_attempts, 2);
}

#[tokio::test]
async fn test_verified_channel_is_idempotent() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.type_code(Channel::Email, VALID_CODE).await;
    assert_eq!(
        h.orchestrator.verify_for(Channel::Email).await.unwrap(),
        VerifyOutcome::Verified
    );

    let state = h.orchestrator.channel(Channel::Email).state().await;
    assert_eq!(state.seconds_remaining, 0);
    assert_eq!(state.resend_cooldown_seconds, 0);

    assert_eq!(
        h.orchestrator.send_for(Channel::Email).await.unwrap(),
        SendOutcome::AlreadyVerified
    );
    assert_eq!(
        h.orchestrator.resend_for(Channel::Email).await.unwrap(),
        ResendOutcome::AlreadyVerified
    );
    assert_eq!(
        h.orchestrator.verify_for(Channel::Email).await.unwrap(),
        VerifyOutcome::AlreadyVerified
    );
    h.orchestrator.set_digit(Channel::Email, 0, "9").await.unwrap();

    assert_eq!(h.gateway.send_count(Channel::Email), 1);
    assert_eq!(h.gateway.verify_count(Channel::Email), 1);
    assert_eq!(h.orchestrator.channel(Channel::Email).state().await, state);

    // Persisted for the next reload
    let key = h.orchestrator.identity().verification_key();
    let record = h.store.record(&key).unwrap();
    assert!(record.email_verified);
    assert!(!record.phone_verified);
}

#[tokio::test]
async fn test_expiry_blocks_verify_until_resend() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.type_code(Channel::Email, VALID_CODE).await;
    h.advance(180).await;

    assert_eq!(h.orchestrator.channel(Channel::Email).status().await, ChannelStatus::Expired);
    let err = h.orchestrator.verify_for(Channel::Email).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::Expired {
            channel: Channel::Email
        }
    );
    assert_eq!(h.gateway.verify_count(Channel::Email), 0);

    let outcome = h.orchestrator.resend_for(Channel::Email).await.unwrap();
    assert_eq!(
        outcome,
        ResendOutcome::Sent {
            attempts: 1,
            remaining: 4,
            warning: None
        }
    );
    let state = h.orchestrator.channel(Channel::Email).state().await;
    assert_eq!(state.status, ChannelStatus::Sent);
    assert_eq!(state.seconds_remaining, 180);
    assert_eq!(state.code.to_string(), "______");
}

#[tokio::test]
async fn test_resend_waits_for_cooldown() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Phone).await;
    h.advance(59).await;

    let err = h.orchestrator.resend_for(Channel::Phone).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::CooldownActive {
            channel: Channel::Phone,
            seconds: 1
        }
    );
    assert_eq!(h.gateway.send_count(Channel::Phone), 1);

    h.advance(1).await;
    assert!(h.orchestrator.channel(Channel::Phone).snapshot().await.can_resend);
    h.orchestrator.resend_for(Channel::Phone).await.unwrap();
    assert_eq!(h.gateway.send_count(Channel::Phone), 2);
}

#[tokio::test]
async fn test_resend_before_send_is_rejected() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    let err = h.orchestrator.resend_for(Channel::Email).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::NotSent {
            channel: Channel::Email
        }
    );
}

#[tokio::test]
async fn test_server_error_on_resend_refunds_attempt() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.advance(60).await;

    h.gateway.push_send(Channel::Email, server_error());
    let err = h.orchestrator.resend_for(Channel::Email).await.unwrap_err();
    assert!(err.is_transient());

    let state = h.orchestrator.channel(Channel::Email).state().await;
    assert_eq!(state.resend_attempts, 0);
    assert_eq!(state.resend_cooldown_seconds, 0);
}

#[tokio::test]
async fn test_rejected_resend_counts_against_budget() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.advance(60).await;

    h.gateway
        .push_send(Channel::Email, rejected("Too many OTP requests", None));
    let err = h.orchestrator.resend_for(Channel::Email).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::Rejected {
            channel: Channel::Email,
            message: "Too many OTP requests".to_string()
        }
    );
    assert_eq!(h.orchestrator.channel(Channel::Email).state().await.resend_attempts, 1);
}

#[tokio::test]
async fn test_in_flight_call_rejects_overlap() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    sent(&h, Channel::Phone).await;
    h.advance(60).await;
    h.type_code(Channel::Email, VALID_CODE).await;

    let gate = h.gateway.hold();
    let orchestrator = h.orchestrator.clone();
    let verify = tokio::spawn(async move { orchestrator.verify_for(Channel::Email).await });

    while h.orchestrator.channel(Channel::Email).status().await != ChannelStatus::Verifying {
        tokio::task::yield_now().await;
    }
    assert!(h.orchestrator.channel(Channel::Email).is_busy());

    let err = h.orchestrator.resend_for(Channel::Email).await.unwrap_err();
    assert_eq!(
        err,
        VerificationError::Busy {
            channel: Channel::Email
        }
    );
    assert!(matches!(
        h.orchestrator.set_digit(Channel::Email, 0, "1").await,
        Err(VerificationError::Busy { .. })
    ));

    // The other channel is unaffected
    h.orchestrator.set_digit(Channel::Phone, 0, "4").await.unwrap();
    assert!(!h.orchestrator.channel(Channel::Phone).is_busy());

    gate.notify_one();
    assert_eq!(verify.await.unwrap().unwrap(), VerifyOutcome::Verified);
    assert!(!h.orchestrator.channel(Channel::Email).is_busy());
}

#[tokio::test]
async fn test_abandoned_verify_returns_to_sent() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.type_code(Channel::Email, VALID_CODE).await;

    let gate = h.gateway.hold();
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        h.orchestrator.verify_for(Channel::Email),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(h.gateway.verify_count(Channel::Email), 1);

    let machine = h.orchestrator.channel(Channel::Email);
    assert_eq!(machine.status().await, ChannelStatus::Sent);
    assert!(!machine.is_busy());

    // The countdown picks up where it left off
    h.advance(10).await;
    assert_eq!(machine.state().await.seconds_remaining, 170);

    gate.notify_one();
    assert_eq!(
        h.orchestrator.verify_for(Channel::Email).await.unwrap(),
        VerifyOutcome::Verified
    );
}

#[tokio::test]
async fn test_abandoned_verify_can_still_expire() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Phone).await;
    h.type_code(Channel::Phone, VALID_CODE).await;

    let _gate = h.gateway.hold();
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        h.orchestrator.verify_for(Channel::Phone),
    )
    .await;
    assert!(abandoned.is_err());

    h.advance(180).await;
    assert_eq!(
        h.orchestrator.channel(Channel::Phone).status().await,
        ChannelStatus::Expired
    );
}

#[tokio::test]
async fn test_abandoned_resend_refunds_attempt() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Phone).await;
    h.advance(60).await;

    let gate = h.gateway.hold();
    let abandoned = tokio::time::timeout(
        Duration::from_millis(50),
        h.orchestrator.resend_for(Channel::Phone),
    )
    .await;
    assert!(abandoned.is_err());
    assert_eq!(h.gateway.send_count(Channel::Phone), 2);

    let machine = h.orchestrator.channel(Channel::Phone);
    let state = machine.state().await;
    assert_eq!(state.resend_attempts, 0);
    assert_eq!(state.status, ChannelStatus::Sent);
    assert!(!machine.is_busy());

    gate.notify_one();
    assert_eq!(
        h.orchestrator.resend_for(Channel::Phone).await.unwrap(),
        ResendOutcome::Sent {
            attempts: 1,
            remaining: 4,
            warning: None
        }
    );
}

#[tokio::test]
async fn test_server_reported_failures_lock_channel() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Phone).await;
    h.gateway
        .push_verify(Channel::Phone, rejected("Invalid OTP", Some(5)));
    h.type_code(Channel::Phone, "111111").await;

    let err = h.orchestrator.verify_for(Channel::Phone).await.unwrap_err();
    assert!(matches!(
        err,
        VerificationError::Locked {
            channel: Channel::Phone,
            ..
        }
    ));

    let state = h.orchestrator.channel(Channel::Phone).state().await;
    assert_eq!(state.status, ChannelStatus::Locked);
    let lock_until = state.lock_until.unwrap();
    assert_eq!(lock_until, h.clock.now() + chrono::Duration::hours(24));

    let key = h.orchestrator.identity().lockout_key(Channel::Phone);
    assert_eq!(h.store.lockout(&key), Some(h.clock.now()));

    // Nothing is allowed while locked
    assert!(matches!(
        h.orchestrator.resend_for(Channel::Phone).await,
        Err(VerificationError::Locked { .. })
    ));
    assert!(matches!(
        h.orchestrator.set_digit(Channel::Phone, 0, "1").await,
        Err(VerificationError::Locked { .. })
    ));
    assert_eq!(h.gateway.verify_count(Channel::Phone), 1);
    assert_eq!(h.gateway.send_count(Channel::Phone), 1);
}

#[tokio::test]
async fn test_lock_elapses_during_session() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.gateway
        .push_verify(Channel::Email, rejected("Invalid OTP", Some(5)));
    h.type_code(Channel::Email, "111111").await;
    let _ = h.orchestrator.verify_for(Channel::Email).await;

    let machine = h.orchestrator.channel(Channel::Email);
    assert_eq!(machine.tick().await, TickOutcome::Locked);

    h.clock.advance(chrono::Duration::hours(24));
    assert_eq!(machine.tick().await, TickOutcome::LockReleased);
    assert_eq!(machine.status().await, ChannelStatus::Idle);

    let key = h.orchestrator.identity().lockout_key(Channel::Email);
    assert_eq!(h.store.lockout(&key), None);

    sent(&h, Channel::Email).await;
}

#[tokio::test]
async fn test_store_failure_does_not_block_verification() {
    let h = Harness::new(domestic_identity(), Origin::FreshSignup);
    sent(&h, Channel::Email).await;
    h.store.set_failing(true);
    h.type_code(Channel::Email, VALID_CODE).await;

    assert_eq!(
        h.orchestrator.verify_for(Channel::Email).await.unwrap(),
        VerifyOutcome::Verified
    );
    assert_eq!(h.orchestrator.channel(Channel::Email).status().await, ChannelStatus::Verified);
}
