//! OTP channel state machine
//!
//! One [`ChannelMachine`] drives a single channel (email or phone) through
//! `Idle -> Sent -> Verifying -> Verified`, with `Expired` and `Locked` side
//! states. Each machine allows one outstanding backend call at a time; a
//! second call while one is in flight is rejected with
//! [`VerificationError::Busy`] instead of being queued.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::domain::entities::{Channel, ChannelState, ChannelStatus, Identity};
use crate::domain::value_objects::{ChannelSnapshot, VerificationRecord};
use crate::errors::{GatewayError, VerificationError};

use super::budget::ResendBudget;
use super::config::VerificationServiceConfig;
use super::persistence::{LockoutTracker, VerificationRecordKeeper};
use super::timer::ChannelTimer;
use super::traits::{Clock, OtpGateway, OtpResponse};
use super::types::{
    IdentityFragment, Origin, ResendOutcome, SendOtpRequest, SendOutcome, TickOutcome,
    VerificationDeps, VerifyOtpRequest, VerifyOutcome,
};

const DEFAULT_SEND_FAILURE: &str = "Failed to send OTP";
const DEFAULT_VERIFY_FAILURE: &str = "Invalid OTP";

/// Half-applied transition to undo when a call is dropped mid-flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rollback {
    /// Leave `Verifying` for `Sent` or `Expired`
    Verify,
    /// Give back the reserved resend
    Resend,
}

impl Rollback {
    fn apply(self, state: &mut ChannelState, budget: &ResendBudget) {
        match self {
            Rollback::Verify if state.status == ChannelStatus::Verifying => return_to_sent(state),
            Rollback::Verify => {}
            Rollback::Resend => budget.refund_resend(state),
        }
    }
}

/// Marks a channel busy until dropped
///
/// While armed, dropping the guard also rolls back the transition the call
/// started, for callers that abandon it at the backend await.
struct InFlight {
    channel: Channel,
    flag: Arc<watch::Sender<bool>>,
    state: Arc<Mutex<ChannelState>>,
    budget: ResendBudget,
    rollback: Option<Rollback>,
}

impl InFlight {
    fn arm(&mut self, rollback: Rollback) {
        self.rollback = Some(rollback);
    }

    fn disarm(&mut self) {
        self.rollback = None;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        let Some(rollback) = self.rollback.take() else {
            self.flag.send_replace(false);
            return;
        };

        warn!(
            channel = %self.channel,
            rollback = ?rollback,
            event = "call_abandoned",
            "Backend call dropped before it settled, rolling back"
        );
        if let Ok(mut state) = self.state.try_lock() {
            rollback.apply(&mut state, &self.budget);
            drop(state);
            self.flag.send_replace(false);
            return;
        }

        // Someone holds the state lock; finish the rollback before releasing the channel
        let flag = Arc::clone(&self.flag);
        let state = Arc::clone(&self.state);
        let budget = self.budget;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let mut guard = state.lock().await;
                    rollback.apply(&mut guard, &budget);
                    drop(guard);
                    flag.send_replace(false);
                });
            }
            Err(_) => {
                flag.send_replace(false);
            }
        }
    }
}

/// State machine of one verification channel
pub struct ChannelMachine {
    channel: Channel,
    identity: Identity,
    origin: Origin,
    timer: ChannelTimer,
    budget: ResendBudget,
    gateway: Arc<dyn OtpGateway>,
    clock: Arc<dyn Clock>,
    records: Arc<VerificationRecordKeeper>,
    lockout: LockoutTracker,
    state: Arc<Mutex<ChannelState>>,
    in_flight: Arc<watch::Sender<bool>>,
}

impl ChannelMachine {
    pub fn new(
        channel: Channel,
        identity: Identity,
        origin: Origin,
        config: &VerificationServiceConfig,
        deps: &VerificationDeps,
        records: Arc<VerificationRecordKeeper>,
    ) -> Self {
        let budget = ResendBudget::new(config.max_resend, config.lockout_duration);
        let lockout = LockoutTracker::new(
            Arc::clone(&deps.lockouts),
            identity.lockout_key(channel),
            budget,
        );
        let (in_flight, _) = watch::channel(false);

        Self {
            channel,
            identity,
            origin,
            timer: ChannelTimer::new(config.validity_seconds, config.resend_cooldown_seconds),
            budget,
            gateway: Arc::clone(&deps.gateway),
            clock: Arc::clone(&deps.clock),
            records,
            lockout,
            state: Arc::new(Mutex::new(ChannelState::new())),
            in_flight: Arc::new(in_flight),
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Current status
    pub async fn status(&self) -> ChannelStatus {
        self.state.lock().await.status
    }

    /// Copy of the full channel state
    pub async fn state(&self) -> ChannelState {
        self.state.lock().await.clone()
    }

    /// Render state for the UI
    pub async fn snapshot(&self) -> ChannelSnapshot {
        let state = self.state.lock().await;
        let can_resend = matches!(state.status, ChannelStatus::Sent | ChannelStatus::Expired)
            && self.budget.can_resend(&state);
        ChannelSnapshot::from_state(self.channel, &state, can_resend)
    }

    /// Whether a backend call is outstanding
    pub fn is_busy(&self) -> bool {
        *self.in_flight.borrow()
    }

    /// Resolve once no backend call is outstanding
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|busy| !*busy).await;
    }

    /// Seed the channel from persisted records
    ///
    /// Only an idle channel is seeded, so calling this again mid-session
    /// never rewinds progress.
    pub async fn restore(&self, record: &VerificationRecord) -> ChannelStatus {
        let now = self.clock.now();
        if record.is_verified(self.channel) {
            let mut state = self.state.lock().await;
            if state.status == ChannelStatus::Idle {
                *state = ChannelState::verified();
                info!(
                    channel = %self.channel,
                    event = "channel_restored_verified",
                    "Channel restored as verified"
                );
            }
            return state.status;
        }

        let lock_until = self.lockout.restore(now).await;
        let mut state = self.state.lock().await;
        if let (Some(until), ChannelStatus::Idle) = (lock_until, state.status) {
            *state = ChannelState::locked(until);
            warn!(
                channel = %self.channel,
                identity = %self.masked(),
                lock_until = %until,
                event = "channel_restored_locked",
                "Channel restored as locked"
            );
        }
        state.status
    }

    /// First delivery of a code
    pub async fn send(&self) -> Result<SendOutcome, VerificationError> {
        if self.status().await == ChannelStatus::Verified {
            return Ok(SendOutcome::AlreadyVerified);
        }
        let _guard = self.begin()?;

        {
            let mut state = self.state.lock().await;
            match state.status {
                ChannelStatus::Verified => return Ok(SendOutcome::AlreadyVerified),
                ChannelStatus::Locked => {
                    let err = self.locked_error(&state);
                    return Err(fail(&mut state, err));
                }
                ChannelStatus::Idle => {}
                _ => {
                    return Err(VerificationError::AlreadySent {
                        channel: self.channel,
                    })
                }
            }
            if let Err(err) = self.identity.validate_for(self.channel) {
                return Err(fail(&mut state, err));
            }
        }

        let request = self.send_request();
        let result = settle(self.gateway.send_otp(&request).await);
        let now = self.clock.now();

        let mut state = self.state.lock().await;
        match result {
            Ok(response) => {
                self.timer.arm(&mut state);
                state.code.clear();
                state.status = ChannelStatus::Sent;
                state.error_message = None;
                info!(
                    channel = %self.channel,
                    identity = %self.masked(),
                    context = %self.origin,
                    event = "otp_sent",
                    "OTP sent"
                );
                Ok(SendOutcome::Sent {
                    message: response.message,
                })
            }
            Err(e) if e.is_transient() => {
                warn!(
                    channel = %self.channel,
                    error = %e,
                    event = "otp_send_unavailable",
                    "OTP send failed with a transient error"
                );
                let err = VerificationError::Transient {
                    channel: self.channel,
                    message: e.to_string(),
                };
                Err(fail(&mut state, err))
            }
            Err(e) => {
                let locked_at = self.budget.record_failed_verify(&mut state, e.failed_attempts(), now);
                let message = rejection_message(&e, DEFAULT_SEND_FAILURE);
                warn!(
                    channel = %self.channel,
                    event = "otp_send_rejected",
                    "OTP send rejected: {}", message
                );
                self.reject(state, locked_at, VerificationError::Rejected {
                    channel: self.channel,
                    message,
                })
                .await
            }
        }
    }

    /// Deliver a fresh code, spending one unit of the resend budget
    ///
    /// The attempt is counted before the backend call and refunded when
    /// the backend fails with a transient error or the call is dropped
    /// before it settles.
    pub async fn resend(&self) -> Result<ResendOutcome, VerificationError> {
        if self.status().await == ChannelStatus::Verified {
            return Ok(ResendOutcome::AlreadyVerified);
        }
        let mut guard = self.begin()?;

        {
            let mut state = self.state.lock().await;
            match state.status {
                ChannelStatus::Verified => return Ok(ResendOutcome::AlreadyVerified),
                ChannelStatus::Idle => {
                    return Err(VerificationError::NotSent {
                        channel: self.channel,
                    })
                }
                _ => {}
            }
            if let Err(err) = self.budget.check_resend(self.channel, &state) {
                if matches!(err, VerificationError::TooManyAttempts { .. }) {
                    warn!(
                        channel = %self.channel,
                        attempts = state.resend_attempts,
                        event = "resend_budget_exhausted",
                        "Resend refused, no attempts left"
                    );
                }
                return Err(fail(&mut state, err));
            }
            self.budget.reserve_resend(&mut state);
            guard.arm(Rollback::Resend);
        }

        let request = self.send_request();
        let result = settle(self.gateway.send_otp(&request).await);
        let now = self.clock.now();

        let mut state = self.state.lock().await;
        guard.disarm();
        match result {
            Ok(_) => {
                let warning = self.budget.complete_resend(self.channel, &self.timer, &mut state);
                info!(
                    channel = %self.channel,
                    identity = %self.masked(),
                    attempts = state.resend_attempts,
                    event = "otp_resent",
                    "OTP resent"
                );
                Ok(ResendOutcome::Sent {
                    attempts: state.resend_attempts,
                    remaining: self.budget.remaining(&state),
                    warning,
                })
            }
            Err(e) if e.is_transient() => {
                self.budget.refund_resend(&mut state);
                warn!(
                    channel = %self.channel,
                    error = %e,
                    attempts = state.resend_attempts,
                    event = "otp_resend_refunded",
                    "OTP resend failed with a transient error, attempt refunded"
                );
                let err = VerificationError::Transient {
                    channel: self.channel,
                    message: e.to_string(),
                };
                Err(fail(&mut state, err))
            }
            Err(e) => {
                let locked_at = self.budget.record_failed_verify(&mut state, e.failed_attempts(), now);
                let message = rejection_message(&e, DEFAULT_SEND_FAILURE);
                warn!(
                    channel = %self.channel,
                    attempts = state.resend_attempts,
                    event = "otp_resend_rejected",
                    "OTP resend rejected: {}", message
                );
                self.reject(state, locked_at, VerificationError::Rejected {
                    channel: self.channel,
                    message,
                })
                .await
            }
        }
    }

    /// Type into the code boxes
    ///
    /// See [`crate::domain::entities::CodeBuffer::set`] for paste and clear
    /// semantics. A verified channel ignores input.
    pub async fn set_digit(&self, index: usize, value: &str) -> Result<(), VerificationError> {
        let mut state = self.state.lock().await;
        let err = match state.status {
            ChannelStatus::Verified => return Ok(()),
            ChannelStatus::Sent => {
                state
                    .code
                    .set(index, value)
                    .map_err(|reason| VerificationError::InvalidDigit {
                        channel: self.channel,
                        reason,
                    })?;
                state.error_message = None;
                return Ok(());
            }
            ChannelStatus::Locked => self.locked_error(&state),
            ChannelStatus::Idle => VerificationError::NotSent {
                channel: self.channel,
            },
            ChannelStatus::Expired => VerificationError::Expired {
                channel: self.channel,
            },
            ChannelStatus::Verifying => VerificationError::Busy {
                channel: self.channel,
            },
        };
        Err(err)
    }

    /// Check the typed code with the backend
    ///
    /// Dropping the returned future mid-call puts the channel back in
    /// `Sent` (or `Expired`, if the window closed meanwhile).
    pub async fn verify(&self) -> Result<VerifyOutcome, VerificationError> {
        if self.status().await == ChannelStatus::Verified {
            return Ok(VerifyOutcome::AlreadyVerified);
        }
        let mut guard = self.begin()?;

        let request = {
            let mut state = self.state.lock().await;
            let err = match state.status {
                ChannelStatus::Verified => return Ok(VerifyOutcome::AlreadyVerified),
                ChannelStatus::Sent => None,
                ChannelStatus::Locked => Some(self.locked_error(&state)),
                ChannelStatus::Idle => Some(VerificationError::NotSent {
                    channel: self.channel,
                }),
                ChannelStatus::Expired => Some(VerificationError::Expired {
                    channel: self.channel,
                }),
                ChannelStatus::Verifying => Some(VerificationError::Busy {
                    channel: self.channel,
                }),
            };
            if let Some(err) = err {
                return Err(fail(&mut state, err));
            }
            let Some(code) = state.code.code() else {
                let err = VerificationError::IncompleteCode {
                    channel: self.channel,
                };
                return Err(fail(&mut state, err));
            };
            state.status = ChannelStatus::Verifying;
            guard.arm(Rollback::Verify);
            VerifyOtpRequest {
                fragment: self.fragment(),
                code,
                context: self.origin,
            }
        };

        let result = settle(self.gateway.verify_otp(&request).await);
        let now = self.clock.now();

        let mut state = self.state.lock().await;
        guard.disarm();
        match result {
            Ok(_) => {
                state.status = ChannelStatus::Verified;
                state.error_message = None;
                self.timer.freeze(&mut state);
                drop(state);
                info!(
                    channel = %self.channel,
                    identity = %self.masked(),
                    event = "otp_verified",
                    "OTP verified"
                );
                self.records.mark_verified(self.channel).await;
                Ok(VerifyOutcome::Verified)
            }
            Err(e) if e.is_transient() => {
                return_to_sent(&mut state);
                warn!(
                    channel = %self.channel,
                    error = %e,
                    event = "otp_verify_unavailable",
                    "OTP verify failed with a transient error"
                );
                let err = VerificationError::Transient {
                    channel: self.channel,
                    message: e.to_string(),
                };
                Err(fail(&mut state, err))
            }
            Err(e) => {
                return_to_sent(&mut state);
                let locked_at = self.budget.record_failed_verify(&mut state, e.failed_attempts(), now);
                let message = rejection_message(&e, DEFAULT_VERIFY_FAILURE);
                warn!(
                    channel = %self.channel,
                    failed_attempts = state.failed_attempts,
                    event = "otp_verify_rejected",
                    "OTP verify rejected"
                );
                self.reject(state, locked_at, VerificationError::InvalidCode {
                    channel: self.channel,
                    message,
                })
                .await
            }
        }
    }

    /// Mark the channel verified without code entry
    ///
    /// A code is still requested once in the background; its outcome is
    /// logged and otherwise ignored. Returns false when the channel was
    /// already verified. An identity missing the fields this channel needs
    /// is refused and the channel stays as it was.
    pub async fn bypass(&self) -> Result<bool, VerificationError> {
        {
            let mut state = self.state.lock().await;
            if state.is_verified() {
                return Ok(false);
            }
            if let Err(err) = self.identity.validate_for(self.channel) {
                warn!(
                    channel = %self.channel,
                    error = %err,
                    event = "otp_bypass_refused",
                    "Bypass refused, identity is incomplete"
                );
                return Err(fail(&mut state, err));
            }
            *state = ChannelState::verified();
        }

        info!(
            channel = %self.channel,
            identity = %self.masked(),
            event = "otp_bypassed",
            "Channel marked verified without code entry"
        );

        let gateway = Arc::clone(&self.gateway);
        let request = self.send_request();
        let channel = self.channel;
        tokio::spawn(async move {
            match settle(gateway.send_otp(&request).await) {
                Ok(_) => debug!(channel = %channel, event = "bypass_send_delivered", "Bypass OTP sent"),
                Err(e) => warn!(
                    channel = %channel,
                    error = %e,
                    event = "bypass_send_failed",
                    "Bypass OTP send failed"
                ),
            }
        });

        self.records.mark_verified(self.channel).await;
        Ok(true)
    }

    /// Advance the channel by one scheduler tick
    pub async fn tick(&self) -> TickOutcome {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        match state.status {
            ChannelStatus::Locked => {
                if state.is_locked_at(now) {
                    return TickOutcome::Locked;
                }
                *state = ChannelState::new();
                drop(state);
                info!(
                    channel = %self.channel,
                    identity = %self.masked(),
                    event = "lock_released",
                    "Channel lock elapsed"
                );
                self.lockout.purge().await;
                TickOutcome::LockReleased
            }
            ChannelStatus::Sent | ChannelStatus::Expired => {
                if !ChannelTimer::is_running(&state) {
                    return TickOutcome::Idle;
                }
                if self.timer.tick(&mut state) {
                    info!(channel = %self.channel, event = "otp_expired", "OTP validity window elapsed");
                    return TickOutcome::Expired;
                }
                TickOutcome::Ticked
            }
            _ => TickOutcome::Idle,
        }
    }

    /// Remove this channel's lockout entry
    pub async fn clear_lockout(&self) {
        self.lockout.purge().await;
    }

    fn begin(&self) -> Result<InFlight, VerificationError> {
        let acquired = self.in_flight.send_if_modified(|busy| {
            if *busy {
                return false;
            }
            *busy = true;
            true
        });
        if !acquired {
            debug!(channel = %self.channel, event = "channel_busy", "Call rejected, another is in flight");
            return Err(VerificationError::Busy {
                channel: self.channel,
            });
        }
        Ok(InFlight {
            channel: self.channel,
            flag: Arc::clone(&self.in_flight),
            state: Arc::clone(&self.state),
            budget: self.budget,
            rollback: None,
        })
    }

    /// Surface a backend rejection, locking the channel if the backend says so
    async fn reject<T>(
        &self,
        mut state: tokio::sync::MutexGuard<'_, ChannelState>,
        locked_at: Option<DateTime<Utc>>,
        err: VerificationError,
    ) -> Result<T, VerificationError> {
        let Some(locked_at) = locked_at else {
            return Err(fail(&mut state, err));
        };

        let lock_err = self.locked_error(&state);
        let lock_err = fail(&mut state, lock_err);
        drop(state);
        warn!(
            channel = %self.channel,
            identity = %self.masked(),
            event = "channel_locked",
            "Channel locked after exhausting its attempt budget"
        );
        self.lockout.record(locked_at).await;
        Err(lock_err)
    }

    fn locked_error(&self, state: &ChannelState) -> VerificationError {
        VerificationError::Locked {
            channel: self.channel,
            until: state
                .lock_until
                .unwrap_or_else(|| self.budget.lock_end(self.clock.now())),
        }
    }

    fn fragment(&self) -> IdentityFragment {
        IdentityFragment::for_channel(&self.identity, self.channel)
    }

    fn send_request(&self) -> SendOtpRequest {
        SendOtpRequest {
            fragment: self.fragment(),
            context: self.origin,
        }
    }

    fn masked(&self) -> String {
        self.identity.masked(self.channel)
    }
}

/// Record `err` as the channel's visible error and hand it back
fn fail(state: &mut ChannelState, err: VerificationError) -> VerificationError {
    state.error_message = Some(err.to_string());
    err
}

fn return_to_sent(state: &mut ChannelState) {
    state.status = if state.seconds_remaining == 0 {
        ChannelStatus::Expired
    } else {
        ChannelStatus::Sent
    };
}

/// Treat a `success: false` body like any other rejection
fn settle(result: Result<OtpResponse, GatewayError>) -> Result<OtpResponse, GatewayError> {
    match result {
        Ok(response) if !response.success => Err(GatewayError::Rejected {
            status: 200,
            message: response.message,
            failed_attempts: response.failed_attempts,
        }),
        other => other,
    }
}

fn rejection_message(err: &GatewayError, fallback: &str) -> String {
    match err {
        GatewayError::Rejected { message, .. } if !message.trim().is_empty() => message.clone(),
        _ => fallback.to_string(),
    }
}
