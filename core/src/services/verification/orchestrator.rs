//! Verification orchestrator
//!
//! Owns the email and phone [`ChannelMachine`]s of one identity, applies the
//! regional phone bypass, and decides whether the user may proceed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::entities::{Channel, ChannelStatus, Identity};
use crate::domain::value_objects::VerificationSnapshot;
use crate::errors::{ChannelFailure, DomainError, DomainResult, VerificationError};

use super::channel::ChannelMachine;
use super::config::VerificationServiceConfig;
use super::persistence::VerificationRecordKeeper;
use super::types::{
    InitReport, Origin, ResendOutcome, SendOutcome, VerificationDeps, VerifyOutcome,
};

/// Coordinates both channels of one verification session
pub struct VerificationOrchestrator {
    session_id: Uuid,
    identity: Identity,
    origin: Origin,
    config: VerificationServiceConfig,
    records: Arc<VerificationRecordKeeper>,
    email: ChannelMachine,
    phone: ChannelMachine,
    requires_phone_otp: bool,
    auto_send_fired: AtomicBool,
}

impl VerificationOrchestrator {
    /// Create an orchestrator for `identity`
    ///
    /// Nothing is read or sent until [`initialize`](Self::initialize).
    pub fn new(
        identity: Identity,
        origin: Origin,
        config: VerificationServiceConfig,
        deps: VerificationDeps,
    ) -> Self {
        let records = Arc::new(VerificationRecordKeeper::new(
            Arc::clone(&deps.records),
            identity.verification_key(),
            config.record_ttl,
        ));
        let email = ChannelMachine::new(
            Channel::Email,
            identity.clone(),
            origin,
            &config,
            &deps,
            Arc::clone(&records),
        );
        let phone = ChannelMachine::new(
            Channel::Phone,
            identity.clone(),
            origin,
            &config,
            &deps,
            Arc::clone(&records),
        );
        let requires_phone_otp =
            identity.has_phone() && identity.is_default_region(&config.default_region);

        Self {
            session_id: Uuid::new_v4(),
            identity,
            origin,
            config,
            records,
            email,
            phone,
            requires_phone_otp,
            auto_send_fired: AtomicBool::new(false),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether the phone channel needs a typed code
    pub fn requires_phone_otp(&self) -> bool {
        self.requires_phone_otp
    }

    /// Machine driving `channel`
    pub fn channel(&self, channel: Channel) -> &ChannelMachine {
        match channel {
            Channel::Email => &self.email,
            Channel::Phone => &self.phone,
        }
    }

    /// Restore persisted state, apply the phone bypass, and auto-send on a resumed login
    ///
    /// Safe to call repeatedly: restoring only touches idle channels and the
    /// resumed-login auto-send fires at most once per orchestrator.
    pub async fn initialize(&self) -> Result<InitReport, VerificationError> {
        if self.identity.email.trim().is_empty() {
            return Err(VerificationError::MissingField {
                field: "email".to_string(),
            });
        }

        let mut report = InitReport::default();
        let record = self.records.load().await;

        for channel in Channel::ALL {
            match self.channel(channel).restore(&record).await {
                ChannelStatus::Verified if record.is_verified(channel) => {
                    report.restored.push(channel)
                }
                ChannelStatus::Locked => report.locked.push(channel),
                _ => {}
            }
        }

        if self.identity.has_phone() && !self.requires_phone_otp {
            match self.phone.bypass().await {
                Ok(bypassed) => report.bypassed = bypassed,
                Err(e) => {
                    warn!(
                        session_id = %self.session_id,
                        channel = %Channel::Phone,
                        error = %e,
                        event = "phone_bypass_refused",
                        "Phone bypass refused"
                    );
                    report.failures.push(ChannelFailure::new(Channel::Phone, e.to_string()));
                }
            }
        }

        if self.origin == Origin::ResumedLogin
            && !self.is_ready().await
            && !self.auto_send_fired.swap(true, Ordering::SeqCst)
        {
            self.auto_send(&mut report).await;
        }

        info!(
            session_id = %self.session_id,
            origin = %self.origin,
            restored = report.restored.len(),
            locked = report.locked.len(),
            bypassed = report.bypassed,
            auto_sent = report.auto_sent.len(),
            requires_phone_otp = self.requires_phone_otp,
            event = "verification_initialized",
            "Verification session initialized"
        );
        Ok(report)
    }

    async fn auto_send(&self, report: &mut InitReport) {
        let email_due = self.email.status().await == ChannelStatus::Idle;
        let phone_due =
            self.requires_phone_otp && self.phone.status().await == ChannelStatus::Idle;

        let (email, phone) = tokio::join!(
            async {
                if email_due {
                    Some(self.email.send().await)
                } else {
                    None
                }
            },
            async {
                if phone_due {
                    Some(self.phone.send().await)
                } else {
                    None
                }
            }
        );

        for (channel, result) in [(Channel::Email, email), (Channel::Phone, phone)] {
            match result {
                Some(Ok(SendOutcome::Sent { .. })) => report.auto_sent.push(channel),
                Some(Ok(_)) | None => {}
                Some(Err(e)) => {
                    warn!(
                        session_id = %self.session_id,
                        channel = %channel,
                        error = %e,
                        event = "auto_send_failed",
                        "Automatic OTP send failed"
                    );
                    report.failures.push(ChannelFailure::new(channel, e.to_string()));
                }
            }
        }
    }

    /// First delivery on `channel`
    ///
    /// On an exempt phone region the phone channel is bypassed instead of
    /// entering `Sent`, provided the dial code and number are well formed.
    pub async fn send_for(&self, channel: Channel) -> Result<SendOutcome, VerificationError> {
        if channel == Channel::Phone && self.identity.has_phone() && !self.requires_phone_otp {
            return Ok(if self.phone.bypass().await? {
                SendOutcome::Bypassed
            } else {
                SendOutcome::AlreadyVerified
            });
        }
        self.channel(channel).send().await
    }

    /// Fresh delivery on `channel`, charged to its resend budget
    pub async fn resend_for(&self, channel: Channel) -> Result<ResendOutcome, VerificationError> {
        self.channel(channel).resend().await
    }

    /// Type into `channel`'s code boxes
    pub async fn set_digit(
        &self,
        channel: Channel,
        index: usize,
        value: &str,
    ) -> Result<(), VerificationError> {
        self.channel(channel).set_digit(index, value).await
    }

    /// Verify `channel`'s typed code
    pub async fn verify_for(&self, channel: Channel) -> Result<VerifyOutcome, VerificationError> {
        self.channel(channel).verify().await
    }

    /// Complete verification
    ///
    /// Waits for outstanding calls, then verifies email and, when required,
    /// phone. Channels that end verified stay verified even when the other
    /// fails.
    pub async fn submit(&self) -> Result<(), VerificationError> {
        tokio::join!(self.email.wait_idle(), self.phone.wait_idle());

        let mut failures = Vec::new();
        if let Err(e) = self.email.verify().await {
            failures.push(ChannelFailure::new(Channel::Email, e.to_string()));
        }

        if self.requires_phone_otp {
            if let Err(e) = self.phone.verify().await {
                failures.push(ChannelFailure::new(Channel::Phone, e.to_string()));
            }
        } else if self.identity.has_phone() {
            if self.phone.status().await != ChannelStatus::Verified {
                let err = self
                    .identity
                    .validate_for(Channel::Phone)
                    .err()
                    .unwrap_or(VerificationError::NotSent {
                        channel: Channel::Phone,
                    });
                failures.push(ChannelFailure::new(Channel::Phone, err.to_string()));
            }
        } else if self.config.require_phone {
            let err = VerificationError::MissingField {
                field: "phone".to_string(),
            };
            failures.push(ChannelFailure::new(Channel::Phone, err.to_string()));
        }

        if !failures.is_empty() {
            warn!(
                session_id = %self.session_id,
                failures = failures.len(),
                event = "submit_rejected",
                "Verification submit rejected"
            );
            return Err(VerificationError::SubmitRejected { failures });
        }

        info!(session_id = %self.session_id, event = "submit_accepted", "Verification complete");
        Ok(())
    }

    /// Whether every required channel is verified
    pub async fn is_ready(&self) -> bool {
        if self.email.status().await != ChannelStatus::Verified {
            return false;
        }
        if self.identity.has_phone() {
            self.phone.status().await == ChannelStatus::Verified
        } else {
            !self.config.require_phone
        }
    }

    /// Render state of both channels
    pub async fn snapshot(&self) -> VerificationSnapshot {
        let (email, phone) = tokio::join!(self.email.snapshot(), self.phone.snapshot());
        VerificationSnapshot {
            email,
            phone,
            requires_phone_otp: self.requires_phone_otp,
            ready: self.is_ready().await,
        }
    }

    /// Advance both channels by one second
    ///
    /// Returns false once there is nothing left to tick.
    pub async fn tick(&self) -> bool {
        tokio::join!(self.email.tick(), self.phone.tick());
        !self.is_ready().await
    }

    /// End the session and forget everything persisted for this identity
    pub async fn finish(&self) -> DomainResult<()> {
        if !self.is_ready().await {
            return Err(DomainError::BusinessRule {
                message: "verification is not complete".to_string(),
            });
        }

        self.records
            .clear()
            .await
            .map_err(|message| VerificationError::Persistence { message })?;
        tokio::join!(self.email.clear_lockout(), self.phone.clear_lockout());

        info!(session_id = %self.session_id, event = "verification_finished", "Verification records cleared");
        Ok(())
    }
}
