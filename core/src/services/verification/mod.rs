//! Multi-channel OTP verification
//!
//! This module provides the verification workflow used during signup and
//! verify-pending login:
//! - Per-channel countdown and resend budget with 24h lockout
//! - Email and phone channel state machines over a remote OTP backend
//! - Persistence of verified channels and lockouts across reloads
//! - An orchestrator that applies the regional phone bypass and decides readiness

mod budget;
mod channel;
mod clock;
mod config;
mod orchestrator;
mod persistence;
mod scheduler;
mod timer;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use budget::ResendBudget;
pub use channel::ChannelMachine;
pub use clock::{ManualClock, SystemClock};
pub use config::VerificationServiceConfig;
pub use orchestrator::VerificationOrchestrator;
pub use persistence::{LockoutTracker, VerificationRecordKeeper};
pub use scheduler::{spawn_ticker, TICK_PERIOD};
pub use timer::ChannelTimer;
pub use traits::{Clock, LockoutStore, OtpGateway, OtpResponse, VerificationStore};
pub use types::{
    IdentityFragment, InitReport, Origin, ResendOutcome, SendOtpRequest, SendOutcome,
    TickOutcome, VerificationDeps, VerifyOtpRequest, VerifyOutcome,
};
