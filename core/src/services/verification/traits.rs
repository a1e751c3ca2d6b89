//! Collaborator interfaces consumed by the orchestrator

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vp_shared::OtpApiResponse;

use crate::domain::value_objects::VerificationRecord;
use crate::errors::GatewayError;

use super::types::{SendOtpRequest, VerifyOtpRequest};

/// Response envelope of the OTP backend
pub type OtpResponse = OtpApiResponse;

/// Remote service that delivers and checks one-time passwords
#[async_trait]
pub trait OtpGateway: Send + Sync {
    /// Ask the backend to deliver a code to the request's destination
    async fn send_otp(&self, request: &SendOtpRequest) -> Result<OtpResponse, GatewayError>;
    /// Check a typed code
    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<OtpResponse, GatewayError>;
}

/// Keyed, TTL-capable store of verification records
#[async_trait]
pub trait VerificationStore: Send + Sync {
    /// Store a record that expires after `ttl`
    async fn persist_verification(
        &self,
        key: &str,
        record: &VerificationRecord,
        ttl: Duration,
    ) -> Result<(), String>;
    /// Read a record, `None` when absent or expired
    async fn read_verification(&self, key: &str) -> Result<Option<VerificationRecord>, String>;
    /// Remove a record
    async fn clear_verification(&self, key: &str) -> Result<(), String>;
}

/// Keyed store of lock start timestamps
#[async_trait]
pub trait LockoutStore: Send + Sync {
    /// Record when a lock started
    async fn persist_lockout(&self, key: &str, locked_at: DateTime<Utc>) -> Result<(), String>;
    /// Read a lock start, `None` when absent
    async fn read_lockout(&self, key: &str) -> Result<Option<DateTime<Utc>>, String>;
    /// Remove a lock entry
    async fn clear_lockout(&self, key: &str) -> Result<(), String>;
}

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
