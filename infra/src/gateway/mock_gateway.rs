//! Mock OTP backend
//!
//! Accepts one fixed development code on every destination and keeps a
//! per-destination count of wrong codes, so lockouts can be exercised
//! without the real backend. Nothing is delivered anywhere.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::{info, warn};

use vp_core::errors::GatewayError;
use vp_core::services::verification::{
    IdentityFragment, OtpGateway, OtpResponse, SendOtpRequest, VerifyOtpRequest,
};
use vp_shared::{email::mask_email, phone::mask_phone_number};

/// In-process OTP backend for development
pub struct MockOtpGateway {
    /// Code every verify call must match
    mock_code: String,
    /// Number of codes "delivered"
    send_count: AtomicU64,
    /// Wrong codes per destination since its last success
    failed_attempts: Mutex<HashMap<String, u32>>,
    /// Answer every call with a 503
    simulate_outage: AtomicBool,
}

impl MockOtpGateway {
    /// Create a mock backend accepting `mock_code`
    pub fn new(mock_code: impl Into<String>) -> Self {
        Self {
            mock_code: mock_code.into(),
            send_count: AtomicU64::new(0),
            failed_attempts: Mutex::new(HashMap::new()),
            simulate_outage: AtomicBool::new(false),
        }
    }

    /// Total number of sends accepted
    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Make every call fail as if the backend were down
    pub fn set_simulate_outage(&self, outage: bool) {
        self.simulate_outage.store(outage, Ordering::SeqCst);
    }

    fn check_outage(&self) -> Result<(), GatewayError> {
        if self.simulate_outage.load(Ordering::SeqCst) {
            warn!(provider = "mock", "Mock OTP backend simulating outage");
            return Err(GatewayError::Server { status: 503 });
        }
        Ok(())
    }

    fn record_failure(&self, destination: &str) -> u32 {
        let mut attempts = self
            .failed_attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let count = attempts.entry(destination.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    fn reset_failures(&self, destination: &str) {
        self.failed_attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(destination);
    }
}

impl Default for MockOtpGateway {
    fn default() -> Self {
        Self::new("123456")
    }
}

fn destination_key(fragment: &IdentityFragment) -> String {
    match fragment {
        IdentityFragment::Email(email) => email.to_lowercase(),
        IdentityFragment::Phone {
            country_code,
            number,
        } => format!("{}{}", country_code, number),
    }
}

fn masked(fragment: &IdentityFragment) -> String {
    match fragment {
        IdentityFragment::Email(email) => mask_email(email),
        IdentityFragment::Phone {
            country_code,
            number,
        } => format!("{} {}", country_code, mask_phone_number(number)),
    }
}

#[async_trait]
impl OtpGateway for MockOtpGateway {
    async fn send_otp(&self, request: &SendOtpRequest) -> Result<OtpResponse, GatewayError> {
        self.check_outage()?;

        let count = self.send_count.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            target: "otp_gateway",
            provider = "mock",
            channel = %request.channel(),
            destination = %masked(&request.fragment),
            context = %request.context,
            count = count,
            "Mock OTP sent"
        );

        Ok(OtpResponse::success(format!(
            "{} OTP sent",
            request.channel().label()
        )))
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<OtpResponse, GatewayError> {
        self.check_outage()?;

        let destination = destination_key(&request.fragment);
        if request.code == self.mock_code {
            self.reset_failures(&destination);
            info!(
                target: "otp_gateway",
                provider = "mock",
                channel = %request.channel(),
                destination = %masked(&request.fragment),
                "Mock OTP verified"
            );
            return Ok(OtpResponse::success(format!(
                "{} verified",
                request.channel().label()
            )));
        }

        let failed = self.record_failure(&destination);
        warn!(
            target: "otp_gateway",
            provider = "mock",
            channel = %request.channel(),
            destination = %masked(&request.fragment),
            failed_attempts = failed,
            "Mock OTP rejected"
        );
        Err(GatewayError::Rejected {
            status: 400,
            message: "Invalid OTP".to_string(),
            failed_attempts: Some(failed),
        })
    }
}
