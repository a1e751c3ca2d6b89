//! REST client for the OTP backend
//!
//! Each channel has its own pair of endpoints below `BackendConfig::base_url`:
//!
//! | operation | email              | phone            |
//! |-----------|--------------------|------------------|
//! | send      | `send-email-otp`   | `send-sms-otp`   |
//! | verify    | `verify-email-otp` | `verify-sms-otp` |
//!
//! Status handling:
//! - transport failure or an unreadable 2xx body → [`GatewayError::Network`]
//! - 5xx → [`GatewayError::Server`]
//! - 4xx → [`GatewayError::Rejected`] carrying the body's message and
//!   `failedAttempts` when present

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use vp_core::domain::entities::Channel;
use vp_core::errors::GatewayError;
use vp_core::services::verification::{
    IdentityFragment, OtpGateway, OtpResponse, SendOtpRequest, VerifyOtpRequest,
};
use vp_shared::config::BackendConfig;
use vp_shared::{email::mask_email, phone::mask_phone_number};

use crate::InfrastructureError;

/// JSON body of every OTP endpoint
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum OtpRequestBody<'a> {
    #[serde(rename_all = "camelCase")]
    Email {
        email: &'a str,
        context: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        otp: Option<&'a str>,
    },
    #[serde(rename_all = "camelCase")]
    Phone {
        country_code: &'a str,
        phone: &'a str,
        context: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        otp: Option<&'a str>,
    },
}

impl<'a> OtpRequestBody<'a> {
    pub(crate) fn new(fragment: &'a IdentityFragment, context: &'static str, otp: Option<&'a str>) -> Self {
        match fragment {
            IdentityFragment::Email(email) => OtpRequestBody::Email {
                email,
                context,
                otp,
            },
            IdentityFragment::Phone {
                country_code,
                number,
            } => OtpRequestBody::Phone {
                country_code,
                phone: number,
                context,
                otp,
            },
        }
    }
}

/// OTP gateway backed by the platform's REST API
pub struct RestOtpGateway {
    client: Client,
    config: BackendConfig,
}

impl RestOtpGateway {
    /// Create a gateway with the configured request timeout
    pub fn new(config: BackendConfig) -> Result<Self, InfrastructureError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;

        info!(base_url = %config.base_url, "REST OTP gateway initialized");

        Ok(Self { client, config })
    }

    fn send_path(channel: Channel) -> &'static str {
        match channel {
            Channel::Email => "send-email-otp",
            Channel::Phone => "send-sms-otp",
        }
    }

    fn verify_path(channel: Channel) -> &'static str {
        match channel {
            Channel::Email => "verify-email-otp",
            Channel::Phone => "verify-sms-otp",
        }
    }

    async fn post(
        &self,
        path: &str,
        body: &OtpRequestBody<'_>,
        destination: &str,
    ) -> Result<OtpResponse, GatewayError> {
        let url = self.config.endpoint(path);
        debug!(url = %url, destination = %destination, "Calling OTP backend");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(url = %url, error = %e, "OTP backend unreachable");
                GatewayError::Network(e.to_string())
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let result = classify_response(status, &text);
        match &result {
            Ok(_) => debug!(url = %url, status = status.as_u16(), "OTP backend answered"),
            Err(e) if e.is_transient() => {
                warn!(url = %url, status = status.as_u16(), error = %e, "OTP backend failed")
            }
            Err(e) => {
                info!(url = %url, status = status.as_u16(), error = %e, "OTP backend rejected request")
            }
        }
        result
    }
}

/// Map an HTTP status and body onto the gateway result
///
/// 2xx bodies are returned as-is, `success: false` included; the channel
/// machine decides what a declined 2xx means.
pub fn classify_response(status: StatusCode, body: &str) -> Result<OtpResponse, GatewayError> {
    if status.is_server_error() {
        return Err(GatewayError::Server {
            status: status.as_u16(),
        });
    }

    if status.is_success() {
        return serde_json::from_str::<OtpResponse>(body)
            .map_err(|e| GatewayError::Network(format!("malformed backend response: {}", e)));
    }

    let parsed = serde_json::from_str::<OtpResponse>(body).ok();
    let message = parsed
        .as_ref()
        .map(|r| r.message.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request rejected")
                .to_string()
        });

    Err(GatewayError::Rejected {
        status: status.as_u16(),
        message,
        failed_attempts: parsed.and_then(|r| r.failed_attempts),
    })
}

fn masked_destination(fragment: &IdentityFragment) -> String {
    match fragment {
        IdentityFragment::Email(email) => mask_email(email),
        IdentityFragment::Phone {
            country_code,
            number,
        } => format!("{} {}", country_code, mask_phone_number(number)),
    }
}

#[async_trait]
impl OtpGateway for RestOtpGateway {
    async fn send_otp(&self, request: &SendOtpRequest) -> Result<OtpResponse, GatewayError> {
        let body = OtpRequestBody::new(&request.fragment, request.context.as_context(), None);
        self.post(
            Self::send_path(request.channel()),
            &body,
            &masked_destination(&request.fragment),
        )
        .await
    }

    async fn verify_otp(&self, request: &VerifyOtpRequest) -> Result<OtpResponse, GatewayError> {
        let body = OtpRequestBody::new(
            &request.fragment,
            request.context.as_context(),
            Some(request.code.as_str()),
        );
        self.post(
            Self::verify_path(request.channel()),
            &body,
            &masked_destination(&request.fragment),
        )
        .await
    }
}

