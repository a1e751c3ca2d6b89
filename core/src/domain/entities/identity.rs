//! Identity being verified during signup or verify-pending login.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use vp_shared::utils::{email, phone};

use super::channel::Channel;
use crate::errors::VerificationError;

/// Email and optional phone of the person signing up
///
/// Only used to derive stable keys and backend destinations; a changed
/// email or phone is a different identity with fresh channel state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub phone: String,
}

impl Identity {
    /// Create an identity with email and phone
    pub fn new(
        email: impl Into<String>,
        country_code: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            country_code: country_code.into(),
            phone: phone.into(),
        }
    }

    /// Create an identity without a phone number
    pub fn email_only(email: impl Into<String>) -> Self {
        Self::new(email, "", "")
    }

    /// Whether a phone number was provided
    pub fn has_phone(&self) -> bool {
        !phone::normalize_phone_number(&self.phone).is_empty()
    }

    /// Whether the phone's dial code is the platform's home region
    pub fn is_default_region(&self, default_region: &str) -> bool {
        phone::normalize_dial_code(&self.country_code) == phone::normalize_dial_code(default_region)
    }

    /// Digest keying the persisted verification record
    ///
    /// Hex SHA-256 over the normalized email, dial code and phone, so any
    /// change to either channel's address yields a new key.
    pub fn verification_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(email::normalize_email(&self.email).as_bytes());
        hasher.update(b"|");
        hasher.update(phone::normalize_dial_code(&self.country_code).as_bytes());
        hasher.update(b"|");
        hasher.update(phone::normalize_phone_number(&self.phone).as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Raw identity string keying a channel's lockout record
    pub fn lockout_key(&self, channel: Channel) -> String {
        match channel {
            Channel::Email => email::normalize_email(&self.email),
            Channel::Phone => phone::to_e164(&self.country_code, &self.phone),
        }
    }

    /// Masked address for logs
    pub fn masked(&self, channel: Channel) -> String {
        match channel {
            Channel::Email => email::mask_email(&self.email),
            Channel::Phone => phone::mask_phone_number(&self.lockout_key(Channel::Phone)),
        }
    }

    /// Check the fields a channel needs before anything is sent
    pub fn validate_for(&self, channel: Channel) -> Result<(), VerificationError> {
        match channel {
            Channel::Email => {
                if self.email.trim().is_empty() {
                    return Err(VerificationError::MissingField {
                        field: "email".to_string(),
                    });
                }
                if !email::is_valid_email(&self.email) {
                    return Err(VerificationError::InvalidFormat {
                        field: "email".to_string(),
                    });
                }
            }
            Channel::Phone => {
                if !self.has_phone() {
                    return Err(VerificationError::MissingField {
                        field: "phone".to_string(),
                    });
                }
                if self.country_code.trim().is_empty() {
                    return Err(VerificationError::MissingField {
                        field: "countryCode".to_string(),
                    });
                }
                if !phone::is_valid_dial_code(&self.country_code)
                    || !phone::is_valid_national_number(&self.phone)
                    || !phone::is_valid_international_phone(&self.lockout_key(Channel::Phone))
                {
                    return Err(VerificationError::InvalidFormat {
                        field: "phone".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
