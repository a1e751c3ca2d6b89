//! OTP backend response envelope

use serde::{Deserialize, Serialize};

/// Body returned by the `send-*-otp` and `verify-*-otp` endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpApiResponse {
    /// Whether the backend accepted the request
    #[serde(default)]
    pub success: bool,

    /// Human-readable message for the user
    #[serde(default)]
    pub message: String,

    /// Cumulative failed attempts the backend has recorded for this channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_attempts: Option<u32>,
}

impl OtpApiResponse {
    /// Create a successful response
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            failed_attempts: None,
        }
    }

    /// Create a failed response
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            failed_attempts: None,
        }
    }

    /// Attach the backend's failed attempt count
    pub fn with_failed_attempts(mut self, failed_attempts: u32) -> Self {
        self.failed_attempts = Some(failed_attempts);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_body() {
        let body = r#"{"success": false, "message": "Invalid OTP", "failedAttempts": 2}"#;
        let response: OtpApiResponse = serde_json::from_str(body).unwrap();
        assert!(!response.success);
        assert_eq!(response.message, "Invalid OTP");
        assert_eq!(response.failed_attempts, Some(2));
    }

    #[test]
    fn test_missing_fields_default() {
        let response: OtpApiResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(response.success);
        assert!(response.message.is_empty());
        assert!(response.failed_attempts.is_none());
    }

    #[test]
    fn test_failed_attempts_omitted_when_absent() {
        let json = serde_json::to_string(&OtpApiResponse::success("sent")).unwrap();
        assert!(!json.contains("failedAttempts"));
    }
}
