//! OTP backend gateways
//!
//! [`RestOtpGateway`] talks to the platform's `send-*-otp` / `verify-*-otp`
//! endpoints; [`MockOtpGateway`] answers in-process for development.

mod mock_gateway;
mod rest_gateway;

#[cfg(test)]
mod tests;

pub use mock_gateway::MockOtpGateway;
pub use rest_gateway::{classify_response, RestOtpGateway};
