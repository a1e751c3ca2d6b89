//! Tests for the OTP backend gateways
