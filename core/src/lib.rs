//! # Vowpath Core
//!
//! Core verification logic for the Vowpath signup and verify-pending flows.
//! This crate contains the domain entities, the OTP channel state machines,
//! the verification orchestrator, collaborator interfaces and error types.

pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use services::*;
