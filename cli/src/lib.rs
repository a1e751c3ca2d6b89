//! # Vowpath CLI
//!
//! A line-oriented terminal front end for the verification flow. It wires
//! the infrastructure collaborators into a [`VerificationOrchestrator`],
//! runs the shared ticker, and turns typed commands into orchestrator calls.
//!
//! [`VerificationOrchestrator`]: vp_core::services::VerificationOrchestrator

pub mod app;
pub mod args;
pub mod commands;
pub mod render;
pub mod telemetry;

pub use app::{execute, run, Reply};
pub use args::Cli;
pub use commands::{Command, CommandError};
