//! Identity field utilities

pub mod email;
pub mod phone;

// Re-export commonly used utilities
pub use email::*;
pub use phone::*;
