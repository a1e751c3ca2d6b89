//! Value objects representing immutable domain concepts.

pub mod snapshot;
pub mod verification_record;

// Re-export commonly used types
pub use snapshot::{ChannelSnapshot, VerificationSnapshot};
pub use verification_record::VerificationRecord;
