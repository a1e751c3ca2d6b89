//! Domain entities representing core verification objects.

pub mod channel;
pub mod identity;


// Re-export commonly used types
pub use channel::{
    Channel, ChannelState, ChannelStatus, CodeBuffer, CodeInputError, LOCKOUT_HOURS, MAX_RESEND,
    OTP_LENGTH, OTP_VALIDITY_SECONDS, RESEND_COOLDOWN_SECONDS,
};
pub use identity::Identity;
