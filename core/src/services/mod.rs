//! Business services containing domain logic and use cases.

pub mod verification;

// Re-export commonly used types
pub use verification::{
    spawn_ticker, Clock, InitReport, LockoutStore, ManualClock, Origin, OtpGateway,
    SystemClock, VerificationDeps, VerificationOrchestrator, VerificationServiceConfig,
    VerificationStore,
};
