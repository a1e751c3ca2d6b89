//! Common type definitions

pub mod response;

pub use response::OtpApiResponse;
