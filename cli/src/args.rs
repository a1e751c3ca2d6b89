//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use vp_core::domain::Identity;
use vp_core::services::Origin;

/// Verify a signup's email address and mobile number with one-time codes.
#[derive(Parser, Debug)]
#[command(name = "vowpath")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Email address to verify.
    #[arg(long, short)]
    pub email: String,

    /// Dial code of the mobile number, e.g. +91.
    #[arg(long, default_value = "")]
    pub country_code: String,

    /// Mobile number without the dial code.
    #[arg(long, short, default_value = "")]
    pub phone: String,

    /// Resume a login whose account is still pending verification.
    #[arg(long)]
    pub resume: bool,

    /// Override the configured log level.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Identity under verification
    pub fn identity(&self) -> Identity {
        Identity::new(
            self.email.trim(),
            self.country_code.trim(),
            self.phone.trim(),
        )
    }

    pub fn origin(&self) -> Origin {
        if self.resume {
            Origin::ResumedLogin
        } else {
            Origin::FreshSignup
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_identity() {
        let cli = Cli::try_parse_from([
            "vowpath",
            "--email",
            " a@b.com ",
            "--country-code",
            "+91",
            "--phone",
            "9876543210",
            "--resume",
        ])
        .unwrap();

        assert_eq!(cli.identity(), Identity::new("a@b.com", "+91", "9876543210"));
        assert_eq!(cli.origin(), Origin::ResumedLogin);
    }

    #[test]
    fn test_phone_defaults_to_absent() {
        let cli = Cli::try_parse_from(["vowpath", "-e", "a@b.com"]).unwrap();
        assert!(!cli.identity().has_phone());
        assert_eq!(cli.origin(), Origin::FreshSignup);
    }
}
