//! Interactive command parsing
//!
//! One command per input line:
//!
//! ```text
//! send <channel>                 deliver a code
//! resend <channel>               deliver a fresh code (uses the resend budget)
//! digit <channel> <box> <value>  type into box 1-6; several digits paste forward
//! clear <channel> <box>          empty one box
//! code <channel> <digits>        type the whole code from the first box
//! verify <channel>               check the typed code
//! submit                         verify everything required
//! status                         show both channels
//! finish                         forget persisted state once verified
//! help | quit
//! ```

use std::str::FromStr;

use thiserror::Error;
use vp_core::domain::{Channel, OTP_LENGTH};

/// A parsed user command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(Channel),
    Resend(Channel),
    /// Zero-based box index
    Digit {
        channel: Channel,
        index: usize,
        value: String,
    },
    Code {
        channel: Channel,
        digits: String,
    },
    Verify(Channel),
    Submit,
    Status,
    Finish,
    Help,
    Quit,
}

/// Why an input line is not a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}', type 'help' for the list")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("{0}")]
    InvalidChannel(String),

    #[error("box must be a number from 1 to {}", OTP_LENGTH)]
    InvalidBox,
}

pub const HELP: &str = "\
commands:
  send <email|phone>                deliver a code
  resend <email|phone>              deliver a fresh code
  digit <email|phone> <box> <value> type into box 1-6 (several digits paste forward)
  clear <email|phone> <box>         empty one box
  code <email|phone> <digits>       type the whole code
  verify <email|phone>              check the typed code
  submit                            verify everything required
  status                            show both channels
  finish                            forget stored progress once verified
  quit";

fn channel(arg: Option<&str>, usage: &'static str) -> Result<Channel, CommandError> {
    arg.ok_or(CommandError::Usage(usage))?
        .parse()
        .map_err(CommandError::InvalidChannel)
}

fn box_index(arg: Option<&str>, usage: &'static str) -> Result<usize, CommandError> {
    let number: usize = arg
        .ok_or(CommandError::Usage(usage))?
        .parse()
        .map_err(|_| CommandError::InvalidBox)?;
    if number == 0 || number > OTP_LENGTH {
        return Err(CommandError::InvalidBox);
    }
    Ok(number - 1)
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.split_whitespace();
        let Some(name) = parts.next() else {
            return Err(CommandError::Empty);
        };

        let command = match name.to_lowercase().as_str() {
            "send" => Command::Send(channel(parts.next(), "send <channel>")?),
            "resend" => Command::Resend(channel(parts.next(), "resend <channel>")?),
            "digit" => {
                const USAGE: &str = "digit <channel> <box> <value>";
                let channel = channel(parts.next(), USAGE)?;
                let index = box_index(parts.next(), USAGE)?;
                let value = parts.next().ok_or(CommandError::Usage(USAGE))?;
                Command::Digit {
                    channel,
                    index,
                    value: value.to_string(),
                }
            }
            "clear" => {
                const USAGE: &str = "clear <channel> <box>";
                Command::Digit {
                    channel: channel(parts.next(), USAGE)?,
                    index: box_index(parts.next(), USAGE)?,
                    value: String::new(),
                }
            }
            "code" => {
                const USAGE: &str = "code <channel> <digits>";
                let channel = channel(parts.next(), USAGE)?;
                let digits = parts.next().ok_or(CommandError::Usage(USAGE))?;
                Command::Code {
                    channel,
                    digits: digits.to_string(),
                }
            }
            "verify" => Command::Verify(channel(parts.next(), "verify <channel>")?),
            "submit" => Command::Submit,
            "status" | "s" => Command::Status,
            "finish" => Command::Finish,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_channel_commands() {
        assert_eq!("send email".parse(), Ok(Command::Send(Channel::Email)));
        assert_eq!("RESEND mobile".parse(), Ok(Command::Resend(Channel::Phone)));
        assert_eq!("verify sms".parse(), Ok(Command::Verify(Channel::Phone)));
    }

    #[test]
    fn test_digit_box_is_one_based() {
        assert_eq!(
            "digit phone 1 7".parse(),
            Ok(Command::Digit {
                channel: Channel::Phone,
                index: 0,
                value: "7".to_string()
            })
        );
        assert_eq!("digit phone 0 7".parse::<Command>(), Err(CommandError::InvalidBox));
        assert_eq!("digit phone 7 7".parse::<Command>(), Err(CommandError::InvalidBox));
    }

    #[test]
    fn test_clear_types_empty_value() {
        assert_eq!(
            "clear email 6".parse(),
            Ok(Command::Digit {
                channel: Channel::Email,
                index: 5,
                value: String::new()
            })
        );
    }

    #[test]
    fn test_missing_arguments_report_usage() {
        assert_eq!(
            "code email".parse::<Command>(),
            Err(CommandError::Usage("code <channel> <digits>"))
        );
        assert_eq!("send".parse::<Command>(), Err(CommandError::Usage("send <channel>")));
    }

    #[test]
    fn test_unknown_and_empty_lines() {
        assert_eq!("   ".parse::<Command>(), Err(CommandError::Empty));
        assert!(matches!(
            "launch".parse::<Command>(),
            Err(CommandError::Unknown(name)) if name == "launch"
        ));
        assert!(matches!(
            "send fax".parse::<Command>(),
            Err(CommandError::InvalidChannel(_))
        ));
    }
}
