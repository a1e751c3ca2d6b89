//! Session wiring and command dispatch

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use vp_core::errors::{DomainError, VerificationError};
use vp_core::services::verification::{
    spawn_ticker, ResendOutcome, SendOutcome, VerificationOrchestrator,
    VerificationServiceConfig, VerifyOutcome, TICK_PERIOD,
};

use crate::args::Cli;
use crate::commands::{Command, HELP};
use crate::render::render_snapshot;

/// What to show after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A one-line result, followed by the refreshed status
    Message(String),
    /// Only the refreshed status
    Status,
    /// Static text
    Text(&'static str),
    /// Leave the session
    Quit,
}

/// Run one command against the orchestrator
pub async fn execute(
    orchestrator: &VerificationOrchestrator,
    command: Command,
) -> Result<Reply, DomainError> {
    let reply = match command {
        Command::Send(channel) => match orchestrator.send_for(channel).await? {
            SendOutcome::Sent { message } => Reply::Message(message),
            SendOutcome::AlreadyVerified => {
                Reply::Message(format!("{} is already verified", channel.label()))
            }
            SendOutcome::Bypassed => Reply::Message(format!(
                "{} verified without a code for this region",
                channel.label()
            )),
        },
        Command::Resend(channel) => match orchestrator.resend_for(channel).await? {
            ResendOutcome::Sent {
                remaining, warning, ..
            } => Reply::Message(match warning {
                Some(warning) => warning,
                None => format!(
                    "New {} code sent, {} resend(s) left",
                    channel.label(),
                    remaining
                ),
            }),
            ResendOutcome::AlreadyVerified => {
                Reply::Message(format!("{} is already verified", channel.label()))
            }
        },
        Command::Digit {
            channel,
            index,
            value,
        } => {
            orchestrator.set_digit(channel, index, &value).await?;
            Reply::Status
        }
        Command::Code { channel, digits } => {
            orchestrator.set_digit(channel, 0, &digits).await?;
            Reply::Status
        }
        Command::Verify(channel) => match orchestrator.verify_for(channel).await? {
            VerifyOutcome::Verified => Reply::Message(format!("{} verified", channel.label())),
            VerifyOutcome::AlreadyVerified => {
                Reply::Message(format!("{} is already verified", channel.label()))
            }
        },
        Command::Submit => {
            orchestrator.submit().await?;
            Reply::Message("Verification complete".to_string())
        }
        Command::Status => Reply::Status,
        Command::Finish => {
            orchestrator.finish().await?;
            Reply::Quit
        }
        Command::Help => Reply::Text(HELP),
        Command::Quit => Reply::Quit,
    };
    Ok(reply)
}

/// Load configuration, build the orchestrator and serve commands from stdin
pub async fn run(cli: Cli) -> Result<()> {
    let mut config = vp_infra::load_config(cli.config.as_deref())
        .context("failed to load configuration")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    crate::telemetry::init(&config.logging)?;

    info!("vowpath v{}", env!("CARGO_PKG_VERSION"));

    let services = vp_infra::initialize(&config)
        .await
        .context("failed to initialize infrastructure")?;
    let service_config = VerificationServiceConfig::from(&config.verification);
    let max_resend = service_config.max_resend;

    let orchestrator = Arc::new(VerificationOrchestrator::new(
        cli.identity(),
        cli.origin(),
        service_config,
        services.deps,
    ));

    let report = orchestrator
        .initialize()
        .await
        .map_err(DomainError::from)
        .context("cannot start verification")?;
    for failure in &report.failures {
        println!("{}: {}", failure.channel.label(), failure.message);
    }

    let ticker = spawn_ticker(&orchestrator, TICK_PERIOD);
    println!("{}", render_snapshot(&orchestrator.snapshot().await, max_resend));
    println!("type 'help' for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match execute(&orchestrator, command).await {
            Ok(Reply::Quit) => break,
            Ok(Reply::Text(text)) => println!("{}", text),
            Ok(Reply::Message(message)) => {
                println!("{}", message);
                println!("{}", render_snapshot(&orchestrator.snapshot().await, max_resend));
            }
            Ok(Reply::Status) => {
                println!("{}", render_snapshot(&orchestrator.snapshot().await, max_resend));
            }
            Err(e) => {
                warn!(error = %e, "Command failed");
                println!("{}", user_message(&e));
            }
        }
    }

    ticker.abort();
    if let Some(sweeper) = services.sweeper {
        sweeper.abort();
    }
    info!(session_id = %orchestrator.session_id(), "Session closed");
    Ok(())
}

/// Message shown to the user for a failed command
pub fn user_message(error: &DomainError) -> String {
    match error {
        DomainError::Verification(VerificationError::SubmitRejected { failures }) => failures
            .iter()
            .map(|f| format!("{}: {}", f.channel.label(), f.message))
            .collect::<Vec<_>>()
            .join("\n"),
        DomainError::Verification(e) => e.to_string(),
        other => other.to_string(),
    }
}
