//! Plain-text rendering of verification snapshots

use std::fmt::Write;

use vp_core::domain::{ChannelSnapshot, ChannelStatus, VerificationSnapshot};

/// `m:ss`
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// One status line for a channel, plus its error line when set
pub fn render_channel(snapshot: &ChannelSnapshot, max_resend: u32) -> String {
    let mut line = format!(
        "{:<6} [{}]",
        snapshot.channel.label(),
        snapshot.status
    );

    match snapshot.status {
        ChannelStatus::Sent | ChannelStatus::Verifying => {
            let _ = write!(
                line,
                "  code {}  expires in {}",
                snapshot.code,
                format_countdown(snapshot.seconds_remaining)
            );
        }
        ChannelStatus::Expired => line.push_str("  code expired"),
        ChannelStatus::Locked => {
            if let Some(until) = snapshot.lock_until {
                let _ = write!(line, "  locked until {}", until.format("%Y-%m-%d %H:%M UTC"));
            }
        }
        ChannelStatus::Idle | ChannelStatus::Verified => {}
    }

    if matches!(snapshot.status, ChannelStatus::Sent | ChannelStatus::Expired) {
        if snapshot.resend_cooldown_seconds > 0 {
            let _ = write!(
                line,
                "  resend in {}",
                format_countdown(snapshot.resend_cooldown_seconds)
            );
        } else if snapshot.can_resend {
            line.push_str("  resend available");
        }
        let _ = write!(line, "  resends {}/{}", snapshot.resend_attempts, max_resend);
    }

    if let Some(error) = &snapshot.error_message {
        let _ = write!(line, "\n       ! {}", error);
    }
    line
}

/// Both channels and the overall verdict
pub fn render_snapshot(snapshot: &VerificationSnapshot, max_resend: u32) -> String {
    let mut out = render_channel(&snapshot.email, max_resend);
    out.push('\n');

    if snapshot.requires_phone_otp || snapshot.phone.status != ChannelStatus::Idle {
        out.push_str(&render_channel(&snapshot.phone, max_resend));
        out.push('\n');
    }

    out.push_str(if snapshot.ready {
        "Ready: yes, type 'finish' to complete"
    } else {
        "Ready: no"
    });
    out
}
