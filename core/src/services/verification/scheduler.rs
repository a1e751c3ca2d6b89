//! Shared one-second ticker

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

use super::orchestrator::VerificationOrchestrator;

/// Default tick period
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Tick both channels of `orchestrator` every `period`
///
/// The task holds only a weak reference and stops when the orchestrator is
/// dropped or nothing is left to count down.
pub fn spawn_ticker(
    orchestrator: &Arc<VerificationOrchestrator>,
    period: Duration,
) -> JoinHandle<()> {
    let session_id = orchestrator.session_id();
    let orchestrator = Arc::downgrade(orchestrator);

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(orchestrator) = orchestrator.upgrade() else {
                debug!(session_id = %session_id, event = "ticker_orphaned", "Orchestrator dropped, ticker stopping");
                break;
            };
            if !orchestrator.tick().await {
                debug!(session_id = %session_id, event = "ticker_done", "All channels settled, ticker stopping");
                break;
            }
        }
    })
}
