// src/scheduler.rs
//! Top-level run loop: repeat the scan cycle forever on a fixed interval,
//! isolating each cycle's failures from the next.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::scan::Scanner;

/// Pause before retrying after a cycle dies unexpectedly.
const RECOVERY_PAUSE: Duration = Duration::from_secs(60);

/// Drive the scanner until the process receives an interrupt. Each cycle
/// runs in its own task so a panic surfaces as a `JoinError` here instead of
/// taking the process down; the loop logs it and retries after a short
/// recovery pause. Shutdown is observed at the sleep boundary between
/// cycles.
pub async fn run_until_shutdown(scanner: Scanner, scan_interval: Duration) {
    let scanner = Arc::new(scanner);

    loop {
        let cycle = {
            let scanner = scanner.clone();
            tokio::spawn(async move { scanner.run_cycle().await })
        };

        let pause = match cycle.await {
            Ok(report) => {
                info!(
                    new_items = report.new_items,
                    queued = report.queued,
                    notified = report.notified,
                    next_scan_secs = scan_interval.as_secs(),
                    "scan cycle complete"
                );
                scan_interval
            }
            Err(e) => {
                error!(error = %e, recovery_secs = RECOVERY_PAUSE.as_secs(), "scan cycle aborted unexpectedly");
                RECOVERY_PAUSE
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping");
                return;
            }
            _ = tokio::time::sleep(pause) => {}
        }
    }
}
