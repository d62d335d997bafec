//! Periodic run loop

use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wardensync_sync::metrics::{record_cycle, set_consecutive_failures};

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Single cycle requested and done
    Completed,
    Shutdown,
    FailureThreshold,
}

#[derive(Debug, Clone)]
pub struct RunLoop {
    pub interval: Duration,
    pub max_failures: u32,
    pub once: bool,
}

impl RunLoop {
    /// Run `cycle` until shutdown, until the failure threshold is reached,
    /// or once when `once` is set. `cycle` resolves to `true` on success.
    ///
    /// A cycle in flight is never interrupted; only the sleep between cycles is.
    pub async fn run<F, Fut>(&self, shutdown: CancellationToken, mut cycle: F) -> LoopExit
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        let max_failures = self.max_failures.max(1);
        let mut failures: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                return LoopExit::Shutdown;
            }

            let started = Instant::now();
            let success = cycle().await;
            record_cycle(success, started.elapsed());

            if success {
                if failures > 0 {
                    info!(previous_failures = failures, "Sync recovered");
                }
                failures = 0;
            } else {
                failures += 1;
                warn!(
                    consecutive_failures = failures,
                    max_failures, "Sync cycle failed"
                );
            }
            set_consecutive_failures(failures);

            if failures >= max_failures {
                error!(
                    consecutive_failures = failures,
                    "Too many consecutive failures, giving up"
                );
                return LoopExit::FailureThreshold;
            }
            if self.once {
                return LoopExit::Completed;
            }

            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping sync loop");
                    return LoopExit::Shutdown;
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
