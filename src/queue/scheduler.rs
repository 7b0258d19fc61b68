//! Background task that runs a sweep on a fixed interval
//!
//! Sweeps run inline on the scheduler task, so two sweeps never overlap.
//! Shutdown is observed between sweeps only; a sweep in progress finishes.

use crate::error::Result;
use crate::queue::engine::SweepReport;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Something the scheduler can sweep
pub trait SweepTarget: Send + Sync + 'static {
    fn run_sweep(&self) -> Result<SweepReport>;

    /// Called when a sweep returned an error or panicked
    fn record_sweep_failure(&self) {}
}

/// Handle to a running sweep loop
pub struct SweepScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl SweepScheduler {
    /// Spawn the sweep loop on the current tokio runtime
    pub fn spawn(target: Arc<dyn SweepTarget>, sweep_interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(target, sweep_interval, shutdown_rx));

        info!("Sweep scheduler started ({:?} interval)", sweep_interval);
        Self {
            shutdown_tx,
            handle,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signal the loop and wait for the current sweep (if any) to finish
    pub async fn shutdown(self) {
        if self.shutdown_tx.send(true).is_err() {
            debug!("Sweep loop already exited");
        }

        match self.handle.await {
            Ok(()) => info!("Sweep scheduler stopped"),
            Err(e) => warn!("Sweep scheduler task ended abnormally: {}", e),
        }
    }
}

async fn run_loop(
    target: Arc<dyn SweepTarget>,
    sweep_interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(sweep_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        if *shutdown_rx.borrow() {
            break;
        }

        match catch_unwind(AssertUnwindSafe(|| target.run_sweep())) {
            Ok(Ok(report)) => {
                if report.is_idle() {
                    debug!(
                        "Sweep completed in {:?}, {} waiting",
                        report.duration, report.remaining
                    );
                }
            }
            Ok(Err(e)) => {
                warn!("Sweep failed: {}", e);
                target.record_sweep_failure();
            }
            Err(_) => {
                error!("Sweep panicked, continuing on the next tick");
                target.record_sweep_failure();
            }
        }
    }

    debug!("Sweep loop exiting");
}
