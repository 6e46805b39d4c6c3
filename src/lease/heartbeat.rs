//! # Lease Heartbeat
//!
//! Keeps a lease alive while a long-running action executes under it. The
//! heartbeat renews every [`LeaseConfig::heartbeat_interval`] on its own tokio
//! task and only shares the [`LeaseHandle`] with the foreground flow.
//!
//! [`LeaseConfig::heartbeat_interval`]: crate::config::LeaseConfig::heartbeat_interval

use super::manager::{LeaseHandle, LeaseManager};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Background renewal task bound to one lease.
///
/// [`Heartbeat::stop`] cancels the task, including a renewal still in
/// flight, and waits for it to finish, so no renewal can happen after it
/// returns. Dropping a heartbeat without stopping it aborts the task.
#[derive(Debug)]
pub struct Heartbeat {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    renewals: Arc<AtomicU64>,
    period: Duration,
}

impl Heartbeat {
    /// Spawn the renewal loop; the first renewal happens one period from now.
    ///
    /// The period is the configured heartbeat interval, shortened to half the
    /// handle's TTL when the lease was taken with a shorter TTL.
    pub fn start(manager: LeaseManager, handle: LeaseHandle) -> Self {
        let period = manager
            .config()
            .heartbeat_interval()
            .min(handle.ttl() / 2)
            .max(MIN_PERIOD);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let renewals = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&renewals);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let renewed = tokio::select! {
                            biased;
                            _ = &mut stop_rx => break,
                            renewed = manager.renew(&handle) => renewed,
                        };
                        match renewed {
                            Ok(true) => {
                                counter.fetch_add(1, Ordering::Relaxed);
                            }
                            // Lease is gone; the coordinator's freshness check reports it
                            Ok(false) => {}
                            Err(e) => {
                                warn!(
                                    key = %handle.key(),
                                    error = %e,
                                    "Heartbeat renewal failed"
                                );
                            }
                        }
                    }
                }
            }

            debug!(key = %handle.key(), "Heartbeat stopped");
        });

        Self {
            stop_tx: Some(stop_tx),
            task: Some(task),
            renewals,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Successful renewals so far
    pub fn renewal_count(&self) -> u64 {
        self.renewals.load(Ordering::Relaxed)
    }

    /// Signal and cancel the task, then wait until it has exited.
    ///
    /// Never blocks on the lock store: a renewal stuck in flight is dropped.
    pub async fn stop(mut self) -> u64 {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The task may already be gone; nothing to signal then
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {
                    debug!("Heartbeat task cancelled");
                }
                Err(e) => {
                    warn!(error = %e, "Heartbeat task did not exit cleanly");
                }
            }
        }
        self.renewal_count()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
