// src/sched/sweeper.rs

//! Periodic reconciliation sweep.
//!
//! Push notifications from the provider are not guaranteed to arrive; the
//! sweeper is the correctness backstop. On a fixed period it re-evaluates
//! the working set under the scheduler lock, refills freed admission slots,
//! and after a short grace interval performs a best-effort check for full
//! drain.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::sched::scheduler::SharedScheduler;

/// Spawn the background sweep task.
///
/// The task ends on its own once the scheduler has initiated shutdown.
pub fn spawn_sweeper(
    scheduler: SharedScheduler,
    period: Duration,
    grace: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(period_secs = period.as_secs(), "reconciliation sweeper started");
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of `interval` fires immediately; skip it so the
        // event path gets a full period before the first sweep.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            {
                let mut sched = scheduler.lock().expect("scheduler lock poisoned");
                if sched.is_shutting_down() {
                    break;
                }
                debug!("sweeping working set");
                let removed = sched.sweep_working();
                if removed > 0 {
                    info!(removed, "sweep finalized playlists missed by notifications");
                    sched.replenish();
                }
            }

            tokio::time::sleep(grace).await;

            // Best-effort drain check: if the lock is contended the event
            // path is active and will detect the drain itself.
            match scheduler.try_lock() {
                Ok(mut sched) => {
                    if sched.check_termination() || sched.is_shutting_down() {
                        break;
                    }
                    sched.log_depths();
                }
                Err(_) => debug!("scheduler busy; skipping drain check"),
            }
        }

        info!("reconciliation sweeper exiting");
    })
}
