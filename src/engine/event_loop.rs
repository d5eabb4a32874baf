// src/engine/event_loop.rs

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::catalog::{SessionEvent, TrackChange};
use crate::errors::Result;
use crate::sched::{DrainSummary, SharedScheduler};

/// What woke the loop up.
enum Wake {
    /// The drain oneshot resolved (`None` if the sender was dropped).
    Drained(Option<DrainSummary>),
    /// The event channel yielded (`None` when closed).
    Event(Option<SessionEvent>),
}

/// How the foreground loop ended.
#[derive(Debug)]
pub enum LoopOutcome {
    /// Every enumerated playlist was finalized; carries the drain summary.
    Drained(DrainSummary),
    /// Ctrl-C arrived before the catalog drained.
    Interrupted,
}

/// Foreground driver of the ingestion run.
///
/// Consumes [`SessionEvent`]s from the pump and dispatches them into the
/// scheduler synchronously on this task; no callback ever runs on a provider
/// thread. The loop ends when the scheduler reports full drain on the
/// oneshot channel, or on an interrupt.
pub struct EventLoop {
    scheduler: SharedScheduler,
    event_rx: mpsc::Receiver<SessionEvent>,
    done_rx: oneshot::Receiver<DrainSummary>,
}

impl EventLoop {
    pub fn new(
        scheduler: SharedScheduler,
        event_rx: mpsc::Receiver<SessionEvent>,
        done_rx: oneshot::Receiver<DrainSummary>,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            done_rx,
        }
    }

    pub async fn run(mut self) -> Result<LoopOutcome> {
        info!("event loop started");

        let mut events_open = true;
        loop {
            let wake = if events_open {
                tokio::select! {
                    summary = &mut self.done_rx => Wake::Drained(summary.ok()),
                    event = self.event_rx.recv() => Wake::Event(event),
                }
            } else {
                // The pump is gone; the sweeper still drives the drain via
                // polling, so just wait for the drain signal.
                Wake::Drained((&mut self.done_rx).await.ok())
            };

            match wake {
                Wake::Drained(Some(summary)) => {
                    info!("catalog drained; event loop exiting");
                    return Ok(LoopOutcome::Drained(summary));
                }
                Wake::Drained(None) => {
                    return Err(
                        anyhow::anyhow!("drain channel closed without a summary").into()
                    );
                }
                Wake::Event(Some(event)) => {
                    debug!(?event, "session event received");
                    if !self.dispatch(event) {
                        info!("interrupt received; stopping event loop");
                        return Ok(LoopOutcome::Interrupted);
                    }
                }
                Wake::Event(None) => {
                    warn!("session event channel closed; continuing on sweeps only");
                    events_open = false;
                }
            }
        }
    }

    /// Handle a single session event. Returns `false` when the loop should
    /// stop (interrupt).
    fn dispatch(&self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::ContainerLoaded => {
                self.lock_scheduler().on_container_loaded();
            }
            SessionEvent::PlaylistStateChanged(handle) => {
                self.lock_scheduler().on_completion_event(&handle);
            }
            SessionEvent::TracksChanged { handle, change } => match change {
                TrackChange::Added(count) => {
                    info!(playlist = %handle, count, "tracks were added");
                }
                TrackChange::Removed(count) => {
                    info!(playlist = %handle, count, "tracks were removed");
                }
                TrackChange::Moved(count) => {
                    info!(playlist = %handle, count, "tracks were moved");
                }
            },
            SessionEvent::ShutdownRequested => return false,
        }
        true
    }

    fn lock_scheduler(&self) -> std::sync::MutexGuard<'_, crate::sched::Scheduler> {
        self.scheduler.lock().expect("scheduler lock poisoned")
    }
}
