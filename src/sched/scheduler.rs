// src/sched/scheduler.rs

//! The ingestion scheduler.
//!
//! Owns the pending queue and the working set, admits playlists up to the
//! configured window, reacts to completion notifications, and finalizes
//! fully-loaded playlists (export, unregister, release). Termination is a
//! data-flow event: when both collections drain, the scheduler sends a
//! [`DrainSummary`] on its oneshot channel exactly once.
//!
//! All entry points are called with the surrounding `Mutex` held — by the
//! event loop on the foreground task and by the reconciliation sweeper.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::catalog::{
    CatalogSession, ContainerEntry, PlaylistHandle, PlaylistKind, RegistrationKind,
};
use crate::export::Exporter;
use crate::sched::queue::{PendingQueue, Priority, WorkingSet};

/// Both watch kinds a playlist subscribes to while loading.
const WATCH_KINDS: [RegistrationKind; 2] = [
    RegistrationKind::TrackMutation,
    RegistrationKind::MetadataCompletion,
];

/// Scheduler handle shared between the event loop and the sweeper.
pub type SharedScheduler = Arc<Mutex<Scheduler>>;

/// Counters reported at shutdown and exposed for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DrainSummary {
    /// Regular playlists enqueued from the container.
    pub enumerated: usize,
    /// Container entries skipped as folders or placeholders.
    pub ignored: usize,
    /// Playlists successfully written by the exporter.
    pub exported: usize,
    /// References released (every finalized playlist, exported or not).
    pub released: usize,
    /// Names of playlists whose export failed; they were released and will
    /// not be retried.
    pub export_failures: Vec<String>,
}

pub struct Scheduler {
    session: Arc<dyn CatalogSession>,
    exporter: Box<dyn Exporter>,
    pending: PendingQueue,
    working: WorkingSet,
    /// Admission window: maximum number of playlists loading at once.
    window: usize,
    /// Playlist name given with `-l`; a matching container entry is
    /// head-enqueued so it is admitted first.
    priority_name: Option<String>,
    /// One-shot drain channel. `None` once shutdown has been initiated.
    done_tx: Option<oneshot::Sender<DrainSummary>>,
    stats: DrainSummary,
}

impl Scheduler {
    pub fn new(
        session: Arc<dyn CatalogSession>,
        exporter: Box<dyn Exporter>,
        window: usize,
        priority_name: Option<String>,
        done_tx: oneshot::Sender<DrainSummary>,
    ) -> Self {
        Self {
            session,
            exporter,
            pending: PendingQueue::new(),
            working: WorkingSet::new(),
            window,
            priority_name,
            done_tx: Some(done_tx),
            stats: DrainSummary::default(),
        }
    }

    pub fn into_shared(self) -> SharedScheduler {
        Arc::new(Mutex::new(self))
    }

    /// Enumerate the container and queue every regular playlist, then fill
    /// the admission window.
    pub fn on_container_loaded(&mut self) {
        let entries = self.session.enumerate_container();
        info!(entries = entries.len(), "container enumerated");
        self.queue_entries(entries);
        self.replenish();
    }

    fn queue_entries(&mut self, entries: Vec<ContainerEntry>) {
        for entry in entries {
            match entry.kind {
                PlaylistKind::Playlist => {
                    let priority = match &self.priority_name {
                        Some(name) if *name == entry.handle.name => Priority::Urgent,
                        _ => Priority::Normal,
                    };
                    if priority == Priority::Urgent {
                        info!(playlist = %entry.handle, "prioritizing named playlist");
                    }
                    debug!(playlist = %entry.handle, "queueing playlist");
                    self.stats.enumerated += 1;
                    self.pending.enqueue(entry.handle, priority);
                }
                PlaylistKind::Folder | PlaylistKind::Placeholder => {
                    debug!(entry = %entry.handle, "ignoring folder or placeholder");
                    self.stats.ignored += 1;
                }
            }
        }
    }

    /// Admission control: move playlists from pending into working until the
    /// window is full or pending is empty.
    ///
    /// A dequeued playlist that is already fully loaded is finalized on the
    /// spot and never occupies a working slot or registers for
    /// notifications.
    pub fn replenish(&mut self) {
        while self.working.len() < self.window {
            let Some(handle) = self.pending.dequeue() else {
                break;
            };

            if self.session.evaluate_loaded(&handle) {
                debug!(playlist = %handle, "dequeue-skip: already loaded at admission");
                self.finalize(handle);
                continue;
            }

            for kind in WATCH_KINDS {
                if let Err(err) = self.session.register_completion(&handle, kind) {
                    // Non-fatal: the sweep will poll this playlist instead.
                    warn!(
                        playlist = %handle,
                        ?kind,
                        error = %err,
                        "completion watch registration failed; relying on sweep"
                    );
                }
            }
            debug!(playlist = %handle, "admitted into working set");
            self.working.admit(handle);
        }

        self.check_termination();
    }

    /// Push-notification completion path, invoked synchronously by the event
    /// loop.
    pub fn on_completion_event(&mut self, handle: &PlaylistHandle) {
        if !self.working.contains(handle) {
            // A sweep finalized this playlist before the notification was
            // delivered; the late event must not re-run the side effects.
            debug!(playlist = %handle, "stale completion event; ignoring");
            return;
        }

        if self.session.evaluate_loaded(handle) {
            self.finalize(handle.clone());
            self.replenish();
        } else {
            debug!(playlist = %handle, "still loading");
        }
    }

    /// One reconciliation pass over the working set: finalize every member
    /// the completion predicate accepts, returning how many were removed.
    pub fn sweep_working(&mut self) -> usize {
        let session = Arc::clone(&self.session);
        let ready = self.working.evaluate_all(|handle| session.evaluate_loaded(handle));
        let removed = ready.len();
        for handle in ready {
            self.finalize(handle);
        }
        removed
    }

    /// Terminal action on a fully-loaded playlist: unregister watches,
    /// export, remove from working, release the session reference.
    fn finalize(&mut self, handle: PlaylistHandle) {
        for kind in WATCH_KINDS {
            self.session.unregister_completion(&handle, kind);
        }

        match self
            .session
            .snapshot(&handle)
            .map_err(anyhow::Error::from)
            .and_then(|snapshot| self.exporter.export(&snapshot).map_err(Into::into))
        {
            Ok(()) => {
                info!(playlist = %handle, "playlist exported");
                self.stats.exported += 1;
            }
            Err(err) => {
                // Observable permanent skip: the playlist is released below
                // and never re-enqueued.
                error!(playlist = %handle, error = %err, "export failed; playlist dropped");
                self.stats.export_failures.push(handle.name.clone());
            }
        }

        // The sweep path removes members during traversal; removal here is a
        // no-op in that case.
        self.working.remove(&handle);
        self.session.release(&handle);
        self.stats.released += 1;
    }

    /// Fire the shutdown sequence if everything has drained. Safe to call
    /// from both the event path and the sweep path; only the first caller
    /// that observes "both empty" sends the summary.
    pub fn check_termination(&mut self) -> bool {
        if !self.pending.is_empty() || !self.working.is_empty() {
            return false;
        }
        let Some(done_tx) = self.done_tx.take() else {
            return false;
        };
        info!(
            exported = self.stats.exported,
            failures = self.stats.export_failures.len(),
            "all queues empty; initiating shutdown"
        );
        let _ = done_tx.send(self.stats.clone());
        true
    }

    /// Whether the drain summary has already been sent.
    pub fn is_shutting_down(&self) -> bool {
        self.done_tx.is_none()
    }

    /// Log current queue depths, listing what is still being worked on.
    pub fn log_depths(&self) {
        info!(
            pending = self.pending.len(),
            working = self.working.len(),
            "queues not yet drained"
        );
        for handle in self.working.iter() {
            debug!(playlist = %handle, "still working");
        }
    }

    /// (pending, working) depths, exposed for tests and diagnostics.
    pub fn depths(&self) -> (usize, usize) {
        (self.pending.len(), self.working.len())
    }

    /// Whether the given playlist currently occupies a working slot.
    pub fn is_working(&self, handle: &PlaylistHandle) -> bool {
        self.working.contains(handle)
    }

    pub fn stats(&self) -> &DrainSummary {
        &self.stats
    }
}
