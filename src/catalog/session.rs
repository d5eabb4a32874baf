// src/catalog/session.rs

//! The Catalog Session collaborator contract.
//!
//! The scheduler core only ever talks to [`CatalogSession`]; the concrete
//! provider client lives in [`remote`](crate::catalog::remote) and tests
//! substitute a scripted fake. All trait methods are synchronous — they read
//! and update the session's local cache, which the async pump refreshes in
//! the background — so they can be called while holding the scheduler lock.

use thiserror::Error;

use crate::catalog::handle::{ContainerEntry, PlaylistHandle};
use crate::catalog::snapshot::PlaylistSnapshot;

/// Why a completion watch is being registered.
///
/// The reference system distinguished these with raw sentinel user-data
/// values; here they are a closed, named set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    /// Track add/remove/move notifications, surfaced for observability.
    TrackMutation,
    /// Metadata/load-state notifications that drive the completion path.
    MetadataCompletion,
}

/// Events flowing from the session pump into the event loop.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The playlist container finished its initial synchronization; the
    /// scheduler should enumerate it now. Emitted at most once per run.
    ContainerLoaded,
    /// A watched playlist's load state may have changed.
    PlaylistStateChanged(PlaylistHandle),
    /// Tracks were added to, removed from, or moved within a watched
    /// playlist. Logged, never acted on.
    TracksChanged {
        handle: PlaylistHandle,
        change: TrackChange,
    },
    /// Graceful shutdown requested (Ctrl-C).
    ShutdownRequested,
}

/// Kind and magnitude of a track mutation.
#[derive(Debug, Clone, Copy)]
pub enum TrackChange {
    Added(usize),
    Removed(usize),
    Moved(usize),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("catalog request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid gateway URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unknown playlist: {0}")]
    UnknownPlaylist(String),

    #[error("completion watch rejected for playlist {0}")]
    RegistrationRejected(String),
}

/// Collaborator contract consumed by the scheduler core.
pub trait CatalogSession: Send + Sync {
    /// Enumerate the playlist container. Called exactly once, after the pump
    /// reports [`SessionEvent::ContainerLoaded`]. Handles returned here carry
    /// an acquired provider-side reference, paired with [`release`].
    ///
    /// [`release`]: CatalogSession::release
    fn enumerate_container(&self) -> Vec<ContainerEntry>;

    /// Subscribe to push notifications for `handle`. Best-effort: a failure
    /// is non-fatal, the reconciliation sweep covers unwatched playlists.
    fn register_completion(
        &self,
        handle: &PlaylistHandle,
        kind: RegistrationKind,
    ) -> Result<(), SessionError>;

    /// Drop a notification subscription. Unregistering a watch that was
    /// never established is a no-op.
    fn unregister_completion(&self, handle: &PlaylistHandle, kind: RegistrationKind);

    /// The completion predicate: true once every track of the playlist has
    /// finished loading. Total and side-effect-free.
    fn evaluate_loaded(&self, handle: &PlaylistHandle) -> bool;

    /// Materialize the playlist's current contents for export.
    fn snapshot(&self, handle: &PlaylistHandle) -> Result<PlaylistSnapshot, SessionError>;

    /// Release the provider-side reference acquired at enumeration. Called
    /// exactly once per handle, at finalization.
    fn release(&self, handle: &PlaylistHandle);
}
