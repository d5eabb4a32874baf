// src/catalog/handle.rs

//! Opaque playlist handles.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Reference to a remote playlist being ingested.
///
/// The `id` alone is the identity; the `name` is carried for logging and is
/// deliberately excluded from equality, since the provider may rename a
/// playlist while it is loading.
#[derive(Debug, Clone)]
pub struct PlaylistHandle {
    pub id: String,
    pub name: String,
}

impl PlaylistHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for PlaylistHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlaylistHandle {}

impl Hash for PlaylistHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for PlaylistHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Container entry type, as reported during enumeration.
///
/// Only `Playlist` entries are eligible for ingestion; folder markers and
/// placeholders are skipped by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistKind {
    Playlist,
    Folder,
    Placeholder,
}

/// A single entry of the account's playlist container.
#[derive(Debug, Clone)]
pub struct ContainerEntry {
    pub handle: PlaylistHandle,
    pub kind: PlaylistKind,
}
