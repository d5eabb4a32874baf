#![allow(dead_code)]

use pldump::catalog::{ContainerEntry, PlaylistHandle, PlaylistKind};

use crate::fake_session::FakeSession;

/// Builder for a scripted container enumeration, to simplify test setup.
pub struct ContainerBuilder {
    entries: Vec<ContainerEntry>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn playlist(mut self, id: &str, name: &str) -> Self {
        self.entries.push(ContainerEntry {
            handle: PlaylistHandle::new(id, name),
            kind: PlaylistKind::Playlist,
        });
        self
    }

    pub fn folder(mut self, name: &str) -> Self {
        self.entries.push(ContainerEntry {
            handle: PlaylistHandle::new(format!("folder-{name}"), name),
            kind: PlaylistKind::Folder,
        });
        self
    }

    pub fn placeholder(mut self) -> Self {
        let id = format!("placeholder-{}", self.entries.len());
        self.entries.push(ContainerEntry {
            handle: PlaylistHandle::new(id, ""),
            kind: PlaylistKind::Placeholder,
        });
        self
    }

    pub fn build(self) -> Vec<ContainerEntry> {
        self.entries
    }

    pub fn into_session(self) -> FakeSession {
        FakeSession::new(self.build())
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for a handle with a derived display name.
pub fn handle(id: &str) -> PlaylistHandle {
    PlaylistHandle::new(id, format!("playlist {id}"))
}
