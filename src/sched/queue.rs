// src/sched/queue.rs

//! Owned queue types for the ingestion scheduler.
//!
//! The reference system grew several near-duplicate intrusive-list queue
//! modules; they are consolidated here into one `VecDeque`-backed pending
//! queue plus a membership set for playlists currently being loaded.

use std::collections::VecDeque;

use crate::catalog::PlaylistHandle;

/// Where an enqueued handle lands in the pending queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    /// Append to the tail (default enumeration order).
    Normal,
    /// Prepend to the head, so the handle is admitted next.
    Urgent,
}

/// FIFO of playlists discovered but not yet admitted for loading.
///
/// No deduplication is performed; callers must not enqueue a handle that is
/// already pending or working.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: VecDeque<PlaylistHandle>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, handle: PlaylistHandle, priority: Priority) {
        match priority {
            Priority::Normal => self.entries.push_back(handle),
            Priority::Urgent => self.entries.push_front(handle),
        }
    }

    /// Remove and return the head entry. Non-blocking.
    pub fn dequeue(&mut self) -> Option<PlaylistHandle> {
        self.entries.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Playlists currently admitted for loading.
///
/// Membership is keyed on handle identity (the playlist id); order carries no
/// meaning and is only preserved for readable depth logging.
#[derive(Debug, Default)]
pub struct WorkingSet {
    members: Vec<PlaylistHandle>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handle to the set. The caller holds the scheduler lock and has
    /// verified the handle is not already a member.
    pub fn admit(&mut self, handle: PlaylistHandle) {
        debug_assert!(!self.contains(&handle), "handle admitted twice");
        self.members.push(handle);
    }

    /// Remove a handle if present. Idempotent: the notification path and the
    /// sweep path may both attempt the removal.
    pub fn remove(&mut self, handle: &PlaylistHandle) -> bool {
        match self.members.iter().position(|m| m == handle) {
            Some(idx) => {
                self.members.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, handle: &PlaylistHandle) -> bool {
        self.members.iter().any(|m| m == handle)
    }

    /// Remove and return every member the predicate accepts. This is the
    /// sweep's core operation; the scheduler finalizes each returned handle.
    pub fn evaluate_all<F>(&mut self, mut predicate: F) -> Vec<PlaylistHandle>
    where
        F: FnMut(&PlaylistHandle) -> bool,
    {
        let mut accepted = Vec::new();
        self.members.retain(|handle| {
            if predicate(handle) {
                accepted.push(handle.clone());
                false
            } else {
                true
            }
        });
        accepted
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaylistHandle> {
        self.members.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }
}
