use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use pldump::catalog::{
    CatalogSession, ContainerEntry, PlaylistHandle, PlaylistSnapshot, RegistrationKind,
    SessionError,
};

/// A scripted catalog session:
/// - serves a fixed container enumeration
/// - answers the completion predicate from a mutable `loaded` set
/// - records every registration, unregistration, and release.
pub struct FakeSession {
    inner: Mutex<FakeInner>,
}

#[derive(Default)]
struct FakeInner {
    entries: Vec<ContainerEntry>,
    loaded: HashSet<String>,
    /// Ids whose snapshots report missing tracks (export re-check failure).
    incomplete: HashSet<String>,
    /// Ids whose watch registration is scripted to fail.
    registration_failures: HashSet<String>,
    active_watches: HashMap<String, HashSet<RegistrationKind>>,
    register_log: Vec<(String, RegistrationKind)>,
    released: Vec<String>,
}

impl FakeSession {
    pub fn new(entries: Vec<ContainerEntry>) -> Self {
        Self {
            inner: Mutex::new(FakeInner {
                entries,
                ..FakeInner::default()
            }),
        }
    }

    /// Flip the completion predicate to true for `id`.
    pub fn mark_loaded(&self, id: &str) {
        self.lock().loaded.insert(id.to_string());
    }

    /// Make watch registration fail for `id`.
    pub fn fail_registration(&self, id: &str) {
        self.lock().registration_failures.insert(id.to_string());
    }

    /// Make `id`'s snapshot report missing tracks even though the predicate
    /// says loaded (exercises the exporter's defensive re-check).
    pub fn make_snapshot_incomplete(&self, id: &str) {
        self.lock().incomplete.insert(id.to_string());
    }

    /// Ids released so far, in release order.
    pub fn released(&self) -> Vec<String> {
        self.lock().released.clone()
    }

    /// Every registration ever performed for `id`.
    pub fn registrations(&self, id: &str) -> Vec<RegistrationKind> {
        self.lock()
            .register_log
            .iter()
            .filter(|(logged, _)| logged == id)
            .map(|(_, kind)| *kind)
            .collect()
    }

    /// Watches currently active for `id`.
    pub fn active_watches(&self, id: &str) -> usize {
        self.lock()
            .active_watches
            .get(id)
            .map(|kinds| kinds.len())
            .unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeInner> {
        self.inner.lock().unwrap()
    }
}

impl CatalogSession for FakeSession {
    fn enumerate_container(&self) -> Vec<ContainerEntry> {
        self.lock().entries.clone()
    }

    fn register_completion(
        &self,
        handle: &PlaylistHandle,
        kind: RegistrationKind,
    ) -> Result<(), SessionError> {
        let mut inner = self.lock();
        if inner.registration_failures.contains(&handle.id) {
            return Err(SessionError::RegistrationRejected(handle.name.clone()));
        }
        inner.register_log.push((handle.id.clone(), kind));
        inner
            .active_watches
            .entry(handle.id.clone())
            .or_default()
            .insert(kind);
        Ok(())
    }

    fn unregister_completion(&self, handle: &PlaylistHandle, kind: RegistrationKind) {
        if let Some(kinds) = self.lock().active_watches.get_mut(&handle.id) {
            kinds.remove(&kind);
        }
    }

    fn evaluate_loaded(&self, handle: &PlaylistHandle) -> bool {
        self.lock().loaded.contains(&handle.id)
    }

    fn snapshot(&self, handle: &PlaylistHandle) -> Result<PlaylistSnapshot, SessionError> {
        let inner = self.lock();
        let expected = if inner.incomplete.contains(&handle.id) {
            1
        } else {
            0
        };
        Ok(PlaylistSnapshot {
            id: handle.id.clone(),
            name: handle.name.clone(),
            uri: format!("catalog:playlist:{}", handle.id),
            owner: "tester".into(),
            description: None,
            expected_tracks: expected,
            tracks: Vec::new(),
        })
    }

    fn release(&self, handle: &PlaylistHandle) {
        self.lock().released.push(handle.id.clone());
    }
}
