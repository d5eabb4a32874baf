// src/catalog/remote.rs

//! Concrete catalog session over the provider's HTTP/JSON gateway.
//!
//! `RemoteSession` keeps an in-memory cache of everything the scheduler may
//! ask about. The synchronous [`CatalogSession`] methods only touch that
//! cache; the cache itself is refreshed by the pump task spawned with
//! [`spawn_session_pump`], which polls the gateway and emits
//! [`SessionEvent`]s into the runtime channel. Poll frequency backs off
//! geometrically while the provider is idle and snaps back on any activity.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::catalog::handle::{ContainerEntry, PlaylistHandle, PlaylistKind};
use crate::catalog::session::{
    CatalogSession, RegistrationKind, SessionError, SessionEvent, TrackChange,
};
use crate::catalog::snapshot::{AlbumRef, ArtistRef, PlaylistSnapshot, TrackEntry};

pub struct RemoteSession {
    http: reqwest::Client,
    base: Url,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    container_ready: bool,
    /// Container entries in provider order, including folders/placeholders.
    container: Vec<ContainerEntry>,
    playlists: HashMap<String, CachedPlaylist>,
}

struct CachedPlaylist {
    handle: PlaylistHandle,
    uri: String,
    owner: String,
    description: Option<String>,
    expected_tracks: usize,
    tracks: Vec<TrackEntry>,
    watches: HashSet<RegistrationKind>,
    /// Provider-side reference count; the entry is dropped when it reaches 0.
    refs: u32,
}

// --- gateway wire types ---

#[derive(Debug, Deserialize)]
struct ApiLogin {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ApiContainer {
    loaded: bool,
    #[serde(default)]
    playlists: Vec<ApiContainerEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiContainerEntry {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    id: String,
    name: String,
    uri: String,
    owner: String,
    description: Option<String>,
    total_tracks: usize,
    #[serde(default)]
    tracks: Vec<ApiTrack>,
}

#[derive(Debug, Deserialize)]
struct ApiTrack {
    uri: String,
    title: String,
    duration_ms: u64,
    added_at: u64,
    added_by: Option<String>,
    loaded: bool,
    album: ApiAlbum,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Debug, Deserialize)]
struct ApiAlbum {
    uri: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiArtist {
    uri: String,
    name: String,
}

impl RemoteSession {
    pub fn new(base: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Log in and store the bearer token for subsequent requests.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), SessionError> {
        let url = self.endpoint("session")?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(SessionError::AuthenticationFailed(username.to_string()));
        }

        let login: ApiLogin = response.error_for_status()?.json().await?;
        self.lock().token = Some(login.token);
        info!(user = %username, "logged in to catalog gateway");
        Ok(())
    }

    /// Tear down the gateway session. Failures are the caller's to log; the
    /// process exits either way.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let Some(token) = self.lock().token.take() else {
            return Ok(());
        };
        let url = self.endpoint("session")?;
        self.http
            .delete(url)
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?;
        info!("logged out of catalog gateway");
        Ok(())
    }

    /// One poll cycle: refresh local state from the gateway and report what
    /// changed. An empty vec means the provider was idle.
    pub async fn process_events(&self) -> Result<Vec<SessionEvent>, SessionError> {
        if !self.lock().container_ready {
            return self.poll_container().await;
        }
        self.poll_watched().await
    }

    /// Poll the container until its initial synchronization completes, then
    /// seed the playlist cache and report readiness.
    async fn poll_container(&self) -> Result<Vec<SessionEvent>, SessionError> {
        let container: ApiContainer = self.get_json("container").await?;
        if !container.loaded {
            debug!("container not yet synchronized");
            return Ok(Vec::new());
        }

        // Fetch playlist bodies before taking the state lock.
        let mut entries = Vec::with_capacity(container.playlists.len());
        let mut bodies = Vec::new();
        for entry in container.playlists {
            let kind = kind_from_wire(&entry.kind);
            let handle = PlaylistHandle::new(entry.id.clone(), entry.name);
            if kind == PlaylistKind::Playlist {
                bodies.push(self.get_playlist(&entry.id).await?);
            }
            entries.push(ContainerEntry { handle, kind });
        }

        let mut state = self.lock();
        for body in bodies {
            let cached = cache_entry(body);
            state.playlists.insert(cached.handle.id.clone(), cached);
        }
        info!(playlists = entries.len(), "container synchronized");
        state.container = entries;
        state.container_ready = true;
        Ok(vec![SessionEvent::ContainerLoaded])
    }

    /// Refresh every watched playlist and emit change events.
    async fn poll_watched(&self) -> Result<Vec<SessionEvent>, SessionError> {
        let watched: Vec<String> = {
            let state = self.lock();
            state
                .playlists
                .values()
                .filter(|p| !p.watches.is_empty())
                .map(|p| p.handle.id.clone())
                .collect()
        };

        let mut fresh = Vec::with_capacity(watched.len());
        for id in watched {
            fresh.push(self.get_playlist(&id).await?);
        }

        let mut events = Vec::new();
        let mut state = self.lock();
        for body in fresh {
            let Some(cached) = state.playlists.get_mut(&body.id) else {
                // Released while the fetch was in flight.
                continue;
            };

            let old_total = cached.expected_tracks;
            let old_loaded = cached.tracks.len();
            let updated = cache_entry(body);

            if cached.watches.contains(&RegistrationKind::TrackMutation) {
                if let Some(change) = track_change(old_total, updated.expected_tracks) {
                    events.push(SessionEvent::TracksChanged {
                        handle: cached.handle.clone(),
                        change,
                    });
                }
            }

            let state_changed = updated.tracks.len() != old_loaded
                || updated.expected_tracks != old_total;
            if state_changed && cached.watches.contains(&RegistrationKind::MetadataCompletion) {
                events.push(SessionEvent::PlaylistStateChanged(cached.handle.clone()));
            }

            cached.expected_tracks = updated.expected_tracks;
            cached.tracks = updated.tracks;
            cached.uri = updated.uri;
            cached.owner = updated.owner;
            cached.description = updated.description;
        }
        Ok(events)
    }

    async fn get_playlist(&self, id: &str) -> Result<ApiPlaylist, SessionError> {
        self.get_json(&format!("playlists/{id}")).await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, SessionError> {
        let url = self.endpoint(path)?;
        let token = self.lock().token.clone();
        let mut request = self.http.get(url).header("Accept", "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let value = request
            .send()
            .await?
            .error_for_status()?
            .json::<T>()
            .await?;
        Ok(value)
    }

    fn endpoint(&self, path: &str) -> Result<Url, SessionError> {
        Ok(self.base.join(path)?)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().expect("session state lock poisoned")
    }
}

impl CatalogSession for RemoteSession {
    fn enumerate_container(&self) -> Vec<ContainerEntry> {
        self.lock().container.clone()
    }

    fn register_completion(
        &self,
        handle: &PlaylistHandle,
        kind: RegistrationKind,
    ) -> Result<(), SessionError> {
        let mut state = self.lock();
        match state.playlists.get_mut(&handle.id) {
            Some(cached) => {
                cached.watches.insert(kind);
                Ok(())
            }
            None => Err(SessionError::RegistrationRejected(handle.name.clone())),
        }
    }

    fn unregister_completion(&self, handle: &PlaylistHandle, kind: RegistrationKind) {
        if let Some(cached) = self.lock().playlists.get_mut(&handle.id) {
            cached.watches.remove(&kind);
        }
    }

    fn evaluate_loaded(&self, handle: &PlaylistHandle) -> bool {
        let state = self.lock();
        match state.playlists.get(&handle.id) {
            Some(cached) => cached.tracks.len() == cached.expected_tracks,
            None => false,
        }
    }

    fn snapshot(&self, handle: &PlaylistHandle) -> Result<PlaylistSnapshot, SessionError> {
        let state = self.lock();
        let cached = state
            .playlists
            .get(&handle.id)
            .ok_or_else(|| SessionError::UnknownPlaylist(handle.id.clone()))?;
        Ok(PlaylistSnapshot {
            id: cached.handle.id.clone(),
            name: cached.handle.name.clone(),
            uri: cached.uri.clone(),
            owner: cached.owner.clone(),
            description: cached.description.clone(),
            expected_tracks: cached.expected_tracks,
            tracks: cached.tracks.clone(),
        })
    }

    fn release(&self, handle: &PlaylistHandle) {
        let mut state = self.lock();
        if let Some(cached) = state.playlists.get_mut(&handle.id) {
            cached.refs = cached.refs.saturating_sub(1);
            if cached.refs == 0 {
                debug!(playlist = %handle.name, "dropping released playlist from cache");
                state.playlists.remove(&handle.id);
            }
        }
    }
}

fn kind_from_wire(kind: &str) -> PlaylistKind {
    match kind {
        "playlist" => PlaylistKind::Playlist,
        "folder" | "folder_start" | "folder_end" => PlaylistKind::Folder,
        _ => PlaylistKind::Placeholder,
    }
}

fn cache_entry(body: ApiPlaylist) -> CachedPlaylist {
    let owner = body.owner;
    let tracks = body
        .tracks
        .into_iter()
        .filter(|t| t.loaded)
        .map(|t| TrackEntry {
            uri: t.uri,
            title: t.title,
            duration_ms: t.duration_ms,
            added_at: t.added_at,
            added_by: t.added_by,
            album: AlbumRef {
                uri: t.album.uri,
                name: t.album.name,
            },
            artists: t
                .artists
                .into_iter()
                .map(|a| ArtistRef {
                    uri: a.uri,
                    name: a.name,
                })
                .collect(),
        })
        .collect();
    CachedPlaylist {
        handle: PlaylistHandle::new(body.id, body.name),
        uri: body.uri,
        owner,
        description: body.description,
        expected_tracks: body.total_tracks,
        tracks,
        watches: HashSet::new(),
        refs: 1,
    }
}

fn track_change(old_total: usize, new_total: usize) -> Option<TrackChange> {
    match new_total.cmp(&old_total) {
        std::cmp::Ordering::Greater => Some(TrackChange::Added(new_total - old_total)),
        std::cmp::Ordering::Less => Some(TrackChange::Removed(old_total - new_total)),
        std::cmp::Ordering::Equal => None,
    }
}

/// Spawn the background pump that feeds the runtime event channel.
///
/// While the provider is idle the poll interval doubles from `initial` up to
/// `max`, mirroring the timed-wait loop of the reference client; any batch of
/// events resets it.
pub fn spawn_session_pump(
    session: Arc<RemoteSession>,
    event_tx: mpsc::Sender<SessionEvent>,
    initial: Duration,
    max: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("session pump started");
        let mut idle_timeout = initial;
        loop {
            match session.process_events().await {
                Ok(events) if !events.is_empty() => {
                    idle_timeout = initial;
                    for event in events {
                        if event_tx.send(event).await.is_err() {
                            debug!("event channel closed; pump exiting");
                            return;
                        }
                    }
                }
                Ok(_) => {
                    debug!(timeout_ms = idle_timeout.as_millis() as u64, "provider idle; backing off");
                    tokio::time::sleep(idle_timeout).await;
                    idle_timeout = (idle_timeout * 2).min(max);
                }
                Err(err) => {
                    warn!(error = %err, "session poll failed; retrying after backoff");
                    tokio::time::sleep(idle_timeout).await;
                    idle_timeout = (idle_timeout * 2).min(max);
                }
            }
        }
    })
}
