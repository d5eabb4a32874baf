use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use pldump::catalog::PlaylistSnapshot;
use pldump::export::{ExportError, Exporter};

/// An exporter that records which playlists were exported and can be
/// scripted to fail for specific ids.
pub struct RecordingExporter {
    exported: Arc<Mutex<Vec<String>>>,
    fail_ids: HashSet<String>,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self {
            exported: Arc::new(Mutex::new(Vec::new())),
            fail_ids: HashSet::new(),
        }
    }

    /// Shared view of the export log; usable after the exporter has been
    /// boxed into the scheduler.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.exported)
    }

    pub fn fail_for(mut self, id: &str) -> Self {
        self.fail_ids.insert(id.to_string());
        self
    }
}

impl Default for RecordingExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Exporter for RecordingExporter {
    fn export(&mut self, snapshot: &PlaylistSnapshot) -> Result<(), ExportError> {
        if self.fail_ids.contains(&snapshot.id) {
            return Err(ExportError::Io(std::io::Error::other(
                "simulated export failure",
            )));
        }
        if !snapshot.is_complete() {
            return Err(ExportError::Incomplete {
                missing: snapshot.missing_tracks(),
                total: snapshot.expected_tracks,
            });
        }
        self.exported.lock().unwrap().push(snapshot.id.clone());
        Ok(())
    }
}
