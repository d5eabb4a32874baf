// src/config.rs

//! Settings file handling.
//!
//! All settings are optional; a missing file or section falls back to the
//! defaults below. Example:
//!
//! ```toml
//! [catalog]
//! server_url = "http://127.0.0.1:4950/"
//!
//! [ingest]
//! window = 10
//! sweep_period_secs = 20
//! sweep_grace_secs = 5
//!
//! [export]
//! output_dir = "playlists"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::errors::{PldumpError, Result};

/// Default settings path probed when `--config` is not given.
pub const DEFAULT_SETTINGS_PATH: &str = "Pldump.toml";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub catalog: CatalogSection,

    #[serde(default)]
    pub ingest: IngestSection,

    #[serde(default)]
    pub export: ExportSection,
}

/// `[catalog]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSection {
    /// Base URL of the catalog gateway.
    #[serde(default = "default_server_url")]
    pub server_url: String,
}

/// `[ingest]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSection {
    /// Admission window: playlists loading concurrently.
    #[serde(default = "default_window")]
    pub window: usize,

    /// Reconciliation sweep period.
    #[serde(default = "default_sweep_period_secs")]
    pub sweep_period_secs: u64,

    /// Grace sleep between a sweep and its drain check.
    #[serde(default = "default_sweep_grace_secs")]
    pub sweep_grace_secs: u64,

    /// Initial idle backoff of the session pump.
    #[serde(default = "default_pump_initial_timeout_ms")]
    pub pump_initial_timeout_ms: u64,

    /// Ceiling for the doubling idle backoff.
    #[serde(default = "default_pump_max_timeout_ms")]
    pub pump_max_timeout_ms: u64,
}

/// `[export]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportSection {
    /// Directory the XSPF files are written into; created if missing.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_server_url() -> String {
    "http://127.0.0.1:4950/".to_string()
}

fn default_window() -> usize {
    10
}

fn default_sweep_period_secs() -> u64 {
    20
}

fn default_sweep_grace_secs() -> u64 {
    5
}

fn default_pump_initial_timeout_ms() -> u64 {
    1000
}

fn default_pump_max_timeout_ms() -> u64 {
    64_000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("playlists")
}

impl Default for CatalogSection {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
        }
    }
}

impl Default for IngestSection {
    fn default() -> Self {
        Self {
            window: default_window(),
            sweep_period_secs: default_sweep_period_secs(),
            sweep_grace_secs: default_sweep_grace_secs(),
            pump_initial_timeout_ms: default_pump_initial_timeout_ms(),
            pump_max_timeout_ms: default_pump_max_timeout_ms(),
        }
    }
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl Settings {
    pub fn sweep_period(&self) -> Duration {
        Duration::from_secs(self.ingest.sweep_period_secs)
    }

    pub fn sweep_grace(&self) -> Duration {
        Duration::from_secs(self.ingest.sweep_grace_secs)
    }

    pub fn pump_initial_timeout(&self) -> Duration {
        Duration::from_millis(self.ingest.pump_initial_timeout_ms)
    }

    pub fn pump_max_timeout(&self) -> Duration {
        Duration::from_millis(self.ingest.pump_max_timeout_ms)
    }
}

/// Resolve settings: an explicit `--config` path must exist; otherwise
/// `Pldump.toml` is loaded when present, else defaults are used.
pub fn load(explicit: Option<&Path>) -> Result<Settings> {
    match explicit {
        Some(path) => load_from_path(path),
        None => {
            let default_path = Path::new(DEFAULT_SETTINGS_PATH);
            if default_path.exists() {
                load_from_path(default_path)
            } else {
                Ok(Settings::default())
            }
        }
    }
}

fn load_from_path(path: &Path) -> Result<Settings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading settings file at {path:?}"))?;
    let settings: Settings = toml::from_str(&contents)?;
    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<()> {
    if settings.ingest.window == 0 {
        return Err(PldumpError::Config(
            "[ingest].window must be >= 1 (got 0)".to_string(),
        ));
    }
    if settings.ingest.sweep_period_secs == 0 {
        return Err(PldumpError::Config(
            "[ingest].sweep_period_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    if settings.ingest.pump_initial_timeout_ms == 0 {
        return Err(PldumpError::Config(
            "[ingest].pump_initial_timeout_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if settings.ingest.pump_max_timeout_ms < settings.ingest.pump_initial_timeout_ms {
        return Err(PldumpError::Config(
            "[ingest].pump_max_timeout_ms must be >= pump_initial_timeout_ms".to_string(),
        ));
    }
    Ok(())
}
