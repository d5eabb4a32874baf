// src/export/mod.rs

//! Export layer.
//!
//! The scheduler hands finalized playlists to an [`Exporter`]; the concrete
//! XSPF file writer lives in [`xspf`]. Tests substitute a recording fake.

pub mod xspf;

use thiserror::Error;

use crate::catalog::PlaylistSnapshot;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The defensive re-check at export time found tracks the completion
    /// predicate had counted as loaded but which are absent from the
    /// snapshot.
    #[error("playlist not fully materialized: {missing} of {total} tracks missing")]
    Incomplete { missing: usize, total: usize },
}

/// Collaborator performing the terminal side effect on a finalized playlist.
pub trait Exporter: Send {
    fn export(&mut self, snapshot: &PlaylistSnapshot) -> Result<(), ExportError>;
}

pub use xspf::XspfExporter;
