// src/errors.rs

//! Crate-wide error type and exit-code mapping.

use thiserror::Error;

use crate::catalog::SessionError;
use crate::export::ExportError;

#[derive(Error, Debug)]
pub enum PldumpError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("catalog session error: {0}")]
    Session(#[from] SessionError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PldumpError {
    /// Process exit code for this failure: 2 for authentication failures,
    /// 1 for everything else (arguments, settings, session bootstrap).
    pub fn exit_code(&self) -> i32 {
        match self {
            PldumpError::Session(SessionError::AuthenticationFailed(_)) => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, PldumpError>;
