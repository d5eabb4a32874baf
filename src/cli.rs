// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `pldump`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pldump",
    version,
    about = "Dump a catalog account's playlists to XSPF files.",
    long_about = None
)]
pub struct CliArgs {
    /// Catalog account user name.
    #[arg(short = 'u', long = "username", value_name = "USER")]
    pub username: String,

    /// Catalog account password.
    #[arg(short = 'p', long = "password", value_name = "PASS")]
    pub password: String,

    /// Admit the named playlist ahead of the rest of the container.
    #[arg(short = 'l', long = "list", value_name = "NAME")]
    pub list: Option<String>,

    /// Legacy flag from the original tool; accepted but has no effect.
    #[arg(short = 'd', long = "delete")]
    pub delete: bool,

    /// Path to the settings file (TOML).
    ///
    /// If omitted, `Pldump.toml` is used when present, otherwise built-in
    /// defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PLDUMP_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::try_parse()`.
///
/// `main` handles the error itself so that missing arguments exit with
/// code 1 rather than clap's default.
pub fn try_parse() -> Result<CliArgs, clap::Error> {
    CliArgs::try_parse()
}
