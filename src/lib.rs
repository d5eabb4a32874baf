// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod export;
pub mod logging;
pub mod sched;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use url::Url;

use crate::catalog::{spawn_session_pump, CatalogSession, RemoteSession, SessionEvent};
use crate::cli::CliArgs;
use crate::engine::{EventLoop, LoopOutcome};
use crate::errors::{PldumpError, Result};
use crate::export::XspfExporter;
use crate::sched::{spawn_sweeper, Scheduler};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - settings loading
/// - session login
/// - scheduler / sweeper / event loop
/// - the session pump
/// - Ctrl-C handling
/// - logout at shutdown
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = config::load(args.config.as_deref().map(Path::new))?;

    let base = Url::parse(&settings.catalog.server_url)
        .map_err(|err| PldumpError::Config(format!("invalid [catalog].server_url: {err}")))?;
    let session = Arc::new(RemoteSession::new(base));
    session.login(&args.username, &args.password).await?;

    if args.delete {
        warn!("-d/--delete is accepted for compatibility but has no effect");
    }

    let exporter = XspfExporter::new(&settings.export.output_dir)?;

    // Runtime event channel and the one-shot drain channel.
    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(64);
    let (done_tx, done_rx) = oneshot::channel();

    let scheduler = Scheduler::new(
        Arc::clone(&session) as Arc<dyn CatalogSession>,
        Box::new(exporter),
        settings.ingest.window,
        args.list.clone(),
        done_tx,
    )
    .into_shared();

    // Background session pump with geometric idle backoff.
    let _pump = spawn_session_pump(
        Arc::clone(&session),
        event_tx.clone(),
        settings.pump_initial_timeout(),
        settings.pump_max_timeout(),
    );

    // Background reconciliation sweeper.
    let _sweeper = spawn_sweeper(
        Arc::clone(&scheduler),
        settings.sweep_period(),
        settings.sweep_grace(),
    );

    // Ctrl-C → graceful shutdown.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {err}");
                return;
            }
            let _ = tx.send(SessionEvent::ShutdownRequested).await;
        });
    }

    let outcome = EventLoop::new(scheduler, event_rx, done_rx).run().await?;

    match outcome {
        LoopOutcome::Drained(summary) => {
            info!(
                enumerated = summary.enumerated,
                ignored = summary.ignored,
                exported = summary.exported,
                released = summary.released,
                "catalog drain complete"
            );
            if !summary.export_failures.is_empty() {
                warn!(
                    failed = ?summary.export_failures,
                    "some playlists failed to export and were skipped"
                );
            }
        }
        LoopOutcome::Interrupted => {
            warn!("interrupted before the catalog drained");
        }
    }

    // Shutdown-path errors are logged, never fatal.
    if let Err(err) = session.logout().await {
        warn!(error = %err, "logout failed");
    }

    Ok(())
}
