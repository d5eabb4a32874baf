// tests/invariants.rs

//! Property tests over random enumeration sizes, windows, and event
//! interleavings: admission bound, conservation, exactly-once release, and
//! liveness with a single shutdown.

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use tokio::sync::oneshot;

use pldump::catalog::CatalogSession;
use pldump::sched::{DrainSummary, Scheduler};
use pldump_test_utils::builders::{handle, ContainerBuilder};
use pldump_test_utils::fake_exporter::RecordingExporter;
use pldump_test_utils::fake_session::FakeSession;

/// A single step of simulated provider activity.
#[derive(Debug, Clone, Copy)]
enum Op {
    /// Playlist `idx` finishes loading and its notification is delivered.
    Complete(usize),
    /// Playlist `idx` finishes loading but its notification is lost.
    SilentComplete(usize),
    /// A notification arrives for a playlist that may not be loaded (or may
    /// already be finalized).
    SpuriousEvent(usize),
    /// One reconciliation sweep cycle.
    Sweep,
}

fn op_strategy(max_idx: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..max_idx).prop_map(Op::Complete),
        (0..max_idx).prop_map(Op::SilentComplete),
        (0..max_idx).prop_map(Op::SpuriousEvent),
        Just(Op::Sweep),
    ]
}

fn playlist_id(idx: usize) -> String {
    format!("p{idx}")
}

fn build_session(count: usize, initially_loaded: &[usize]) -> Arc<FakeSession> {
    let mut builder = ContainerBuilder::new();
    for idx in 0..count {
        let id = playlist_id(idx);
        builder = builder.playlist(&id, &format!("playlist {id}"));
    }
    let session = Arc::new(builder.into_session());
    for idx in initially_loaded {
        session.mark_loaded(&playlist_id(idx % count.max(1)));
    }
    session
}

fn assert_invariants(
    scheduler: &Scheduler,
    session: &FakeSession,
    total: usize,
    window: usize,
) -> Result<(), TestCaseError> {
    let (pending, working) = scheduler.depths();
    prop_assert!(working <= window, "admission bound violated: {working} > {window}");
    prop_assert_eq!(
        pending + working + session.released().len(),
        total,
        "conservation violated"
    );
    Ok(())
}

/// Emulate one sweeper cycle, the way `spawn_sweeper` drives the scheduler.
fn run_sweep(scheduler: &mut Scheduler) {
    let removed = scheduler.sweep_working();
    if removed > 0 {
        scheduler.replenish();
    }
    scheduler.check_termination();
}

proptest! {
    #[test]
    fn scheduler_invariants_hold_under_any_interleaving(
        count in 1..16usize,
        window in 1..6usize,
        initially_loaded in proptest::collection::vec(0..16usize, 0..4),
        ops in proptest::collection::vec(op_strategy(16), 0..60),
    ) {
        let session = build_session(count, &initially_loaded);
        let exporter = RecordingExporter::new();
        let export_log = exporter.log_handle();
        let (done_tx, mut done_rx) = oneshot::channel::<DrainSummary>();
        let mut scheduler = Scheduler::new(
            Arc::clone(&session) as Arc<dyn CatalogSession>,
            Box::new(exporter),
            window,
            None,
            done_tx,
        );

        scheduler.on_container_loaded();
        assert_invariants(&scheduler, &session, count, window)?;

        for op in ops {
            match op {
                Op::Complete(idx) => {
                    let id = playlist_id(idx % count);
                    session.mark_loaded(&id);
                    scheduler.on_completion_event(&handle(&id));
                }
                Op::SilentComplete(idx) => {
                    session.mark_loaded(&playlist_id(idx % count));
                }
                Op::SpuriousEvent(idx) => {
                    scheduler.on_completion_event(&handle(&playlist_id(idx % count)));
                }
                Op::Sweep => run_sweep(&mut scheduler),
            }
            assert_invariants(&scheduler, &session, count, window)?;
        }

        // Liveness: once every playlist is loaded, a bounded number of
        // sweeps must drain both collections and fire shutdown once.
        for idx in 0..count {
            session.mark_loaded(&playlist_id(idx));
        }
        let mut sweeps = 0;
        while !scheduler.is_shutting_down() {
            run_sweep(&mut scheduler);
            sweeps += 1;
            prop_assert!(sweeps <= count + 2, "drain did not converge");
        }

        let (pending, working) = scheduler.depths();
        prop_assert_eq!((pending, working), (0, 0));

        // Exactly one shutdown, with every playlist accounted for.
        let summary = done_rx.try_recv().expect("drain summary sent once");
        prop_assert_eq!(summary.enumerated, count);
        prop_assert_eq!(summary.released, count);
        prop_assert!(!scheduler.check_termination());

        // Exactly-once release and export: no id appears twice.
        let released = session.released();
        let unique: HashSet<&String> = released.iter().collect();
        prop_assert_eq!(unique.len(), released.len(), "a playlist was released twice");
        let log = export_log.lock().unwrap().clone();
        prop_assert_eq!(log.len(), count, "every playlist exported exactly once");
    }
}
