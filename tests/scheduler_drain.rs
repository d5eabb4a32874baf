// tests/scheduler_drain.rs

//! Scenario tests driving the scheduler synchronously, the way the event
//! loop and the sweeper do under the lock.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use pldump::catalog::CatalogSession;
use pldump::sched::{DrainSummary, Scheduler};
use pldump_test_utils::builders::{handle, ContainerBuilder};
use pldump_test_utils::fake_exporter::RecordingExporter;
use pldump_test_utils::fake_session::FakeSession;
use pldump_test_utils::init_tracing;

type ExportLog = Arc<Mutex<Vec<String>>>;

fn new_scheduler(
    session: Arc<FakeSession>,
    window: usize,
    priority_name: Option<String>,
) -> (Scheduler, oneshot::Receiver<DrainSummary>, ExportLog) {
    let exporter = RecordingExporter::new();
    let log = exporter.log_handle();
    let (done_tx, done_rx) = oneshot::channel();
    let scheduler = Scheduler::new(
        session as Arc<dyn CatalogSession>,
        Box::new(exporter),
        window,
        priority_name,
        done_tx,
    );
    (scheduler, done_rx, log)
}

fn exported(log: &ExportLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Conservation: everything enumerated is pending, working, or released.
fn assert_conserved(scheduler: &Scheduler, session: &FakeSession, total: usize) {
    let (pending, working) = scheduler.depths();
    assert_eq!(
        pending + working + session.released().len(),
        total,
        "conservation violated"
    );
}

#[test]
fn five_playlists_window_two_drain() {
    init_tracing();

    let session = Arc::new(
        ContainerBuilder::new()
            .playlist("p1", "playlist p1")
            .playlist("p2", "playlist p2")
            .playlist("p3", "playlist p3")
            .playlist("p4", "playlist p4")
            .playlist("p5", "playlist p5")
            .into_session(),
    );
    let (mut scheduler, mut done_rx, log) = new_scheduler(Arc::clone(&session), 2, None);

    // Enumeration admits the first two, queues the rest.
    scheduler.on_container_loaded();
    assert_eq!(scheduler.depths(), (3, 2));
    assert!(scheduler.is_working(&handle("p1")));
    assert!(scheduler.is_working(&handle("p2")));
    assert_conserved(&scheduler, &session, 5);

    // Completion event for p1 finalizes it and admits p3.
    session.mark_loaded("p1");
    scheduler.on_completion_event(&handle("p1"));
    assert_eq!(scheduler.depths(), (2, 2));
    assert!(!scheduler.is_working(&handle("p1")));
    assert!(scheduler.is_working(&handle("p3")));
    assert_eq!(exported(&log), ["p1"]);
    assert_conserved(&scheduler, &session, 5);

    // A sweep finds p2 loaded (its notification never arrived) and admits
    // p4.
    session.mark_loaded("p2");
    assert_eq!(scheduler.sweep_working(), 1);
    scheduler.replenish();
    assert_eq!(scheduler.depths(), (1, 2));
    assert!(scheduler.is_working(&handle("p4")));
    assert_conserved(&scheduler, &session, 5);

    // Drain the rest through a mix of events and sweeps.
    session.mark_loaded("p3");
    scheduler.on_completion_event(&handle("p3"));
    session.mark_loaded("p4");
    session.mark_loaded("p5");
    assert_eq!(scheduler.sweep_working(), 2);
    scheduler.replenish();

    assert_eq!(scheduler.depths(), (0, 0));
    assert!(scheduler.is_shutting_down());
    let summary = done_rx.try_recv().expect("exactly one drain summary");
    assert_eq!(summary.enumerated, 5);
    assert_eq!(summary.exported, 5);
    assert_eq!(summary.released, 5);
    assert!(summary.export_failures.is_empty());
    assert_eq!(session.released().len(), 5);
}

#[test]
fn already_loaded_playlist_takes_the_fast_path() {
    init_tracing();

    let session = Arc::new(
        ContainerBuilder::new()
            .playlist("q1", "playlist q1")
            .into_session(),
    );
    session.mark_loaded("q1");
    let (mut scheduler, mut done_rx, log) = new_scheduler(Arc::clone(&session), 2, None);

    scheduler.on_container_loaded();

    // Finalized straight off the pending queue: no registration, no working
    // slot.
    assert!(session.registrations("q1").is_empty());
    assert_eq!(scheduler.depths(), (0, 0));
    assert_eq!(exported(&log), ["q1"]);
    assert_eq!(session.released(), ["q1"]);
    assert!(done_rx.try_recv().is_ok());
}

#[test]
fn folders_and_placeholders_are_ignored() {
    init_tracing();

    let session = Arc::new(
        ContainerBuilder::new()
            .folder("albums")
            .playlist("p1", "playlist p1")
            .placeholder()
            .into_session(),
    );
    let (mut scheduler, _done_rx, _log) = new_scheduler(Arc::clone(&session), 4, None);

    scheduler.on_container_loaded();

    assert_eq!(scheduler.depths(), (0, 1));
    assert_eq!(scheduler.stats().enumerated, 1);
    assert_eq!(scheduler.stats().ignored, 2);
}

#[test]
fn named_list_is_admitted_first() {
    init_tracing();

    let session = Arc::new(
        ContainerBuilder::new()
            .playlist("a", "morning")
            .playlist("b", "commute")
            .playlist("c", "favourites")
            .into_session(),
    );
    let (mut scheduler, _done_rx, log) =
        new_scheduler(Arc::clone(&session), 1, Some("favourites".to_string()));

    scheduler.on_container_loaded();
    assert!(scheduler.is_working(&handle("c")));

    // Drain in admission order: the urgent entry first, then FIFO.
    for id in ["c", "a", "b"] {
        session.mark_loaded(id);
        scheduler.on_completion_event(&handle(id));
    }
    assert_eq!(exported(&log), ["c", "a", "b"]);
}

#[test]
fn registration_failure_degrades_to_sweep_only() {
    init_tracing();

    let session = Arc::new(
        ContainerBuilder::new()
            .playlist("p1", "playlist p1")
            .into_session(),
    );
    session.fail_registration("p1");
    let (mut scheduler, mut done_rx, log) = new_scheduler(Arc::clone(&session), 2, None);

    // Registration fails but the playlist still occupies a working slot.
    scheduler.on_container_loaded();
    assert_eq!(scheduler.depths(), (0, 1));
    assert_eq!(session.active_watches("p1"), 0);

    // No notification will ever arrive; the sweep completes it.
    session.mark_loaded("p1");
    assert_eq!(scheduler.sweep_working(), 1);
    scheduler.replenish();

    assert_eq!(exported(&log), ["p1"]);
    assert!(done_rx.try_recv().is_ok());
}

#[test]
fn export_failure_is_an_observable_permanent_skip() {
    init_tracing();

    let session = Arc::new(
        ContainerBuilder::new()
            .playlist("bad", "haunted list")
            .playlist("good", "playlist good")
            .into_session(),
    );
    // Predicate true, but the snapshot is missing tracks: the exporter's
    // defensive re-check fails.
    session.make_snapshot_incomplete("bad");
    let (mut scheduler, mut done_rx, log) = new_scheduler(Arc::clone(&session), 2, None);

    scheduler.on_container_loaded();
    session.mark_loaded("bad");
    session.mark_loaded("good");
    scheduler.on_completion_event(&handle("bad"));
    scheduler.on_completion_event(&handle("good"));

    // The failed playlist was released, never re-enqueued, and reported.
    let summary = done_rx.try_recv().expect("drain completes despite failure");
    assert_eq!(summary.exported, 1);
    assert_eq!(summary.released, 2);
    assert_eq!(summary.export_failures, ["haunted list"]);
    assert_eq!(exported(&log), ["good"]);
    assert_eq!(session.released().len(), 2);
}

#[test]
fn finalize_side_effects_run_once_across_racing_paths() {
    init_tracing();

    let session = Arc::new(
        ContainerBuilder::new()
            .playlist("p1", "playlist p1")
            .playlist("p2", "playlist p2")
            .into_session(),
    );
    let (mut scheduler, _done_rx, log) = new_scheduler(Arc::clone(&session), 2, None);

    scheduler.on_container_loaded();
    session.mark_loaded("p1");

    // The sweep wins the race; the late notification must be a no-op.
    assert_eq!(scheduler.sweep_working(), 1);
    scheduler.on_completion_event(&handle("p1"));
    scheduler.on_completion_event(&handle("p1"));

    assert_eq!(exported(&log), ["p1"]);
    assert_eq!(session.released(), ["p1"]);
}
