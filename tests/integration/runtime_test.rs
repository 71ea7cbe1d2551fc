use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time::timeout;

use procwatch::core::config::Config;
use procwatch::core::process_monitor::{
    spawn_monitor, FilterMode, MonitorHandle, RuntimeOptions, SortMode, StatusLevel,
    ProcessState, StatusMessage, TerminationController, TerminationPhase,
};

use super::common::{raw, three_processes, Behavior, FakeSource};

const WAIT: Duration = Duration::from_secs(3);

fn options(interval_ms: u64) -> RuntimeOptions {
    let mut options = RuntimeOptions::from_config(&Config::default(), "alice");
    options.refresh_interval = Duration::from_millis(interval_ms);
    options.termination =
        TerminationController::new(Duration::from_millis(50), Duration::from_millis(50));
    options
}

/// Wait for the first published cycle.
async fn first_snapshot(handle: &MonitorHandle) {
    let mut snapshots = handle.watch_snapshots();
    timeout(WAIT, snapshots.wait_for(|s| s.taken_at.is_some()))
        .await
        .expect("timed out waiting for the first snapshot")
        .expect("snapshot channel closed");
}

/// Run `action` and wait for the snapshot it causes.
async fn after<F: FnOnce()>(handle: &MonitorHandle, action: F) {
    let mut snapshots = handle.watch_snapshots();
    snapshots.borrow_and_update();
    action();
    timeout(WAIT, snapshots.changed())
        .await
        .expect("timed out waiting for a snapshot")
        .expect("snapshot channel closed");
}

async fn eventually<F: FnMut() -> bool>(mut condition: F) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time")
}

async fn wait_for_status<F>(
    rx: &mut broadcast::Receiver<StatusMessage>,
    mut matches: F,
) -> StatusMessage
where
    F: FnMut(&StatusMessage) -> bool,
{
    timeout(WAIT, async {
        loop {
            match rx.recv().await {
                Ok(message) if matches(&message) => return message,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("status channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for status message")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduler_publishes_snapshots() {
    let fake = FakeSource::new("alice", three_processes());
    let handle = spawn_monitor(fake.boxed(), options(20));
    let mut status = handle.subscribe_status();

    first_snapshot(&handle).await;

    let snapshot = handle.current_snapshot();
    assert_eq!(snapshot.total(), 3);
    assert_eq!(handle.current_tables().apps.len(), 1);
    assert_eq!(handle.system_overview().current_user, "alice");
    assert_eq!(handle.system_overview().logical_cpus, 1);

    let summary = wait_for_status(&mut status, |m| m.text.starts_with("Apps: ")).await;
    assert_eq!(summary.level, StatusLevel::Info);

    // Scheduled cycles also feed the metrics series
    eventually(|| handle.current_series().cpu.len() >= 2).await;

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pause_suppresses_then_resumes() {
    let fake = FakeSource::new("alice", three_processes());
    let handle = spawn_monitor(fake.boxed(), options(20));
    let mut status = handle.subscribe_status();
    first_snapshot(&handle).await;

    handle.pause_auto_refresh(Some(Duration::from_millis(300)));
    wait_for_status(&mut status, |m| m.text == "Auto refresh paused for 300ms").await;

    // Let a cycle already in flight finish
    tokio::time::sleep(Duration::from_millis(60)).await;
    let calls_at_pause = fake.state.lock().list_calls;
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(fake.state.lock().list_calls, calls_at_pause);

    wait_for_status(&mut status, |m| m.text == "Auto refresh resumed").await;
    eventually(|| fake.state.lock().list_calls > calls_at_pause).await;

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refresh_now_reports_progress() {
    let fake = FakeSource::new("alice", three_processes());
    let handle = spawn_monitor(fake.boxed(), options(60_000));
    let mut status = handle.subscribe_status();
    first_snapshot(&handle).await;

    handle.refresh_now();
    wait_for_status(&mut status, |m| m.text == "Refreshing...").await;
    wait_for_status(&mut status, |m| m.text.starts_with("Refreshed at ")).await;

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_refresh_queued_behind_slow_cycle_wins() {
    for _ in 0..3 {
        // The scheduled first cycle sees pid 500 and takes 150 ms; every
        // listing after it sees pid 600 only.
        let newer = vec![raw(600, "newer", "alice", ProcessState::Running)];
        let older = vec![raw(500, "older", "alice", ProcessState::Running)];
        let fake =
            FakeSource::new("alice", newer).with_slow_list(Duration::from_millis(150), older);
        let handle = spawn_monitor(fake.boxed(), options(60_000));
        let mut status = handle.subscribe_status();

        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.refresh_now();
        wait_for_status(&mut status, |m| m.text.starts_with("Refreshed at ")).await;
        tokio::time::sleep(Duration::from_millis(250)).await;

        let snapshot = handle.current_snapshot();
        assert!(snapshot.find(600).is_some());
        assert!(snapshot.find(500).is_none());
        let pids: Vec<u32> = handle.current_tables().apps.iter().map(|r| r.pid).collect();
        assert_eq!(pids, vec![600]);
        assert_eq!(fake.state.lock().list_calls, 2);

        handle.shutdown();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_pause_is_acknowledged_during_slow_cycle() {
    let fake = FakeSource::new("alice", three_processes())
        .with_slow_list(Duration::from_millis(800), three_processes());
    let handle = spawn_monitor(fake.boxed(), options(20));
    let mut status = handle.subscribe_status();

    // The first scheduled cycle is now holding the engine
    tokio::time::sleep(Duration::from_millis(30)).await;
    let sent = Instant::now();
    handle.pause_auto_refresh(Some(Duration::from_secs(5)));
    wait_for_status(&mut status, |m| m.text == "Auto refresh paused for 5s").await;
    assert!(sent.elapsed() < Duration::from_millis(400));

    handle.set_sort_mode(SortMode::NameAsc);
    first_snapshot(&handle).await;
    eventually(|| handle.current_tables().sort_mode == SortMode::NameAsc).await;

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cycle_errors_become_status_messages() {
    let fake = FakeSource::new("alice", three_processes());
    fake.state.lock().list_fails = true;
    let handle = spawn_monitor(fake.boxed(), options(20));
    let mut status = handle.subscribe_status();

    let error = wait_for_status(&mut status, |m| m.text.starts_with("Error: ")).await;
    assert_eq!(error.level, StatusLevel::Error);
    assert!(error.text.contains("scripted failure"));

    // The schedule keeps running
    fake.state.lock().list_fails = false;
    first_snapshot(&handle).await;
    assert_eq!(handle.current_snapshot().total(), 3);

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_filter_and_sort_changes_refresh_immediately() {
    let fake = FakeSource::new("alice", three_processes());
    let handle = spawn_monitor(fake.boxed(), options(60_000));
    first_snapshot(&handle).await;
    assert_eq!(handle.current_snapshot().total(), 3);

    after(&handle, || handle.set_filter(FilterMode::Your, "")).await;
    assert_eq!(handle.current_snapshot().total(), 1);

    after(&handle, || handle.set_filter(FilterMode::All, "")).await;
    after(&handle, || handle.set_sort_mode(SortMode::NameAsc)).await;

    let tables = handle.current_tables();
    assert_eq!(tables.sort_mode, SortMode::NameAsc);
    let order: Vec<u32> = tables.background.iter().map(|r| r.pid).collect();
    assert_eq!(order, vec![501, 1]);

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_termination_confirms_and_refreshes() {
    let fake = FakeSource::new("alice", three_processes()).with_behavior(500, Behavior::ExitOnTerm);
    let handle = spawn_monitor(fake.boxed(), options(60_000));
    first_snapshot(&handle).await;

    let mut snapshots = handle.watch_snapshots();
    snapshots.borrow_and_update();

    let outcome = handle.request_termination(500).await.unwrap();
    assert_eq!(outcome.phase, TerminationPhase::Confirmed);
    assert_eq!(outcome.name, "editor");
    assert!(fake.state.lock().kill_calls.is_empty());

    timeout(WAIT, snapshots.changed()).await.unwrap().unwrap();
    assert!(handle.current_snapshot().find(500).is_none());

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_termination_escalation_is_announced() {
    let fake = FakeSource::new("alice", three_processes()).with_behavior(500, Behavior::Ignore);
    let handle = spawn_monitor(fake.boxed(), options(60_000));
    let mut status = handle.subscribe_status();
    first_snapshot(&handle).await;

    let outcome = handle.request_termination(500).await.unwrap();
    assert_eq!(outcome.phase, TerminationPhase::Failed);

    wait_for_status(&mut status, |m| {
        m.text == "Process editor not responding, forcing kill..."
    })
    .await;
    let failure = wait_for_status(&mut status, |m| m.level == StatusLevel::Error).await;
    assert_eq!(failure.text, "Could not terminate editor (PID 500)");

    handle.shutdown();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_process_details_lookup() {
    let fake = FakeSource::new("alice", three_processes());
    let handle = spawn_monitor(fake.boxed(), options(60_000));

    let details = handle.process_details(500).await.unwrap().unwrap();
    assert_eq!(details.name, "editor");
    assert!(handle.process_details(4242).await.unwrap().is_err());

    handle.shutdown();
}
