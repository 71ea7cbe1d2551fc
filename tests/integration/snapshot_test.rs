use procwatch::core::process_monitor::{
    build_snapshot, FilterMode, ProcessError, ProcessState, SnapshotQuery,
};

use super::common::{raw, three_processes, FakeSource};

fn pids(records: &[procwatch::core::process_monitor::ProcessRecord]) -> Vec<u32> {
    records.iter().map(|r| r.pid).collect()
}

#[test]
fn test_reserved_prefix_goes_to_background() {
    let mut source = FakeSource::new("alice", three_processes());
    let query = SnapshotQuery::new("alice");

    let snapshot = build_snapshot(&mut source, &query).unwrap();

    assert_eq!(pids(&snapshot.apps), vec![500]);
    assert_eq!(pids(&snapshot.background), vec![1, 501]);
    assert_eq!(snapshot.access_denied, 0);
    assert_eq!(snapshot.total(), 3);
}

#[test]
fn test_your_filter_drops_other_owners() {
    let mut source = FakeSource::new("alice", three_processes());
    let query = SnapshotQuery::new("alice").with_filter(FilterMode::Your, "");

    let snapshot = build_snapshot(&mut source, &query).unwrap();

    assert_eq!(pids(&snapshot.apps), vec![500]);
    assert!(snapshot.background.is_empty());
}

#[test]
fn test_non_root_and_running_filters() {
    let mut source = FakeSource::new("alice", three_processes());

    let non_root = SnapshotQuery::new("alice").with_filter(FilterMode::NonRoot, "");
    let snapshot = build_snapshot(&mut source, &non_root).unwrap();
    assert_eq!(snapshot.total(), 1);

    let running = SnapshotQuery::new("alice").with_filter(FilterMode::Running, "");
    let snapshot = build_snapshot(&mut source, &running).unwrap();
    assert_eq!(pids(&snapshot.apps), vec![500]);
    assert_eq!(pids(&snapshot.background), vec![1]);
}

#[test]
fn test_search_is_case_insensitive_substring() {
    let mut source = FakeSource::new("alice", three_processes());
    let query = SnapshotQuery::new("alice").with_filter(FilterMode::All, "EDIT");

    let snapshot = build_snapshot(&mut source, &query).unwrap();

    assert_eq!(pids(&snapshot.apps), vec![500]);
    assert_eq!(snapshot.total(), 1);
}

#[test]
fn test_apps_and_background_are_disjoint() {
    let mut processes = three_processes();
    processes.push(raw(600, "browser", "alice", ProcessState::Sleeping));
    processes.push(raw(601, "shell", "alice", ProcessState::Running));
    let mut source = FakeSource::new("alice", processes);

    let snapshot = build_snapshot(&mut source, &SnapshotQuery::new("alice")).unwrap();

    for app in &snapshot.apps {
        assert!(snapshot.background.iter().all(|b| b.pid != app.pid));
    }
    assert_eq!(snapshot.total(), 5);
    // Not running, so not an app
    assert!(snapshot.background.iter().any(|b| b.pid == 600));
}

#[test]
fn test_access_denied_counted_and_exited_skipped() {
    let mut processes = three_processes();
    processes.push(Err(ProcessError::AccessDenied { pid: 700 }));
    processes.push(Err(ProcessError::AccessDenied { pid: 701 }));
    processes.push(Err(ProcessError::NoSuchProcess { pid: 702 }));
    processes.push(raw(0, "kernel", "root", ProcessState::Running));
    let mut source = FakeSource::new("alice", processes);

    let snapshot = build_snapshot(&mut source, &SnapshotQuery::new("alice")).unwrap();

    assert_eq!(snapshot.access_denied, 2);
    assert_eq!(snapshot.total(), 3);
    assert!(snapshot.find(0).is_none());
}

#[test]
fn test_enumeration_failure_propagates() {
    let mut source = FakeSource::new("alice", three_processes());
    source.state.lock().list_fails = true;

    assert!(build_snapshot(&mut source, &SnapshotQuery::new("alice")).is_err());
}
