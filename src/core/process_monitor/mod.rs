//! Process monitoring core.
//!
//! Snapshot acquisition, classification, filtering, sorting, diff-refresh of
//! rendered tables, rolling system metrics and escalating termination, driven
//! by a pausable scheduler.

mod diff;
mod engine;
mod history;
mod metrics;
mod runtime;
mod snapshot;
mod sort;
mod source;
mod status;
mod termination;

pub use diff::{ReconcileReport, RowChange, RowValues, TableView};
pub use engine::{
    sample_system, CycleKind, CycleReport, EngineSettings, MonitorEngine, PauseGate, PauseState,
    TableFrame,
};
pub use history::{MetricSeries, MetricsHistory, DEFAULT_HISTORY_SIZE};
pub use metrics::{normalize_cpu, CpuLoad, ProcessRecord, Snapshot, SystemOverview, SystemSample};
pub use runtime::{spawn_monitor, MonitorHandle, MonitorRuntime, RuntimeOptions};
pub use snapshot::{
    build_snapshot, FilterMode, SnapshotQuery, DEFAULT_PRIVILEGED_OWNERS,
    DEFAULT_RESERVED_PREFIXES,
};
pub use sort::{sort_records, sorted, SortMode};
pub use source::{
    DiskIoCounters, NetIoCounters, ProcessDetails, ProcessError, ProcessRead, ProcessSource,
    ProcessState, RawProcessInfo,
};
pub use status::{cycle_summary, StatusLevel, StatusMessage};
pub use termination::{
    TerminationController, TerminationOutcome, TerminationPhase, TerminationRequest,
    DEFAULT_FORCE_TIMEOUT, DEFAULT_GRACEFUL_TIMEOUT,
};
