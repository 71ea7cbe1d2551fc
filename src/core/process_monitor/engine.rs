//! Synchronous refresh engine.
//!
//! [`MonitorEngine`] owns the cycle state: filter and sort selection, the two
//! rendered tables and the metrics history. The async runtime serializes
//! access to it behind a mutex and calls [`MonitorEngine::run_cycle`] from
//! blocking worker threads. The pause deadline lives apart from it in a
//! [`PauseGate`], so the scheduler can check it without waiting on a cycle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::Result;

use super::diff::{ReconcileReport, RowValues, TableView};
use super::history::{MetricSeries, MetricsHistory};
use super::metrics::{Snapshot, SystemSample};
use super::snapshot::{build_snapshot, FilterMode, SnapshotQuery};
use super::sort::{sort_records, SortMode};
use super::source::ProcessSource;
use super::status::cycle_summary;

/// Why a cycle runs. Manual cycles skip the metrics tick so rates stay
/// "per scheduled interval".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
    Scheduled,
    Manual,
}

/// Result of polling the pause deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseState {
    Active,
    Paused,
    /// The deadline passed on this poll; reported once.
    Resumed,
}

/// Auto-refresh suspension deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseGate {
    paused_until: Option<Instant>,
}

impl PauseGate {
    /// Suspend until `now + duration`. A later call replaces the deadline.
    pub fn pause(&mut self, now: Instant, duration: Duration) {
        self.paused_until = Some(now + duration);
    }

    pub fn is_paused(&self, now: Instant) -> bool {
        matches!(self.paused_until, Some(deadline) if now < deadline)
    }

    /// Check the deadline, clearing it once it has passed.
    pub fn poll(&mut self, now: Instant) -> PauseState {
        match self.paused_until {
            Some(deadline) if now < deadline => PauseState::Paused,
            Some(_) => {
                self.paused_until = None;
                PauseState::Resumed
            }
            None => PauseState::Active,
        }
    }
}

/// Row contents of both tables, as handed to the front end.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TableFrame {
    pub apps: Vec<RowValues>,
    pub background: Vec<RowValues>,
    pub sort_mode: SortMode,
    pub filter: FilterMode,
    pub search: String,
    pub apps_scroll: f32,
    pub background_scroll: f32,
}

/// Everything one cycle produced.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub snapshot: Arc<Snapshot>,
    pub apps: ReconcileReport,
    pub background: ReconcileReport,
    pub series: Option<Arc<MetricSeries>>,
    pub tables: Arc<TableFrame>,
    pub summary: String,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub current_user: String,
    pub reserved_prefixes: Vec<String>,
    pub privileged_owners: Vec<String>,
    pub history_capacity: usize,
    pub tip_threshold: usize,
    pub filter: FilterMode,
    pub search: String,
    pub sort_mode: SortMode,
}

pub struct MonitorEngine {
    query: SnapshotQuery,
    sort_mode: SortMode,
    /// Sort mode of the last rendered cycle; None before the first one.
    rendered_sort: Option<SortMode>,
    apps: TableView,
    background: TableView,
    history: MetricsHistory,
    tip_threshold: usize,
    cycles: u64,
}

impl MonitorEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let mut query = SnapshotQuery::new(settings.current_user)
            .with_filter(settings.filter, settings.search);
        query.reserved_prefixes = settings.reserved_prefixes;
        query.privileged_owners = settings.privileged_owners;

        Self {
            query,
            sort_mode: settings.sort_mode,
            rendered_sort: None,
            apps: TableView::new(),
            background: TableView::new(),
            history: MetricsHistory::with_capacity(settings.history_capacity),
            tip_threshold: settings.tip_threshold,
            cycles: 0,
        }
    }

    pub fn query(&self) -> &SnapshotQuery {
        &self.query
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn set_filter(&mut self, filter: FilterMode, search: impl Into<String>) {
        self.query.filter = filter;
        self.query.search = search.into();
    }

    /// Takes effect on the next cycle, which will fully rebuild both tables.
    pub fn set_sort_mode(&mut self, mode: SortMode) {
        self.sort_mode = mode;
    }

    pub fn apps_table(&self) -> &TableView {
        &self.apps
    }

    pub fn background_table(&self) -> &TableView {
        &self.background
    }

    pub fn apps_table_mut(&mut self) -> &mut TableView {
        &mut self.apps
    }

    pub fn background_table_mut(&mut self) -> &mut TableView {
        &mut self.background
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    /// Snapshot, sort, diff and (for scheduled cycles) metrics tick.
    pub fn run_cycle(
        &mut self,
        source: &mut dyn ProcessSource,
        kind: CycleKind,
    ) -> Result<CycleReport> {
        let mut snapshot = build_snapshot(source, &self.query)?;

        sort_records(&mut snapshot.apps, self.sort_mode);
        sort_records(&mut snapshot.background, self.sort_mode);

        let full_refresh =
            matches!(self.rendered_sort, Some(previous) if previous != self.sort_mode);
        if full_refresh {
            log::debug!("Sort mode changed to {}, rebuilding tables", self.sort_mode);
        }

        let apps = self.apps.reconcile(&snapshot.apps, full_refresh);
        let background = self.background.reconcile(&snapshot.background, full_refresh);
        self.rendered_sort = Some(self.sort_mode);

        let series = match kind {
            CycleKind::Scheduled => {
                self.history.tick(sample_system(source));
                Some(Arc::new(self.history.series()))
            }
            CycleKind::Manual => None,
        };

        let summary = cycle_summary(&snapshot, self.tip_threshold, chrono::Local::now());
        self.cycles += 1;

        Ok(CycleReport {
            snapshot: Arc::new(snapshot),
            apps,
            background,
            series,
            tables: Arc::new(self.table_frame()),
            summary,
        })
    }

    pub fn table_frame(&self) -> TableFrame {
        TableFrame {
            apps: self.apps.rows().to_vec(),
            background: self.background.rows().to_vec(),
            sort_mode: self.sort_mode,
            filter: self.query.filter,
            search: self.query.search.clone(),
            apps_scroll: self.apps.scroll_fraction(),
            background_scroll: self.background.scroll_fraction(),
        }
    }
}

/// Read the system-wide counters for one metrics tick.
pub fn sample_system(source: &mut dyn ProcessSource) -> SystemSample {
    SystemSample {
        cpu_percent: source.system_cpu_percent(),
        memory_percent: source.system_memory_percent(),
        disk: source.disk_io_counters(),
        net: source.net_io_counters(),
    }
}
