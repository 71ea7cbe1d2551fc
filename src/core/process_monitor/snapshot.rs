//! Snapshot construction: one walk over the process table with per-process
//! error isolation, visibility filtering and app/background classification.

use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::metrics::{ProcessRecord, Snapshot};
use super::source::{ProcessError, ProcessSource};

pub const DEFAULT_RESERVED_PREFIXES: &[&str] = &["system", "idle", "svchost"];
pub const DEFAULT_PRIVILEGED_OWNERS: &[&str] = &["root", "admin"];

/// Which processes are visible at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    #[default]
    All,
    /// Owned by the current user
    Your,
    /// Not owned by a privileged account
    NonRoot,
    Running,
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::Your,
        FilterMode::NonRoot,
        FilterMode::Running,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FilterMode::All => "All",
            FilterMode::Your => "Your",
            FilterMode::NonRoot => "Non-root",
            FilterMode::Running => "Running",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(FilterMode::All),
            "your" | "mine" => Ok(FilterMode::Your),
            "non-root" | "nonroot" => Ok(FilterMode::NonRoot),
            "running" => Ok(FilterMode::Running),
            other => Err(format!(
                "unknown filter '{}', expected one of: all, your, non-root, running",
                other
            )),
        }
    }
}

/// Inputs that decide visibility and classification for one cycle.
#[derive(Debug, Clone)]
pub struct SnapshotQuery {
    pub filter: FilterMode,
    pub search: String,
    pub current_user: String,
    pub reserved_prefixes: Vec<String>,
    pub privileged_owners: Vec<String>,
}

impl SnapshotQuery {
    pub fn new(current_user: impl Into<String>) -> Self {
        Self {
            filter: FilterMode::All,
            search: String::new(),
            current_user: current_user.into(),
            reserved_prefixes: DEFAULT_RESERVED_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            privileged_owners: DEFAULT_PRIVILEGED_OWNERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn with_filter(mut self, filter: FilterMode, search: impl Into<String>) -> Self {
        self.filter = filter;
        self.search = search.into();
        self
    }

    /// Visibility test. Pure in (record, filter, search, current user).
    pub fn should_show(&self, record: &ProcessRecord) -> bool {
        if !self.search.is_empty()
            && !record
                .name
                .to_lowercase()
                .contains(&self.search.to_lowercase())
        {
            return false;
        }

        match self.filter {
            FilterMode::All => true,
            FilterMode::Your => record.owner == self.current_user,
            FilterMode::NonRoot => !self
                .privileged_owners
                .iter()
                .any(|owner| owner == &record.owner),
            FilterMode::Running => record.status.is_running(),
        }
    }

    /// Foreground "app" test; everything else visible is background.
    pub fn is_app(&self, record: &ProcessRecord) -> bool {
        if record.owner != self.current_user || !record.status.is_running() {
            return false;
        }
        let name = record.name.to_lowercase();
        !self
            .reserved_prefixes
            .iter()
            .any(|prefix| name.starts_with(&prefix.to_lowercase()))
    }
}

/// Walk the process table once and produce a classified snapshot.
pub fn build_snapshot(source: &mut dyn ProcessSource, query: &SnapshotQuery) -> Result<Snapshot> {
    let cpu_count = source.cpu_logical_count();
    let entries = source.list_processes()?;

    let mut snapshot = Snapshot::empty();

    for entry in entries {
        let raw = match entry {
            Ok(raw) => raw,
            Err(ProcessError::AccessDenied { .. }) => {
                snapshot.access_denied += 1;
                continue;
            }
            // Exited mid-scan
            Err(ProcessError::NoSuchProcess { .. }) => continue,
            Err(e) => {
                log::debug!("Skipping unreadable process: {}", e);
                continue;
            }
        };

        if raw.pid == 0 {
            continue;
        }

        let record = ProcessRecord::from_raw(raw, cpu_count);
        if !query.should_show(&record) {
            continue;
        }

        if query.is_app(&record) {
            snapshot.apps.push(record);
        } else {
            snapshot.background.push(record);
        }
    }

    snapshot.taken_at = Some(Instant::now());
    snapshot.taken_at_local = Some(chrono::Local::now());

    log::debug!(
        "Snapshot built: {} apps, {} background, {} denied",
        snapshot.apps.len(),
        snapshot.background.len(),
        snapshot.access_denied
    );

    Ok(snapshot)
}
