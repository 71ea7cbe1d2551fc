use std::time::Instant;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::source::{DiskIoCounters, NetIoCounters, ProcessState, RawProcessInfo};

/// One process at one sampling instant. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub name: String,
    pub owner: String,
    /// Normalized to a single machine: 0..=100
    pub cpu_percent: f32,
    pub memory_bytes: u64,
    pub status: ProcessState,
}

impl ProcessRecord {
    pub fn from_raw(raw: RawProcessInfo, cpu_count: usize) -> Self {
        Self {
            pid: raw.pid,
            cpu_percent: normalize_cpu(raw.cpu_percent, cpu_count),
            name: raw.name,
            owner: raw.username,
            memory_bytes: raw.memory_rss,
            status: raw.status,
        }
    }

    pub fn cpu_load(&self) -> CpuLoad {
        CpuLoad::from_percent(self.cpu_percent)
    }
}

/// Divide a raw per-core percentage by the logical CPU count and clamp into 0..=100.
pub fn normalize_cpu(raw_percent: f32, cpu_count: usize) -> f32 {
    if raw_percent.is_nan() || raw_percent <= 0.0 {
        return 0.0;
    }
    let normalized = raw_percent / cpu_count.max(1) as f32;
    normalized.min(100.0)
}

/// Coarse CPU level so a front end can highlight busy rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CpuLoad {
    Normal,
    Elevated,
    High,
    Hot,
}

impl CpuLoad {
    pub fn from_percent(percent: f32) -> Self {
        if percent > 30.0 {
            CpuLoad::Hot
        } else if percent > 20.0 {
            CpuLoad::High
        } else if percent > 10.0 {
            CpuLoad::Elevated
        } else {
            CpuLoad::Normal
        }
    }
}

/// One cycle's classified, filtered process set.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub apps: Vec<ProcessRecord>,
    pub background: Vec<ProcessRecord>,
    pub access_denied: usize,
    #[serde(skip)]
    pub taken_at: Option<Instant>,
    pub taken_at_local: Option<DateTime<Local>>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self {
            apps: Vec::new(),
            background: Vec::new(),
            access_denied: 0,
            taken_at: None,
            taken_at_local: None,
        }
    }

    pub fn total(&self) -> usize {
        self.apps.len() + self.background.len()
    }

    pub fn find(&self, pid: u32) -> Option<&ProcessRecord> {
        self.apps
            .iter()
            .chain(self.background.iter())
            .find(|record| record.pid == pid)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Raw system-wide readings taken once per cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSample {
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk: DiskIoCounters,
    pub net: NetIoCounters,
}

/// Static facts about the host, computed once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemOverview {
    pub current_user: String,
    pub logical_cpus: usize,
    /// GiB, rounded to one decimal
    pub total_memory_gb: f64,
}

impl SystemOverview {
    pub fn new(current_user: String, logical_cpus: usize, total_memory_bytes: u64) -> Self {
        let gb = total_memory_bytes as f64 / (1024.0 * 1024.0 * 1024.0);
        Self {
            current_user,
            logical_cpus,
            total_memory_gb: (gb * 10.0).round() / 10.0,
        }
    }
}
