use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::metrics::ProcessRecord;

/// Row ordering for both process tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortMode {
    /// Enumeration order
    #[default]
    Default,
    NameAsc,
    NameDesc,
    MemAsc,
    MemDesc,
    CpuAsc,
    CpuDesc,
}

impl SortMode {
    pub fn label(&self) -> &'static str {
        match self {
            SortMode::Default => "Default",
            SortMode::NameAsc => "Name A-Z",
            SortMode::NameDesc => "Name Z-A",
            SortMode::MemAsc => "Memory Min-Max",
            SortMode::MemDesc => "Memory Max-Min",
            SortMode::CpuAsc => "CPU Min-Max",
            SortMode::CpuDesc => "CPU Max-Min",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "none" => Ok(SortMode::Default),
            "name" | "name-asc" => Ok(SortMode::NameAsc),
            "name-desc" => Ok(SortMode::NameDesc),
            "mem" | "mem-asc" | "memory-asc" => Ok(SortMode::MemAsc),
            "mem-desc" | "memory-desc" => Ok(SortMode::MemDesc),
            "cpu" | "cpu-asc" => Ok(SortMode::CpuAsc),
            "cpu-desc" => Ok(SortMode::CpuDesc),
            other => Err(format!(
                "unknown sort mode '{}', expected one of: default, name-asc, name-desc, mem-asc, mem-desc, cpu-asc, cpu-desc",
                other
            )),
        }
    }
}

fn compare(a: &ProcessRecord, b: &ProcessRecord, mode: SortMode) -> Ordering {
    match mode {
        SortMode::Default => Ordering::Equal,
        SortMode::NameAsc => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortMode::NameDesc => b.name.to_lowercase().cmp(&a.name.to_lowercase()),
        SortMode::MemAsc => a.memory_bytes.cmp(&b.memory_bytes),
        SortMode::MemDesc => b.memory_bytes.cmp(&a.memory_bytes),
        SortMode::CpuAsc => a.cpu_percent.total_cmp(&b.cpu_percent),
        SortMode::CpuDesc => b.cpu_percent.total_cmp(&a.cpu_percent),
    }
}

/// Sort in place. Stable: equal keys keep their input order, including for
/// the descending modes.
pub fn sort_records(records: &mut [ProcessRecord], mode: SortMode) {
    if mode == SortMode::Default {
        return;
    }
    records.sort_by(|a, b| compare(a, b, mode));
}

pub fn sorted(mut records: Vec<ProcessRecord>, mode: SortMode) -> Vec<ProcessRecord> {
    sort_records(&mut records, mode);
    records
}
