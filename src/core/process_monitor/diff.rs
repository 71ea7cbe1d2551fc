//! Diff-refresh of a rendered process table.
//!
//! A [`TableView`] holds the rows a front end currently displays plus a
//! `pid -> RowValues` cache. Reconciling against a fresh, sorted record list
//! touches only rows whose values changed unless a full rebuild is requested.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::metrics::{CpuLoad, ProcessRecord};

/// Values shown in one table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowValues {
    pub pid: u32,
    pub name: String,
    pub owner: String,
    pub cpu: String,
    pub cpu_load: CpuLoad,
    pub memory: String,
    pub status: String,
}

impl RowValues {
    pub fn from_record(record: &ProcessRecord) -> Self {
        Self {
            pid: record.pid,
            name: record.name.clone(),
            owner: record.owner.clone(),
            cpu: format!("{:.1}%", record.cpu_percent),
            cpu_load: record.cpu_load(),
            memory: format!("{} MB", record.memory_bytes / (1024 * 1024)),
            status: record.status.to_string(),
        }
    }
}

/// One edit a front end applies to its widget.
///
/// Changes replay in order against the previously displayed rows. Every
/// `index` is a position in the list as it stands after the earlier changes
/// were applied, and also the row's final position. Replaying the whole list
/// yields exactly the new row order, including rows that only moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowChange {
    /// Delete the row for `pid`.
    Removed { pid: u32 },
    /// Take the row for `pid`, refresh its values and place it at `index`.
    Updated { pid: u32, index: usize },
    /// Take the row for `pid` unchanged and place it at `index`.
    Moved { pid: u32, index: usize },
    /// Insert a new row for `pid` at `index`.
    Inserted { pid: u32, index: usize },
}

/// Summary of one reconcile pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub rebuilt: bool,
    pub removed: Vec<u32>,
    pub updated: Vec<u32>,
    pub moved: Vec<u32>,
    pub inserted: Vec<u32>,
    pub unchanged: usize,
    pub changes: Vec<RowChange>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        !self.rebuilt && self.changes.is_empty()
    }
}

/// Rendered state of a single process table.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    rows: Vec<RowValues>,
    cache: HashMap<u32, RowValues>,
    /// Fraction of the content scrolled past, 0.0..=1.0
    scroll: f32,
}

impl TableView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[RowValues] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cached(&self, pid: u32) -> Option<&RowValues> {
        self.cache.get(&pid)
    }

    pub fn scroll_fraction(&self) -> f32 {
        self.scroll
    }

    pub fn set_scroll_fraction(&mut self, fraction: f32) {
        self.scroll = clamp_fraction(fraction);
    }

    /// Bring the displayed rows in line with `records`.
    ///
    /// `full_refresh` clears and re-inserts every row. Otherwise vanished pids
    /// are removed, new pids inserted, and surviving rows are updated or moved
    /// only when their values or position changed. Either way the final row
    /// order equals the order of `records`.
    pub fn reconcile(&mut self, records: &[ProcessRecord], full_refresh: bool) -> ReconcileReport {
        let scroll = self.scroll;

        let report = if full_refresh {
            self.rebuild(records)
        } else {
            self.apply_diff(records)
        };

        self.scroll = clamp_fraction(scroll);
        report
    }

    fn rebuild(&mut self, records: &[ProcessRecord]) -> ReconcileReport {
        self.rows.clear();
        self.cache.clear();

        let mut report = ReconcileReport {
            rebuilt: true,
            ..Default::default()
        };

        for (index, record) in records.iter().enumerate() {
            let values = RowValues::from_record(record);
            self.cache.insert(record.pid, values.clone());
            self.rows.push(values);
            report.inserted.push(record.pid);
            report.changes.push(RowChange::Inserted {
                pid: record.pid,
                index,
            });
        }

        report
    }

    fn apply_diff(&mut self, records: &[ProcessRecord]) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        let incoming: HashSet<u32> = records.iter().map(|r| r.pid).collect();

        // Removals first, in current display order
        for row in &self.rows {
            if !incoming.contains(&row.pid) {
                report.removed.push(row.pid);
                report.changes.push(RowChange::Removed { pid: row.pid });
            }
        }

        // Display order as a replaying widget sees it
        let mut order: Vec<u32> = self
            .rows
            .iter()
            .map(|row| row.pid)
            .filter(|pid| incoming.contains(pid))
            .collect();

        let mut rows = Vec::with_capacity(records.len());
        let mut cache = HashMap::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            let values = RowValues::from_record(record);
            match self.cache.get(&record.pid) {
                Some(previous) => {
                    let in_place = order.get(index) == Some(&record.pid);
                    if !in_place {
                        let found = order[index..].iter().position(|&p| p == record.pid);
                        if let Some(offset) = found {
                            order.remove(index + offset);
                        }
                        order.insert(index, record.pid);
                    }

                    if *previous != values {
                        report.updated.push(record.pid);
                        report.changes.push(RowChange::Updated {
                            pid: record.pid,
                            index,
                        });
                    } else if !in_place {
                        report.moved.push(record.pid);
                        report.changes.push(RowChange::Moved {
                            pid: record.pid,
                            index,
                        });
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => {
                    order.insert(index, record.pid);
                    report.inserted.push(record.pid);
                    report.changes.push(RowChange::Inserted {
                        pid: record.pid,
                        index,
                    });
                }
            }
            cache.insert(record.pid, values.clone());
            rows.push(values);
        }

        self.rows = rows;
        self.cache = cache;
        report
    }
}

fn clamp_fraction(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
