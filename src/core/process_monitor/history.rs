use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::metrics::SystemSample;
use super::source::{DiskIoCounters, NetIoCounters};

pub const DEFAULT_HISTORY_SIZE: usize = 60;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Read-only copy of the rolling series handed to the front end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    /// MB per update interval
    pub disk_rate: Vec<f64>,
    /// MB received per update interval
    pub net_rate: Vec<f64>,
}

/// Circular buffer for storing metric history (for charts)
#[derive(Debug, Clone)]
pub struct MetricsHistory {
    capacity: usize,
    pub cpu_usage: VecDeque<f64>,
    pub memory_usage: VecDeque<f64>,
    pub disk_rate: VecDeque<f64>,
    pub net_rate: VecDeque<f64>,
    last_disk: Option<DiskIoCounters>,
    last_net: Option<NetIoCounters>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            cpu_usage: VecDeque::with_capacity(capacity),
            memory_usage: VecDeque::with_capacity(capacity),
            disk_rate: VecDeque::with_capacity(capacity),
            net_rate: VecDeque::with_capacity(capacity),
            last_disk: None,
            last_net: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.cpu_usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_usage.is_empty()
    }

    /// Record one cycle. Disk and network become rates against the previous
    /// tick's counters; the first tick records 0.
    pub fn tick(&mut self, sample: SystemSample) {
        let disk_rate = match self.last_disk {
            Some(prev) => {
                let read = sample.disk.read_bytes.saturating_sub(prev.read_bytes);
                let write = sample.disk.write_bytes.saturating_sub(prev.write_bytes);
                (read + write) as f64 / BYTES_PER_MB
            }
            None => 0.0,
        };
        self.last_disk = Some(sample.disk);

        let net_rate = match self.last_net {
            Some(prev) => {
                sample.net.bytes_recv.saturating_sub(prev.bytes_recv) as f64 / BYTES_PER_MB
            }
            None => 0.0,
        };
        self.last_net = Some(sample.net);

        let capacity = self.capacity;
        Self::push_value(&mut self.cpu_usage, sample.cpu_percent as f64, capacity);
        Self::push_value(&mut self.memory_usage, sample.memory_percent as f64, capacity);
        Self::push_value(&mut self.disk_rate, disk_rate, capacity);
        Self::push_value(&mut self.net_rate, net_rate, capacity);
    }

    fn push_value<T>(queue: &mut VecDeque<T>, value: T, capacity: usize) {
        if queue.len() >= capacity {
            queue.pop_front();
        }
        queue.push_back(value);
    }

    pub fn series(&self) -> MetricSeries {
        MetricSeries {
            cpu: self.cpu_usage.iter().copied().collect(),
            memory: self.memory_usage.iter().copied().collect(),
            disk_rate: self.disk_rate.iter().copied().collect(),
            net_rate: self.net_rate.iter().copied().collect(),
        }
    }
}

impl Default for MetricsHistory {
    fn default() -> Self {
        Self::new()
    }
}
