//! Capability interface over the OS process table.
//!
//! Everything that touches the operating system goes through [`ProcessSource`].
//! The production strategy lives in `crate::platform::SysinfoSource`; tests
//! plug in scripted sources.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Result;

/// Failure reading or acting on a single process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    #[error("access denied to process {pid}")]
    AccessDenied { pid: u32 },

    #[error("process {pid} no longer exists")]
    NoSuchProcess { pid: u32 },

    #[error("failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

/// One entry of an enumeration; each process may fail on its own.
pub type ProcessRead = std::result::Result<RawProcessInfo, ProcessError>;

/// Scheduling state as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessState {
    Running,
    Sleeping,
    Idle,
    Stopped,
    Zombie,
    Dead,
    Other(String),
}

impl ProcessState {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running)
    }

    /// True once the process can no longer be scheduled.
    pub fn has_exited(&self) -> bool {
        matches!(self, ProcessState::Zombie | ProcessState::Dead)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessState::Running => f.write_str("running"),
            ProcessState::Sleeping => f.write_str("sleeping"),
            ProcessState::Idle => f.write_str("idle"),
            ProcessState::Stopped => f.write_str("stopped"),
            ProcessState::Zombie => f.write_str("zombie"),
            ProcessState::Dead => f.write_str("dead"),
            ProcessState::Other(s) => f.write_str(s),
        }
    }
}

/// Process fields exactly as the OS reported them, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProcessInfo {
    pub pid: u32,
    pub name: String,
    pub username: String,
    /// Raw percentage; may exceed 100 on multi-core machines.
    pub cpu_percent: f32,
    pub memory_rss: u64,
    pub status: ProcessState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskIoCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetIoCounters {
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

/// Detailed view of one process, with an explicit field list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDetails {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub name: String,
    pub exe: Option<String>,
    pub command_line: Vec<String>,
    pub cwd: Option<String>,
    pub owner: Option<String>,
    pub status: String,
    /// Unix timestamp in seconds
    pub start_time: u64,
    pub run_time_secs: u64,
    pub cpu_percent: f32,
    pub memory_rss: u64,
    pub memory_virtual: u64,
    pub disk_read_bytes: u64,
    pub disk_written_bytes: u64,
}

/// OS capabilities required by the monitor core.
pub trait ProcessSource: Send {
    /// Enumerate every process. The outer error means the table could not be
    /// listed at all; inner errors are per process.
    fn list_processes(&mut self) -> Result<Vec<ProcessRead>>;

    /// Number of logical CPUs, never zero.
    fn cpu_logical_count(&self) -> usize;

    fn system_cpu_percent(&mut self) -> f32;

    fn system_memory_percent(&mut self) -> f32;

    fn disk_io_counters(&mut self) -> DiskIoCounters;

    fn net_io_counters(&mut self) -> NetIoCounters;

    /// Graceful termination request (SIGTERM or platform equivalent).
    fn terminate(&mut self, pid: u32) -> std::result::Result<(), ProcessError>;

    /// Forceful termination (SIGKILL or platform equivalent).
    fn kill(&mut self, pid: u32) -> std::result::Result<(), ProcessError>;

    /// Block until `pid` exits or `timeout` elapses. Returns true if it exited.
    fn wait_for_exit(&mut self, pid: u32, timeout: Duration) -> bool;

    /// Account name owning the monitor itself.
    fn current_user(&self) -> Option<String>;

    /// Total physical memory in bytes.
    fn total_memory(&self) -> u64;

    fn process_details(&mut self, pid: u32) -> std::result::Result<ProcessDetails, ProcessError>;
}
