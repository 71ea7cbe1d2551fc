//! Scripted in-memory process table shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use procwatch::core::process_monitor::{
    DiskIoCounters, NetIoCounters, ProcessDetails, ProcessError, ProcessRead, ProcessSource,
    ProcessState, RawProcessInfo,
};
use procwatch::error::{MonitorError, Result};

/// How a scripted process reacts to signals.
#[derive(Debug, Clone, PartialEq)]
pub enum Behavior {
    ExitOnTerm,
    ExitOnKill,
    /// Accepts both signals and keeps running
    Ignore,
    DenyTerm,
    Gone,
    KillFails,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub processes: Vec<ProcessRead>,
    pub list_fails: bool,
    pub cpu_count: usize,
    pub cpu_percent: f32,
    pub memory_percent: f32,
    pub disk: DiskIoCounters,
    pub net: NetIoCounters,
    pub behaviors: HashMap<u32, Behavior>,
    pub exited: HashSet<u32>,
    pub terminate_calls: Vec<u32>,
    pub kill_calls: Vec<u32>,
    pub list_calls: usize,
    pub metric_samples: usize,
    /// The next listing sleeps for the delay and returns these processes.
    pub slow_list: Option<(Duration, Vec<ProcessRead>)>,
}

/// Cloneable handle; tests keep one copy and hand a boxed clone to the engine.
#[derive(Clone)]
pub struct FakeSource {
    pub state: Arc<Mutex<FakeState>>,
    user: String,
}

impl FakeSource {
    pub fn new(user: &str, processes: Vec<ProcessRead>) -> Self {
        let state = FakeState {
            processes,
            cpu_count: 1,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            user: user.to_string(),
        }
    }

    pub fn with_behavior(self, pid: u32, behavior: Behavior) -> Self {
        self.state.lock().behaviors.insert(pid, behavior);
        self
    }

    pub fn set_processes(&self, processes: Vec<ProcessRead>) {
        self.state.lock().processes = processes;
    }

    pub fn with_slow_list(self, delay: Duration, processes: Vec<ProcessRead>) -> Self {
        self.state.lock().slow_list = Some((delay, processes));
        self
    }

    pub fn boxed(&self) -> Box<dyn ProcessSource> {
        Box::new(self.clone())
    }

    fn behavior(&self, pid: u32) -> Option<Behavior> {
        self.state.lock().behaviors.get(&pid).cloned()
    }
}

pub fn raw(pid: u32, name: &str, user: &str, status: ProcessState) -> ProcessRead {
    Ok(RawProcessInfo {
        pid,
        name: name.to_string(),
        username: user.to_string(),
        cpu_percent: 0.0,
        memory_rss: 0,
        status,
    })
}

pub fn raw_with_usage(
    pid: u32,
    name: &str,
    user: &str,
    cpu_percent: f32,
    memory_rss: u64,
) -> ProcessRead {
    Ok(RawProcessInfo {
        pid,
        name: name.to_string(),
        username: user.to_string(),
        cpu_percent,
        memory_rss,
        status: ProcessState::Running,
    })
}

/// The three-process table used across the snapshot tests.
pub fn three_processes() -> Vec<ProcessRead> {
    vec![
        raw(1, "system_idle", "root", ProcessState::Running),
        raw(500, "editor", "alice", ProcessState::Running),
        raw(501, "sync", "root", ProcessState::Sleeping),
    ]
}

impl ProcessSource for FakeSource {
    fn list_processes(&mut self) -> Result<Vec<ProcessRead>> {
        let mut state = self.state.lock();
        state.list_calls += 1;
        if let Some((delay, processes)) = state.slow_list.take() {
            drop(state);
            std::thread::sleep(delay);
            return Ok(processes);
        }
        if state.list_fails {
            return Err(MonitorError::enumeration("scripted failure"));
        }
        let exited = state.exited.clone();
        Ok(state
            .processes
            .iter()
            .filter(|entry| match entry {
                Ok(info) => !exited.contains(&info.pid),
                Err(_) => true,
            })
            .cloned()
            .collect())
    }

    fn cpu_logical_count(&self) -> usize {
        self.state.lock().cpu_count.max(1)
    }

    fn system_cpu_percent(&mut self) -> f32 {
        let mut state = self.state.lock();
        state.metric_samples += 1;
        state.cpu_percent
    }

    fn system_memory_percent(&mut self) -> f32 {
        self.state.lock().memory_percent
    }

    fn disk_io_counters(&mut self) -> DiskIoCounters {
        self.state.lock().disk
    }

    fn net_io_counters(&mut self) -> NetIoCounters {
        self.state.lock().net
    }

    fn terminate(&mut self, pid: u32) -> std::result::Result<(), ProcessError> {
        let behavior = self.behavior(pid);
        let mut state = self.state.lock();
        state.terminate_calls.push(pid);
        match behavior {
            Some(Behavior::Gone) => Err(ProcessError::NoSuchProcess { pid }),
            Some(Behavior::DenyTerm) => Err(ProcessError::AccessDenied { pid }),
            Some(Behavior::ExitOnTerm) => {
                state.exited.insert(pid);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn kill(&mut self, pid: u32) -> std::result::Result<(), ProcessError> {
        let behavior = self.behavior(pid);
        let mut state = self.state.lock();
        state.kill_calls.push(pid);
        match behavior {
            Some(Behavior::Gone) => Err(ProcessError::NoSuchProcess { pid }),
            Some(Behavior::KillFails) => Err(ProcessError::Signal {
                pid,
                reason: "operation not permitted".to_string(),
            }),
            Some(Behavior::ExitOnKill) => {
                state.exited.insert(pid);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn wait_for_exit(&mut self, pid: u32, _timeout: Duration) -> bool {
        self.state.lock().exited.contains(&pid)
    }

    fn current_user(&self) -> Option<String> {
        Some(self.user.clone())
    }

    fn total_memory(&self) -> u64 {
        16 * 1024 * 1024 * 1024
    }

    fn process_details(&mut self, pid: u32) -> std::result::Result<ProcessDetails, ProcessError> {
        let state = self.state.lock();
        state
            .processes
            .iter()
            .filter_map(|entry| entry.as_ref().ok())
            .find(|info| info.pid == pid && !state.exited.contains(&pid))
            .map(|info| ProcessDetails {
                pid,
                name: info.name.clone(),
                owner: Some(info.username.clone()),
                status: info.status.to_string(),
                cpu_percent: info.cpu_percent,
                memory_rss: info.memory_rss,
                ..Default::default()
            })
            .ok_or(ProcessError::NoSuchProcess { pid })
    }
}
