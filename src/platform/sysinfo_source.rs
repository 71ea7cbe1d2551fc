//! `ProcessSource` backed by the `sysinfo` crate (Linux, macOS, Windows).

use std::time::{Duration, Instant};

use sysinfo::{
    CpuRefreshKind, Disks, MemoryRefreshKind, Networks, Pid, Process, ProcessRefreshKind,
    ProcessStatus, ProcessesToUpdate, RefreshKind, Signal, System, UpdateKind, Users,
};

use crate::core::process_monitor::{
    DiskIoCounters, NetIoCounters, ProcessDetails, ProcessError, ProcessRead, ProcessSource,
    ProcessState, RawProcessInfo,
};
use crate::error::{MonitorError, Result};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct SysinfoSource {
    system: System,
    users: Users,
    disks: Disks,
    networks: Networks,
    cpu_count: usize,
    current_user: Option<String>,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::everything())
            .with_memory(MemoryRefreshKind::everything());

        let mut system = System::new_with_specifics(refresh_kind);
        let users = Users::new_with_refreshed_list();
        let cpu_count = system.cpus().len().max(1);

        let current_user = sysinfo::get_current_pid()
            .ok()
            .and_then(|pid| {
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::nothing().with_user(UpdateKind::Always),
                );
                system.process(pid).and_then(|p| p.user_id().cloned())
            })
            .and_then(|uid| users.get_user_by_id(&uid).map(|u| u.name().to_string()))
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok());

        Self {
            system,
            users,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
            cpu_count,
            current_user,
        }
    }

    fn list_refresh_kind() -> ProcessRefreshKind {
        ProcessRefreshKind::nothing()
            .with_cpu()
            .with_memory()
            .with_user(UpdateKind::OnlyIfNotSet)
    }

    fn refresh_one(&mut self, pid: Pid, kind: ProcessRefreshKind) {
        self.system
            .refresh_processes_specifics(ProcessesToUpdate::Some(&[pid]), true, kind);
    }

    fn has_exited(&self, pid: Pid) -> bool {
        self.system
            .process(pid)
            .map_or(true, |p| map_status(p.status()).has_exited())
    }

    fn owner_name(&self, process: &Process) -> Option<String> {
        process.user_id().map(|uid| {
            self.users
                .get_user_by_id(uid)
                .map(|user| user.name().to_string())
                .unwrap_or_else(|| uid.to_string())
        })
    }

    fn read_process(&self, process: &Process) -> ProcessRead {
        let pid = process.pid().as_u32();

        // An unreadable owner means /proc (or the platform equivalent) refused us
        let username = self
            .owner_name(process)
            .ok_or(ProcessError::AccessDenied { pid })?;

        Ok(RawProcessInfo {
            pid,
            name: process.name().to_string_lossy().to_string(),
            username,
            cpu_percent: process.cpu_usage(),
            memory_rss: process.memory(),
            status: map_status(process.status()),
        })
    }

    /// After a failed signal: gone means it exited, still present means we
    /// were not allowed to signal it.
    fn signal_failure(&mut self, pid: u32) -> ProcessError {
        let spid = Pid::from_u32(pid);
        self.refresh_one(spid, ProcessRefreshKind::nothing());
        if self.has_exited(spid) {
            ProcessError::NoSuchProcess { pid }
        } else {
            ProcessError::AccessDenied { pid }
        }
    }

    fn send_signal(&mut self, pid: u32, signal: Signal) -> std::result::Result<(), ProcessError> {
        let spid = Pid::from_u32(pid);
        self.refresh_one(spid, ProcessRefreshKind::nothing());

        let process = self
            .system
            .process(spid)
            .ok_or(ProcessError::NoSuchProcess { pid })?;

        let delivered = match process.kill_with(signal) {
            Some(delivered) => delivered,
            // Signal not supported on this platform; fall back to the native kill
            None => process.kill(),
        };

        if delivered {
            Ok(())
        } else {
            Err(self.signal_failure(pid))
        }
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSource for SysinfoSource {
    fn list_processes(&mut self) -> Result<Vec<ProcessRead>> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            Self::list_refresh_kind(),
        );

        let mut processes: Vec<&Process> = self.system.processes().values().collect();
        if processes.is_empty() {
            return Err(MonitorError::enumeration("process table is empty or unreadable"));
        }
        processes.sort_by_key(|p| p.pid());

        Ok(processes.into_iter().map(|p| self.read_process(p)).collect())
    }

    fn cpu_logical_count(&self) -> usize {
        self.cpu_count
    }

    fn system_cpu_percent(&mut self) -> f32 {
        self.system.refresh_cpu_usage();
        self.system.global_cpu_usage()
    }

    fn system_memory_percent(&mut self) -> f32 {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total > 0 {
            (self.system.used_memory() as f32 / total as f32) * 100.0
        } else {
            0.0
        }
    }

    fn disk_io_counters(&mut self) -> DiskIoCounters {
        self.disks.refresh(true);
        self.disks
            .iter()
            .fold(DiskIoCounters::default(), |acc, disk| {
                let usage = disk.usage();
                DiskIoCounters {
                    read_bytes: acc.read_bytes.saturating_add(usage.total_read_bytes),
                    write_bytes: acc.write_bytes.saturating_add(usage.total_written_bytes),
                }
            })
    }

    fn net_io_counters(&mut self) -> NetIoCounters {
        self.networks.refresh(true);
        self.networks
            .values()
            .fold(NetIoCounters::default(), |acc, data| NetIoCounters {
                bytes_recv: acc.bytes_recv.saturating_add(data.total_received()),
                bytes_sent: acc.bytes_sent.saturating_add(data.total_transmitted()),
            })
    }

    fn terminate(&mut self, pid: u32) -> std::result::Result<(), ProcessError> {
        self.send_signal(pid, Signal::Term)
    }

    fn kill(&mut self, pid: u32) -> std::result::Result<(), ProcessError> {
        self.send_signal(pid, Signal::Kill)
    }

    fn wait_for_exit(&mut self, pid: u32, timeout: Duration) -> bool {
        let spid = Pid::from_u32(pid);
        let deadline = Instant::now() + timeout;

        loop {
            self.refresh_one(spid, ProcessRefreshKind::nothing());
            if self.has_exited(spid) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            std::thread::sleep(EXIT_POLL_INTERVAL.min(deadline - now));
        }
    }

    fn current_user(&self) -> Option<String> {
        self.current_user.clone()
    }

    fn total_memory(&self) -> u64 {
        self.system.total_memory()
    }

    fn process_details(&mut self, pid: u32) -> std::result::Result<ProcessDetails, ProcessError> {
        let spid = Pid::from_u32(pid);
        self.refresh_one(spid, ProcessRefreshKind::everything());

        let process = self
            .system
            .process(spid)
            .ok_or(ProcessError::NoSuchProcess { pid })?;

        let disk = process.disk_usage();

        Ok(ProcessDetails {
            pid,
            parent_pid: process.parent().map(|p| p.as_u32()),
            name: process.name().to_string_lossy().to_string(),
            exe: process.exe().map(|p| p.display().to_string()),
            command_line: process
                .cmd()
                .iter()
                .map(|arg| arg.to_string_lossy().to_string())
                .collect(),
            cwd: process.cwd().map(|p| p.display().to_string()),
            owner: self.owner_name(process),
            status: map_status(process.status()).to_string(),
            start_time: process.start_time(),
            run_time_secs: process.run_time(),
            cpu_percent: process.cpu_usage(),
            memory_rss: process.memory(),
            memory_virtual: process.virtual_memory(),
            disk_read_bytes: disk.total_read_bytes,
            disk_written_bytes: disk.total_written_bytes,
        })
    }
}

fn map_status(status: ProcessStatus) -> ProcessState {
    match status {
        ProcessStatus::Run => ProcessState::Running,
        ProcessStatus::Sleep => ProcessState::Sleeping,
        ProcessStatus::Idle => ProcessState::Idle,
        ProcessStatus::Stop => ProcessState::Stopped,
        ProcessStatus::Zombie => ProcessState::Zombie,
        ProcessStatus::Dead => ProcessState::Dead,
        other => ProcessState::Other(other.to_string().to_lowercase()),
    }
}
