//! Tokio runtime and scheduler for the refresh cycle.
//!
//! One scheduler task owns the interval ticker and the command channel. All
//! OS work (cycles, termination, detail lookups) runs on blocking worker
//! threads; results reach the front end through `watch` channels carrying
//! immutable `Arc` values and a `broadcast` status stream.
//!
//! The scheduler task never waits on a cycle. Filter, sort and pause settings
//! sit in a small [`Controls`] block that a cycle copies into the engine when
//! it starts, and each cycle publishes before it releases the engine, so
//! reports reach the channels in the order they were computed.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};

use crate::core::config::Config;
use crate::error::{MonitorError, Result};

use super::engine::{
    CycleKind, CycleReport, EngineSettings, MonitorEngine, PauseGate, PauseState, TableFrame,
};
use super::history::MetricSeries;
use super::metrics::{Snapshot, SystemOverview};
use super::snapshot::FilterMode;
use super::sort::SortMode;
use super::source::{
    DiskIoCounters, NetIoCounters, ProcessDetails, ProcessError, ProcessRead, ProcessSource,
};
use super::status::StatusMessage;
use super::termination::{TerminationController, TerminationOutcome, TerminationRequest};

const STATUS_CHANNEL_CAPACITY: usize = 64;
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Knobs for the scheduler and the engine it drives.
#[derive(Debug, Clone)]
pub struct RuntimeOptions {
    pub refresh_interval: Duration,
    pub pause_duration: Duration,
    pub termination: TerminationController,
    pub engine: EngineSettings,
}

impl RuntimeOptions {
    pub fn from_config(config: &Config, current_user: impl Into<String>) -> Self {
        Self {
            refresh_interval: Duration::from_millis(config.refresh_interval_ms),
            pause_duration: Duration::from_millis(config.pause_duration_ms),
            termination: TerminationController::new(
                Duration::from_millis(config.graceful_timeout_ms),
                Duration::from_millis(config.force_timeout_ms),
            ),
            engine: EngineSettings {
                current_user: current_user.into(),
                reserved_prefixes: config.reserved_prefixes.clone(),
                privileged_owners: config.privileged_owners.clone(),
                history_capacity: config.history_capacity,
                tip_threshold: config.access_denied_tip_threshold,
                filter: config.default_filter,
                search: String::new(),
                sort_mode: config.default_sort,
            },
        }
    }
}

/// Requests from the front end, consumed in order by the scheduler task.
#[derive(Debug)]
enum MonitorCommand {
    SetFilter { mode: FilterMode, search: String },
    SetSort(SortMode),
    Pause(Option<Duration>),
    RefreshNow,
    Terminate {
        pid: u32,
        reply: oneshot::Sender<Result<TerminationOutcome>>,
    },
}

/// Front-end settings the next cycle picks up.
struct Controls {
    filter: FilterMode,
    search: String,
    sort_mode: SortMode,
    pause: PauseGate,
}

struct Shared {
    source: Mutex<Box<dyn ProcessSource>>,
    engine: Mutex<MonitorEngine>,
    // Only held for field access, never across a cycle
    controls: Mutex<Controls>,
    in_flight: AtomicBool,
    controller: TerminationController,
    pause_duration: Duration,
    overview: SystemOverview,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
    series_tx: watch::Sender<Arc<MetricSeries>>,
    tables_tx: watch::Sender<Arc<TableFrame>>,
    status_tx: broadcast::Sender<StatusMessage>,
}

impl Shared {
    /// Run one cycle and publish it. Both locks stay held until the report is
    /// sent, so a later cycle can never be overwritten by an earlier one.
    fn run_and_publish(&self, kind: CycleKind) -> Result<u64> {
        // Lock order: source, engine, controls
        let mut source = self.source.lock();
        let mut engine = self.engine.lock();
        {
            let controls = self.controls.lock();
            let query = engine.query();
            if query.filter != controls.filter || query.search != controls.search {
                engine.set_filter(controls.filter, controls.search.clone());
            }
            engine.set_sort_mode(controls.sort_mode);
        }

        let report = engine.run_cycle(&mut **source, kind)?;
        self.publish(report);
        Ok(engine.cycles())
    }

    fn publish(&self, report: CycleReport) {
        // Snapshot goes last: a snapshot watcher must see matching tables
        if let Some(series) = report.series {
            let _ = self.series_tx.send(series);
        }
        let _ = self.tables_tx.send(report.tables);
        let _ = self.snapshot_tx.send(report.snapshot);
        self.status(StatusMessage::info(report.summary));
    }

    fn status(&self, message: StatusMessage) {
        // No subscribers is fine
        let _ = self.status_tx.send(message);
    }
}

/// Cloneable front-end handle to a running monitor.
#[derive(Clone)]
pub struct MonitorHandle {
    shared: Arc<Shared>,
    command_tx: mpsc::UnboundedSender<MonitorCommand>,
    snapshot_rx: watch::Receiver<Arc<Snapshot>>,
    series_rx: watch::Receiver<Arc<MetricSeries>>,
    tables_rx: watch::Receiver<Arc<TableFrame>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MonitorHandle {
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.snapshot_rx.borrow().clone()
    }

    pub fn current_series(&self) -> Arc<MetricSeries> {
        self.series_rx.borrow().clone()
    }

    pub fn current_tables(&self) -> Arc<TableFrame> {
        self.tables_rx.borrow().clone()
    }

    /// Receiver that wakes whenever a new snapshot is published.
    pub fn watch_snapshots(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshot_rx.clone()
    }

    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusMessage> {
        self.shared.status_tx.subscribe()
    }

    pub fn system_overview(&self) -> &SystemOverview {
        &self.shared.overview
    }

    pub fn set_filter(&self, mode: FilterMode, search: impl Into<String>) {
        self.send(MonitorCommand::SetFilter {
            mode,
            search: search.into(),
        });
    }

    pub fn set_sort_mode(&self, mode: SortMode) {
        self.send(MonitorCommand::SetSort(mode));
    }

    /// Suspend scheduled cycles; `None` uses the configured duration.
    pub fn pause_auto_refresh(&self, duration: Option<Duration>) {
        self.send(MonitorCommand::Pause(duration));
    }

    pub fn refresh_now(&self) {
        self.send(MonitorCommand::RefreshNow);
    }

    /// Terminate `pid` with the graceful-then-forceful policy. Resolves once a
    /// terminal phase is reached; an out-of-band refresh follows.
    pub async fn request_termination(&self, pid: u32) -> Result<TerminationOutcome> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(MonitorCommand::Terminate { pid, reply })
            .map_err(|_| MonitorError::runtime("monitor is shut down"))?;
        response
            .await
            .map_err(|_| MonitorError::runtime("termination task dropped its reply"))?
    }

    pub async fn process_details(
        &self,
        pid: u32,
    ) -> Result<std::result::Result<ProcessDetails, ProcessError>> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.source.lock().process_details(pid))
            .await
            .map_err(|e| MonitorError::runtime(format!("details lookup panicked: {}", e)))
    }

    pub fn shutdown(&self) {
        log::info!("Shutting down monitor scheduler");
        let _ = self.shutdown_tx.send(());
    }

    fn send(&self, command: MonitorCommand) {
        if self.command_tx.send(command).is_err() {
            log::warn!("Monitor command dropped: scheduler is not running");
        }
    }
}

/// Spawn the scheduler on the current Tokio runtime.
///
/// Must be called from within a runtime context.
pub fn spawn_monitor(source: Box<dyn ProcessSource>, options: RuntimeOptions) -> MonitorHandle {
    let overview = SystemOverview::new(
        options.engine.current_user.clone(),
        source.cpu_logical_count(),
        source.total_memory(),
    );

    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(Snapshot::empty()));
    let (series_tx, series_rx) = watch::channel(Arc::new(MetricSeries::default()));
    let (tables_tx, tables_rx) = watch::channel(Arc::new(TableFrame::default()));
    let (status_tx, _) = broadcast::channel(STATUS_CHANNEL_CAPACITY);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let controls = Controls {
        filter: options.engine.filter,
        search: options.engine.search.clone(),
        sort_mode: options.engine.sort_mode,
        pause: PauseGate::default(),
    };

    let shared = Arc::new(Shared {
        source: Mutex::new(source),
        engine: Mutex::new(MonitorEngine::new(options.engine)),
        controls: Mutex::new(controls),
        in_flight: AtomicBool::new(false),
        controller: options.termination,
        pause_duration: options.pause_duration,
        overview,
        snapshot_tx,
        series_tx,
        tables_tx,
        status_tx,
    });

    tokio::spawn(scheduler_task(
        Arc::clone(&shared),
        command_rx,
        shutdown_tx.subscribe(),
        options.refresh_interval,
    ));

    log::info!(
        "Monitor scheduler started (interval {} ms)",
        options.refresh_interval.as_millis()
    );

    MonitorHandle {
        shared,
        command_tx,
        snapshot_rx,
        series_rx,
        tables_rx,
        shutdown_tx,
    }
}

/// Owns a dedicated Tokio runtime for front ends that are not async.
pub struct MonitorRuntime {
    handle: MonitorHandle,
    runtime: tokio::runtime::Runtime,
}

impl MonitorRuntime {
    pub fn start(source: Box<dyn ProcessSource>, options: RuntimeOptions) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .thread_name("monitor-worker")
            .build()?;

        let handle = {
            let _guard = runtime.enter();
            spawn_monitor(source, options)
        };

        Ok(Self { handle, runtime })
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn shutdown(self) {
        self.handle.shutdown();
        self.runtime.shutdown_timeout(Duration::from_secs(1));
    }
}

async fn scheduler_task(
    shared: Arc<Shared>,
    mut command_rx: mpsc::UnboundedReceiver<MonitorCommand>,
    mut shutdown: broadcast::Receiver<()>,
    refresh_interval: Duration,
) {
    let mut ticker = interval(refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tokio::spawn(scheduled_cycle(Arc::clone(&shared)));
            }
            Some(command) = command_rx.recv() => {
                handle_command(&shared, command);
            }
            _ = shutdown.recv() => {
                log::info!("Monitor scheduler shutting down");
                break;
            }
        }
    }
}

fn handle_command(shared: &Arc<Shared>, command: MonitorCommand) {
    match command {
        MonitorCommand::SetFilter { mode, search } => {
            log::debug!("Filter set to {} / '{}'", mode, search);
            {
                let mut controls = shared.controls.lock();
                controls.filter = mode;
                controls.search = search;
            }
            tokio::spawn(manual_cycle(Arc::clone(shared), false));
        }
        MonitorCommand::SetSort(mode) => {
            log::debug!("Sort mode set to {}", mode);
            shared.controls.lock().sort_mode = mode;
            tokio::spawn(manual_cycle(Arc::clone(shared), false));
        }
        MonitorCommand::Pause(duration) => {
            let duration = duration.unwrap_or(shared.pause_duration);
            shared.controls.lock().pause.pause(Instant::now(), duration);
            log::info!("Auto refresh paused for {:?}", duration);
            shared.status(StatusMessage::info(format!(
                "Auto refresh paused for {}",
                format_pause(duration)
            )));
        }
        MonitorCommand::RefreshNow => {
            tokio::spawn(manual_cycle(Arc::clone(shared), true));
        }
        MonitorCommand::Terminate { pid, reply } => {
            let shared = Arc::clone(shared);
            tokio::spawn(async move {
                let outcome = terminate(Arc::clone(&shared), pid).await;
                let _ = reply.send(outcome);
                manual_cycle(shared, true).await;
            });
        }
    }
}

async fn scheduled_cycle(shared: Arc<Shared>) {
    let pause = shared.controls.lock().pause.poll(Instant::now());
    match pause {
        PauseState::Paused => return,
        PauseState::Resumed => {
            log::info!("Auto refresh resumed");
            shared.status(StatusMessage::info("Auto refresh resumed"));
        }
        PauseState::Active => {}
    }

    if shared.in_flight.swap(true, Ordering::AcqRel) {
        log::debug!("Previous cycle still running, skipping tick");
        return;
    }

    let worker = Arc::clone(&shared);
    let result =
        tokio::task::spawn_blocking(move || worker.run_and_publish(CycleKind::Scheduled)).await;
    shared.in_flight.store(false, Ordering::Release);

    match result {
        Ok(Ok(cycle)) => log::trace!("Scheduled cycle {} published", cycle),
        Ok(Err(e)) => {
            log::warn!("Refresh cycle failed: {}", e);
            shared.status(StatusMessage::error(format!("Error: {}", e)));
        }
        Err(e) => {
            log::error!("Refresh worker panicked: {}", e);
            shared.status(StatusMessage::error(format!("Error: {}", e)));
        }
    }
}

async fn manual_cycle(shared: Arc<Shared>, announce: bool) {
    if announce {
        shared.status(StatusMessage::info("Refreshing..."));
    }

    let worker = Arc::clone(&shared);
    let result =
        tokio::task::spawn_blocking(move || worker.run_and_publish(CycleKind::Manual)).await;

    match result {
        Ok(Ok(cycle)) => {
            log::trace!("Manual cycle {} published", cycle);
            if announce {
                shared.status(StatusMessage::info(format!(
                    "Refreshed at {}",
                    chrono::Local::now().format("%H:%M:%S")
                )));
            }
        }
        Ok(Err(e)) => {
            log::warn!("Manual refresh failed: {}", e);
            shared.status(StatusMessage::error(format!("Error during refresh: {}", e)));
        }
        Err(e) => {
            log::error!("Manual refresh worker panicked: {}", e);
            shared.status(StatusMessage::error(format!("Error during refresh: {}", e)));
        }
    }
}

async fn terminate(shared: Arc<Shared>, pid: u32) -> Result<TerminationOutcome> {
    let name = shared
        .snapshot_tx
        .borrow()
        .find(pid)
        .map(|record| record.name.clone())
        .unwrap_or_else(|| "<unknown>".to_string());

    log::info!("Termination requested for {} (PID {})", name, pid);

    let worker = Arc::clone(&shared);
    let outcome = tokio::task::spawn_blocking(move || {
        let mut source = SharedSource::new(&worker.source);
        let status_tx = worker.status_tx.clone();
        worker
            .controller
            .run(&mut source, TerminationRequest::new(pid, name), |request| {
                let _ = status_tx.send(StatusMessage::warning(format!(
                    "Process {} not responding, forcing kill...",
                    request.target_name
                )));
            })
    })
    .await
    .map_err(|e| MonitorError::termination(format!("termination worker panicked: {}", e)))?;

    shared.status(if outcome.succeeded() {
        StatusMessage::info(outcome.message.clone())
    } else {
        StatusMessage::error(outcome.message.clone())
    });

    Ok(outcome)
}

fn format_pause(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

/// Source view that takes the shared lock per call, so a termination waiting
/// on a process does not hold up refresh cycles.
struct SharedSource<'a> {
    inner: &'a Mutex<Box<dyn ProcessSource>>,
}

impl<'a> SharedSource<'a> {
    fn new(inner: &'a Mutex<Box<dyn ProcessSource>>) -> Self {
        Self { inner }
    }
}

impl ProcessSource for SharedSource<'_> {
    fn list_processes(&mut self) -> Result<Vec<ProcessRead>> {
        self.inner.lock().list_processes()
    }

    fn cpu_logical_count(&self) -> usize {
        self.inner.lock().cpu_logical_count()
    }

    fn system_cpu_percent(&mut self) -> f32 {
        self.inner.lock().system_cpu_percent()
    }

    fn system_memory_percent(&mut self) -> f32 {
        self.inner.lock().system_memory_percent()
    }

    fn disk_io_counters(&mut self) -> DiskIoCounters {
        self.inner.lock().disk_io_counters()
    }

    fn net_io_counters(&mut self) -> NetIoCounters {
        self.inner.lock().net_io_counters()
    }

    fn terminate(&mut self, pid: u32) -> std::result::Result<(), ProcessError> {
        self.inner.lock().terminate(pid)
    }

    fn kill(&mut self, pid: u32) -> std::result::Result<(), ProcessError> {
        self.inner.lock().kill(pid)
    }

    fn wait_for_exit(&mut self, pid: u32, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.inner.lock().wait_for_exit(pid, Duration::ZERO) {
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
        self.inner.lock().current_user()
    }

    fn total_memory(&self) -> u64 {
        self.inner.lock().total_memory()
    }

    fn process_details(&mut self, pid: u32) -> std::result::Result<ProcessDetails, ProcessError> {
        self.inner.lock().process_details(pid)
    }
}
