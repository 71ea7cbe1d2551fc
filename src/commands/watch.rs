//! Live monitor command.
//!
//! Headless front end over `MonitorRuntime`: redraws the top rows of both
//! tables whenever a new snapshot is published, or streams one JSON object
//! per cycle with `--json`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use tokio::sync::broadcast::error::TryRecvError;

use crate::core::process_monitor::{MonitorHandle, MonitorRuntime, StatusMessage};
use crate::platform::{self, elevation_hint, is_elevated};
use crate::ui::{format_overview, format_series, format_status};

use super::list::print_table;
use super::{load_config, runtime_options, search_text};

const DEFAULT_ROWS: usize = 15;
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

struct WatchSettings {
    json_output: bool,
    rows: usize,
    max_cycles: Option<u64>,
}

/// Execute the watch command
pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let settings = WatchSettings {
        json_output: matches.get_flag("json"),
        rows: matches
            .get_one::<usize>("rows")
            .copied()
            .unwrap_or(DEFAULT_ROWS),
        max_cycles: matches.get_one::<u64>("cycles").copied(),
    };

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let source = platform::default_source();
    let options = runtime_options(&config, source.current_user(), search_text(matches));

    let monitor =
        MonitorRuntime::start(source, options).context("Failed to start the monitor runtime")?;
    let handle = monitor.handle();

    let result = monitor.block_on(render_loop(&handle, &stop, &settings));
    monitor.shutdown();

    if !settings.json_output {
        println!("{}", "Monitor stopped.".dimmed());
    }
    result
}

async fn render_loop(
    handle: &MonitorHandle,
    stop: &AtomicBool,
    settings: &WatchSettings,
) -> Result<()> {
    let mut snapshots = handle.watch_snapshots();
    let mut status_rx = handle.subscribe_status();
    let mut last_status: Option<StatusMessage> = None;
    let mut rendered = 0u64;
    let mut stop_poll = tokio::time::interval(STOP_POLL_INTERVAL);

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    log::warn!("Snapshot channel closed");
                    break;
                }

                loop {
                    match status_rx.try_recv() {
                        Ok(message) => last_status = Some(message),
                        Err(TryRecvError::Lagged(skipped)) => {
                            log::debug!("Status stream lagged by {} messages", skipped);
                        }
                        Err(_) => break,
                    }
                }

                if settings.json_output {
                    print_json(handle)?;
                } else {
                    draw(handle, last_status.as_ref(), settings.rows);
                }

                rendered += 1;
                if settings.max_cycles.is_some_and(|max| rendered >= max) {
                    break;
                }
            }
            _ = stop_poll.tick() => {
                if stop.load(Ordering::Relaxed) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn print_json(handle: &MonitorHandle) -> Result<()> {
    let snapshot = handle.current_snapshot();
    let series = handle.current_series();
    let value = serde_json::json!({
        "snapshot": &*snapshot,
        "series": &*series,
    });
    println!("{}", serde_json::to_string(&value)?);
    Ok(())
}

fn draw(handle: &MonitorHandle, status: Option<&StatusMessage>, rows: usize) {
    let tables = handle.current_tables();
    let snapshot = handle.current_snapshot();

    // Clear screen and home the cursor
    print!("\x1b[2J\x1b[H");

    println!("{}", format_overview(handle.system_overview()).dimmed());
    println!("{}", format_series(&handle.current_series()).dimmed());
    println!(
        "{}",
        format!(
            "Filter: {} | Search: '{}' | Sort: {}",
            tables.filter, tables.search, tables.sort_mode
        )
        .dimmed()
    );
    println!();

    print_table("Apps", &tables.apps, Some(rows));
    println!();
    print_table("Background", &tables.background, Some(rows));
    println!();

    if let Some(message) = status {
        println!("{}", format_status(message));
    }
    if snapshot.access_denied > 0 && !is_elevated() {
        println!(
            "{}",
            format!("{} unreadable; {}", snapshot.access_denied, elevation_hint()).yellow()
        );
    }
    println!("{}", "Press Ctrl+C to exit".dimmed());
}
