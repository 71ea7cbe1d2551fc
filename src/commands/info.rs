//! Detailed view of one process.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::process_monitor::{normalize_cpu, CpuLoad, ProcessError};
use crate::platform::{self, elevation_hint, is_elevated};
use crate::ui::{fit_width, format_details};

const LABEL_WIDTH: usize = 18;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let pid = *matches
        .get_one::<u32>("pid")
        .context("PID argument is required")?;
    let json_output = matches.get_flag("json");

    let mut source = platform::default_source();
    // Per-process CPU needs a previous sample
    let _ = source.process_details(pid);
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

    let details = match source.process_details(pid) {
        Ok(details) => details,
        Err(ProcessError::NoSuchProcess { .. }) => anyhow::bail!("No process with PID {}", pid),
        Err(e @ ProcessError::AccessDenied { .. }) if !is_elevated() => {
            anyhow::bail!("{} ({})", e, elevation_hint())
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to read PID {}", pid)),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    let normalized = normalize_cpu(details.cpu_percent, source.cpu_logical_count());

    println!("{}", format!("{} (PID {})", details.name, details.pid).cyan().bold());
    for (label, value) in format_details(&details) {
        println!("  {}{}", fit_width(&label, LABEL_WIDTH).white().bold(), value);
    }

    let load = match CpuLoad::from_percent(normalized) {
        CpuLoad::Normal => "normal".normal(),
        CpuLoad::Elevated => "elevated".yellow(),
        CpuLoad::High => "high".red(),
        CpuLoad::Hot => "hot".red().bold(),
    };
    println!("  {}{}", fit_width("CPU load", LABEL_WIDTH).white().bold(), load);

    Ok(())
}
