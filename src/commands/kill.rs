//! Terminate a single process with the graceful-then-forceful policy.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::process_monitor::{ProcessError, TerminationController, TerminationRequest};
use crate::core::Config;
use crate::platform::{self, elevation_hint, is_elevated};
use crate::ui;

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let pid = *matches
        .get_one::<u32>("pid")
        .context("PID argument is required")?;
    let skip_confirm = matches.get_flag("yes");

    let config = Config::load().context("Failed to load configuration")?;
    let controller = TerminationController::new(
        Duration::from_millis(config.graceful_timeout_ms),
        Duration::from_millis(config.force_timeout_ms),
    );

    let mut source = platform::default_source();
    let name = match source.process_details(pid) {
        Ok(details) => details.name,
        Err(ProcessError::NoSuchProcess { .. }) => {
            anyhow::bail!("No process with PID {}", pid);
        }
        Err(e) => {
            log::debug!("Could not read details for PID {}: {}", pid, e);
            "<unknown>".to_string()
        }
    };

    if !skip_confirm {
        let prompt = format!("Terminate {} (PID {})?", name, pid);
        if !ui::confirm(&prompt)? {
            ui::dimmed("Cancelled.");
            return Ok(());
        }
    }

    println!(
        "{}",
        format!("Sending terminate signal to {} (PID {})...", name, pid).dimmed()
    );

    let outcome = controller.run(
        source.as_mut(),
        TerminationRequest::new(pid, name),
        |request| {
            ui::warn(&format!(
                "Process {} not responding, forcing kill...",
                request.target_name
            ));
        },
    );

    if outcome.succeeded() {
        ui::success(&outcome.message);
        return Ok(());
    }

    if !is_elevated() {
        ui::dimmed(&format!(
            "Hint: {} to signal processes owned by other users.",
            elevation_hint()
        ));
    }
    anyhow::bail!(outcome.message)
}
