//! One-shot process listing.

use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

use crate::core::process_monitor::{CycleKind, MonitorEngine, RowValues, SystemOverview};
use crate::platform::{self, elevation_hint, is_elevated};
use crate::ui::{format_overview, format_row, format_series, table_header};

use super::{load_config, runtime_options, search_text};

pub fn execute(matches: &ArgMatches) -> Result<()> {
    let config = load_config(matches)?;
    let rows = matches.get_one::<usize>("rows").copied();
    let json_output = matches.get_flag("json");

    let mut source = platform::default_source();
    let options = runtime_options(&config, source.current_user(), search_text(matches));
    let current_user = options.engine.current_user.clone();
    let mut engine = MonitorEngine::new(options.engine);

    // CPU usage needs two samples; the first cycle only primes the counters
    engine
        .run_cycle(source.as_mut(), CycleKind::Scheduled)
        .context("Failed to read the process table")?;
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
    let report = engine
        .run_cycle(source.as_mut(), CycleKind::Scheduled)
        .context("Failed to read the process table")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&*report.snapshot)?);
        return Ok(());
    }

    println!(
        "{}",
        format_overview(&SystemOverview::new(
            current_user,
            source.cpu_logical_count(),
            source.total_memory(),
        ))
        .dimmed()
    );
    println!("{}", format_series(&engine.history().series()).dimmed());
    println!();

    print_table("Apps", &report.tables.apps, rows);
    println!();
    print_table("Background", &report.tables.background, rows);
    println!();
    println!("{}", report.summary);

    if report.snapshot.access_denied > 0 && !is_elevated() {
        println!(
            "{}",
            format!(
                "{} processes could not be read; {} to include them.",
                report.snapshot.access_denied,
                elevation_hint()
            )
            .yellow()
        );
    }

    Ok(())
}

pub(crate) fn print_table(title: &str, rows: &[RowValues], limit: Option<usize>) {
    println!("{}", format!("{} ({})", title, rows.len()).cyan().bold());
    println!("{}", table_header().white().bold());

    let shown = limit.unwrap_or(rows.len()).min(rows.len());
    for row in &rows[..shown] {
        println!("{}", format_row(row));
    }
    if shown < rows.len() {
        println!("{}", format!("... {} more", rows.len() - shown).dimmed());
    }
}
