use colored::{ColoredString, Colorize};
use humansize::{format_size as human_format_size, BINARY};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::process_monitor::{
    CpuLoad, MetricSeries, ProcessDetails, RowValues, StatusLevel, StatusMessage, SystemOverview,
};

const PID_WIDTH: usize = 8;
const NAME_WIDTH: usize = 28;
const USER_WIDTH: usize = 14;
const CPU_WIDTH: usize = 8;
const MEM_WIDTH: usize = 10;

/// Format byte count in human-readable binary units
pub fn format_size(bytes: u64) -> String {
    human_format_size(bytes, BINARY)
}

/// Pad or truncate to an exact display width, respecting wide characters.
pub fn fit_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return format!("{}{}", text, " ".repeat(width - text.width()));
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}

pub fn table_header() -> String {
    format!(
        "{}{}{}{}{}{}",
        fit_width("PID", PID_WIDTH),
        fit_width("Name", NAME_WIDTH),
        fit_width("User", USER_WIDTH),
        fit_width("CPU%", CPU_WIDTH),
        fit_width("Memory", MEM_WIDTH),
        "Status"
    )
}

fn colorize_cpu(text: String, load: CpuLoad) -> ColoredString {
    match load {
        CpuLoad::Hot => text.red().bold(),
        CpuLoad::High => text.red(),
        CpuLoad::Elevated => text.yellow(),
        CpuLoad::Normal => text.normal(),
    }
}

pub fn format_row(row: &RowValues) -> String {
    format!(
        "{}{}{}{}{}{}",
        fit_width(&row.pid.to_string(), PID_WIDTH),
        fit_width(&row.name, NAME_WIDTH),
        fit_width(&row.owner, USER_WIDTH),
        colorize_cpu(fit_width(&row.cpu, CPU_WIDTH), row.cpu_load),
        fit_width(&row.memory, MEM_WIDTH),
        row.status.dimmed()
    )
}

pub fn format_status(message: &StatusMessage) -> String {
    let stamp = message.at.format("%H:%M:%S").to_string();
    let text = match message.level {
        StatusLevel::Info => message.text.normal(),
        StatusLevel::Warning => message.text.yellow(),
        StatusLevel::Error => message.text.red().bold(),
    };
    format!("{} {}", stamp.dimmed(), text)
}

fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(0.0)
}

/// Latest value of each rolling series on one line.
pub fn format_series(series: &MetricSeries) -> String {
    format!(
        "CPU {:>5.1}% | Memory {:>5.1}% | Disk {:>6.2} MB | Net {:>6.2} MB | {} samples",
        last(&series.cpu),
        last(&series.memory),
        last(&series.disk_rate),
        last(&series.net_rate),
        series.cpu.len()
    )
}

pub fn format_overview(overview: &SystemOverview) -> String {
    format!(
        "User: {} | CPUs: {} | Memory: {:.1} GB",
        overview.current_user, overview.logical_cpus, overview.total_memory_gb
    )
}

pub fn format_details(details: &ProcessDetails) -> Vec<(String, String)> {
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    vec![
        ("PID".into(), details.pid.to_string()),
        (
            "Parent PID".into(),
            details
                .parent_pid
                .map(|p| p.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Name".into(), details.name.clone()),
        ("Owner".into(), or_dash(&details.owner)),
        ("Status".into(), details.status.clone()),
        ("Executable".into(), or_dash(&details.exe)),
        ("Command line".into(), details.command_line.join(" ")),
        ("Working dir".into(), or_dash(&details.cwd)),
        (
            "Started".into(),
            chrono::DateTime::from_timestamp(details.start_time as i64, 0)
                .map(|t| {
                    t.with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                })
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Run time".into(), format!("{}s", details.run_time_secs)),
        ("CPU".into(), format!("{:.1}%", details.cpu_percent)),
        ("Resident memory".into(), format_size(details.memory_rss)),
        ("Virtual memory".into(), format_size(details.memory_virtual)),
        ("Disk read".into(), format_size(details.disk_read_bytes)),
        ("Disk written".into(), format_size(details.disk_written_bytes)),
    ]
}
