use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::metrics::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// User-visible feedback line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
    pub at: DateTime<Local>,
}

impl StatusMessage {
    pub fn info<S: Into<String>>(text: S) -> Self {
        Self::with_level(StatusLevel::Info, text)
    }

    pub fn warning<S: Into<String>>(text: S) -> Self {
        Self::with_level(StatusLevel::Warning, text)
    }

    pub fn error<S: Into<String>>(text: S) -> Self {
        Self::with_level(StatusLevel::Error, text)
    }

    fn with_level<S: Into<String>>(level: StatusLevel, text: S) -> Self {
        Self {
            level,
            text: text.into(),
            at: Local::now(),
        }
    }
}

/// "Apps: 12 | Background: 134 | Total: 146 | Access Denied: 3 | Last update: HH:MM:SS"
pub fn cycle_summary(snapshot: &Snapshot, tip_threshold: usize, now: DateTime<Local>) -> String {
    let mut status = format!(
        "Apps: {} | Background: {} | Total: {} | Access Denied: {} | Last update: {}",
        snapshot.apps.len(),
        snapshot.background.len(),
        snapshot.total(),
        snapshot.access_denied,
        now.format("%H:%M:%S")
    );

    if snapshot.access_denied > tip_threshold {
        status.push_str(" | Tip: run with elevated privileges to see all processes.");
    }

    status
}
