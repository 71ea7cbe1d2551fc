// Platform-specific code module

pub mod elevation;
mod sysinfo_source;

pub use elevation::{elevation_hint, is_elevated};
pub use sysinfo_source::SysinfoSource;

use crate::core::process_monitor::ProcessSource;

/// The process source for the host OS.
pub fn default_source() -> Box<dyn ProcessSource> {
    Box::new(SysinfoSource::new())
}
