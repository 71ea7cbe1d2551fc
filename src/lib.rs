// procwatch library - public API

pub mod error;
pub use error::{MonitorError, Result};

pub mod commands;
pub mod core;
pub mod platform;
pub mod ui;

pub use core::config::Config;

/// Initialize logging. `RUST_LOG` still wins over the level picked here.
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}
