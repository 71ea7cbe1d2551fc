// Command handlers module
pub mod config;
pub mod info;
pub mod kill;
pub mod list;
pub mod watch;

use anyhow::{Context, Result};
use clap::ArgMatches;

use crate::core::process_monitor::{FilterMode, RuntimeOptions, SortMode};
use crate::core::Config;

/// Load the saved config and apply the flags shared by `watch` and `list`.
pub(crate) fn load_config(matches: &ArgMatches) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;

    if let Some(interval) = matches
        .try_get_one::<u64>("interval")
        .ok()
        .flatten()
        .copied()
    {
        config.refresh_interval_ms = interval;
    }
    if let Some(filter) = matches.try_get_one::<FilterMode>("filter").ok().flatten() {
        config.default_filter = *filter;
    }
    if let Some(sort) = matches.try_get_one::<SortMode>("sort").ok().flatten() {
        config.default_sort = *sort;
    }

    config.validate()?;
    Ok(config)
}

pub(crate) fn search_text(matches: &ArgMatches) -> String {
    matches
        .try_get_one::<String>("search")
        .ok()
        .flatten()
        .cloned()
        .unwrap_or_default()
}

pub(crate) fn runtime_options(
    config: &Config,
    current_user: Option<String>,
    search: String,
) -> RuntimeOptions {
    let mut options = RuntimeOptions::from_config(config, current_user.unwrap_or_default());
    options.engine.search = search;
    options
}
