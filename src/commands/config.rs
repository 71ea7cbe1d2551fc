use crate::core::Config;
use anyhow::{Context, Result};
use colored::Colorize;

use crate::ui;

pub fn execute(matches: &clap::ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("show", _)) => show(),
        Some(("path", _)) => path(),
        Some(("reset", sub_matches)) => reset(sub_matches.get_flag("yes")),
        _ => {
            println!("Use 'procwatch config --help' for more information.");
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let config = Config::load()?;
    let config_path = Config::get_config_path()?;

    if !config_path.exists() {
        println!("{}", "No config file found, showing defaults.".dimmed());
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to serialize config")?
    );

    if let Err(e) = config.validate() {
        ui::warn(&e.to_string());
    }
    Ok(())
}

fn path() -> Result<()> {
    let config_path = Config::get_config_path()?;
    println!("{}", config_path.display().to_string().cyan().bold());
    Ok(())
}

fn reset(skip_confirm: bool) -> Result<()> {
    let config_path = Config::get_config_path()?;

    if !skip_confirm && !ui::confirm("Restore the default configuration?")? {
        ui::dimmed("Cancelled.");
        return Ok(());
    }

    Config::default().save_to(&config_path)?;
    println!(
        "{} {}",
        "✓ Configuration reset:".green(),
        config_path.display()
    );
    Ok(())
}
