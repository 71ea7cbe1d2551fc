use anyhow::Result;
use clap::{Arg, ArgAction, Command};

use procwatch::commands;
use procwatch::core::process_monitor::{FilterMode, SortMode};

fn filter_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("filter")
                .short('f')
                .long("filter")
                .value_name("MODE")
                .help("Process filter: all, your, non-root, running")
                .value_parser(clap::value_parser!(FilterMode)),
        )
        .arg(
            Arg::new("search")
                .short('s')
                .long("search")
                .value_name("TEXT")
                .help("Case-insensitive substring match on the process name"),
        )
        .arg(
            Arg::new("sort")
                .long("sort")
                .value_name("MODE")
                .help("Sort: default, name, name-desc, mem, mem-desc, cpu, cpu-desc")
                .value_parser(clap::value_parser!(SortMode)),
        )
        .arg(
            Arg::new("rows")
                .short('n')
                .long("rows")
                .value_name("N")
                .help("Rows to show per table")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print JSON instead of tables")
                .action(ArgAction::SetTrue),
        )
}

fn cli() -> Command {
    Command::new("procwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interactive process monitor")
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .global(true)
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            filter_args(Command::new("watch").about("Live process tables (default)"))
                .arg(
                    Arg::new("interval")
                        .short('i')
                        .long("interval")
                        .value_name("MS")
                        .help("Refresh interval in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("cycles")
                        .short('c')
                        .long("cycles")
                        .value_name("N")
                        .help("Exit after N published cycles")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(filter_args(
            Command::new("list").about("Print one snapshot of the process tables"),
        ))
        .subcommand(
            Command::new("kill")
                .about("Terminate a process, forcing a kill if it does not exit")
                .arg(
                    Arg::new("pid")
                        .help("Process ID")
                        .required(true)
                        .index(1)
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("yes")
                        .short('y')
                        .long("yes")
                        .help("Skip the confirmation prompt")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("info")
                .about("Show details for one process")
                .arg(
                    Arg::new("pid")
                        .help("Process ID")
                        .required(true)
                        .index(1)
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print JSON")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Manage configuration (use 'procwatch config --help' for subcommands)")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("path").about("Print the config file path"))
                .subcommand(
                    Command::new("reset")
                        .about("Restore the default configuration")
                        .arg(
                            Arg::new("yes")
                                .short('y')
                                .long("yes")
                                .help("Skip the confirmation prompt")
                                .action(ArgAction::SetTrue),
                        ),
                ),
        )
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    procwatch::init_logging(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("watch", sub_matches)) => commands::watch::execute(sub_matches),
        Some(("list", sub_matches)) => commands::list::execute(sub_matches),
        Some(("kill", sub_matches)) => commands::kill::execute(sub_matches),
        Some(("info", sub_matches)) => commands::info::execute(sub_matches),
        Some(("config", sub_matches)) => commands::config::execute(sub_matches),
        _ => {
            // No subcommand: run `watch` with its defaults
            let defaults = cli().get_matches_from(["procwatch", "watch"]);
            match defaults.subcommand() {
                Some((_, sub_matches)) => commands::watch::execute(sub_matches),
                None => Ok(()),
            }
        }
    }
}
