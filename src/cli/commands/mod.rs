//! CLI command implementations

mod init;
mod inspect;
mod prune;
mod report;
mod scan;
mod synth;
mod validate;


use crate::cli::LogLevel;
use crate::config::{Cli, Command};

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<(), String> {
    // Configure output based on verbose/quiet flags
    let log_level = if cli.quiet {
        LogLevel::Quiet
    } else if cli.verbose {
        LogLevel::Verbose
    } else {
        LogLevel::Normal
    };

    match cli.command {
        Command::Prune(args) => prune::run_prune(args, log_level),
        Command::Validate(args) => validate::run_validate(args, log_level),
        Command::Inspect(args) => inspect::run_inspect(args, log_level),
        Command::Scan(args) => scan::run_scan(args, log_level),
        Command::Init(args) => init::run_init(args, log_level),
        Command::Synth(args) => synth::run_synth(args, log_level),
    }
}
