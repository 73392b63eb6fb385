//! Main application entry point and high-level flow coordination.
//!
//! Parses the command line and dispatches to the matching handler:
//!
//! - `run` (default): the daemon, through the [`Stairlight`] builder
//! - `status`, `mode`, `trigger`, `test`: one-shot clients of a running daemon
//! - `simulate`: the daemon against a simulated wall clock
//!
//! Everything else lives in the library so it can be tested.

use anyhow::Result;

use stairlight::args::{self, CliAction, ParsedArgs};
use stairlight::common::constants::EXIT_FAILURE;
use stairlight::logger::{Log, LoggerGuard};
use stairlight::{Stairlight, commands, config, log_error_exit};

fn main() -> Result<()> {
    let parsed_args = ParsedArgs::from_env();

    match parsed_args.action {
        CliAction::ShowVersion => {
            args::display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            args::display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            std::process::exit(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            config_dir,
            log_file,
        } => {
            config::set_config_dir(config_dir)?;
            let _log_guard = start_file_logging(log_file)?;
            Stairlight::new(debug_enabled).run()
        }
        CliAction::Status { json } => commands::status::handle_status_command(json),
        CliAction::Mode { mode } => commands::mode::handle_mode_command(mode),
        CliAction::Trigger { location } => commands::trigger::handle_trigger_command(location),
        CliAction::Test { direction } => commands::test::handle_test_command(direction),
        CliAction::Simulate {
            debug_enabled,
            config_dir,
            start_time,
            end_time,
            multiplier,
            log_file,
        } => {
            config::set_config_dir(config_dir)?;
            let _log_guard = start_file_logging(log_file)?;

            let source = match commands::simulate::handle_simulate_command(
                &start_time,
                &end_time,
                multiplier,
                debug_enabled,
            ) {
                Ok(source) => source,
                Err(e) => {
                    log_error_exit!("{}", e);
                    std::process::exit(EXIT_FAILURE);
                }
            };

            // Don't interfere with a real instance
            Stairlight::new(debug_enabled)
                .without_lock()
                .without_headers()
                .with_simulated_clock(source)
                .run()
        }
    }
}

/// Route all output to `log_file` for the lifetime of the returned guard.
fn start_file_logging(log_file: Option<String>) -> Result<Option<LoggerGuard>> {
    match log_file {
        Some(path) => Ok(Some(Log::start_file_logging(path)?)),
        None => Ok(None),
    }
}
