//! Command-line argument parsing and processing.
//!
//! This module handles parsing of command-line arguments and provides a clean
//! interface for the main application logic. Global flags may appear anywhere;
//! the first positional argument selects the subcommand.

use crate::core::{Direction, MotionLocation};

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
        log_file: Option<String>,
    },
    /// Print the status of the running daemon
    Status { json: bool },
    /// Switch the running daemon to another operating mode
    Mode { mode: String },
    /// Inject a motion event into the running daemon
    Trigger { location: MotionLocation },
    /// Run a diagnostic sweep (daemon must be in diagnostic mode)
    Test { direction: Direction },
    /// Run the daemon against a simulated wall clock
    Simulate {
        debug_enabled: bool,
        config_dir: Option<String>,
        start_time: String,
        end_time: String,
        multiplier: f64,
        log_file: Option<String>,
    },

    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments (typically from std::env::args())
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut json = false;
        let mut unknown_arg_found = false;
        let mut config_dir: Option<String> = None;
        let mut log_file: Option<String> = None;
        let mut positionals: Vec<String> = Vec::new();

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            let arg_str = &args_vec[i];
            match arg_str.as_str() {
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--debug" | "-d" => debug_enabled = true,
                "--json" => json = true,
                "--config" | "-c" => {
                    // Parse: --config <directory>
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        config_dir = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing directory for --config. Usage: --config <directory>");
                        unknown_arg_found = true;
                    }
                }
                "--log" => {
                    // Parse: --log <file>
                    if i + 1 < args_vec.len() && !args_vec[i + 1].starts_with('-') {
                        log_file = Some(args_vec[i + 1].clone());
                        i += 1;
                    } else {
                        log_warning!("Missing file for --log. Usage: --log <file>");
                        unknown_arg_found = true;
                    }
                }
                _ => {
                    if arg_str.starts_with('-') {
                        log_warning!("Unknown option: {arg_str}");
                        unknown_arg_found = true;
                    } else {
                        positionals.push(arg_str.clone());
                    }
                }
            }
            i += 1;
        }

        // Version and help take precedence over everything else
        if display_version {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if display_help {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }
        if unknown_arg_found {
            return ParsedArgs {
                action: CliAction::ShowHelpDueToError,
            };
        }

        let (command, rest) = match positionals.split_first() {
            Some((command, rest)) => (command.as_str(), rest),
            None => ("run", &[][..]),
        };

        let action = match command {
            "run" if rest.is_empty() => CliAction::Run {
                debug_enabled,
                config_dir,
                log_file,
            },
            "status" if rest.is_empty() => CliAction::Status { json },
            "mode" | "m" => match rest {
                [mode] => CliAction::Mode { mode: mode.clone() },
                _ => usage_error("mode", "stairlight mode <id>"),
            },
            "trigger" => match rest {
                [location] => match MotionLocation::parse(location) {
                    Ok(location) => CliAction::Trigger { location },
                    Err(e) => {
                        log_warning!("{}", e);
                        usage_error("trigger", "stairlight trigger <top|bottom>")
                    }
                },
                _ => usage_error("trigger", "stairlight trigger <top|bottom>"),
            },
            "test" | "t" => match rest {
                [] => CliAction::Test {
                    direction: Direction::Ascending,
                },
                [direction] => match Direction::parse(direction) {
                    Ok(direction) => CliAction::Test { direction },
                    Err(e) => {
                        log_warning!("{}", e);
                        usage_error("test", "stairlight test [up|down]")
                    }
                },
                _ => usage_error("test", "stairlight test [up|down]"),
            },
            "simulate" | "S" => parse_simulate(rest, debug_enabled, config_dir, log_file),
            "run" | "status" => {
                log_warning!("'{}' takes no arguments", command);
                CliAction::ShowHelpDueToError
            }
            _ => {
                log_warning!("Unknown command: {}", command);
                CliAction::ShowHelpDueToError
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }
}

fn usage_error(command: &str, usage: &str) -> CliAction {
    log_warning!("Invalid arguments for {}. Usage: {}", command, usage);
    CliAction::ShowHelpDueToError
}

/// Parse: simulate <start> <end> [multiplier]
fn parse_simulate(
    rest: &[String],
    debug_enabled: bool,
    config_dir: Option<String>,
    log_file: Option<String>,
) -> CliAction {
    const USAGE: &str = "stairlight simulate \"YYYY-MM-DD HH:MM:SS\" \"YYYY-MM-DD HH:MM:SS\" [multiplier]";

    let (start_time, end_time, multiplier) = match rest {
        [start, end] => (start, end, None),
        [start, end, multiplier] => (start, end, Some(multiplier)),
        _ => return usage_error("simulate", USAGE),
    };

    let multiplier = match multiplier.map(|m| m.parse::<f64>()) {
        None => 0.0, // 0 = default acceleration
        Some(Ok(mult)) if (0.1..=86_400.0).contains(&mult) => mult,
        Some(_) => {
            log_error!("Invalid multiplier. Must be between 0.1 and 86400.");
            return CliAction::ShowHelpDueToError;
        }
    };

    CliAction::Simulate {
        debug_enabled,
        config_dir,
        start_time: start_time.clone(),
        end_time: end_time.clone(),
        multiplier,
        log_file,
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    println!("┗ {}", env!("CARGO_PKG_DESCRIPTION"));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("stairlight [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("    --log <file>       Write all output to a file");
    log_indented!("    --json             Print status as JSON");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("run                    Run the daemon (default)");
    log_indented!("status                 Show mode, sequencer and daylight state");
    log_indented!("mode, m <id>           Switch the operating mode");
    log_indented!("trigger <top|bottom>   Inject a motion event");
    log_indented!("test, t [up|down]      Diagnostic sweep (diagnostic mode only)");
    log_indented!("simulate, S <start> <end> [multiplier]");
    log_indented!("                       Run against a simulated clock (log-only driver)");
    log_block_start!("Modes:");
    for mode in crate::core::OperatingMode::ALL {
        log_indented!("{:<22} {}", mode.id(), mode.label());
    }
    log_end!();
}
