//! Structured logging system with visual formatting.
//!
//! stairlight logs to the console using a box-drawing layout so that a long
//! running daemon stays readable in `journalctl` or a terminal:
//!
//! ```text
//! ┏ stairlight v0.3.0 ━━╸
//! ┃
//! ┣ Loading configuration...
//! ┃   14 segments, step delay 250ms
//! ┣[INFO] Mode changed: Off → Motion activated
//! ╹
//! ```
//!
//! The logger can be muted at runtime (tests do this) and can be redirected to
//! a file with [`Log::start_file_logging`].

use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

// Channel for routing output to file when --log is active
static LOG_CHANNEL: OnceLock<Option<Sender<LogMessage>>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Main logging interface providing structured output formatting.
///
/// ## Logging Conventions
///
/// - **`log_block_start!`**: opens a new conceptual block (mode change, startup
///   phase, shutdown). Prints an empty pipe line for spacing, then `┣ message`.
/// - **`log_decorated!`**: a line belonging to the current block, `┣ message`.
/// - **`log_indented!`**: nested detail, `┃   message`.
/// - **`log_pipe!`**: a lone `┃` for spacing before a semantic message.
/// - **`log_version!`** / **`log_end!`**: header and final marker, once each.
/// - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**:
///   semantic messages with a coloured `[LEVEL]` tag.
pub struct Log;

impl Log {
    /// Enable or disable logging.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Start file logging to the specified path.
    ///
    /// All subsequent output goes to the file (ANSI colours stripped) until the
    /// returned guard is dropped.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(Some(tx.clone()))
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::Builder::new()
            .name("log-writer".to_string())
            .spawn(move || {
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&file_path)?;

                loop {
                    match rx.recv() {
                        Ok(LogMessage::Formatted(text)) => {
                            file.write_all(text.as_bytes())?;
                        }
                        Ok(LogMessage::Shutdown) | Err(_) => {
                            file.flush()?;
                            break;
                        }
                    }
                }

                Ok::<(), anyhow::Error>(())
            })?;

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Timestamp prefix shown while the wall clock is simulated.
    ///
    /// Returns an empty string when running on real time. Public for macro access.
    pub fn get_timestamp_prefix() -> String {
        // Check without initializing the time source
        if crate::time_source::is_initialized() && crate::time_source::is_simulated() {
            format!("[{}] ", crate::time_source::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Guard for file logging that flushes and joins the writer thread on drop.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Strip ANSI colour sequences (`ESC [ ... m`) from text.
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

// Public function that routes output (needed by macros)
pub fn write_output(text: &str) {
    if let Some(Some(tx)) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros
//
// Every macro accepts either a format string literal with arguments or a
// single expression implementing Display.

/// Shared expansion for all line-oriented macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($lead:expr, $fmt:literal $($arg:tt)*) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let message = format!($fmt $($arg)*);
            let formatted = format!("{prefix}{}{message}\n", $lead);
            $crate::logger::write_output(&formatted);
        }
    }};
    ($lead:expr, $expr:expr) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let expr = $expr;
            let formatted = format!("{prefix}{}{expr}\n", $lead);
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log a decorated message as part of the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => { $crate::__log_line!("┣ ", $($arg)+) };
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => { $crate::__log_line!("┃   ", $($arg)+) };
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}┃\n"));
        }
    }};
}

/// Log a block start message, initiating a new conceptual block of information.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => {{
        $crate::log_pipe!();
        $crate::__log_line!("┣ ", $($arg)+)
    }};
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let version = env!("CARGO_PKG_VERSION");
            $crate::logger::write_output(&format!("{prefix}┏ stairlight v{version} ━━╸\n"));
        }
    }};
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}╹\n"));
        }
    }};
}

/// Log a warning message with pipe prefix and yellow-colored tag.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => { $crate::__log_line!("┣[\x1b[33mWARNING\x1b[0m] ", $($arg)+) };
}

/// Log an error message with pipe prefix and red-colored tag.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => { $crate::__log_line!("┣[\x1b[31mERROR\x1b[0m] ", $($arg)+) };
}

/// Log an error message without the pipe prefix, for one-shot CLI commands.
#[macro_export]
macro_rules! log_error_standalone {
    ($($arg:tt)+) => { $crate::__log_line!("[\x1b[31mERROR\x1b[0m] ", $($arg)+) };
}

/// Log an error that terminates the current flow, closing the pipe.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)+) => {{
        $crate::log_pipe!();
        $crate::__log_line!("┗[\x1b[31mERROR\x1b[0m] ", $($arg)+)
    }};
}

/// Log an informational message with pipe prefix and green-colored tag.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => { $crate::__log_line!("┣[\x1b[32mINFO\x1b[0m] ", $($arg)+) };
}

/// Log a debug/operational message with pipe prefix and green-colored tag.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => { $crate::__log_line!("┣[\x1b[32mDEBUG\x1b[0m] ", $($arg)+) };
}

/// Log a critical message with pipe prefix and red-colored tag.
#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => { $crate::__log_line!("┣[\x1b[31mCRITICAL\x1b[0m] ", $($arg)+) };
}
