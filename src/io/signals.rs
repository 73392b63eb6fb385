//! Unix signal handling.
//!
//! SIGINT, SIGTERM and SIGHUP all request a clean shutdown: the signal thread
//! clears the shared `running` flag and wakes the core loop with
//! [`Command::Shutdown`], which then switches every segment off and releases
//! the GPIO handles before the process exits.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::Sender,
    thread,
};

use crate::core::Command;

/// Register the shutdown signals and spawn the thread that forwards them.
pub fn setup_signal_handler(
    sender: Sender<Command>,
    running: Arc<AtomicBool>,
    debug_enabled: bool,
) -> Result<()> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGHUP]).context("failed to register signal handlers")?;

    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for sig in signals.forever() {
                if debug_enabled {
                    log_pipe!();
                    log_debug!("Received {}", signal_name(sig));
                }
                running.store(false, Ordering::SeqCst);
                if sender.send(Command::Shutdown).is_err() {
                    // Core loop already gone
                    break;
                }
            }
        })
        .context("failed to spawn signal handler thread")?;

    Ok(())
}

fn signal_name(sig: i32) -> &'static str {
    match sig {
        SIGINT => "SIGINT",
        SIGTERM => "SIGTERM",
        SIGHUP => "SIGHUP",
        _ => "signal",
    }
}
