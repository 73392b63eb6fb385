//! Command-line command handlers for stairlight.
//!
//! One-shot commands (`status`, `mode`, `trigger`, `test`) talk to a running
//! daemon over the control socket. `simulate` prepares a simulated clock and
//! hands over to the normal daemon run.

pub mod mode;
pub mod simulate;
pub mod status;
pub mod trigger;

use crate::common::constants::EXIT_FAILURE;
use crate::core::StatusReport;
use crate::ipc::{IpcClient, Request};

/// Send `request` to the running daemon.
///
/// Exits the process with a failure code when no daemon is running or the
/// request is refused, after printing the reason.
pub(crate) fn request_or_exit(request: &Request) -> StatusReport {
    let client = IpcClient::new();
    if !client.is_running() {
        log_error_standalone!("No stairlight process is running");
        println!("  Start stairlight first or use 'stairlight --debug' to run");
        std::process::exit(EXIT_FAILURE);
    }

    match client.request(request) {
        Ok(status) => status,
        Err(e) => {
            log_error_standalone!("{:#}", e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}
