//! Mode command - switch the running daemon's operating mode.

use anyhow::Result;

use crate::ipc::Request;

pub fn handle_mode_command(mode: String) -> Result<()> {
    let before = super::request_or_exit(&Request::Status).mode;
    let status = super::request_or_exit(&Request::SetMode { mode });

    log_version!();
    if before == status.mode {
        log_block_start!("Mode unchanged: {}", status.mode);
    } else {
        log_block_start!("Mode changed: {} → {}", before, status.mode);
    }
    log_indented!("{}", status.mode_label);
    log_end!();
    Ok(())
}
