//! Trigger command - inject a motion event as if a sensor had fired.
//!
//! The event goes through the same dispatcher as hardware edges, so it is
//! ignored whenever the current mode would ignore real motion.

use anyhow::Result;

use crate::core::MotionLocation;
use crate::ipc::Request;

pub fn handle_trigger_command(location: MotionLocation) -> Result<()> {
    let before = super::request_or_exit(&Request::Status).ignored_triggers;
    let status = super::request_or_exit(&Request::Trigger { location });

    log_version!();
    if status.ignored_triggers > before {
        log_block_start!(
            "Motion at {} ignored (mode {}, sequencer {})",
            location,
            status.mode,
            status.sequencer.state
        );
    } else {
        log_block_start!(
            "Motion at {} accepted: sweeping {}",
            location,
            location.direction()
        );
    }
    log_end!();
    Ok(())
}
