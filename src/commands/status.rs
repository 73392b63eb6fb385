//! Status command - display the daemon's runtime state via IPC.
//!
//! The daemon answers with a [`StatusReport`] taken from the core loop, so
//! what is printed is exactly what the sequencer is doing right now.

use anyhow::Result;

use crate::core::StatusReport;
use crate::ipc::Request;

pub fn handle_status_command(json: bool) -> Result<()> {
    let status = super::request_or_exit(&Request::Status);
    output_status(&status, json)
}

/// Output the status in the requested format.
pub(crate) fn output_status(status: &StatusReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
    } else {
        for line in format_status(status) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Human readable status, one entry per printed line.
pub(crate) fn format_status(status: &StatusReport) -> Vec<String> {
    let mut lines = Vec::new();

    lines.push(format!("          Mode: {} ({})", status.mode_label, status.mode));
    if let Some(previous) = status.previous_mode {
        lines.push(format!(" Previous mode: {previous}"));
    }

    let sequencer = &status.sequencer;
    let mut state = sequencer.state.clone();
    if let Some(action) = sequencer.action {
        state.push_str(match action {
            crate::core::sequencer::SweepAction::On => " on",
            crate::core::sequencer::SweepAction::Off => " off",
        });
    }
    if let Some(direction) = sequencer.direction {
        state.push_str(&format!(" ({direction})"));
    }
    lines.push(format!("     Sequencer: {state}"));
    lines.push(format!("      Segments: {}", render_mask(&sequencer.lit)));

    match &status.ambient {
        Some(ambient) => {
            lines.push(format!(
                "      Daylight: {}",
                if ambient.dark { "dark" } else { "light" }
            ));
            lines.push(format!(
                "   Sunrise end: {}",
                ambient.sunrise_end.format("%H:%M:%S")
            ));
            lines.push(format!(
                "  Sunset start: {}",
                ambient.sunset_start.format("%H:%M:%S")
            ));
            lines.push(format!(
                "        Cutoff: {}{}",
                ambient.cutoff.format("%H:%M"),
                if ambient.after_cutoff { " (passed)" } else { "" }
            ));
        }
        None => lines.push("      Daylight: unknown".to_string()),
    }

    if status.ignored_triggers > 0 {
        lines.push(format!("Ignored motion: {}", status.ignored_triggers));
    }
    if let Some(fault) = &status.last_fault {
        lines.push(format!("    Last fault: {fault}"));
    }

    lines
}

/// Render the lit mask bottom to top as filled and empty blocks.
fn render_mask(mask: &str) -> String {
    mask.chars()
        .map(|c| if c == '1' { '▮' } else { '▯' })
        .collect()
}
