//! Messages accepted by the core loop and the status payload it reports.
//!
//! Every external trigger (motion edges, control-surface requests, signals)
//! is turned into a [`Command`] and sent over one channel, so the engine
//! state is only ever mutated from the loop that owns it.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

use super::dispatcher::MotionLocation;
use super::mode::OperatingMode;
use super::sequencer::{Direction, SequencerState, SweepAction};
use crate::error::{DriverFault, ModeRejected};
use crate::geo::AmbientReading;

/// Answer to a control-surface request.
pub type Reply = Result<StatusReport, ModeRejected>;

#[derive(Debug)]
pub enum Command {
    /// Rising edge from a motion sensor.
    Motion { location: MotionLocation },
    /// Motion injected through the control surface.
    Trigger {
        location: MotionLocation,
        reply: Sender<Reply>,
    },
    SetMode { mode: String, reply: Sender<Reply> },
    Status { reply: Sender<Reply> },
    /// Diagnostic sweep, only honoured in diagnostic mode.
    Test {
        direction: Direction,
        reply: Sender<Reply>,
    },
    /// A motion input could not be read.
    InputFault(DriverFault),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeEntry {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerReport {
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<SweepAction>,
    /// One character per segment, bottom first: `1` lit, `0` dark.
    pub lit: String,
}

impl SequencerReport {
    pub fn new(state: SequencerState, lit: &[bool]) -> Self {
        let action = match state {
            SequencerState::Sweeping { action, .. } => Some(action),
            _ => None,
        };
        Self {
            state: state.name().to_string(),
            direction: state.direction(),
            action,
            lit: lit.iter().map(|&on| if on { '1' } else { '0' }).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbientReport {
    pub dark: bool,
    pub after_cutoff: bool,
    pub sunrise_end: DateTime<Local>,
    pub sunset_start: DateTime<Local>,
    pub cutoff: DateTime<Local>,
}

impl From<&AmbientReading> for AmbientReport {
    fn from(reading: &AmbientReading) -> Self {
        Self {
            dark: reading.dark,
            after_cutoff: reading.after_cutoff,
            sunrise_end: reading.window.sunrise_end,
            sunset_start: reading.window.sunset_start,
            cutoff: reading.window.cutoff,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub mode: OperatingMode,
    pub mode_label: String,
    pub previous_mode: Option<OperatingMode>,
    pub available_modes: Vec<ModeEntry>,
    pub sequencer: SequencerReport,
    pub ambient: Option<AmbientReport>,
    pub ignored_triggers: u64,
    pub last_fault: Option<String>,
}

/// Every mode with its label, in menu order.
pub fn available_modes() -> Vec<ModeEntry> {
    OperatingMode::ALL
        .iter()
        .map(|mode| ModeEntry {
            id: mode.id().to_string(),
            label: mode.label().to_string(),
        })
        .collect()
}
