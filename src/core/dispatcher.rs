//! Motion dispatcher: maps a sensor location to a sweep direction.
//!
//! There is no debounce beyond the busy check. A sensor firing again while a
//! sweep is in flight is dropped and counted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use super::sequencer::{Direction, Sequencer};
use crate::error::ModeRejected;

/// Physical mounting location of a motion sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionLocation {
    Top,
    Bottom,
}

impl MotionLocation {
    /// Someone at the top walks down, so the lights follow them downwards.
    pub fn direction(&self) -> Direction {
        match self {
            MotionLocation::Top => Direction::Descending,
            MotionLocation::Bottom => Direction::Ascending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MotionLocation::Top => "top",
            MotionLocation::Bottom => "bottom",
        }
    }

    pub fn parse(requested: &str) -> Result<Self, ModeRejected> {
        match requested.trim().to_ascii_lowercase().as_str() {
            "top" => Ok(MotionLocation::Top),
            "bottom" => Ok(MotionLocation::Bottom),
            _ => Err(ModeRejected::InvalidArgument {
                kind: "motion location",
                requested: requested.to_string(),
            }),
        }
    }
}

impl fmt::Display for MotionLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a motion event did not reach the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The current mode does not route motion at all.
    ModeUnauthorized,
    /// Motion is routed only when dark and it is light.
    NotDark,
    /// Motion is routed only after the hybrid cutoff.
    BeforeCutoff,
    /// A sweep is already in flight.
    Busy,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            IgnoreReason::ModeUnauthorized => "not authorized by the current mode",
            IgnoreReason::NotDark => "it is not dark",
            IgnoreReason::BeforeCutoff => "the cutoff has not passed",
            IgnoreReason::Busy => "a sweep is already running",
        };
        f.write_str(text)
    }
}

/// Outcome of a motion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Activated(Direction),
    Ignored(IgnoreReason),
}

pub struct MotionDispatcher {
    step_delay: Duration,
    hold_duration: Duration,
    ignored: u64,
    debug_enabled: bool,
}

impl MotionDispatcher {
    pub fn new(step_delay: Duration, hold_duration: Duration, debug_enabled: bool) -> Self {
        Self {
            step_delay,
            hold_duration,
            ignored: 0,
            debug_enabled,
        }
    }

    /// Start a sweep for `location` if the sequencer is free.
    ///
    /// Callers have already checked that the mode authorizes motion.
    pub fn on_motion(
        &mut self,
        location: MotionLocation,
        sequencer: &mut Sequencer,
        now: Instant,
    ) -> Dispatch {
        let direction = location.direction();
        if sequencer.activate(direction, self.step_delay, self.hold_duration, now) {
            Dispatch::Activated(direction)
        } else {
            self.ignore(location, IgnoreReason::Busy)
        }
    }

    /// Record a motion event that was dropped.
    pub fn ignore(&mut self, location: MotionLocation, reason: IgnoreReason) -> Dispatch {
        self.ignored += 1;
        if self.debug_enabled {
            log_debug!("Motion at {location} ignored: {reason}");
        }
        Dispatch::Ignored(reason)
    }

    /// Number of motion events dropped since startup.
    pub fn ignored_triggers(&self) -> u64 {
        self.ignored
    }
}
