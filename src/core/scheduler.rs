//! Day/night scheduler.
//!
//! Each tick recomputes the [`ScheduleWindow`] for the current time, caches
//! the resulting reading and, when asked, decides whether the lights should be
//! held on or cleared. The scheduler never starts directional sweeps and never
//! touches the sequencer itself; the mode controller applies its decisions.

use anyhow::Result;
use chrono::{DateTime, Local, NaiveTime};

use super::mode::SchedulePolicy;
use crate::geo::{AmbientReading, ScheduleWindow, SolarCalculator};

/// What the scheduler wants done to the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleAction {
    None,
    Hold,
    Clear,
}

pub struct DayNightScheduler {
    calculator: Box<dyn SolarCalculator>,
    latitude: f64,
    longitude: f64,
    cutoff: NaiveTime,
    last: Option<AmbientReading>,
    debug_enabled: bool,
}

impl DayNightScheduler {
    pub fn new(
        calculator: Box<dyn SolarCalculator>,
        latitude: f64,
        longitude: f64,
        cutoff: NaiveTime,
        debug_enabled: bool,
    ) -> Self {
        Self {
            calculator,
            latitude,
            longitude,
            cutoff,
            last: None,
            debug_enabled,
        }
    }

    /// Recompute the window for `now` and cache the reading.
    ///
    /// On failure the previous reading is kept.
    pub fn tick(&mut self, now: DateTime<Local>) -> Result<AmbientReading> {
        let window = ScheduleWindow::compute(
            self.calculator.as_ref(),
            now,
            self.latitude,
            self.longitude,
            self.cutoff,
        )?;
        let reading = window.reading(now);

        match self.last {
            Some(previous) if previous.dark == reading.dark => {}
            Some(_) | None => {
                if reading.dark {
                    log_block_start!("Dark (sunset start {})", window.sunset_start.format("%H:%M"));
                } else {
                    log_block_start!("Light (sunrise end {})", window.sunrise_end.format("%H:%M"));
                }
            }
        }
        if self.debug_enabled {
            log_debug!(
                "Scheduler tick: dark={}, after_cutoff={}, cutoff {}",
                reading.dark,
                reading.after_cutoff,
                window.cutoff.format("%H:%M")
            );
        }

        self.last = Some(reading);
        Ok(reading)
    }

    /// Most recent reading, if any tick has succeeded yet.
    pub fn reading(&self) -> Option<&AmbientReading> {
        self.last.as_ref()
    }

    /// Whether the last reading was dark. Unknown counts as light.
    pub fn is_dark(&self) -> bool {
        self.last.is_some_and(|reading| reading.dark)
    }

    /// Whether the last reading was past the hybrid cutoff.
    pub fn is_after_cutoff(&self) -> bool {
        self.last.is_some_and(|reading| reading.after_cutoff)
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    /// Reconcile the wanted hold state with the actual one.
    pub fn decide(&self, policy: SchedulePolicy, held: bool) -> ScheduleAction {
        let want_hold = match policy {
            SchedulePolicy::Ignore => return ScheduleAction::None,
            SchedulePolicy::HoldWhenDark => self.is_dark(),
            SchedulePolicy::HoldUntilCutoff => self.is_dark() && !self.is_after_cutoff(),
        };

        match (want_hold, held) {
            (true, false) => ScheduleAction::Hold,
            (false, true) => ScheduleAction::Clear,
            _ => ScheduleAction::None,
        }
    }
}
