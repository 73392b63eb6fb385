//! Segment sequencing state machine.
//!
//! The sequencer owns the segment driver and turns segments on and off in a
//! directional, timed order. It never sleeps: timers are stored as a single
//! [`PendingTimer`] and fired by [`Sequencer::poll`], which the core loop calls
//! whenever [`Sequencer::next_deadline`] has passed. Any new command replaces
//! the pending timer before doing anything else, so two sweeps can never
//! write the same segments concurrently.
//!
//! State transitions:
//!
//! ```text
//!            activate                 last step            hold timer
//!   Idle ─────────────▶ Sweeping(On) ───────────▶ Lit(dir) ──────────▶ Sweeping(Off) ──▶ Idle
//!     │  activate_all                                 ▲                      ▲
//!     └──────────────────────────────────────▶ Lit(None) ── hold timer ──▶ Idle (sync)
//!
//!   any ── hold_all_on ──▶ Held        any ── deactivate_immediately ──▶ Idle
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::{DriverFault, ModeRejected};
use crate::hardware::SegmentDriver;

/// Direction of a sweep. Ascending starts at segment 0 (bottom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    /// Parse a direction name. Accepts `up`/`down` as aliases.
    pub fn parse(requested: &str) -> Result<Self, ModeRejected> {
        match requested.trim().to_ascii_lowercase().as_str() {
            "ascending" | "up" => Ok(Direction::Ascending),
            "descending" | "down" => Ok(Direction::Descending),
            _ => Err(ModeRejected::InvalidArgument {
                kind: "direction",
                requested: requested.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Ascending => "ascending",
            Direction::Descending => "descending",
        }
    }

    /// Index of the first segment touched by a sweep in this direction.
    fn leading_end(&self, len: usize) -> isize {
        match self {
            Direction::Ascending => 0,
            Direction::Descending => len as isize - 1,
        }
    }

    fn stride(&self) -> isize {
        match self {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a sweep writes to each segment it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepAction {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerState {
    /// Everything off, nothing pending.
    Idle,
    /// A timed sweep is running; `cursor` is the next segment to touch.
    Sweeping {
        action: SweepAction,
        direction: Direction,
        cursor: isize,
    },
    /// Fully lit with a hold timer pending. `None` after `activate_all`.
    Lit { direction: Option<Direction> },
    /// Fully lit until told otherwise.
    Held,
}

impl SequencerState {
    pub fn name(&self) -> &'static str {
        match self {
            SequencerState::Idle => "idle",
            SequencerState::Sweeping { .. } => "sweeping",
            SequencerState::Lit { .. } => "lit",
            SequencerState::Held => "held",
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            SequencerState::Sweeping { direction, .. } => Some(*direction),
            SequencerState::Lit { direction } => *direction,
            SequencerState::Idle | SequencerState::Held => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Step,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTimer {
    kind: TimerKind,
    due: Instant,
}

pub struct Sequencer {
    driver: Box<dyn SegmentDriver>,
    lit: Vec<bool>,
    state: SequencerState,
    timer: Option<PendingTimer>,
    /// Spacing of the sweep currently running.
    sweep_delay: Duration,
    /// Hold applied when the current on-sweep completes.
    hold_duration: Duration,
    /// Spacing used for off-sweeps.
    off_step_delay: Duration,
    debug_enabled: bool,
}

impl Sequencer {
    pub fn new(driver: Box<dyn SegmentDriver>, off_step_delay: Duration, debug_enabled: bool) -> Self {
        let len = driver.len();
        Self {
            driver,
            lit: vec![false; len],
            state: SequencerState::Idle,
            timer: None,
            sweep_delay: off_step_delay,
            hold_duration: Duration::ZERO,
            off_step_delay,
            debug_enabled,
        }
    }

    pub fn len(&self) -> usize {
        self.lit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lit.is_empty()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    /// True while a sweep or a timed hold is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.state,
            SequencerState::Sweeping { .. } | SequencerState::Lit { .. }
        )
    }

    pub fn is_held(&self) -> bool {
        self.state == SequencerState::Held
    }

    /// Logical level of every segment as last written.
    pub fn lit_segments(&self) -> &[bool] {
        &self.lit
    }

    pub fn driver_name(&self) -> &'static str {
        self.driver.driver_name()
    }

    /// When [`Sequencer::poll`] next has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timer.map(|timer| timer.due)
    }

    /// Start an on-sweep. Ignored while busy; returns whether it was accepted.
    pub fn activate(
        &mut self,
        direction: Direction,
        step_delay: Duration,
        hold_duration: Duration,
        now: Instant,
    ) -> bool {
        if self.is_busy() || self.is_empty() {
            return false;
        }

        log_decorated!(
            "Sweeping on {direction} ({}ms steps, {}s hold)",
            step_delay.as_millis(),
            hold_duration.as_secs()
        );

        self.sweep_delay = step_delay;
        self.hold_duration = hold_duration;
        self.state = SequencerState::Sweeping {
            action: SweepAction::On,
            direction,
            cursor: direction.leading_end(self.len()),
        };
        self.timer = Some(PendingTimer {
            kind: TimerKind::Step,
            due: now + step_delay,
        });
        true
    }

    /// Start an off-sweep from the leading end of `direction`.
    ///
    /// No-op unless busy. From `Lit(None)` every segment is turned off at once.
    pub fn deactivate(&mut self, direction: Direction, now: Instant) -> Result<(), DriverFault> {
        match self.state {
            SequencerState::Idle | SequencerState::Held => Ok(()),
            SequencerState::Lit { direction: None } => {
                log_decorated!("Switching all segments off");
                self.timer = None;
                self.state = SequencerState::Idle;
                self.write_all(false)
            }
            SequencerState::Sweeping { .. } | SequencerState::Lit { direction: Some(_) } => {
                log_decorated!("Sweeping off {direction}");
                self.start_off_sweep(direction, now);
                Ok(())
            }
        }
    }

    /// Turn every segment on at once and arm the hold timer. Ignored while busy.
    pub fn activate_all(&mut self, hold_duration: Duration, now: Instant) -> Result<bool, DriverFault> {
        if self.is_busy() {
            return Ok(false);
        }

        log_decorated!("Switching all segments on ({}s hold)", hold_duration.as_secs());

        self.hold_duration = hold_duration;
        self.state = SequencerState::Lit { direction: None };
        self.timer = Some(PendingTimer {
            kind: TimerKind::Hold,
            due: now + hold_duration,
        });
        self.write_all(true)?;
        Ok(true)
    }

    /// Turn every segment on and keep it on with no timer.
    pub fn hold_all_on(&mut self) -> Result<(), DriverFault> {
        log_decorated!("Holding all segments on");
        self.timer = None;
        self.state = SequencerState::Held;
        self.write_all(true)
    }

    /// Cancel everything and switch every segment off.
    ///
    /// Every segment is attempted even if some writes fail; the first fault is
    /// returned. The state is `Idle` either way.
    pub fn deactivate_immediately(&mut self) -> Result<(), DriverFault> {
        if self.state != SequencerState::Idle || self.lit.iter().any(|on| *on) {
            log_decorated!("Switching all segments off immediately");
        }
        self.timer = None;
        self.state = SequencerState::Idle;
        self.write_all(false)
    }

    /// Fire every timer that is due at `now`, in order.
    ///
    /// Late processing catches up one step at a time, each step scheduled
    /// relative to the previous deadline rather than to `now`.
    pub fn poll(&mut self, now: Instant) -> Result<(), DriverFault> {
        while let Some(timer) = self.timer {
            if timer.due > now {
                break;
            }
            match timer.kind {
                TimerKind::Step => self.step(timer.due)?,
                TimerKind::Hold => self.hold_expired(timer.due)?,
            }
        }
        Ok(())
    }

    /// Release the driver handles. Called once at shutdown.
    pub fn release(&mut self) -> Result<(), DriverFault> {
        self.timer = None;
        self.driver.release()
    }

    fn start_off_sweep(&mut self, direction: Direction, now: Instant) {
        self.sweep_delay = self.off_step_delay;
        self.state = SequencerState::Sweeping {
            action: SweepAction::Off,
            direction,
            cursor: direction.leading_end(self.len()),
        };
        self.timer = Some(PendingTimer {
            kind: TimerKind::Step,
            due: now + self.off_step_delay,
        });
    }

    fn step(&mut self, due: Instant) -> Result<(), DriverFault> {
        let SequencerState::Sweeping {
            action,
            direction,
            cursor,
        } = self.state
        else {
            self.timer = None;
            return Ok(());
        };

        // Cursor is kept in range by construction; reaching here with it
        // outside means the sweep already finished.
        if cursor >= 0 && (cursor as usize) < self.len() {
            self.write(cursor as usize, action == SweepAction::On)?;
        }

        let next = cursor + direction.stride();
        if next < 0 || next as usize >= self.len() {
            match action {
                SweepAction::On => {
                    if self.debug_enabled {
                        log_debug!("Sweep {direction} complete, holding");
                    }
                    self.state = SequencerState::Lit {
                        direction: Some(direction),
                    };
                    self.timer = Some(PendingTimer {
                        kind: TimerKind::Hold,
                        due: due + self.hold_duration,
                    });
                }
                SweepAction::Off => {
                    if self.debug_enabled {
                        log_debug!("Off-sweep {direction} complete");
                    }
                    self.state = SequencerState::Idle;
                    self.timer = None;
                }
            }
        } else {
            self.state = SequencerState::Sweeping {
                action,
                direction,
                cursor: next,
            };
            self.timer = Some(PendingTimer {
                kind: TimerKind::Step,
                due: due + self.sweep_delay,
            });
        }
        Ok(())
    }

    fn hold_expired(&mut self, due: Instant) -> Result<(), DriverFault> {
        match self.state {
            SequencerState::Lit {
                direction: Some(direction),
            } => self.deactivate(direction, due),
            SequencerState::Lit { direction: None } => self.deactivate(Direction::Ascending, due),
            _ => {
                self.timer = None;
                Ok(())
            }
        }
    }

    fn write(&mut self, index: usize, on: bool) -> Result<(), DriverFault> {
        self.driver.write(index, on)?;
        self.lit[index] = on;
        Ok(())
    }

    fn write_all(&mut self, on: bool) -> Result<(), DriverFault> {
        let mut first_fault = None;
        for index in 0..self.len() {
            if let Err(fault) = self.write(index, on) {
                first_fault.get_or_insert(fault);
            }
        }
        first_fault.map_or(Ok(()), Err)
    }
}
