//! Mode controller: the single owner of the lighting engine state.
//!
//! Motion events, scheduler ticks and control-surface requests all end up
//! here. The controller consults the routing policy of the current
//! [`OperatingMode`] and only then forwards to the [`MotionDispatcher`] or
//! applies a [`ScheduleAction`] to the [`Sequencer`].
//!
//! Driver faults never escape: they are logged, the lights are forced off
//! and the fault is kept for the status report.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

use super::command::{AmbientReport, SequencerReport, StatusReport, available_modes};
use super::dispatcher::{Dispatch, IgnoreReason, MotionDispatcher, MotionLocation};
use super::mode::{MotionPolicy, OperatingMode};
use super::scheduler::{DayNightScheduler, ScheduleAction};
use super::sequencer::{Direction, Sequencer};
use crate::error::{DriverFault, ModeRejected};

/// Parameters for creating a [`ModeController`].
pub struct ControllerParams {
    pub initial_mode: OperatingMode,
    pub sequencer: Sequencer,
    pub dispatcher: MotionDispatcher,
    pub scheduler: DayNightScheduler,
    pub diagnostic_step_delay: Duration,
    pub hold_duration: Duration,
    pub debug_enabled: bool,
}

pub struct ModeController {
    mode: OperatingMode,
    previous_mode: Option<OperatingMode>,
    sequencer: Sequencer,
    dispatcher: MotionDispatcher,
    scheduler: DayNightScheduler,
    diagnostic_step_delay: Duration,
    hold_duration: Duration,
    last_fault: Option<String>,
    debug_enabled: bool,
}

impl ModeController {
    pub fn new(params: ControllerParams) -> Self {
        Self {
            mode: params.initial_mode,
            previous_mode: None,
            sequencer: params.sequencer,
            dispatcher: params.dispatcher,
            scheduler: params.scheduler,
            diagnostic_step_delay: params.diagnostic_step_delay,
            hold_duration: params.hold_duration,
            last_fault: None,
            debug_enabled: params.debug_enabled,
        }
    }

    /// Put the hardware in a known state and apply the initial mode.
    pub fn start(&mut self) {
        log_block_start!("Mode: {} ({})", self.mode.label(), self.mode.id());
        let result = self.sequencer.deactivate_immediately();
        self.check(result);
        self.enter_mode();
    }

    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    pub fn previous_mode(&self) -> Option<OperatingMode> {
        self.previous_mode
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn scheduler(&self) -> &DayNightScheduler {
        &self.scheduler
    }

    pub fn last_fault(&self) -> Option<&str> {
        self.last_fault.as_deref()
    }

    /// Earliest instant at which [`ModeController::poll`] has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sequencer.next_deadline()
    }

    /// Switch to the mode named `requested`.
    ///
    /// Unknown names are rejected without touching any state. Requesting the
    /// current mode is a no-op.
    pub fn set_mode(&mut self, requested: &str) -> Result<OperatingMode, ModeRejected> {
        let target = OperatingMode::parse(requested)?;
        self.change_mode(target);
        Ok(target)
    }

    /// Returns whether the mode actually changed.
    pub fn change_mode(&mut self, target: OperatingMode) -> bool {
        if target == self.mode {
            if self.debug_enabled {
                log_debug!("Already in {} mode", target.id());
            }
            return false;
        }

        log_block_start!("Mode: {} → {}", self.mode.id(), target.id());
        self.previous_mode = Some(self.mode);
        self.mode = target;
        self.enter_mode();
        true
    }

    fn enter_mode(&mut self) {
        let result = match self.mode {
            OperatingMode::Off => self.sequencer.deactivate_immediately(),
            OperatingMode::AlwaysOn => self.sequencer.hold_all_on(),
            _ => Ok(()),
        };
        self.check(result);
    }

    /// Route a motion event according to the current mode.
    pub fn on_motion(&mut self, location: MotionLocation, now: Instant) -> Dispatch {
        let gate = match self.mode.motion_policy() {
            MotionPolicy::Never => Some(IgnoreReason::ModeUnauthorized),
            MotionPolicy::Always => None,
            MotionPolicy::WhenDark => (!self.scheduler.is_dark()).then_some(IgnoreReason::NotDark),
            MotionPolicy::AfterCutoff => {
                (!self.scheduler.is_after_cutoff()).then_some(IgnoreReason::BeforeCutoff)
            }
        };

        match gate {
            Some(reason) => self.dispatcher.ignore(location, reason),
            None => {
                if self.debug_enabled {
                    log_debug!("Motion at {location}");
                }
                self.dispatcher.on_motion(location, &mut self.sequencer, now)
            }
        }
    }

    /// Evaluate the day/night window and apply the scheduler's decision.
    ///
    /// A failed solar calculation keeps the previous reading.
    pub fn on_schedule_tick(&mut self, local_now: DateTime<Local>) -> ScheduleAction {
        if let Err(e) = self.scheduler.tick(local_now) {
            log_warning!("Failed to evaluate daylight: {e}");
        }

        let action = self
            .scheduler
            .decide(self.mode.schedule_policy(), self.sequencer.is_held());
        let result = match action {
            ScheduleAction::None => Ok(()),
            ScheduleAction::Hold => self.sequencer.hold_all_on(),
            ScheduleAction::Clear => self.sequencer.deactivate_immediately(),
        };
        self.check(result);
        action
    }

    /// Diagnostic slow sweep. Only allowed in diagnostic mode.
    pub fn test_trigger(&mut self, direction: Direction, now: Instant) -> Result<bool, ModeRejected> {
        if self.mode != OperatingMode::Diagnostic {
            return Err(ModeRejected::NotAuthorized {
                action: "test sweep",
                required: OperatingMode::Diagnostic.id(),
                current: self.mode.id(),
            });
        }

        let accepted = self.sequencer.activate(
            direction,
            self.diagnostic_step_delay,
            self.hold_duration,
            now,
        );
        if !accepted {
            log_decorated!("Test sweep ignored, a sweep is already running");
        }
        Ok(accepted)
    }

    /// Fire due sequencer timers.
    pub fn poll(&mut self, now: Instant) {
        let result = self.sequencer.poll(now);
        self.check(result);
    }

    /// Handle a fault reported outside the sequencer, e.g. a motion input.
    pub fn on_fault(&mut self, fault: DriverFault) {
        self.handle_fault(fault);
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            mode: self.mode,
            mode_label: self.mode.label().to_string(),
            previous_mode: self.previous_mode,
            available_modes: available_modes(),
            sequencer: SequencerReport::new(self.sequencer.state(), self.sequencer.lit_segments()),
            ambient: self.scheduler.reading().map(AmbientReport::from),
            ignored_triggers: self.dispatcher.ignored_triggers(),
            last_fault: self.last_fault.clone(),
        }
    }

    /// Turn everything off and release the segment handles.
    pub fn shutdown(&mut self) {
        if let Err(fault) = self.sequencer.deactivate_immediately() {
            log_error!("Failed to switch segments off: {fault}");
        }
        match self.sequencer.release() {
            Ok(()) => {
                if self.debug_enabled {
                    log_debug!("Released {} segment outputs", self.sequencer.len());
                }
            }
            Err(fault) => log_error!("Failed to release segment outputs: {fault}"),
        }
    }

    fn check(&mut self, result: Result<(), DriverFault>) {
        if let Err(fault) = result {
            self.handle_fault(fault);
        }
    }

    fn handle_fault(&mut self, fault: DriverFault) {
        log_pipe!();
        log_error!("Driver fault: {fault}");
        log_indented!("Switching all segments off");
        self.last_fault = Some(fault.to_string());

        // Keep going past further faults; every segment gets its off write
        if let Err(again) = self.sequencer.deactivate_immediately() {
            log_error!("Forced shutoff incomplete: {again}");
        }
    }
}
