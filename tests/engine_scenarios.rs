//! End-to-end scenarios for the mode controller with an in-memory driver.
//!
//! The sun rises fully at 07:00 and starts setting at 19:00 every day; the
//! hybrid cutoff is 23:00.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use std::time::{Duration, Instant};

use stairlight::core::controller::{ControllerParams, ModeController};
use stairlight::core::dispatcher::{Dispatch, IgnoreReason, MotionDispatcher, MotionLocation};
use stairlight::core::scheduler::{DayNightScheduler, ScheduleAction};
use stairlight::core::{Direction, OperatingMode, Sequencer};
use stairlight::geo::{SolarCalculator, SunTimes};
use stairlight::hardware::recording::{RecordingDriver, WriteLog};
use stairlight::logger::Log;

const SEGMENTS: usize = 4;
const STEP: Duration = Duration::from_millis(100);
const HOLD: Duration = Duration::from_secs(1);
const DIAGNOSTIC_STEP: Duration = Duration::from_millis(500);

struct FixedSun;

impl SolarCalculator for FixedSun {
    fn sun_times(&self, date: NaiveDate, _latitude: f64, _longitude: f64) -> Result<SunTimes> {
        let local = |h: u32, m: u32| -> Result<DateTime<Local>> {
            let naive = date.and_hms_opt(h, m, 0).context("invalid time")?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .context("nonexistent local time")
        };
        Ok(SunTimes {
            sunrise: local(6, 55)?,
            sunrise_end: local(7, 0)?,
            sunset_start: local(19, 0)?,
            sunset: local(19, 5)?,
        })
    }
}

fn at(h: u32, m: u32) -> DateTime<Local> {
    let date = NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
    Local
        .from_local_datetime(&date.and_hms_opt(h, m, 0).unwrap())
        .earliest()
        .unwrap()
}

fn controller(mode: OperatingMode) -> (ModeController, WriteLog) {
    Log::set_enabled(false);
    let (driver, log) = RecordingDriver::new(SEGMENTS);
    let mut controller = ModeController::new(ControllerParams {
        initial_mode: mode,
        sequencer: Sequencer::new(Box::new(driver), STEP, false),
        dispatcher: MotionDispatcher::new(STEP, HOLD, false),
        scheduler: DayNightScheduler::new(
            Box::new(FixedSun),
            52.0,
            5.0,
            NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            false,
        ),
        diagnostic_step_delay: DIAGNOSTIC_STEP,
        hold_duration: HOLD,
        debug_enabled: false,
    });
    controller.start();
    log.clear();
    (controller, log)
}

/// Poll every `STEP` until `until` has passed.
fn run_until(controller: &mut ModeController, start: Instant, until: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed <= until {
        controller.poll(start + elapsed);
        elapsed += STEP;
    }
}

#[test]
fn test_night_walk_down_from_the_top() {
    let (mut controller, log) = controller(OperatingMode::MotionWhenDark);
    controller.on_schedule_tick(at(21, 30));

    let t0 = Instant::now();
    assert_eq!(
        controller.on_motion(MotionLocation::Top, t0),
        Dispatch::Activated(Direction::Descending)
    );

    // Fully lit after one step per segment
    run_until(&mut controller, t0, STEP * SEGMENTS as u32);
    assert!(log.all_on());
    assert_eq!(log.indices(true), vec![3, 2, 1, 0]);
    assert_eq!(controller.sequencer().state().name(), "lit");

    // Hold expires, then the off-sweep follows the walker down
    run_until(&mut controller, t0, STEP * SEGMENTS as u32 * 2 + HOLD);
    assert!(log.all_off());
    assert_eq!(log.indices(false), vec![3, 2, 1, 0]);
    assert_eq!(controller.sequencer().state().name(), "idle");
}

#[test]
fn test_daytime_motion_is_ignored_in_motion_when_dark() {
    let (mut controller, log) = controller(OperatingMode::MotionWhenDark);
    controller.on_schedule_tick(at(12, 0));

    assert_eq!(
        controller.on_motion(MotionLocation::Bottom, Instant::now()),
        Dispatch::Ignored(IgnoreReason::NotDark)
    );
    assert!(log.writes().is_empty());
    assert_eq!(controller.status().ignored_triggers, 1);
}

#[test]
fn test_second_walker_does_not_restart_the_sweep() {
    let (mut controller, log) = controller(OperatingMode::Motion);

    let t0 = Instant::now();
    controller.on_motion(MotionLocation::Bottom, t0);
    controller.poll(t0 + STEP * 2);
    assert_eq!(
        controller.on_motion(MotionLocation::Top, t0 + STEP * 2),
        Dispatch::Ignored(IgnoreReason::Busy)
    );

    run_until(&mut controller, t0, STEP * SEGMENTS as u32);
    assert_eq!(log.indices(true), vec![0, 1, 2, 3]);
}

#[test]
fn test_hybrid_night_holds_until_cutoff_then_follows_motion() {
    let (mut controller, log) = controller(OperatingMode::DarkThenMotion);

    // Evening: held on, motion does nothing
    assert_eq!(controller.on_schedule_tick(at(19, 30)), ScheduleAction::Hold);
    assert!(log.all_on());
    assert_eq!(
        controller.on_motion(MotionLocation::Bottom, Instant::now()),
        Dispatch::Ignored(IgnoreReason::BeforeCutoff)
    );
    assert_eq!(controller.on_schedule_tick(at(22, 59)), ScheduleAction::None);

    // Past the cutoff the hold is cleared and motion sweeps again
    assert_eq!(controller.on_schedule_tick(at(23, 30)), ScheduleAction::Clear);
    assert!(log.all_off());

    let t0 = Instant::now();
    assert_eq!(
        controller.on_motion(MotionLocation::Bottom, t0),
        Dispatch::Activated(Direction::Ascending)
    );

    // Early morning before sunrise still counts as after the cutoff
    run_until(&mut controller, t0, STEP * SEGMENTS as u32 * 2 + HOLD);
    assert_eq!(controller.on_schedule_tick(at(5, 0)), ScheduleAction::None);
    assert!(!controller.sequencer().is_held());

    // Daytime: nothing is held and motion is ignored
    assert_eq!(controller.on_schedule_tick(at(10, 0)), ScheduleAction::None);
    assert_eq!(
        controller.on_motion(MotionLocation::Top, Instant::now()),
        Dispatch::Ignored(IgnoreReason::BeforeCutoff)
    );
}

#[test]
fn test_always_on_when_dark_follows_the_sun() {
    let (mut controller, log) = controller(OperatingMode::AlwaysOnWhenDark);

    assert_eq!(controller.on_schedule_tick(at(12, 0)), ScheduleAction::None);
    assert!(log.all_off());

    assert_eq!(controller.on_schedule_tick(at(20, 0)), ScheduleAction::Hold);
    assert!(log.all_on());

    // Repeated ticks do not rewrite the outputs
    log.clear();
    assert_eq!(controller.on_schedule_tick(at(2, 0)), ScheduleAction::None);
    assert!(log.writes().is_empty());

    assert_eq!(controller.on_schedule_tick(at(7, 30)), ScheduleAction::Clear);
    assert!(log.all_off());
}

#[test]
fn test_mode_switch_cancels_a_running_sweep() {
    let (mut controller, log) = controller(OperatingMode::Motion);

    let t0 = Instant::now();
    controller.on_motion(MotionLocation::Bottom, t0);
    controller.poll(t0 + STEP * 2);
    assert_eq!(log.indices(true), vec![0, 1]);

    assert!(controller.set_mode("off").is_ok());
    assert!(log.all_off());
    assert_eq!(controller.sequencer().state().name(), "idle");
    assert_eq!(controller.next_deadline(), None);

    // Nothing left to fire
    log.clear();
    run_until(&mut controller, t0, STEP * SEGMENTS as u32 * 2 + HOLD);
    assert!(log.writes().is_empty());
}

#[test]
fn test_always_on_then_back_to_motion() {
    let (mut controller, log) = controller(OperatingMode::Motion);

    assert!(controller.set_mode("always-on").is_ok());
    assert!(log.all_on());
    assert!(controller.sequencer().is_held());
    assert_eq!(
        controller.on_motion(MotionLocation::Top, Instant::now()),
        Dispatch::Ignored(IgnoreReason::ModeUnauthorized)
    );

    // Leaving always-on keeps the lights as they are until something happens
    assert!(controller.set_mode("motion").is_ok());
    assert_eq!(controller.previous_mode(), Some(OperatingMode::AlwaysOn));
}

#[test]
fn test_unknown_mode_changes_nothing() {
    let (mut controller, log) = controller(OperatingMode::Motion);

    assert!(controller.set_mode("party").is_err());
    assert_eq!(controller.mode(), OperatingMode::Motion);
    assert_eq!(controller.previous_mode(), None);
    assert!(log.writes().is_empty());
}

#[test]
fn test_diagnostic_sweep_runs_slowly() {
    let (mut controller, log) = controller(OperatingMode::Diagnostic);

    let t0 = Instant::now();
    assert_eq!(controller.test_trigger(Direction::Ascending, t0), Ok(true));

    // Normal step spacing is not enough in diagnostic mode
    controller.poll(t0 + STEP * SEGMENTS as u32);
    assert!(log.writes().is_empty());

    controller.poll(t0 + DIAGNOSTIC_STEP * SEGMENTS as u32);
    assert!(log.all_on());
    assert_eq!(log.indices(true), vec![0, 1, 2, 3]);

    // Motion never reaches the sequencer here
    assert_eq!(
        controller.on_motion(MotionLocation::Bottom, t0),
        Dispatch::Ignored(IgnoreReason::ModeUnauthorized)
    );
}

#[test]
fn test_diagnostic_sweep_refused_outside_diagnostic_mode() {
    let (mut controller, log) = controller(OperatingMode::Motion);

    assert!(controller.test_trigger(Direction::Descending, Instant::now()).is_err());
    assert!(log.writes().is_empty());
}

#[test]
fn test_write_fault_forces_everything_off() {
    let (mut controller, log) = controller(OperatingMode::Motion);

    let t0 = Instant::now();
    controller.on_motion(MotionLocation::Bottom, t0);
    controller.poll(t0 + STEP * 2);
    log.fail_on(2);
    controller.poll(t0 + STEP * 3);

    assert_eq!(controller.sequencer().state().name(), "idle");
    assert_eq!(log.states(), vec![false; SEGMENTS]);
    let fault = controller.last_fault().unwrap();
    assert!(fault.contains("segment 2"), "unexpected fault: {fault}");
    assert_eq!(controller.status().last_fault.as_deref(), Some(fault));
}

#[test]
fn test_shutdown_switches_off_and_releases() {
    let (mut controller, log) = controller(OperatingMode::AlwaysOn);
    assert!(log.all_on());

    controller.shutdown();
    assert!(log.all_off());
    assert!(log.released());
}
