//! The command loop driven from another thread, the way the IPC server and
//! the motion watcher use it.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use stairlight::core::command::Reply;
use stairlight::core::dispatcher::MotionDispatcher;
use stairlight::core::scheduler::DayNightScheduler;
use stairlight::core::{
    Command, ControllerParams, Core, CoreParams, MotionLocation, ModeController, OperatingMode,
    Sequencer,
};
use stairlight::error::ModeRejected;
use stairlight::geo::{SolarCalculator, SunTimes};
use stairlight::hardware::recording::{RecordingDriver, WriteLog};
use stairlight::logger::Log;
use stairlight::time_source::TimeSource;

const SEGMENTS: usize = 3;
const STEP: Duration = Duration::from_millis(5);

struct FixedSun;

impl SolarCalculator for FixedSun {
    fn sun_times(&self, date: NaiveDate, _latitude: f64, _longitude: f64) -> Result<SunTimes> {
        let local = |h: u32| -> Result<DateTime<Local>> {
            let naive = date.and_hms_opt(h, 0, 0).context("invalid time")?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .context("nonexistent local time")
        };
        Ok(SunTimes {
            sunrise: local(6)?,
            sunrise_end: local(7)?,
            sunset_start: local(19)?,
            sunset: local(20)?,
        })
    }
}

/// Wall clock stuck at one instant.
struct FixedClock(DateTime<Local>);

impl TimeSource for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

fn clock_at(h: u32) -> Arc<dyn TimeSource> {
    let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let now = Local
        .from_local_datetime(&date.and_hms_opt(h, 0, 0).unwrap())
        .earliest()
        .unwrap();
    Arc::new(FixedClock(now))
}

struct Harness {
    commands: Sender<Command>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<ModeController>,
    log: WriteLog,
}

impl Harness {
    fn start(mode: OperatingMode, clock: Arc<dyn TimeSource>) -> Self {
        Log::set_enabled(false);
        let (driver, log) = RecordingDriver::new(SEGMENTS);
        let controller = ModeController::new(ControllerParams {
            initial_mode: mode,
            sequencer: Sequencer::new(Box::new(driver), STEP, false),
            dispatcher: MotionDispatcher::new(STEP, Duration::from_millis(20), false),
            scheduler: DayNightScheduler::new(
                Box::new(FixedSun),
                48.0,
                2.0,
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
                false,
            ),
            diagnostic_step_delay: STEP,
            hold_duration: Duration::from_millis(20),
            debug_enabled: false,
        });

        let (commands, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let core = Core::new(CoreParams {
            controller,
            receiver,
            running: running.clone(),
            clock,
            tick_interval: Duration::from_millis(10),
            debug_enabled: false,
        });
        let handle = thread::spawn(move || core.execute());

        Self {
            commands,
            running,
            handle,
            log,
        }
    }

    fn request(&self, build: impl FnOnce(Sender<Reply>) -> Command) -> Reply {
        let (reply, answer) = mpsc::channel();
        self.commands.send(build(reply)).unwrap();
        answer.recv_timeout(Duration::from_secs(5)).unwrap()
    }

    fn shutdown(self) -> (ModeController, WriteLog) {
        self.commands.send(Command::Shutdown).unwrap();
        (self.handle.join().unwrap(), self.log)
    }
}

#[test]
fn test_status_and_mode_change_round_trip() {
    let core = Harness::start(OperatingMode::Motion, clock_at(12));

    let status = core.request(|reply| Command::Status { reply }).unwrap();
    assert_eq!(status.mode, OperatingMode::Motion);
    assert_eq!(status.sequencer.state, "idle");
    assert_eq!(status.sequencer.lit, "000");
    assert!(status.ambient.is_some());

    let status = core
        .request(|reply| Command::SetMode {
            mode: "always-on".to_string(),
            reply,
        })
        .unwrap();
    assert_eq!(status.mode, OperatingMode::AlwaysOn);
    assert_eq!(status.previous_mode, Some(OperatingMode::Motion));
    assert_eq!(status.sequencer.state, "held");
    assert_eq!(status.sequencer.lit, "111");

    let (controller, log) = core.shutdown();
    assert_eq!(controller.mode(), OperatingMode::AlwaysOn);
    assert!(log.all_off());
    assert!(log.released());
}

#[test]
fn test_rejected_requests_leave_state_alone() {
    let core = Harness::start(OperatingMode::Motion, clock_at(12));

    let answer = core.request(|reply| Command::SetMode {
        mode: "strobe".to_string(),
        reply,
    });
    assert!(matches!(answer, Err(ModeRejected::UnknownMode { .. })));

    let answer = core.request(|reply| Command::Test {
        direction: stairlight::core::Direction::Ascending,
        reply,
    });
    assert!(matches!(answer, Err(ModeRejected::NotAuthorized { .. })));

    let status = core.request(|reply| Command::Status { reply }).unwrap();
    assert_eq!(status.mode, OperatingMode::Motion);
    assert_eq!(status.sequencer.state, "idle");

    core.shutdown();
}

#[test]
fn test_sensor_motion_completes_a_full_cycle() {
    let core = Harness::start(OperatingMode::Motion, clock_at(12));

    core.commands
        .send(Command::Motion {
            location: MotionLocation::Top,
        })
        .unwrap();

    // 3 on steps, the hold and 3 off steps take well under a second
    let mut status = core.request(|reply| Command::Status { reply }).unwrap();
    for _ in 0..100 {
        if status.sequencer.state == "idle" {
            break;
        }
        thread::sleep(Duration::from_millis(10));
        status = core.request(|reply| Command::Status { reply }).unwrap();
    }

    assert_eq!(status.sequencer.state, "idle");
    assert_eq!(status.sequencer.lit, "000");
    assert_eq!(core.log.indices(true), vec![2, 1, 0]);
    core.shutdown();
}

#[test]
fn test_trigger_reports_ignored_motion() {
    // Midday, so motion-when-dark drops the event
    let core = Harness::start(OperatingMode::MotionWhenDark, clock_at(12));

    let status = core
        .request(|reply| Command::Trigger {
            location: MotionLocation::Bottom,
            reply,
        })
        .unwrap();
    assert_eq!(status.ignored_triggers, 1);
    assert_eq!(status.sequencer.state, "idle");

    core.shutdown();
}

#[test]
fn test_mode_change_reapplies_the_schedule() {
    // 22:00 is dark, so switching to always-on-when-dark holds immediately
    let core = Harness::start(OperatingMode::Motion, clock_at(22));

    let status = core
        .request(|reply| Command::SetMode {
            mode: "always-on-when-dark".to_string(),
            reply,
        })
        .unwrap();
    assert_eq!(status.sequencer.state, "held");

    core.shutdown();
}

#[test]
fn test_running_flag_stops_the_loop() {
    let core = Harness::start(OperatingMode::AlwaysOn, clock_at(12));
    core.request(|reply| Command::Status { reply }).unwrap();

    core.running.store(false, Ordering::SeqCst);
    let controller = core.handle.join().unwrap();
    assert_eq!(controller.mode(), OperatingMode::AlwaysOn);
    assert!(core.log.all_off());
    assert!(core.log.released());
}

#[test]
fn test_closed_channel_stops_the_loop() {
    let core = Harness::start(OperatingMode::Motion, clock_at(12));
    let Harness {
        commands,
        handle,
        log,
        ..
    } = core;

    drop(commands);
    handle.join().unwrap();
    assert!(log.released());
}
