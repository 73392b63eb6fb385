//! Application coordinator that manages the complete lifecycle of stairlight.
//!
//! This module handles resource acquisition, initialization, and orchestration
//! of the core loop. It manages:
//! - Configuration loading
//! - Lock file management for single-instance enforcement
//! - Segment driver creation
//! - Signal handler, control socket and motion sensor threads
//! - Orderly shutdown (all segments off, handles released)
//!
//! The `Stairlight` struct uses a builder pattern to support different startup contexts:
//! - Normal startup: `Stairlight::new(debug_enabled).run()`
//! - Simulation mode: `Stairlight::new(debug_enabled).without_lock().without_headers()
//!   .with_simulated_clock(source).run()`

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::time::Duration;

use crate::{
    common::constants::*,
    config::{Config, DriverKind},
    core::{
        Command, Core, CoreParams,
        controller::{ControllerParams, ModeController},
        dispatcher::MotionDispatcher,
        scheduler::DayNightScheduler,
        sequencer::Sequencer,
    },
    geo::SunriseCalculator,
    hardware::{self, SegmentDriver, motion::MotionWatcher, simulated::SimulatedSegments},
    io::{self, lock::acquire_lock, signals::setup_signal_handler},
    ipc::{self, IpcServer},
    time_source::{RealTimeSource, SimulatedTimeSource, TimeSource},
};

/// Shortest real-time scheduler tick while simulating
const MIN_SIMULATED_TICK: Duration = Duration::from_millis(10);

/// Builder for configuring and running the stairlight daemon.
///
/// # Examples
///
/// ```no_run
/// use stairlight::Stairlight;
///
/// # fn main() -> anyhow::Result<()> {
/// let debug_enabled = false;
/// Stairlight::new(debug_enabled).run()?;
/// # Ok(())
/// # }
/// ```
pub struct Stairlight {
    debug_enabled: bool,
    create_lock: bool,
    show_headers: bool,
    simulated: Option<Arc<SimulatedTimeSource>>,
}

impl Stairlight {
    /// Create a new runner with defaults matching normal run
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
            show_headers: true,
            simulated: None,
        }
    }

    /// Skip the instance lock and the control socket.
    ///
    /// Used for simulations so they never interfere with a real daemon.
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    /// Skip header display (already shown by the simulate command)
    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Drive the scheduler from a simulated wall clock and the log-only driver.
    pub fn with_simulated_clock(mut self, source: Arc<SimulatedTimeSource>) -> Self {
        self.simulated = Some(source);
        self
    }

    /// Execute the daemon until a shutdown signal or the end of a simulation.
    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
        }

        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                log_error_exit!("Configuration failed");
                eprintln!("{:?}", e);
                std::process::exit(EXIT_FAILURE);
            }
        };
        config.log_config();

        // Lock before touching any GPIO line another instance might own
        let lock = if self.create_lock {
            let lock = acquire_lock(&io::runtime_dir().join(LOCK_FILE_NAME))?;
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Lock acquired at {}", lock.path().display());
            }
            Some(lock)
        } else {
            None
        };

        let driver: Box<dyn SegmentDriver> = if self.simulated.is_some() {
            Box::new(SimulatedSegments::new(
                config.segments().len(),
                self.debug_enabled,
            ))
        } else {
            hardware::create_segment_driver(&config, self.debug_enabled)?
        };
        log_block_start!(
            "Segment driver: {} ({} segments)",
            driver.driver_name(),
            driver.len()
        );

        let mut controller = build_controller(&config, driver, self.debug_enabled)?;

        let (sender, receiver) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));

        // From here on a failed step must switch the segments off and unexport them
        release_on_error(
            setup_signal_handler(sender.clone(), Arc::clone(&running), self.debug_enabled),
            &mut controller,
            &running,
        )?;

        let socket_path = self.create_lock.then(ipc::socket_path);
        let watch_motion = self.simulated.is_none() && config.driver() == DriverKind::Sysfs;
        let services = release_on_error(
            start_services(
                &config,
                socket_path,
                watch_motion,
                &sender,
                &running,
                self.debug_enabled,
            ),
            &mut controller,
            &running,
        )?;
        drop(sender);

        let (clock, tick_interval): (Arc<dyn TimeSource>, Duration) = match &self.simulated {
            Some(source) => {
                let tick = config.poll_interval().div_f64(source.multiplier());
                (source.clone(), tick.max(MIN_SIMULATED_TICK))
            }
            None => (Arc::new(RealTimeSource), config.poll_interval()),
        };

        log_block_start!("Starting stairlight...");
        let core = Core::new(CoreParams {
            controller,
            receiver,
            running: Arc::clone(&running),
            clock,
            tick_interval,
            debug_enabled: self.debug_enabled,
        });
        let controller = core.execute();

        services.stop()?;
        if let Some(lock) = lock {
            lock.release();
        }

        if let Some(fault) = controller.last_fault() {
            log_block_start!("Last driver fault: {}", fault);
        }
        log_end!();
        Ok(())
    }
}

/// Threads feeding commands into the core loop besides the signal handler.
struct Services {
    ipc_server: Option<IpcServer>,
    motion: Option<MotionWatcher>,
}

impl Services {
    fn stop(self) -> Result<()> {
        if let Some(watcher) = self.motion {
            watcher.stop();
        }
        if let Some(server) = self.ipc_server {
            server.shutdown().context("Failed to stop control socket")?;
        }
        Ok(())
    }
}

/// Start the control socket (when `socket_path` is given) and the motion watcher.
///
/// A motion watcher that fails to start stops the already running socket
/// server, which removes its socket file.
fn start_services(
    config: &Config,
    socket_path: Option<PathBuf>,
    watch_motion: bool,
    sender: &Sender<Command>,
    running: &Arc<AtomicBool>,
    debug_enabled: bool,
) -> Result<Services> {
    let ipc_server = match socket_path {
        Some(path) => {
            let server =
                IpcServer::start(path.clone(), sender.clone(), Arc::clone(running), debug_enabled)?;
            log_block_start!("Control socket: {}", path.display());
            Some(server)
        }
        None => None,
    };

    if !watch_motion {
        return Ok(Services {
            ipc_server,
            motion: None,
        });
    }

    let watcher = match MotionWatcher::start(
        &config.gpio_root(),
        &config.motion_sources(),
        config.motion_poll_interval(),
        sender.clone(),
        debug_enabled,
    ) {
        Ok(watcher) => watcher,
        Err(e) => {
            running.store(false, Ordering::SeqCst);
            if let Some(server) = ipc_server
                && let Err(stop_error) = server.shutdown()
            {
                log_warning!("Failed to stop control socket: {:#}", stop_error);
            }
            return Err(e);
        }
    };
    if !watcher.is_active() {
        log_pipe!();
        log_warning!("No motion sensors configured, motion only via `stairlight trigger`");
    }

    Ok(Services {
        ipc_server,
        motion: Some(watcher),
    })
}

/// Switch everything off and stop the helper threads when a startup step fails.
fn release_on_error<T>(
    result: Result<T>,
    controller: &mut ModeController,
    running: &AtomicBool,
) -> Result<T> {
    if result.is_err() {
        running.store(false, Ordering::SeqCst);
        controller.shutdown();
    }
    result
}

/// Build a controller for the given configuration with an explicit driver.
///
/// Used by tests and tools that need the engine without any threads.
pub fn build_controller(
    config: &Config,
    mut driver: Box<dyn SegmentDriver>,
    debug_enabled: bool,
) -> Result<ModeController> {
    let settings = config
        .startup_mode()
        .and_then(|mode| Ok((mode, config.cutoff()?)));
    let (initial_mode, cutoff) = match settings {
        Ok(settings) => settings,
        Err(e) => {
            if let Err(fault) = driver.release() {
                log_warning!("Failed to release segment outputs: {fault}");
            }
            return Err(e);
        }
    };

    Ok(ModeController::new(ControllerParams {
        initial_mode,
        sequencer: Sequencer::new(driver, config.step_delay(), debug_enabled),
        dispatcher: MotionDispatcher::new(config.step_delay(), config.hold_duration(), debug_enabled),
        scheduler: DayNightScheduler::new(
            Box::new(SunriseCalculator),
            config.latitude(),
            config.longitude(),
            cutoff,
            debug_enabled,
        ),
        diagnostic_step_delay: config.diagnostic_step_delay(),
        hold_duration: config.hold_duration(),
        debug_enabled,
    }))
}
