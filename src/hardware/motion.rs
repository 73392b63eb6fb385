//! Motion sensor inputs.
//!
//! PIR sensors are plain digital inputs. A background thread samples every
//! configured pin at `motion_poll_interval` and forwards each rising edge to
//! the core loop as [`Command::Motion`]. A pin that cannot be read is reported
//! once as [`Command::InputFault`] and keeps being polled; it reports again
//! only after it has recovered and failed anew.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::sysfs::{PinDirection, SysfsPin};
use crate::config::MotionSourceConfig;
use crate::core::{Command, MotionLocation};

struct MotionInput {
    location: MotionLocation,
    pin: SysfsPin,
    level: bool,
    faulted: bool,
}

/// Result of sampling one input.
#[derive(Debug, PartialEq, Eq)]
enum Sample {
    Unchanged,
    Rising,
    Falling,
    Failed,
    Recovered,
}

impl MotionInput {
    fn sample(&mut self, sender: &Sender<Command>) -> Result<Sample, ()> {
        match self.pin.read() {
            Ok(level) => {
                let previous = std::mem::replace(&mut self.level, level);
                if std::mem::take(&mut self.faulted) {
                    // Treat the first good read as a baseline, not an edge
                    return Ok(Sample::Recovered);
                }
                match (previous, level) {
                    (false, true) => {
                        sender
                            .send(Command::Motion {
                                location: self.location,
                            })
                            .map_err(|_| ())?;
                        Ok(Sample::Rising)
                    }
                    (true, false) => Ok(Sample::Falling),
                    _ => Ok(Sample::Unchanged),
                }
            }
            Err(fault) => {
                if self.faulted {
                    return Ok(Sample::Unchanged);
                }
                self.faulted = true;
                sender.send(Command::InputFault(fault)).map_err(|_| ())?;
                Ok(Sample::Failed)
            }
        }
    }
}

/// Background sampler for the motion sensor pins.
pub struct MotionWatcher {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MotionWatcher {
    /// Open every configured input and start sampling.
    ///
    /// With no configured sources no thread is started; motion can then only
    /// be injected through the control surface.
    pub fn start(
        gpio_root: &Path,
        sources: &[MotionSourceConfig],
        interval: Duration,
        sender: Sender<Command>,
        debug_enabled: bool,
    ) -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));

        let mut inputs = Vec::with_capacity(sources.len());
        for source in sources {
            // PIR outputs are active high
            let pin = match SysfsPin::open(gpio_root, source.pin, PinDirection::Input, false) {
                Ok(pin) => pin,
                Err(fault) => {
                    release_inputs(&mut inputs, debug_enabled);
                    return Err(fault).with_context(|| {
                        format!("Failed to configure {} motion sensor", source.location)
                    });
                }
            };
            // Baseline: a sensor that is already high must fall before it triggers
            let (level, faulted) = match pin.read() {
                Ok(level) => (level, false),
                Err(_) => (false, true),
            };
            inputs.push(MotionInput {
                location: source.location,
                pin,
                level,
                faulted,
            });
        }

        if inputs.is_empty() {
            return Ok(Self {
                running,
                handle: None,
            });
        }

        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("motion".to_string())
            .spawn(move || watch(inputs, interval, sender, thread_running, debug_enabled))
            .context("failed to spawn motion sensor thread")?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop sampling and release the input pins.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log_warning!("Motion sensor thread panicked");
        }
    }
}

fn watch(
    mut inputs: Vec<MotionInput>,
    interval: Duration,
    sender: Sender<Command>,
    running: Arc<AtomicBool>,
    debug_enabled: bool,
) {
    'sampling: while running.load(Ordering::SeqCst) {
        for input in &mut inputs {
            match input.sample(&sender) {
                Ok(Sample::Rising) if debug_enabled => {
                    log_pipe!();
                    log_debug!("Motion at {} (GPIO {})", input.location, input.pin.pin());
                }
                Ok(Sample::Failed) => {
                    log_pipe!();
                    log_warning!(
                        "{} motion sensor (GPIO {}) cannot be read",
                        input.location,
                        input.pin.pin()
                    );
                }
                Ok(Sample::Recovered) => {
                    log_pipe!();
                    log_info!("{} motion sensor readable again", input.location);
                }
                Ok(_) => {}
                // Core loop is gone
                Err(()) => break 'sampling,
            }
        }
        thread::sleep(interval);
    }

    release_inputs(&mut inputs, debug_enabled);
}

fn release_inputs(inputs: &mut Vec<MotionInput>, debug_enabled: bool) {
    for input in inputs.drain(..) {
        if let Err(fault) = input.pin.release() {
            log_warning!("{}", fault);
        } else if debug_enabled {
            log_debug!("Released motion input GPIO {}", input.pin.pin());
        }
    }
}
