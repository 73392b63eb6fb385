//! Core lighting engine and its command loop.
//!
//! This module owns every piece of mutable lighting state:
//!
//! - [`sequencer`]: timed, directional sweeps over the segments
//! - [`dispatcher`]: motion sensor location to sweep direction
//! - [`scheduler`]: day/night window evaluation and hold/clear decisions
//! - [`controller`]: the operating mode and its routing policy
//! - [`command`]: messages accepted by the loop and the status payload
//!
//! The [`Core`] loop is the single serialization point. Motion watchers,
//! the IPC server and the signal handler only ever send [`Command`]s over a
//! channel; the loop blocks in `recv_timeout` until either a command arrives,
//! a sequencer timer is due or the next scheduler tick.

pub mod command;
pub mod controller;
pub mod dispatcher;
pub mod mode;
pub mod scheduler;
pub mod sequencer;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

pub use command::{Command, Reply, StatusReport};
pub use controller::{ControllerParams, ModeController};
pub use dispatcher::{Dispatch, MotionLocation};
pub use mode::OperatingMode;
pub use sequencer::{Direction, Sequencer};

use crate::error::ModeRejected;
use crate::time_source::TimeSource;

/// Parameters for creating a [`Core`].
pub struct CoreParams {
    pub controller: ModeController,
    pub receiver: Receiver<Command>,
    pub running: Arc<AtomicBool>,
    /// Wall clock used for day/night evaluation.
    pub clock: Arc<dyn TimeSource>,
    /// Real time between scheduler ticks.
    pub tick_interval: Duration,
    pub debug_enabled: bool,
}

pub struct Core {
    controller: ModeController,
    receiver: Receiver<Command>,
    running: Arc<AtomicBool>,
    clock: Arc<dyn TimeSource>,
    tick_interval: Duration,
    debug_enabled: bool,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        Self {
            controller: params.controller,
            receiver: params.receiver,
            running: params.running,
            clock: params.clock,
            tick_interval: params.tick_interval,
            debug_enabled: params.debug_enabled,
        }
    }

    /// Run until shutdown is requested, then switch everything off and
    /// release the segment outputs.
    pub fn execute(mut self) -> ModeController {
        self.controller.start();
        self.controller.on_schedule_tick(self.clock.now());
        let mut next_tick = Instant::now() + self.tick_interval;

        while self.running.load(Ordering::SeqCst) && !self.clock.is_ended() {
            let now = Instant::now();
            self.controller.poll(now);

            if now >= next_tick {
                self.controller.on_schedule_tick(self.clock.now());
                next_tick = now + self.tick_interval;
            }

            let deadline = self
                .controller
                .next_deadline()
                .map_or(next_tick, |due| due.min(next_tick));
            let timeout = deadline.saturating_duration_since(Instant::now());

            match self.receiver.recv_timeout(timeout) {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if self.debug_enabled {
                        log_debug!("Command channel closed");
                    }
                    break;
                }
            }
        }

        log_block_start!("Shutting down...");
        self.running.store(false, Ordering::SeqCst);
        self.controller.shutdown();
        self.controller
    }

    /// Apply one command. Returns false when the loop should stop.
    fn handle(&mut self, command: Command) -> bool {
        let now = Instant::now();
        // Bring the sweep up to date before anything preempts it
        self.controller.poll(now);

        match command {
            Command::Motion { location } => {
                self.controller.on_motion(location, now);
            }
            Command::Trigger { location, reply } => {
                self.controller.on_motion(location, now);
                self.reply(&reply, Ok(()));
            }
            Command::SetMode { mode, reply } => {
                let result = self.controller.set_mode(&mode).map(|_| {
                    self.controller.on_schedule_tick(self.clock.now());
                });
                self.reply(&reply, result);
            }
            Command::Status { reply } => self.reply(&reply, Ok(())),
            Command::Test { direction, reply } => {
                let result = self.controller.test_trigger(direction, now).map(|_| ());
                self.reply(&reply, result);
            }
            Command::InputFault(fault) => self.controller.on_fault(fault),
            Command::Shutdown => return false,
        }
        true
    }

    fn reply(&self, reply: &Sender<Reply>, result: Result<(), ModeRejected>) {
        let answer = result.map(|()| self.controller.status());
        // The requester may have timed out and gone away
        if reply.send(answer).is_err() && self.debug_enabled {
            log_debug!("Dropped reply to a disconnected client");
        }
    }
}
