//! In-memory segment driver for tests.
//!
//! The driver and its [`WriteLog`] share state, so a test can hand the driver
//! to a sequencer and still inspect every write afterwards.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::SegmentDriver;
use crate::error::DriverFault;

#[derive(Debug, Default)]
struct Recorded {
    writes: Vec<(usize, bool)>,
    states: Vec<bool>,
    failing: Option<usize>,
    released: bool,
}

/// Shared view of everything a [`RecordingDriver`] was asked to do.
#[derive(Debug, Clone)]
pub struct WriteLog {
    inner: Arc<Mutex<Recorded>>,
}

impl WriteLog {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every successful write in order, as `(index, on)`.
    pub fn writes(&self) -> Vec<(usize, bool)> {
        self.lock().writes.clone()
    }

    /// Indices written with the given level, in order.
    pub fn indices(&self, on: bool) -> Vec<usize> {
        self.lock()
            .writes
            .iter()
            .filter(|(_, level)| *level == on)
            .map(|(index, _)| *index)
            .collect()
    }

    /// Current level of every segment.
    pub fn states(&self) -> Vec<bool> {
        self.lock().states.clone()
    }

    pub fn all_off(&self) -> bool {
        self.lock().states.iter().all(|on| !on)
    }

    pub fn all_on(&self) -> bool {
        self.lock().states.iter().all(|on| *on)
    }

    /// Forget recorded writes, keeping the current levels.
    pub fn clear(&self) {
        self.lock().writes.clear();
    }

    /// Make every write to `index` fail until [`WriteLog::heal`] is called.
    pub fn fail_on(&self, index: usize) {
        self.lock().failing = Some(index);
    }

    pub fn heal(&self) {
        self.lock().failing = None;
    }

    pub fn released(&self) -> bool {
        self.lock().released
    }
}

pub struct RecordingDriver {
    log: WriteLog,
}

impl RecordingDriver {
    pub fn new(len: usize) -> (Self, WriteLog) {
        let log = WriteLog {
            inner: Arc::new(Mutex::new(Recorded {
                states: vec![false; len],
                ..Recorded::default()
            })),
        };
        (Self { log: log.clone() }, log)
    }
}

impl SegmentDriver for RecordingDriver {
    fn len(&self) -> usize {
        self.log.lock().states.len()
    }

    fn write(&mut self, index: usize, on: bool) -> Result<(), DriverFault> {
        let mut recorded = self.log.lock();
        let len = recorded.states.len();
        if index >= len {
            return Err(DriverFault::OutOfRange { index, len });
        }
        if recorded.failing == Some(index) {
            return Err(DriverFault::Write {
                index,
                pin: index as u32,
                source: io::Error::other("injected failure"),
            });
        }
        recorded.states[index] = on;
        recorded.writes.push((index, on));
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverFault> {
        self.log.lock().released = true;
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "recording"
    }
}
