//! Wall-clock abstraction supporting both real and simulated time.
//!
//! The day/night scheduler reads the wall clock through this module so that a
//! whole night can be replayed with `stairlight simulate` in a few seconds.
//! Sweep timing inside the sequencer is driven by monotonic `Instant`s and is
//! never simulated.

use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Global time source instance, defaults to RealTimeSource
static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Trait for abstracting wall-clock reads
pub trait TimeSource: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Local>;

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// Real-time implementation that uses actual system time
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated wall clock advancing at a constant multiple of real time.
pub struct SimulatedTimeSource {
    start_time: DateTime<Local>,
    end_time: DateTime<Local>,
    /// Time acceleration factor (e.g., 60.0 = 1 simulated minute per real second)
    time_multiplier: f64,
    started_at: Mutex<Option<Instant>>,
}

impl SimulatedTimeSource {
    /// Create a new simulated time source.
    ///
    /// A non-positive multiplier falls back to one simulated hour per second.
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>, multiplier: f64) -> Self {
        Self {
            start_time,
            end_time,
            time_multiplier: if multiplier > 0.0 {
                multiplier
            } else {
                crate::common::constants::DEFAULT_SIMULATION_MULTIPLIER
            },
            started_at: Mutex::new(None),
        }
    }

    /// The effective time acceleration factor.
    pub fn multiplier(&self) -> f64 {
        self.time_multiplier
    }

    fn current_time(&self) -> DateTime<Local> {
        // The clock starts on first read so setup time does not count
        let elapsed = {
            let mut started = self
                .started_at
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            started.get_or_insert_with(Instant::now).elapsed()
        };

        let simulated_secs = elapsed.as_secs_f64() * self.time_multiplier;
        let simulated = self.start_time
            + ChronoDuration::milliseconds((simulated_secs * 1000.0) as i64);

        simulated.min(self.end_time)
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Local> {
        self.current_time()
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.current_time() >= self.end_time
    }
}

/// Initialize the global time source (call once at startup)
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

/// Check if the time source has been initialized
pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

/// Get the current time from the global time source
pub fn now() -> DateTime<Local> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource)).now()
}

/// Check if we're running in simulation mode
pub fn is_simulated() -> bool {
    TIME_SOURCE
        .get_or_init(|| Arc::new(RealTimeSource))
        .is_simulated()
}

/// Parse a datetime string in the format "YYYY-MM-DD HH:MM:SS" as local time
pub fn parse_datetime(s: &str) -> Result<DateTime<Local>, String> {
    use chrono::NaiveDateTime;

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))
        .and_then(|naive| {
            Local
                .from_local_datetime(&naive)
                .single()
                .ok_or_else(|| "Ambiguous or invalid local time".to_string())
        })
}
