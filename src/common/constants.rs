//! Application-wide constants: defaults, validation limits, file names.
//!
//! Durations are expressed in milliseconds to match the configuration file.

// # Segment Defaults

/// Default segment outputs, bottom tread first (BCM numbering)
pub const DEFAULT_SEGMENTS: [u32; 14] = [17, 18, 27, 22, 23, 24, 25, 4, 5, 6, 13, 19, 26, 12];
/// Relay boards driving the treads are typically active-low
pub const DEFAULT_ACTIVE_LOW: bool = true;
pub const MAXIMUM_SEGMENTS: usize = 64;
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

// # Motion Defaults

pub const DEFAULT_TOP_MOTION_PIN: u32 = 21;
pub const DEFAULT_BOTTOM_MOTION_PIN: u32 = 20;

// # Timing Defaults (milliseconds)

pub const DEFAULT_STEP_DELAY: u64 = 250;
pub const MINIMUM_STEP_DELAY: u64 = 1;
pub const MAXIMUM_STEP_DELAY: u64 = 60_000;

pub const DEFAULT_HOLD_DURATION: u64 = 20_000;
pub const MINIMUM_HOLD_DURATION: u64 = 1;
pub const MAXIMUM_HOLD_DURATION: u64 = 3_600_000;

pub const DEFAULT_POLL_INTERVAL: u64 = 60_000;
pub const MINIMUM_POLL_INTERVAL: u64 = 1_000;
pub const MAXIMUM_POLL_INTERVAL: u64 = 3_600_000;

/// Slow sweep used by the diagnostic test trigger
pub const DEFAULT_DIAGNOSTIC_STEP_DELAY: u64 = 5_000;

pub const DEFAULT_MOTION_POLL_INTERVAL: u64 = 25;
pub const MINIMUM_MOTION_POLL_INTERVAL: u64 = 5;
pub const MAXIMUM_MOTION_POLL_INTERVAL: u64 = 1_000;

// # Scheduling Defaults

pub const DEFAULT_LATITUDE: f64 = 51.5;
pub const DEFAULT_LONGITUDE: f64 = -0.1;
/// Hybrid mode stops holding the lights on at this local time
pub const DEFAULT_CUTOFF: &str = "23:00";
pub const DEFAULT_STARTUP_MODE: &str = "motion-when-dark";

/// Angular diameter of the solar disc in degrees.
///
/// Sunrise/sunset are reported for the upper limb touching the horizon;
/// sunrise end and sunset start are one disc diameter later/earlier.
pub const SOLAR_DISC_DIAMETER_DEGREES: f64 = 0.533;

// # Runtime Files

pub const CONFIG_FILE_NAME: &str = "stairlight.toml";
pub const CONFIG_DIR_NAME: &str = "stairlight";
pub const LOCK_FILE_NAME: &str = "stairlight.lock";
pub const SOCKET_FILE_NAME: &str = "stairlight.sock";

// # IPC

/// How long a CLI client waits for the daemon to answer
pub const IPC_CLIENT_TIMEOUT_MS: u64 = 5_000;
/// How long the IPC server waits for a connected client to send its request line
pub const IPC_REQUEST_READ_TIMEOUT_MS: u64 = 250;
/// How long the IPC server waits for the core loop to answer a request
pub const IPC_REPLY_TIMEOUT_MS: u64 = 2_000;
/// Sleep between non-blocking accept polls
pub const IPC_ACCEPT_INTERVAL_MS: u64 = 10;

// # Simulation

pub const DEFAULT_SIMULATION_MULTIPLIER: f64 = 3600.0;

// # Exit Codes

pub const EXIT_FAILURE: i32 = 1;

#[cfg(test)]
pub mod test_constants {
    pub const TEST_SEGMENTS: [u32; 4] = [17, 18, 27, 22];
    pub const TEST_STEP_DELAY: u64 = 100;
    pub const TEST_HOLD_DURATION: u64 = 1_000;
    pub const TEST_POLL_INTERVAL: u64 = 60_000;
    pub const TEST_LATITUDE: f64 = 51.5;
    pub const TEST_LONGITUDE: f64 = -0.1;
}
