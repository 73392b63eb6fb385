//! Hardware abstraction for the light segments and the motion sensors.
//!
//! The sequencer only ever talks to a [`SegmentDriver`]: one boolean output per
//! segment, addressed by ordinal position (0 = bottom tread). Concrete drivers:
//!
//! - [`sysfs::SysfsSegments`]: Linux sysfs GPIO (`/sys/class/gpio`)
//! - [`simulated::SimulatedSegments`]: log-only driver for dry runs and simulation
//! - `recording::RecordingDriver`: in-memory driver for tests
//!   (behind the `testing-support` feature)
//!
//! Motion sensors are read by [`motion::MotionWatcher`], which turns rising
//! edges into commands for the core loop.

use anyhow::{Context, Result};

use crate::config::{Config, DriverKind};
use crate::error::DriverFault;

pub mod motion;
#[cfg(any(test, feature = "testing-support"))]
pub mod recording;
pub mod simulated;
pub mod sysfs;

/// Trait for the physical segment outputs.
///
/// Implementations own one handle per segment from construction until
/// [`SegmentDriver::release`] is called at shutdown.
pub trait SegmentDriver: Send {
    /// Number of segments this driver controls.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Switch segment `index` on or off.
    fn write(&mut self, index: usize, on: bool) -> Result<(), DriverFault>;

    /// Release every segment handle. Called once at shutdown.
    fn release(&mut self) -> Result<(), DriverFault>;

    /// Get a human-readable name for this driver.
    fn driver_name(&self) -> &'static str;
}

/// Create the segment driver selected in the configuration.
pub fn create_segment_driver(config: &Config, debug_enabled: bool) -> Result<Box<dyn SegmentDriver>> {
    let segments = config.segments();

    match config.driver() {
        DriverKind::Sysfs => {
            let driver = sysfs::SysfsSegments::configure(
                &config.gpio_root(),
                &segments,
                config.active_low(),
            )
            .context("Failed to configure segment outputs")?;
            Ok(Box::new(driver))
        }
        DriverKind::Simulated => Ok(Box::new(simulated::SimulatedSegments::new(
            segments.len(),
            debug_enabled,
        ))),
    }
}
