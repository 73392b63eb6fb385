//! Ambient daylight calculations.
//!
//! ## Module Structure
//!
//! - [`solar`]: Sunrise/sunset times for a date and location, behind the
//!   mockable [`solar::SolarCalculator`] trait
//! - [`window`]: The day/night window for one instant and the hybrid-mode
//!   cutoff evaluation
//!
//! "Dark" is measured against the whole solar disc: it is dark until the disc
//! has fully risen and again from the moment its lower limb touches the
//! horizon in the evening.

pub mod solar;
pub mod window;

pub use solar::{SolarCalculator, SunTimes, SunriseCalculator};
pub use window::{AmbientReading, ScheduleWindow};
