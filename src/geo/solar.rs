//! Sunrise/sunset calculation.
//!
//! The [`SolarCalculator`] trait is the seam used by the scheduler; the
//! production implementation wraps the `sunrise` crate.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate};

use crate::common::constants::SOLAR_DISC_DIAMETER_DEGREES;

/// Solar events for one date at one location, in local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SunTimes {
    /// Upper limb appears.
    pub sunrise: DateTime<Local>,
    /// Whole disc above the horizon.
    pub sunrise_end: DateTime<Local>,
    /// Lower limb touches the horizon.
    pub sunset_start: DateTime<Local>,
    /// Upper limb disappears.
    pub sunset: DateTime<Local>,
}

#[cfg_attr(test, mockall::automock)]
pub trait SolarCalculator: Send {
    fn sun_times(&self, date: NaiveDate, latitude: f64, longitude: f64) -> Result<SunTimes>;
}

/// [`SolarCalculator`] backed by the `sunrise` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SunriseCalculator;

impl SolarCalculator for SunriseCalculator {
    fn sun_times(&self, date: NaiveDate, latitude: f64, longitude: f64) -> Result<SunTimes> {
        use sunrise::{Coordinates, SolarDay, SolarEvent};

        let coord = Coordinates::new(latitude, longitude)
            .with_context(|| format!("Invalid coordinates {latitude:.4}°, {longitude:.4}°"))?;
        let solar_day = SolarDay::new(coord, date);
        let sunrise = solar_day.event_time(SolarEvent::Sunrise).with_timezone(&Local);
        let sunset = solar_day.event_time(SolarEvent::Sunset).with_timezone(&Local);

        let transit = disc_transit(latitude);
        Ok(SunTimes {
            sunrise,
            sunrise_end: sunrise + transit,
            sunset_start: sunset - transit,
            sunset,
        })
    }
}

/// Time the solar disc takes to cross the horizon at `latitude`.
///
/// The sun moves 360° in 24h (4 minutes per degree) along a path inclined by
/// the latitude, so the crossing stretches by 1/cos(latitude). Clamped near
/// the poles where the approximation breaks down.
pub fn disc_transit(latitude: f64) -> Duration {
    let inclination = latitude.to_radians().cos().abs().max(0.1);
    let seconds = SOLAR_DISC_DIAMETER_DEGREES * 4.0 * 60.0 / inclination;
    Duration::milliseconds((seconds * 1000.0).round() as i64)
}
