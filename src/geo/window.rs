//! Day/night window evaluation.
//!
//! A [`ScheduleWindow`] is recomputed on every scheduler tick from the current
//! time. Nothing here is cached across days.

use anyhow::{Context, Result};
use chrono::{DateTime, Days, Local, NaiveDate, NaiveTime, TimeZone};

use super::solar::SolarCalculator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleWindow {
    pub sunrise_end: DateTime<Local>,
    pub sunset_start: DateTime<Local>,
    /// First occurrence of the cutoff time at or after `sunset_start`, or
    /// `sunset_start` itself when that occurrence falls after the next sunrise.
    pub cutoff: DateTime<Local>,
    /// Cutoff belonging to the previous evening, for the early morning.
    pub previous_cutoff: DateTime<Local>,
}

/// What the scheduler saw at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientReading {
    pub at: DateTime<Local>,
    pub dark: bool,
    pub after_cutoff: bool,
    pub window: ScheduleWindow,
}

impl ScheduleWindow {
    pub fn compute(
        calculator: &dyn SolarCalculator,
        now: DateTime<Local>,
        latitude: f64,
        longitude: f64,
        cutoff: NaiveTime,
    ) -> Result<Self> {
        let today = now.date_naive();
        let yesterday = today
            .checked_sub_days(Days::new(1))
            .context("Date out of range")?;

        let times = calculator.sun_times(today, latitude, longitude)?;
        let previous = calculator.sun_times(yesterday, latitude, longitude)?;

        Ok(Self {
            sunrise_end: times.sunrise_end,
            sunset_start: times.sunset_start,
            cutoff: night_cutoff(
                times.sunset_start,
                times.sunrise_end + chrono::Duration::days(1),
                cutoff,
            )?,
            previous_cutoff: night_cutoff(previous.sunset_start, times.sunrise_end, cutoff)?,
        })
    }

    /// Dark before the whole disc is up or once its lower limb touches the horizon.
    pub fn is_dark(&self, now: DateTime<Local>) -> bool {
        now < self.sunrise_end || now > self.sunset_start
    }

    /// Whether the hybrid hold window has ended.
    ///
    /// Daytime is never after cutoff. The cutoff instant itself still belongs
    /// to the hold window.
    pub fn after_cutoff(&self, now: DateTime<Local>) -> bool {
        if now < self.sunrise_end {
            now > self.previous_cutoff
        } else if now > self.sunset_start {
            now > self.cutoff
        } else {
            false
        }
    }

    pub fn reading(&self, now: DateTime<Local>) -> AmbientReading {
        AmbientReading {
            at: now,
            dark: self.is_dark(now),
            after_cutoff: self.after_cutoff(now),
            window: *self,
        }
    }
}

/// Cutoff of the night running from `sunset_start` to `next_sunrise_end`.
///
/// A cutoff time that falls in daylight leaves an empty hold window.
fn night_cutoff(
    sunset_start: DateTime<Local>,
    next_sunrise_end: DateTime<Local>,
    cutoff: NaiveTime,
) -> Result<DateTime<Local>> {
    let candidate = cutoff_after(sunset_start, cutoff)?;
    Ok(if candidate > next_sunrise_end {
        sunset_start
    } else {
        candidate
    })
}

/// First local instant with wall time `cutoff` at or after `from`.
fn cutoff_after(from: DateTime<Local>, cutoff: NaiveTime) -> Result<DateTime<Local>> {
    let same_day = local_at(from.date_naive(), cutoff);
    if same_day >= from {
        return Ok(same_day);
    }
    let next_day = from
        .date_naive()
        .checked_add_days(Days::new(1))
        .context("Date out of range")?;
    Ok(local_at(next_day, cutoff))
}

fn local_at(date: NaiveDate, time: NaiveTime) -> DateTime<Local> {
    let naive = date.and_time(time);
    // Wall times skipped by a DST change fall back to being read as UTC
    Local
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| Local.from_utc_datetime(&naive))
}
