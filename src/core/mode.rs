//! Operating modes and the routing policy attached to each of them.
//!
//! A mode decides which triggers are allowed to reach the sequencer. The
//! policy lives entirely in [`OperatingMode::motion_policy`] and
//! [`OperatingMode::schedule_policy`]; the controller only consults these two
//! functions.
//!
//! | Mode | Motion events | Scheduler hold/clear |
//! |---|---|---|
//! | `off` | no | no |
//! | `motion` | always | no |
//! | `motion-when-dark` | when dark | no |
//! | `always-on` | no | no (held at entry) |
//! | `always-on-when-dark` | no | yes |
//! | `dark-then-motion` | after cutoff | before cutoff |
//! | `diagnostic` | no | no |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ModeRejected;

/// The operator-selected policy. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperatingMode {
    Off,
    Motion,
    MotionWhenDark,
    AlwaysOn,
    AlwaysOnWhenDark,
    DarkThenMotion,
    Diagnostic,
}

/// Which motion events a mode lets through to the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPolicy {
    Never,
    Always,
    WhenDark,
    AfterCutoff,
}

/// Whether the day/night scheduler may hold and clear the lights.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    Ignore,
    HoldWhenDark,
    HoldUntilCutoff,
}

impl OperatingMode {
    pub const ALL: [OperatingMode; 7] = [
        OperatingMode::Off,
        OperatingMode::Motion,
        OperatingMode::MotionWhenDark,
        OperatingMode::AlwaysOn,
        OperatingMode::AlwaysOnWhenDark,
        OperatingMode::DarkThenMotion,
        OperatingMode::Diagnostic,
    ];

    /// Stable identifier used on the wire and in the configuration file.
    pub fn id(&self) -> &'static str {
        match self {
            OperatingMode::Off => "off",
            OperatingMode::Motion => "motion",
            OperatingMode::MotionWhenDark => "motion-when-dark",
            OperatingMode::AlwaysOn => "always-on",
            OperatingMode::AlwaysOnWhenDark => "always-on-when-dark",
            OperatingMode::DarkThenMotion => "dark-then-motion",
            OperatingMode::Diagnostic => "diagnostic",
        }
    }

    /// Human readable label shown by the status command.
    pub fn label(&self) -> &'static str {
        match self {
            OperatingMode::Off => "Off",
            OperatingMode::Motion => "Motion activated",
            OperatingMode::MotionWhenDark => "Motion activated when dark",
            OperatingMode::AlwaysOn => "Always on",
            OperatingMode::AlwaysOnWhenDark => "Always on when dark",
            OperatingMode::DarkThenMotion => "On when dark, motion after cutoff",
            OperatingMode::Diagnostic => "Diagnostic",
        }
    }

    /// Parse a mode identifier. Accepts kebab-case and snake_case, any case.
    pub fn parse(requested: &str) -> Result<Self, ModeRejected> {
        let normalized = requested.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|mode| mode.id() == normalized)
            .ok_or_else(|| ModeRejected::UnknownMode {
                requested: requested.to_string(),
                available: Self::ALL
                    .iter()
                    .map(|mode| mode.id())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    pub fn motion_policy(&self) -> MotionPolicy {
        match self {
            OperatingMode::Motion => MotionPolicy::Always,
            OperatingMode::MotionWhenDark => MotionPolicy::WhenDark,
            OperatingMode::DarkThenMotion => MotionPolicy::AfterCutoff,
            OperatingMode::Off
            | OperatingMode::AlwaysOn
            | OperatingMode::AlwaysOnWhenDark
            | OperatingMode::Diagnostic => MotionPolicy::Never,
        }
    }

    pub fn schedule_policy(&self) -> SchedulePolicy {
        match self {
            OperatingMode::AlwaysOnWhenDark => SchedulePolicy::HoldWhenDark,
            OperatingMode::DarkThenMotion => SchedulePolicy::HoldUntilCutoff,
            OperatingMode::Off
            | OperatingMode::Motion
            | OperatingMode::MotionWhenDark
            | OperatingMode::AlwaysOn
            | OperatingMode::Diagnostic => SchedulePolicy::Ignore,
        }
    }
}

impl fmt::Display for OperatingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_id() {
        for mode in OperatingMode::ALL {
            assert_eq!(OperatingMode::parse(mode.id()), Ok(mode));
        }
    }

    #[test]
    fn test_parse_accepts_snake_case_and_uppercase() {
        assert_eq!(
            OperatingMode::parse("ALWAYS_ON_WHEN_DARK"),
            Ok(OperatingMode::AlwaysOnWhenDark)
        );
        assert_eq!(
            OperatingMode::parse(" dark-then-motion "),
            Ok(OperatingMode::DarkThenMotion)
        );
    }

    #[test]
    fn test_parse_unknown_mode_is_rejected() {
        let err = OperatingMode::parse("party").unwrap_err();
        assert!(matches!(err, ModeRejected::UnknownMode { .. }));
        assert!(err.to_string().contains("motion-when-dark"));
    }

    #[test]
    fn test_serde_uses_mode_ids() {
        let json = serde_json::to_string(&OperatingMode::MotionWhenDark).unwrap();
        assert_eq!(json, "\"motion-when-dark\"");
        let parsed: OperatingMode = serde_json::from_str("\"dark-then-motion\"").unwrap();
        assert_eq!(parsed, OperatingMode::DarkThenMotion);
    }

    #[test]
    fn test_routing_table() {
        use MotionPolicy as M;
        use SchedulePolicy as S;
        let expected = [
            (OperatingMode::Off, M::Never, S::Ignore),
            (OperatingMode::Motion, M::Always, S::Ignore),
            (OperatingMode::MotionWhenDark, M::WhenDark, S::Ignore),
            (OperatingMode::AlwaysOn, M::Never, S::Ignore),
            (OperatingMode::AlwaysOnWhenDark, M::Never, S::HoldWhenDark),
            (OperatingMode::DarkThenMotion, M::AfterCutoff, S::HoldUntilCutoff),
            (OperatingMode::Diagnostic, M::Never, S::Ignore),
        ];
        for (mode, motion, schedule) in expected {
            assert_eq!(mode.motion_policy(), motion, "motion policy of {mode}");
            assert_eq!(mode.schedule_policy(), schedule, "schedule policy of {mode}");
        }
    }
}
