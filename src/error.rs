//! Typed errors surfaced by the lighting engine.
//!
//! Configuration problems are reported through `anyhow` during startup and are
//! fatal. The two kinds below happen at runtime and are handled without
//! terminating the daemon.

use std::io;
use thiserror::Error;

/// A failed operation on a GPIO handle.
///
/// Raised by segment drivers and motion inputs. The controller logs it, forces
/// every segment off and reports it through the status payload.
#[derive(Debug, Error)]
pub enum DriverFault {
    #[error("failed to export GPIO {pin}: {source}")]
    Export { pin: u32, source: io::Error },

    #[error("failed to set direction of GPIO {pin}: {source}")]
    Direction { pin: u32, source: io::Error },

    #[error("failed to write segment {index} (GPIO {pin}): {source}")]
    Write {
        index: usize,
        pin: u32,
        source: io::Error,
    },

    #[error("failed to read GPIO {pin}: {source}")]
    Read { pin: u32, source: io::Error },

    #[error("failed to release GPIO {pin}: {source}")]
    Release { pin: u32, source: io::Error },

    #[error("segment index {index} out of range (driver has {len} segments)")]
    OutOfRange { index: usize, len: usize },
}

/// A control-surface request that was refused without changing any state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModeRejected {
    #[error("unknown mode '{requested}' (available: {available})")]
    UnknownMode { requested: String, available: String },

    #[error("{action} is only available in {required} mode (current mode: {current})")]
    NotAuthorized {
        action: &'static str,
        required: &'static str,
        current: &'static str,
    },

    #[error("unknown {kind} '{requested}'")]
    InvalidArgument { kind: &'static str, requested: String },
}
