//! Shared constants used across the daemon and the CLI commands.

pub mod constants;
