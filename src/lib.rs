//! # Stairlight Library
//!
//! Internal library for the stairlight binary application.
//!
//! This library exists to enable testing of the lighting engine and provide clean
//! separation between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Entry Point**: `Stairlight` struct runs the daemon with resource management
//! - **Core Logic**: `core` module with the sequencer, motion dispatcher, day/night
//!   scheduler, mode controller and the command loop that serialises them
//! - **Hardware**: `hardware` module with the segment driver trait, the sysfs GPIO
//!   driver and the motion sensor watcher
//! - **Configuration**: `config` module for TOML-based settings
//! - **Daylight**: `geo` module for sunrise/sunset windows and the hybrid cutoff
//! - **Control Surface**: `ipc` module (Unix socket) and the `commands` that use it
//! - **Infrastructure**: Signal handling, instance lock, logging and the wall clock

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod commands;
pub mod common;
pub mod config;
pub mod core;
pub mod error;
pub mod geo;
pub mod hardware;
pub mod io;
pub mod ipc;
pub mod time_source;

mod stairlight;

pub use stairlight::{Stairlight, build_controller};
