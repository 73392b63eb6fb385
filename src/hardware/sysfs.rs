//! Linux sysfs GPIO driver.
//!
//! Each pin is exported through `<root>/export`, configured through
//! `<root>/gpioN/{direction,active_low}` and driven through `<root>/gpioN/value`.
//! Pins that were already exported when we started are left exported on
//! release.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use super::SegmentDriver;
use crate::error::DriverFault;

/// udev needs a moment to fix permissions on a freshly exported pin
const EXPORT_SETTLE_ATTEMPTS: u32 = 20;
const EXPORT_SETTLE_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    Input,
    Output,
}

impl PinDirection {
    fn as_sysfs(&self) -> &'static str {
        match self {
            PinDirection::Input => "in",
            PinDirection::Output => "out",
        }
    }
}

/// One exported GPIO line.
#[derive(Debug)]
pub struct SysfsPin {
    pin: u32,
    root: PathBuf,
    value_path: PathBuf,
    exported_by_us: bool,
}

impl SysfsPin {
    /// Export (if needed) and configure a pin.
    pub fn open(
        root: &Path,
        pin: u32,
        direction: PinDirection,
        active_low: bool,
    ) -> Result<Self, DriverFault> {
        let pin_dir = root.join(format!("gpio{pin}"));

        let exported_by_us = if pin_dir.exists() {
            false
        } else {
            fs::write(root.join("export"), pin.to_string())
                .map_err(|source| DriverFault::Export { pin, source })?;
            wait_for_export(&pin_dir).map_err(|source| DriverFault::Export { pin, source })?;
            true
        };

        fs::write(pin_dir.join("direction"), direction.as_sysfs())
            .map_err(|source| DriverFault::Direction { pin, source })?;
        fs::write(pin_dir.join("active_low"), if active_low { "1" } else { "0" })
            .map_err(|source| DriverFault::Direction { pin, source })?;

        Ok(Self {
            pin,
            root: root.to_path_buf(),
            value_path: pin_dir.join("value"),
            exported_by_us,
        })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }

    /// Write the logical level (active_low is applied by the kernel).
    pub fn write(&self, high: bool) -> io::Result<()> {
        fs::write(&self.value_path, if high { "1" } else { "0" })
    }

    pub fn read(&self) -> Result<bool, DriverFault> {
        let raw = fs::read_to_string(&self.value_path)
            .map_err(|source| DriverFault::Read { pin: self.pin, source })?;
        Ok(raw.trim() == "1")
    }

    /// Unexport the pin if we exported it.
    pub fn release(&self) -> Result<(), DriverFault> {
        if self.exported_by_us {
            fs::write(self.root.join("unexport"), self.pin.to_string())
                .map_err(|source| DriverFault::Release { pin: self.pin, source })?;
        }
        Ok(())
    }
}

fn wait_for_export(pin_dir: &Path) -> io::Result<()> {
    for _ in 0..EXPORT_SETTLE_ATTEMPTS {
        if pin_dir.join("value").exists() {
            return Ok(());
        }
        thread::sleep(EXPORT_SETTLE_INTERVAL);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} did not appear after export", pin_dir.display()),
    ))
}

/// Segment driver backed by one sysfs output pin per segment.
pub struct SysfsSegments {
    pins: Vec<SysfsPin>,
}

impl SysfsSegments {
    /// Export and configure every segment output, bottom to top.
    ///
    /// Pins opened before a failure are released again before returning the error.
    pub fn configure(root: &Path, pins: &[u32], active_low: bool) -> Result<Self, DriverFault> {
        let mut opened = Vec::with_capacity(pins.len());
        for &pin in pins {
            match SysfsPin::open(root, pin, PinDirection::Output, active_low) {
                Ok(handle) => opened.push(handle),
                Err(fault) => {
                    for handle in &opened {
                        let _ = handle.release();
                    }
                    return Err(fault);
                }
            }
        }
        Ok(Self { pins: opened })
    }
}

impl SegmentDriver for SysfsSegments {
    fn len(&self) -> usize {
        self.pins.len()
    }

    fn write(&mut self, index: usize, on: bool) -> Result<(), DriverFault> {
        let handle = self.pins.get(index).ok_or(DriverFault::OutOfRange {
            index,
            len: self.pins.len(),
        })?;
        handle.write(on).map_err(|source| DriverFault::Write {
            index,
            pin: handle.pin(),
            source,
        })
    }

    fn release(&mut self) -> Result<(), DriverFault> {
        let mut first_fault = None;
        for handle in self.pins.drain(..) {
            if let Err(fault) = handle.release() {
                first_fault.get_or_insert(fault);
            }
        }
        first_fault.map_or(Ok(()), Err)
    }

    fn driver_name(&self) -> &'static str {
        "sysfs"
    }
}
