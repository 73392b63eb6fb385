//! Log-only segment driver.
//!
//! Used by `stairlight simulate` and by `driver = "simulated"` on machines
//! without GPIO. Every write succeeds; with `--debug` the strip is rendered
//! after each change, bottom tread on the left.

use super::SegmentDriver;
use crate::error::DriverFault;

pub struct SimulatedSegments {
    lit: Vec<bool>,
    debug_enabled: bool,
}

impl SimulatedSegments {
    pub fn new(len: usize, debug_enabled: bool) -> Self {
        Self {
            lit: vec![false; len],
            debug_enabled,
        }
    }

    /// Render the strip as `▮` (on) and `▯` (off).
    pub fn render(&self) -> String {
        self.lit.iter().map(|&on| if on { '▮' } else { '▯' }).collect()
    }
}

impl SegmentDriver for SimulatedSegments {
    fn len(&self) -> usize {
        self.lit.len()
    }

    fn write(&mut self, index: usize, on: bool) -> Result<(), DriverFault> {
        let len = self.lit.len();
        let slot = self
            .lit
            .get_mut(index)
            .ok_or(DriverFault::OutOfRange { index, len })?;
        if *slot != on {
            *slot = on;
            if self.debug_enabled {
                log_indented!("{}", self.render());
            }
        }
        Ok(())
    }

    fn release(&mut self) -> Result<(), DriverFault> {
        self.lit.iter_mut().for_each(|on| *on = false);
        Ok(())
    }

    fn driver_name(&self) -> &'static str {
        "simulated"
    }
}
