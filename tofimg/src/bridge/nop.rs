use std::time::Duration;

use tofimg_core::bridge::{Bridge, BridgeCapabilities, BridgeError};
use tofimg_emulator::{ImagerEmulator, M2450A12Chip};

/// A [`Bridge`] to an emulated M2450 A12.
///
/// No hardware is touched and sleeps return immediately. This bridge is mainly used for
/// explanation.
#[derive(Debug)]
pub struct Nop {
    emulator: ImagerEmulator<M2450A12Chip>,
}

impl Default for Nop {
    fn default() -> Self {
        Self::new()
    }
}

impl Nop {
    /// Creates a new [`Nop`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            emulator: ImagerEmulator::m2450_a12(),
        }
    }

    /// Returns `true` while the emulated imager produces frames.
    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.emulator.is_capturing()
    }
}

impl Bridge for Nop {
    fn capabilities(&self) -> BridgeCapabilities {
        self.emulator.capabilities()
    }

    fn read_register(&mut self, address: u16) -> Result<u16, BridgeError> {
        self.emulator.read_register(address)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BridgeError> {
        self.emulator.write_register(address, value)
    }

    fn read_burst(&mut self, first: u16, count: usize) -> Result<Vec<u16>, BridgeError> {
        self.emulator.read_burst(first, count)
    }

    fn write_burst(&mut self, first: u16, values: &[u16]) -> Result<(), BridgeError> {
        self.emulator.write_burst(first, values)
    }

    fn set_reset(&mut self, reset: bool) -> Result<(), BridgeError> {
        self.emulator.set_reset(reset)
    }

    fn sleep_for(&mut self, duration: Duration) {
        self.emulator.sleep_for(duration);
    }
}
