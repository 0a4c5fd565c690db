use std::time::Duration;

use tofimg_core::bridge::{Bridge, BridgeCapabilities, BridgeError, NonVolatileStorage};
use tofimg_emulator::{ChipModel, ImagerEmulator, M2450A12Chip, M2453Chip};

#[derive(Default, Clone, Debug)]
pub struct AuditOption {
    pub broken: bool,
    pub storage: Option<Vec<u8>>,
}

/// A [`Bridge`] to an emulated imager that records every access and can be broken on purpose.
#[derive(Debug)]
pub struct Audit<C: ChipModel = M2450A12Chip> {
    emulator: ImagerEmulator<C>,
    broken: bool,
}

impl<C: ChipModel> std::ops::Deref for Audit<C> {
    type Target = ImagerEmulator<C>;

    fn deref(&self) -> &Self::Target {
        &self.emulator
    }
}

impl<C: ChipModel> std::ops::DerefMut for Audit<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.emulator
    }
}

impl Audit {
    pub fn new(option: AuditOption) -> Self {
        Self::with_chip(M2450A12Chip::new(), option)
    }
}

impl Audit<M2453Chip> {
    pub fn m2453(flash: Vec<u8>, option: AuditOption) -> Self {
        Self::with_chip(M2453Chip::new(flash), option)
    }
}

impl<C: ChipModel> Audit<C> {
    pub fn with_chip(chip: C, option: AuditOption) -> Self {
        let emulator = ImagerEmulator::new(chip).with_access_log();
        let emulator = match option.storage {
            Some(blob) => emulator.with_storage(blob),
            None => emulator,
        };
        Self {
            emulator,
            broken: option.broken,
        }
    }

    pub fn break_down(&mut self) {
        self.broken = true;
    }

    pub fn repair(&mut self) {
        self.broken = false;
    }

    #[must_use]
    pub const fn is_broken(&self) -> bool {
        self.broken
    }

    fn check(&self) -> Result<(), BridgeError> {
        if self.broken {
            return Err(BridgeError::PossiblyUsbStall("broken".to_string()));
        }
        Ok(())
    }
}

impl<C: ChipModel> Bridge for Audit<C> {
    fn capabilities(&self) -> BridgeCapabilities {
        self.emulator.capabilities()
    }

    fn read_register(&mut self, address: u16) -> Result<u16, BridgeError> {
        self.check()?;
        self.emulator.read_register(address)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BridgeError> {
        self.check()?;
        self.emulator.write_register(address, value)
    }

    fn read_burst(&mut self, first: u16, count: usize) -> Result<Vec<u16>, BridgeError> {
        self.check()?;
        self.emulator.read_burst(first, count)
    }

    fn write_burst(&mut self, first: u16, values: &[u16]) -> Result<(), BridgeError> {
        self.check()?;
        self.emulator.write_burst(first, values)
    }

    fn set_reset(&mut self, reset: bool) -> Result<(), BridgeError> {
        self.check()?;
        self.emulator.set_reset(reset)
    }

    fn sleep_for(&mut self, duration: Duration) {
        self.emulator.sleep_for(duration);
    }

    fn storage(&mut self) -> Option<&mut dyn NonVolatileStorage> {
        self.emulator.storage()
    }
}
