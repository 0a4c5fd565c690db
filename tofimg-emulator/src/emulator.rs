use std::time::Duration;

use tofimg_core::{
    bridge::{check_burst_range, Bridge, BridgeCapabilities, BridgeError, NonVolatileStorage},
    sleep::Sleep,
};

use crate::{
    chip::{ChipModel, M2450A12Chip, M2453Chip},
    RegisterFile,
};

/// Error code reported for register accesses while the imager is held in reset.
pub const ERR_IN_RESET: u32 = 0x0001;

/// A bridge operation seen by the emulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Access {
    Read(u16),
    Write(u16, u16),
    ReadBurst(u16, usize),
    WriteBurst(u16, Vec<u16>),
    Reset(bool),
    Sleep(Duration),
}

#[derive(Clone, Debug)]
struct Storage(Vec<u8>);

impl NonVolatileStorage for Storage {
    fn read_storage(&mut self) -> Result<Vec<u8>, BridgeError> {
        Ok(self.0.clone())
    }
}

/// An imager emulated on the register level, usable as [`Bridge`].
///
/// Sleeps only advance a virtual clock unless a sleeper is attached. The imager is held in
/// reset until the reset line is released, register accesses in reset fail.
#[derive(Debug)]
pub struct ImagerEmulator<C: ChipModel> {
    chip: C,
    regs: RegisterFile,
    in_reset: bool,
    elapsed: Duration,
    log: Option<Vec<Access>>,
    storage: Option<Storage>,
    sleeper: Option<Box<dyn Sleep>>,
}

impl ImagerEmulator<M2450A12Chip> {
    /// Creates an emulated M2450 A12.
    #[must_use]
    pub fn m2450_a12() -> Self {
        Self::new(M2450A12Chip::new())
    }
}

impl ImagerEmulator<M2453Chip> {
    /// Creates an emulated M2453 whose serial flash holds `flash`.
    #[must_use]
    pub fn m2453(flash: Vec<u8>) -> Self {
        Self::new(M2453Chip::new(flash))
    }
}

impl<C: ChipModel> ImagerEmulator<C> {
    #[must_use]
    pub fn new(chip: C) -> Self {
        Self {
            chip,
            regs: RegisterFile::new(),
            in_reset: true,
            elapsed: Duration::ZERO,
            log: None,
            storage: None,
            sleeper: None,
        }
    }

    /// Attaches a non-volatile storage holding `blob`.
    #[must_use]
    pub fn with_storage(mut self, blob: Vec<u8>) -> Self {
        self.storage = Some(Storage(blob));
        self
    }

    /// Sleeps with `sleeper` in addition to advancing the virtual clock.
    #[must_use]
    pub fn with_sleeper(mut self, sleeper: impl Sleep + 'static) -> Self {
        self.sleeper = Some(Box::new(sleeper));
        self
    }

    /// Records every bridge operation, see [`ImagerEmulator::accesses`].
    #[must_use]
    pub fn with_access_log(mut self) -> Self {
        self.log = Some(Vec::new());
        self
    }

    #[must_use]
    pub const fn chip(&self) -> &C {
        &self.chip
    }

    pub fn chip_mut(&mut self) -> &mut C {
        &mut self.chip
    }

    /// Returns the register at `address` without going through the bridge.
    #[must_use]
    pub fn register(&self, address: u16) -> u16 {
        self.regs.read(address)
    }

    /// Returns `count` consecutive registers without going through the bridge.
    #[must_use]
    pub fn registers(&self, first: u16, count: usize) -> &[u16] {
        self.regs.slice(first, count)
    }

    /// Overwrites a register bypassing the chip.
    pub fn set_register(&mut self, address: u16, value: u16) {
        self.regs.write(address, value);
    }

    /// Returns the sum of all requested sleeps.
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    #[must_use]
    pub const fn is_in_reset(&self) -> bool {
        self.in_reset
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        !self.in_reset && self.chip.is_capturing()
    }

    /// Returns the recorded bridge operations, empty unless the access log is enabled.
    #[must_use]
    pub fn accesses(&self) -> &[Access] {
        self.log.as_deref().unwrap_or_default()
    }

    /// Returns and clears the recorded bridge operations.
    pub fn take_accesses(&mut self) -> Vec<Access> {
        self.log.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Lets `count` frames pass.
    pub fn advance_frames(&mut self, count: usize) {
        if self.in_reset {
            return;
        }
        (0..count).for_each(|_| self.chip.frame(&mut self.regs));
    }

    fn record(&mut self, access: impl FnOnce() -> Access) {
        if let Some(log) = self.log.as_mut() {
            log.push(access());
        }
    }

    fn check_powered(&self) -> Result<(), BridgeError> {
        if self.in_reset {
            return Err(BridgeError::DeviceDetected {
                msg: format!("{} is held in reset", self.chip.name()),
                code: ERR_IN_RESET,
            });
        }
        Ok(())
    }

    fn write(&mut self, address: u16, value: u16) {
        tracing::trace!("write {:#06X} = {:#06X}", address, value);
        self.chip.write(&mut self.regs, address, value);
    }
}

impl<C: ChipModel> Bridge for ImagerEmulator<C> {
    fn capabilities(&self) -> BridgeCapabilities {
        let caps = BridgeCapabilities::REGISTER | BridgeCapabilities::BURST | BridgeCapabilities::RESET;
        if self.storage.is_some() {
            caps | BridgeCapabilities::STORAGE
        } else {
            caps
        }
    }

    fn read_register(&mut self, address: u16) -> Result<u16, BridgeError> {
        self.check_powered()?;
        self.record(|| Access::Read(address));
        Ok(self.regs.read(address))
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BridgeError> {
        self.check_powered()?;
        self.record(|| Access::Write(address, value));
        self.write(address, value);
        Ok(())
    }

    fn read_burst(&mut self, first: u16, count: usize) -> Result<Vec<u16>, BridgeError> {
        check_burst_range(first, count)?;
        self.check_powered()?;
        self.record(|| Access::ReadBurst(first, count));
        Ok(self.regs.slice(first, count).to_vec())
    }

    fn write_burst(&mut self, first: u16, values: &[u16]) -> Result<(), BridgeError> {
        check_burst_range(first, values.len())?;
        self.check_powered()?;
        self.record(|| Access::WriteBurst(first, values.to_vec()));
        tracing::trace!("burst of {} registers at {:#06X}", values.len(), first);
        values
            .iter()
            .enumerate()
            .for_each(|(i, &value)| self.write(first + i as u16, value));
        Ok(())
    }

    fn set_reset(&mut self, reset: bool) -> Result<(), BridgeError> {
        self.record(|| Access::Reset(reset));
        if self.in_reset && !reset {
            self.chip.power_up(&mut self.regs);
            tracing::debug!("{} powered up", self.chip.name());
        }
        self.in_reset = reset;
        Ok(())
    }

    fn sleep_for(&mut self, duration: Duration) {
        self.record(|| Access::Sleep(duration));
        self.elapsed += duration;
        if let Some(sleeper) = &self.sleeper {
            sleeper.sleep(duration);
        }
    }

    fn storage(&mut self) -> Option<&mut dyn NonVolatileStorage> {
        self.storage
            .as_mut()
            .map(|storage| storage as &mut dyn NonVolatileStorage)
    }
}

#[cfg(test)]
mod tests {
    use tofimg_core::sleep::SpinWaitSleeper;

    use super::*;

    #[test]
    fn reset_blocks_access() -> anyhow::Result<()> {
        let mut emulator = ImagerEmulator::m2450_a12();
        assert!(emulator.is_in_reset());
        assert_eq!(
            Err(BridgeError::DeviceDetected {
                msg: "M2450 A12 is held in reset".to_string(),
                code: ERR_IN_RESET
            }),
            emulator.read_register(0xB0AD)
        );
        assert!(emulator.write_burst(0xA000, &[1, 2]).is_err());

        emulator.set_reset(false)?;
        assert_eq!(0x0A12, emulator.read_register(0xB0AD)?);
        emulator.write_burst(0xA000, &[1, 2])?;
        assert_eq!(vec![1, 2], emulator.read_burst(0xA000, 2)?);

        emulator.set_reset(true)?;
        assert!(emulator.read_register(0xA000).is_err());
        emulator.set_reset(false)?;
        assert_eq!(0, emulator.read_register(0xA000)?);
        Ok(())
    }

    #[test]
    fn burst_overflow() -> anyhow::Result<()> {
        let mut emulator = ImagerEmulator::m2450_a12();
        emulator.set_reset(false)?;
        assert_eq!(
            Err(BridgeError::AddressOverflow(0xFFFF, 2)),
            emulator.read_burst(0xFFFF, 2)
        );
        assert_eq!(
            Err(BridgeError::AddressOverflow(0xFFFF, 2)),
            emulator.write_burst(0xFFFF, &[1, 2])
        );
        Ok(())
    }

    #[test]
    fn access_log() -> anyhow::Result<()> {
        let mut emulator = ImagerEmulator::m2450_a12().with_access_log();
        emulator.set_reset(false)?;
        emulator.write_register(0xA000, 1)?;
        emulator.read_register(0xA000)?;
        emulator.write_burst(0xA001, &[2, 3])?;
        emulator.read_burst(0xA000, 3)?;
        emulator.sleep_for(Duration::from_millis(2));
        assert_eq!(
            vec![
                Access::Reset(false),
                Access::Write(0xA000, 1),
                Access::Read(0xA000),
                Access::WriteBurst(0xA001, vec![2, 3]),
                Access::ReadBurst(0xA000, 3),
                Access::Sleep(Duration::from_millis(2)),
            ],
            emulator.take_accesses()
        );
        assert!(emulator.accesses().is_empty());
        assert!(ImagerEmulator::m2450_a12().accesses().is_empty());
        Ok(())
    }

    #[test]
    fn virtual_clock() {
        let mut emulator = ImagerEmulator::m2450_a12();
        let start = std::time::Instant::now();
        emulator.sleep_for(Duration::from_secs(60));
        emulator.sleep_for(Duration::from_millis(500));
        assert_eq!(Duration::from_millis(60_500), emulator.elapsed());
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn attached_sleeper() {
        let mut emulator = ImagerEmulator::m2450_a12().with_sleeper(SpinWaitSleeper);
        let start = std::time::Instant::now();
        emulator.sleep_for(Duration::from_millis(2));
        assert!(Duration::from_millis(2) <= start.elapsed());
    }

    #[test]
    fn storage() -> anyhow::Result<()> {
        let mut emulator = ImagerEmulator::m2453(vec![]);
        assert!(!emulator.capabilities().contains(BridgeCapabilities::STORAGE));
        assert!(emulator.storage().is_none());

        let mut emulator = emulator.with_storage(vec![1, 2, 3]);
        assert!(emulator.capabilities().contains(BridgeCapabilities::STORAGE));
        assert!(emulator.capabilities().supports_imager());
        let storage = emulator.storage().ok_or(anyhow::anyhow!("no storage"))?;
        assert_eq!(vec![1, 2, 3], storage.read_storage()?);
        Ok(())
    }

    #[test]
    fn frames_need_power() -> anyhow::Result<()> {
        let mut emulator = ImagerEmulator::m2450_a12();
        emulator.advance_frames(3);
        assert_eq!(0, emulator.chip().frames());
        emulator.set_reset(false)?;
        emulator.write_register(0xA87C, 1)?;
        emulator.write_register(0xC400, 1)?;
        assert!(emulator.is_capturing());
        emulator.advance_frames(3);
        assert_eq!(3, emulator.chip().frames());
        Ok(())
    }
}
