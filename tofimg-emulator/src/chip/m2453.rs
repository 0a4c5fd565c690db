use tofimg_driver::imager::flash::registers::*;

use super::{write_serial, ChipModel};
use crate::RegisterFile;

const DESIGN_STEP: u16 = 0x0A11;
const DEFAULT_SERIAL: [u16; 4] = [0x0B53, 0x1702, 0x2200, 0x0042];
/// Command byte and three address bytes.
const SPI_HEADER_BYTES: usize = 4;

/// Register starting the measurement timing control unit.
pub const MTCU_START: u16 = 0x9400;

/// A flash defined M2453 with a serial flash on its SPI master.
///
/// Flash reads copy big endian words into the register space and set the SPI status. Config
/// change flags are consumed immediately unless stalled. The sequencer runs while
/// [`MTCU_START`] is non-zero.
#[derive(Clone, Debug)]
pub struct M2453Chip {
    design_step: u16,
    serial: [u16; 4],
    flash: Vec<u8>,
    config_stalled: bool,
    running: bool,
    transfers: usize,
}

impl M2453Chip {
    /// Creates the chip with `flash` as content of the serial flash.
    #[must_use]
    pub fn new(flash: Vec<u8>) -> Self {
        Self {
            design_step: DESIGN_STEP,
            serial: DEFAULT_SERIAL,
            flash,
            config_stalled: false,
            running: false,
            transfers: 0,
        }
    }

    #[must_use]
    pub const fn with_design_step(mut self, design_step: u16) -> Self {
        self.design_step = design_step;
        self
    }

    #[must_use]
    pub const fn with_serial(mut self, serial: [u16; 4]) -> Self {
        self.serial = serial;
        self
    }

    /// Keeps config change flags pending until the stall is lifted.
    pub fn set_config_stalled(&mut self, stalled: bool) {
        self.config_stalled = stalled;
    }

    /// Returns the number of completed flash transfers since power-up.
    #[must_use]
    pub const fn transfers(&self) -> usize {
        self.transfers
    }

    fn spi_read(&mut self, regs: &mut RegisterFile) {
        regs.write(SPISTATUS, 0);
        let source = regs.read(SPIWRADDR);
        let command = regs.read(source);
        if command >> 8 != FLASH_READ_COMMAND {
            tracing::warn!("unsupported flash command {:#04X}", command >> 8);
            return;
        }
        let address = ((command & 0x00FF) as usize) << 16 | regs.read(source + 1) as usize;
        let length = (regs.read(SPILEN) & SPILEN_MASK) as usize + 1;
        let Some(payload) = length.checked_sub(SPI_HEADER_BYTES) else {
            tracing::warn!("SPI transfer of {} bytes is shorter than its header", length);
            return;
        };
        let Some(data) = self.flash.get(address..address + payload) else {
            tracing::warn!(
                "flash read of {} bytes at {:#08X} exceeds the flash",
                payload,
                address
            );
            return;
        };
        let target = regs.read(SPIRADDR);
        data.chunks_exact(2).enumerate().for_each(|(i, word)| {
            regs.write(
                target.wrapping_add(i as u16),
                u16::from_be_bytes([word[0], word[1]]),
            )
        });
        tracing::trace!(
            "flash read of {} bytes at {:#08X} to {:#06X}",
            payload,
            address,
            target
        );
        self.transfers += 1;
        regs.write(SPISTATUS, SPISTATUS_DONE);
    }
}

impl ChipModel for M2453Chip {
    fn name(&self) -> &'static str {
        "M2453"
    }

    fn power_up(&mut self, regs: &mut RegisterFile) {
        regs.clear();
        regs.write(ANAIP_DESIGNSTEP, self.design_step);
        write_serial(regs, ANAIP_EFUSEVAL1, &self.serial);
        self.running = false;
        self.transfers = 0;
    }

    fn write(&mut self, regs: &mut RegisterFile, address: u16, value: u16) {
        regs.write(address, value);
        match address {
            SPITRIG if value == SPITRIG_READ => self.spi_read(regs),
            CFGCNT_FLAGS if value != 0 && !self.config_stalled => regs.write(CFGCNT_FLAGS, 0),
            MTCU_START => self.running = value != 0,
            _ => {}
        }
    }

    fn frame(&mut self, regs: &mut RegisterFile) {
        if self.running && !self.config_stalled {
            regs.write(CFGCNT_FLAGS, 0);
        }
    }

    fn is_capturing(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flash() -> Vec<u8> {
        (0..=255u8).collect()
    }

    fn spi_read(chip: &mut M2453Chip, regs: &mut RegisterFile, address: u32, bytes: u16) {
        chip.write(regs, SPIWRADDR, PIXMEM);
        chip.write(regs, PIXMEM, FLASH_READ_COMMAND << 8 | (address >> 16) as u16);
        chip.write(regs, PIXMEM + 1, (address & 0xFFFF) as u16);
        chip.write(regs, SPIRADDR, CFGCNT);
        chip.write(regs, SPILEN, SPILEN_READ_ENABLE | (bytes + 3));
        chip.write(regs, SPITRIG, SPITRIG_READ);
    }

    #[test]
    fn power_up() {
        let mut chip = M2453Chip::new(vec![]).with_design_step(0x0A13);
        let mut regs = RegisterFile::new();
        chip.power_up(&mut regs);
        assert_eq!(0x0A13, regs.read(ANAIP_DESIGNSTEP));
        assert_eq!(&DEFAULT_SERIAL[..], regs.slice(ANAIP_EFUSEVAL1, 4));
    }

    #[rstest::rstest]
    #[case(&[0x0001, 0x0203, 0x0405], 0, 6)]
    #[case(&[0x1011, 0x1213], 0x10, 4)]
    #[case(&[0xFEFF], 0xFE, 2)]
    fn flash_read(#[case] expect: &[u16], #[case] address: u32, #[case] bytes: u16) {
        let mut chip = M2453Chip::new(flash());
        let mut regs = RegisterFile::new();
        chip.power_up(&mut regs);
        spi_read(&mut chip, &mut regs, address, bytes);
        assert_eq!(SPISTATUS_DONE, regs.read(SPISTATUS));
        assert_eq!(expect, regs.slice(CFGCNT, expect.len()));
        assert_eq!(0, regs.read(CFGCNT + expect.len() as u16));
        assert_eq!(1, chip.transfers());
    }

    #[rstest::rstest]
    #[case(0xFE, 4)]
    #[case(0x01_0000, 2)]
    fn flash_read_outside(#[case] address: u32, #[case] bytes: u16) {
        let mut chip = M2453Chip::new(flash());
        let mut regs = RegisterFile::new();
        chip.power_up(&mut regs);
        regs.write(SPISTATUS, SPISTATUS_DONE);
        spi_read(&mut chip, &mut regs, address, bytes);
        assert_eq!(0, regs.read(SPISTATUS));
        assert_eq!(0, chip.transfers());
    }

    #[test]
    fn unknown_command() {
        let mut chip = M2453Chip::new(flash());
        let mut regs = RegisterFile::new();
        chip.power_up(&mut regs);
        chip.write(&mut regs, SPIWRADDR, PIXMEM);
        chip.write(&mut regs, PIXMEM, 0x0B00);
        chip.write(&mut regs, SPILEN, SPILEN_READ_ENABLE | 5);
        chip.write(&mut regs, SPITRIG, SPITRIG_READ);
        assert_eq!(0, regs.read(SPISTATUS));
    }

    #[test]
    fn config_flags() {
        let mut chip = M2453Chip::new(vec![]);
        let mut regs = RegisterFile::new();
        chip.power_up(&mut regs);
        chip.write(&mut regs, MTCU_START, 1);
        assert!(chip.is_capturing());

        chip.write(&mut regs, CFGCNT_FLAGS, ConfigFlags::CONFIG_CHANGED.bits());
        assert_eq!(0, regs.read(CFGCNT_FLAGS));

        chip.set_config_stalled(true);
        chip.write(&mut regs, CFGCNT_FLAGS, ConfigFlags::CONFIG_CHANGED.bits());
        chip.frame(&mut regs);
        assert_eq!(ConfigFlags::CONFIG_CHANGED.bits(), regs.read(CFGCNT_FLAGS));

        chip.set_config_stalled(false);
        chip.frame(&mut regs);
        assert_eq!(0, regs.read(CFGCNT_FLAGS));

        chip.write(&mut regs, MTCU_START, 0);
        assert!(!chip.is_capturing());
    }
}
