mod m2450_a12;
mod m2453;

pub use m2450_a12::M2450A12Chip;
pub use m2453::{M2453Chip, MTCU_START};

use crate::RegisterFile;

/// The behaviour of an imager behind its register interface.
///
/// The emulator owns the register file and forwards every host write to the chip, which stores
/// it and reacts to the registers its firmware watches.
pub trait ChipModel: Send {
    /// Name of the chip for log output.
    #[must_use]
    fn name(&self) -> &'static str;

    /// Brings the chip into its power-up state when the reset line is released.
    fn power_up(&mut self, regs: &mut RegisterFile);

    /// Handles a write of the host.
    fn write(&mut self, regs: &mut RegisterFile, address: u16, value: u16);

    /// Advances the chip by one frame.
    fn frame(&mut self, regs: &mut RegisterFile);

    /// Returns `true` while the sequencer produces frames.
    #[must_use]
    fn is_capturing(&self) -> bool;
}

/// Fills the four fuse registers starting at `first`.
pub(crate) fn write_serial(regs: &mut RegisterFile, first: u16, serial: &[u16; 4]) {
    serial
        .iter()
        .enumerate()
        .for_each(|(i, &word)| regs.write(first + i as u16, word));
}
