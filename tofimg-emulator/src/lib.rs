//! Register level emulator of ToF imagers.
//!
//! [`ImagerEmulator`] implements the bridge of an imager over a plain register file and a
//! [`ChipModel`] that reacts to the registers the firmware of the chip watches.

pub mod chip;
mod emulator;
mod memory;

pub use chip::{ChipModel, M2450A12Chip, M2453Chip, MTCU_START};
pub use emulator::{Access, ImagerEmulator, ERR_IN_RESET};
pub use memory::RegisterFile;
