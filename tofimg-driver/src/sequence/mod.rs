mod mixed;
mod normal;

pub use mixed::{MixedModeGenerator, MIXED_MODE_BLOCKS, MIXED_MODE_CAPACITY};
pub use normal::{NormalModeGenerator, NORMAL_MODE_CAPACITY};

use tofimg_core::error::ToFError;

use crate::{measurement::MeasurementBlock, register::RegisterMap};

/// Number of registers of one sequence entry.
pub const SEQ_IDX_OFFSET: u16 = 4;

pub(crate) const EXPO: u16 = 0;
pub(crate) const FR: u16 = 1;
pub(crate) const PS: u16 = 2;
pub(crate) const PLL: u16 = 3;

/// Converts measurement blocks into sequencer registers.
pub trait SequenceGenerator: Send + Sync {
    /// Returns the sequencer registers of `blocks`.
    ///
    /// Fails if the blocks do not fit into the sequencer memory.
    fn generate(&self, blocks: &[MeasurementBlock]) -> Result<RegisterMap, ToFError>;

    /// Moves sequencer registers changed while capturing into the shadow area the firmware
    /// copies at the next safe point, and appends the trigger of the copy.
    fn reconfig_translation(
        &self,
        block_count: usize,
        registers: &RegisterMap,
    ) -> Result<RegisterMap, ToFError>;
}

// GRCOV_EXCL_START
impl SequenceGenerator for Box<dyn SequenceGenerator> {
    fn generate(&self, blocks: &[MeasurementBlock]) -> Result<RegisterMap, ToFError> {
        self.as_ref().generate(blocks)
    }

    fn reconfig_translation(
        &self,
        block_count: usize,
        registers: &RegisterMap,
    ) -> Result<RegisterMap, ToFError> {
        self.as_ref().reconfig_translation(block_count, registers)
    }
}
// GRCOV_EXCL_STOP

fn untranslated() -> ToFError {
    ToFError::runtime("reconfiguration missed some registers to translate")
}
