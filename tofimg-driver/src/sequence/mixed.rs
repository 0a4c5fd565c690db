use tofimg_core::error::ToFError;

use super::{untranslated, SequenceGenerator, EXPO, FR, PLL, PS, SEQ_IDX_OFFSET};
use crate::{
    imager::m2450_a12::registers::*, measurement::MeasurementBlock, register::RegisterMap,
};

/// Number of measurement blocks of the mixed mode sequencer.
pub const MIXED_MODE_BLOCKS: usize = 8;
/// Sequence entries of each mixed mode measurement block.
pub const MIXED_MODE_CAPACITY: usize = 5;

const MM_LPFSMFR_1: u16 = 20;
const MM_LPFSMFR_2: u16 = 21;
const MM_CTRLSEQ: u16 = 22;
const SAFE_FOR_RECONFIG: u16 = 0x8000;

/// Bits of a decode word selecting the sequence entries a parameter is copied to.
const SEQ_NUM_BITSLICE: u16 = 0x3F << 4;

/// Sequencer layout of the all-in-one firmware interleaving several measurement blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MixedModeGenerator;

impl MixedModeGenerator {
    const fn block_start(block: usize) -> u16 {
        AIO_SEQ_START + block as u16 * AIO_MX_MB_OFFSET
    }
}

impl SequenceGenerator for MixedModeGenerator {
    fn generate(&self, blocks: &[MeasurementBlock]) -> Result<RegisterMap, ToFError> {
        if blocks.len() > MIXED_MODE_BLOCKS
            || blocks.iter().any(|mb| mb.sequence.len() > MIXED_MODE_CAPACITY)
        {
            return Err(ToFError::OutOfBounds(format!(
                "the measurement blocks exceed the sequencer memory of {} blocks of {} entries",
                MIXED_MODE_BLOCKS, MIXED_MODE_CAPACITY
            )));
        }

        let mut registers = RegisterMap::new();
        blocks.iter().enumerate().for_each(|(i, mb)| {
            let start = Self::block_start(i);
            mb.sequence.iter().enumerate().for_each(|(j, seq)| {
                let base = start + j as u16 * SEQ_IDX_OFFSET;
                registers.insert(base + EXPO, seq.exposure);
                registers.insert(base + FR, seq.frame_rate);
                registers.insert(base + PS, seq.phase_shift);
                registers.insert(base + PLL, seq.pll_set);
            });
            if !mb.sequence.is_empty() {
                registers.insert(start + MM_LPFSMFR_1, (mb.frame_rate_counter >> 16) as u16);
                registers.insert(start + MM_LPFSMFR_2, (mb.frame_rate_counter & 0xFFFF) as u16);
                registers.insert(
                    start + MM_CTRLSEQ,
                    (mb.sequence.len() - 1) as u16
                        | if mb.safe_for_reconfig {
                            SAFE_FOR_RECONFIG
                        } else {
                            0
                        },
                );
            }
        });

        let used = blocks.iter().filter(|mb| !mb.sequence.is_empty()).count();
        blocks.iter().enumerate().for_each(|(i, mb)| {
            registers.insert(
                AIO_MX_REPEAT_START + i as u16,
                if i < used { mb.cycles } else { 0 },
            );
        });
        Ok(registers)
    }

    /// Packs the changed registers into parameter and decode word pairs.
    ///
    /// A decode word addresses a register slot of one block in every sequence entry whose bit
    /// is set, so equal values of the same slot share one pair.
    fn reconfig_translation(
        &self,
        block_count: usize,
        registers: &RegisterMap,
    ) -> Result<RegisterMap, ToFError> {
        let total_seq = AIO_MX_MB_OFFSET.div_ceil(SEQ_IDX_OFFSET);
        let mut source = registers.clone();
        let mut params = Vec::<(u16, u16)>::new();

        (0..block_count).for_each(|mb| {
            let start = Self::block_start(mb);
            (0..total_seq).for_each(|seq| {
                (0..SEQ_IDX_OFFSET).for_each(|reg| {
                    let address = start + seq * SEQ_IDX_OFFSET + reg;
                    if address >= start + AIO_MX_MB_OFFSET {
                        return;
                    }
                    let Some(value) = source.remove(&address) else {
                        return;
                    };
                    let decode = mb as u16 + ((1 << seq) << 4) + (reg << 12);
                    match params.iter_mut().find(|(p, d)| {
                        *p == value && (*d & !SEQ_NUM_BITSLICE) == (decode & !SEQ_NUM_BITSLICE)
                    }) {
                        Some((_, d)) => *d |= decode,
                        None => params.push((value, decode)),
                    }
                });
            });
        });

        if !source.is_empty() {
            tracing::debug!("untranslated registers {:04X?}", source.keys());
            return Err(untranslated());
        }
        if params.len() > AIO_MX_MAX_PARAMS {
            return Err(ToFError::NotImplemented(
                "reconfiguration failed, partial reconfiguration is not implemented".to_string(),
            ));
        }

        let mut translated = params
            .iter()
            .enumerate()
            .flat_map(|(i, &(param, decode))| {
                let offset = 2 * i as u16;
                [
                    (AIO_SR_MX_PARAMSTART + offset, param),
                    (AIO_SR_MX_DECODESTART + offset, decode),
                ]
            })
            .collect::<RegisterMap>();
        translated.insert(AIO_SR_RECONFIGFLAGS, 3 + ((params.len() as u16) << 8));
        Ok(translated)
    }
}
