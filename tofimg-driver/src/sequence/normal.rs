use tofimg_core::error::ToFError;

use super::{untranslated, SequenceGenerator, EXPO, FR, PLL, PS, SEQ_IDX_OFFSET};
use crate::{
    imager::m2450_a12::registers::*, measurement::MeasurementBlock, register::RegisterMap,
};

/// Sequence entries of the normal mode sequencer.
pub const NORMAL_MODE_CAPACITY: usize = 20;

/// Sequencer layout of the all-in-one firmware with a single measurement block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalModeGenerator;

impl SequenceGenerator for NormalModeGenerator {
    fn generate(&self, blocks: &[MeasurementBlock]) -> Result<RegisterMap, ToFError> {
        let first = blocks
            .first()
            .filter(|mb| !mb.sequence.is_empty())
            .ok_or_else(|| ToFError::logic("no raw frame to sequence"))?;
        let entries = blocks.iter().map(|mb| mb.sequence.len()).sum::<usize>();
        if entries > NORMAL_MODE_CAPACITY {
            return Err(ToFError::OutOfBounds(format!(
                "{} sequence entries exceed the sequencer memory of {}",
                entries, NORMAL_MODE_CAPACITY
            )));
        }

        let mut registers = blocks
            .iter()
            .flat_map(|mb| mb.sequence.iter())
            .enumerate()
            .flat_map(|(i, seq)| {
                let base = AIO_SEQ_START + i as u16 * SEQ_IDX_OFFSET;
                [
                    (base + EXPO, seq.exposure),
                    (base + FR, seq.frame_rate),
                    (base + PS, seq.phase_shift),
                    (base + PLL, seq.pll_set),
                ]
            })
            .collect::<RegisterMap>();
        registers.insert(AIO_NR_LPFSMFR_1, (first.frame_rate_counter >> 16) as u16);
        registers.insert(AIO_NR_LPFSMFR_2, (first.frame_rate_counter & 0xFFFF) as u16);
        registers.insert(CFGCNT_CTRLSEQ, (first.sequence.len() - 1) as u16);
        Ok(registers)
    }

    fn reconfig_translation(
        &self,
        _block_count: usize,
        registers: &RegisterMap,
    ) -> Result<RegisterMap, ToFError> {
        let mut source = registers.clone();
        let mut translated = RegisterMap::new();

        (AIO_SEQ_START..AIO_NR_PLLCFG1_LUT1)
            .step_by(SEQ_IDX_OFFSET as usize)
            .for_each(|sidx| {
                let target = AIO_SR_NR_START + (sidx - AIO_SEQ_START) / 2;
                [EXPO, FR].into_iter().for_each(|reg| {
                    if let Some(value) = source.remove(&(sidx + reg)) {
                        translated.insert(target + reg, value);
                    }
                });
            });
        [
            (AIO_NR_LPFSMFR_1, AIO_SR_NR_LPFSMFR_1),
            (AIO_NR_LPFSMFR_2, AIO_SR_NR_LPFSMFR_2),
        ]
        .into_iter()
        .for_each(|(from, to)| {
            if let Some(value) = source.remove(&from) {
                translated.insert(to, value);
            }
        });
        // The sequence length cannot change while capturing.
        source.remove(&CFGCNT_CTRLSEQ);

        if !source.is_empty() {
            tracing::debug!("untranslated registers {:04X?}", source.keys());
            return Err(untranslated());
        }
        translated.insert(AIO_SR_RECONFIGFLAGS, 1);
        Ok(translated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::tests::{entry, random_block};

    #[test]
    fn generate() -> anyhow::Result<()> {
        let mb = MeasurementBlock {
            sequence: vec![entry(100, 0, 8, 0), entry(200, 300, 76, 1)],
            frame_rate_counter: 0x0001_2345,
            ..MeasurementBlock::new(NORMAL_MODE_CAPACITY)
        };
        let regs = NormalModeGenerator.generate(&[mb])?;
        assert_eq!(
            RegisterMap::from([
                (0xC320, 100),
                (0xC321, 0),
                (0xC322, 8),
                (0xC323, 0),
                (0xC324, 200),
                (0xC325, 300),
                (0xC326, 76),
                (0xC327, 1),
                (0xC3AC, 0x0001),
                (0xC3AD, 0x2345),
                (0xA88D, 1),
            ]),
            regs
        );
        Ok(())
    }

    #[test]
    fn capacity() {
        let mb = MeasurementBlock {
            sequence: vec![entry(1, 0, 0, 0); NORMAL_MODE_CAPACITY + 1],
            ..MeasurementBlock::new(NORMAL_MODE_CAPACITY + 1)
        };
        assert!(matches!(
            NormalModeGenerator.generate(&[mb]),
            Err(ToFError::OutOfBounds(_))
        ));
        assert!(matches!(
            NormalModeGenerator.generate(&[MeasurementBlock::new(NORMAL_MODE_CAPACITY)]),
            Err(ToFError::Logic(_))
        ));
    }

    #[test]
    fn deterministic() -> anyhow::Result<()> {
        let mut rng = rand::rng();
        for _ in 0..100 {
            let blocks = [random_block(&mut rng, NORMAL_MODE_CAPACITY)];
            let regs = NormalModeGenerator.generate(&blocks)?;
            assert_eq!(regs, NormalModeGenerator.generate(&blocks.clone())?);
            assert_eq!(4 * blocks[0].sequence.len() + 3, regs.len());
        }
        Ok(())
    }

    #[test]
    fn reconfig_translation() -> anyhow::Result<()> {
        let changes = RegisterMap::from([
            (0xC320, 10),
            (0xC325, 20),
            (0xC3AC, 0),
            (0xC3AD, 5),
            (0xA88D, 3),
        ]);
        assert_eq!(
            RegisterMap::from([
                (0xA850, 10),
                (0xA853, 20),
                (0xA878, 0),
                (0xA879, 5),
                (0xA87A, 1),
            ]),
            NormalModeGenerator.reconfig_translation(1, &changes)?
        );
        Ok(())
    }

    #[rstest::rstest]
    #[case(0xC322)]
    #[case(0xC323)]
    #[case(0xA893)]
    fn untranslatable(#[case] address: u16) {
        assert_eq!(
            Err(untranslated()),
            NormalModeGenerator.reconfig_translation(1, &RegisterMap::from([(address, 1)]))
        );
    }
}
