use super::{phase_raw_frame_set, UseCaseBuilder};
use crate::{
    common::Freq,
    error::ToFError,
    usecase::{ExposureGray, Ssc, UseCaseDefinition},
};

/// The ten phase calibration sequence: gray, two modulated sets and two more gray frames at the
/// second frequency, one dark and one illuminated.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    frame_rate: u16,
    modulation_frequencies: [Freq<u32>; 2],
    exposure_limits: (u32, u32),
    exposure_modulation: [u32; 2],
    exposure_gray: [u32; 2],
    ssc: Option<[Ssc; 2]>,
}

impl Calibration {
    /// Creates the builder. A zero gray exposure omits the corresponding gray frames.
    #[must_use]
    pub const fn new(
        frame_rate: u16,
        modulation_frequencies: [Freq<u32>; 2],
        exposure_limits: (u32, u32),
        exposure_modulation: [u32; 2],
        exposure_gray: [u32; 2],
    ) -> Self {
        Self {
            frame_rate,
            modulation_frequencies,
            exposure_limits,
            exposure_modulation,
            exposure_gray,
            ssc: None,
        }
    }

    /// Enables spread spectrum modulation, one setting per modulation frequency.
    #[must_use]
    pub const fn with_ssc(mut self, ssc: [Ssc; 2]) -> Self {
        self.ssc = Some(ssc);
        self
    }
}

impl UseCaseBuilder for Calibration {
    fn build(&self) -> Result<UseCaseDefinition, ToFError> {
        let mut uc = UseCaseDefinition::new("TenPhase", self.frame_rate)
            .with_ssc_enabled(self.ssc.is_some());
        let ssc = self.ssc.unwrap_or_default();
        let limits = self.exposure_limits;

        let mut sets = Vec::with_capacity(5);
        for (i, name) in ["mod1", "mod2"].into_iter().enumerate() {
            let group = uc.create_exposure_group(name, limits, self.exposure_modulation[i])?;
            sets.push(phase_raw_frame_set(self.modulation_frequencies[i], group, ssc[i]));
        }

        let [gray1, gray2] = self.exposure_gray;
        if gray1 > 0 {
            let group = uc.create_exposure_group("gray1", limits, gray1)?;
            sets.insert(
                0,
                UseCaseDefinition::gray_raw_frame_set(group, ExposureGray::Off, Freq::ZERO),
            );
            // The ninth phase is repeated as its own set to stay comparable with the tenth.
            let group = uc.create_exposure_group("gray1a", limits, gray1)?;
            sets.push(UseCaseDefinition::gray_raw_frame_set(
                group,
                ExposureGray::Off,
                self.modulation_frequencies[1],
            ));
        }
        if gray2 > 0 {
            let group = uc.create_exposure_group("gray2", limits, gray2)?;
            sets.push(UseCaseDefinition::gray_raw_frame_set(
                group,
                ExposureGray::On,
                self.modulation_frequencies[1],
            ));
        }

        uc.construct_non_mixed(sets)?;
        uc.verify_class_invariants()?;
        Ok(uc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::MHz, usecase::DutyCycle};

    #[test]
    fn ten_phase() -> anyhow::Result<()> {
        let uc = Calibration::new(5, [80 * MHz, 60 * MHz], (1, 2000), [1000, 1000], [300, 400]).build()?;
        assert_eq!("TenPhase", uc.type_name());
        assert_eq!(11, uc.raw_frame_count());
        let sets = uc.raw_frame_sets();
        assert_eq!(5, sets.len());
        assert!(sets[0].is_grayscale());
        assert_eq!(Freq::ZERO, sets[0].modulation_frequency);
        assert_eq!(80 * MHz, sets[1].modulation_frequency);
        assert_eq!(60 * MHz, sets[2].modulation_frequency);
        assert_eq!(DutyCycle::Dc0, sets[3].duty_cycle);
        assert_eq!(60 * MHz, sets[3].modulation_frequency);
        assert_eq!(DutyCycle::Auto, sets[4].duty_cycle);
        assert_eq!(vec![1000, 1000, 300, 300, 400], uc.exposure_times());
        Ok(())
    }

    #[rstest::rstest]
    #[case(8, [0, 0])]
    #[case(10, [300, 0])]
    #[case(9, [0, 400])]
    fn optional_gray(#[case] expect: usize, #[case] gray: [u32; 2]) -> anyhow::Result<()> {
        let uc = Calibration::new(5, [80 * MHz, 60 * MHz], (1, 2000), [1000, 1000], gray).build()?;
        assert_eq!(expect, uc.raw_frame_count());
        Ok(())
    }
}
