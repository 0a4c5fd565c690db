use super::{gray_raw_frame_set, phase_raw_frame_set, place_gray, IntensityPhaseOrder, UseCaseBuilder};
use crate::{
    common::Freq,
    error::ToFError,
    usecase::{ExposureGray, Ssc, UseCaseDefinition},
};

/// Two modulated raw frame sets at different frequencies and an optional grayscale frame.
#[derive(Clone, Debug, PartialEq)]
pub struct EightPhase {
    target_rate: u16,
    modulation_frequencies: [Freq<u32>; 2],
    exposure_limits: (u32, u32),
    exposure_modulation: [u32; 2],
    exposure_gray: u32,
    gray_illumination: ExposureGray,
    order: IntensityPhaseOrder,
    ssc: Option<[Ssc; 2]>,
}

impl EightPhase {
    /// Creates the builder. A zero `exposure_gray` omits the grayscale frame.
    #[must_use]
    pub const fn new(
        target_rate: u16,
        modulation_frequencies: [Freq<u32>; 2],
        exposure_limits: (u32, u32),
        exposure_modulation: [u32; 2],
        exposure_gray: u32,
    ) -> Self {
        Self {
            target_rate,
            modulation_frequencies,
            exposure_limits,
            exposure_modulation,
            exposure_gray,
            gray_illumination: ExposureGray::Off,
            order: IntensityPhaseOrder::IntensityLastPhase,
            ssc: None,
        }
    }

    /// Sets whether the grayscale frame is illuminated. An illuminated frame uses the second
    /// modulation frequency.
    #[must_use]
    pub const fn with_gray_illumination(mut self, illumination: ExposureGray) -> Self {
        self.gray_illumination = illumination;
        self
    }

    /// Sets the position of the grayscale frame.
    #[must_use]
    pub const fn with_order(mut self, order: IntensityPhaseOrder) -> Self {
        self.order = order;
        self
    }

    /// Enables spread spectrum modulation with a common frequency and k-spread and one delta
    /// per modulation frequency.
    #[must_use]
    pub const fn with_ssc(mut self, freq: f64, kspread: f64, delta: [f64; 2]) -> Self {
        self.ssc = Some([
            Ssc {
                freq,
                kspread,
                delta: delta[0],
            },
            Ssc {
                freq,
                kspread,
                delta: delta[1],
            },
        ]);
        self
    }
}

impl UseCaseBuilder for EightPhase {
    fn build(&self) -> Result<UseCaseDefinition, ToFError> {
        let mut uc = UseCaseDefinition::new("EightPhase", self.target_rate)
            .with_ssc_enabled(self.ssc.is_some());
        let ssc = self.ssc.unwrap_or_default();

        let gray_group = |uc: &mut UseCaseDefinition| {
            uc.create_exposure_group("gray", self.exposure_limits, self.exposure_gray)
        };

        let mut gray = None;
        if self.exposure_gray > 0 && self.order == IntensityPhaseOrder::IntensityFirstPhase {
            gray = Some(gray_group(&mut uc)?);
        }
        let mut sets = Vec::with_capacity(3);
        for (i, name) in ["mod1", "mod2"].into_iter().enumerate() {
            let group =
                uc.create_exposure_group(name, self.exposure_limits, self.exposure_modulation[i])?;
            sets.push(phase_raw_frame_set(self.modulation_frequencies[i], group, ssc[i]));
        }
        if self.exposure_gray > 0 && gray.is_none() {
            gray = Some(gray_group(&mut uc)?);
        }
        let gray = gray.map(|group| {
            gray_raw_frame_set(group, self.gray_illumination, self.modulation_frequencies[1])
        });
        place_gray(&mut sets, gray, self.order);

        uc.construct_non_mixed(sets)?;
        uc.verify_class_invariants()?;
        Ok(uc)
    }
}
