use super::{gray_raw_frame_set, phase_raw_frame_set, place_gray, IntensityPhaseOrder, UseCaseBuilder};
use crate::{
    common::Freq,
    error::ToFError,
    usecase::{ExposureGray, Ssc, UseCaseDefinition},
};

/// One modulated raw frame set, optionally followed or preceded by a grayscale frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FourPhase {
    target_rate: u16,
    modulation_frequency: Freq<u32>,
    exposure_limits: (u32, u32),
    exposure_modulation: u32,
    exposure_gray: u32,
    gray_illumination: ExposureGray,
    order: IntensityPhaseOrder,
    ssc: Option<Ssc>,
}

impl FourPhase {
    /// Creates the builder. A zero `exposure_gray` omits the grayscale frame.
    #[must_use]
    pub const fn new(
        target_rate: u16,
        modulation_frequency: Freq<u32>,
        exposure_limits: (u32, u32),
        exposure_modulation: u32,
        exposure_gray: u32,
    ) -> Self {
        Self {
            target_rate,
            modulation_frequency,
            exposure_limits,
            exposure_modulation,
            exposure_gray,
            gray_illumination: ExposureGray::Off,
            order: IntensityPhaseOrder::IntensityLastPhase,
            ssc: None,
        }
    }

    /// Sets whether the grayscale frame is illuminated.
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

    /// Enables spread spectrum modulation.
    #[must_use]
    pub const fn with_ssc(mut self, ssc: Ssc) -> Self {
        self.ssc = Some(ssc);
        self
    }
}

impl UseCaseBuilder for FourPhase {
    fn build(&self) -> Result<UseCaseDefinition, ToFError> {
        let mut uc = UseCaseDefinition::new("FourPhase", self.target_rate)
            .with_ssc_enabled(self.ssc.is_some());
        let modulation =
            uc.create_exposure_group("modulation", self.exposure_limits, self.exposure_modulation)?;
        let mut sets = vec![phase_raw_frame_set(
            self.modulation_frequency,
            modulation,
            self.ssc.unwrap_or_default(),
        )];
        let gray = if self.exposure_gray > 0 {
            let group = uc.create_exposure_group("gray", self.exposure_limits, self.exposure_gray)?;
            Some(gray_raw_frame_set(
                group,
                self.gray_illumination,
                self.modulation_frequency,
            ))
        } else {
            None
        };
        place_gray(&mut sets, gray, self.order);
        uc.construct_non_mixed(sets)?;
        uc.verify_class_invariants()?;
        Ok(uc)
    }
}
