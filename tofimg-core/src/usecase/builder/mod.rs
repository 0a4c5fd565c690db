mod calibration;
mod eight_phase;
mod four_phase;
mod mixed_xht;
mod slave;

pub use calibration::Calibration;
pub use eight_phase::EightPhase;
pub use four_phase::FourPhase;
pub use mixed_xht::{GraySetting, MixedXHt};
pub use slave::Slave;

use super::{
    DutyCycle, ExposureGray, ExposureGroupIdx, PhaseDefinition, RawFrameSet, Ssc,
    UseCaseDefinition,
};
use crate::{common::Freq, error::ToFError};

/// Where the grayscale raw frame set is placed relative to the modulated ones.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntensityPhaseOrder {
    /// Gray frames are captured after the modulated frames.
    #[default]
    IntensityLastPhase,
    /// Gray frames are captured before the modulated frames.
    IntensityFirstPhase,
}

/// A recipe producing a verified [`UseCaseDefinition`].
pub trait UseCaseBuilder {
    /// Builds the use case and checks its class invariants.
    fn build(&self) -> Result<UseCaseDefinition, ToFError>;
}

// GRCOV_EXCL_START
impl UseCaseBuilder for Box<dyn UseCaseBuilder> {
    fn build(&self) -> Result<UseCaseDefinition, ToFError> {
        self.as_ref().build()
    }
}
// GRCOV_EXCL_STOP

pub(crate) const fn phase_raw_frame_set(
    modulation_frequency: Freq<u32>,
    group: ExposureGroupIdx,
    ssc: Ssc,
) -> RawFrameSet {
    RawFrameSet::new(
        modulation_frequency,
        PhaseDefinition::Modulated4PhCw,
        DutyCycle::Auto,
        group,
    )
    .with_ssc(ssc)
}

/// A gray set that borrows `on_frequency` when the illumination is on.
pub(crate) const fn gray_raw_frame_set(
    group: ExposureGroupIdx,
    illumination: ExposureGray,
    on_frequency: Freq<u32>,
) -> RawFrameSet {
    UseCaseDefinition::gray_raw_frame_set(
        group,
        illumination,
        match illumination {
            ExposureGray::On => on_frequency,
            ExposureGray::Off => Freq::ZERO,
        },
    )
}

pub(crate) fn place_gray(
    sets: &mut Vec<RawFrameSet>,
    gray: Option<RawFrameSet>,
    order: IntensityPhaseOrder,
) {
    if let Some(gray) = gray {
        match order {
            IntensityPhaseOrder::IntensityFirstPhase => sets.insert(0, gray),
            IntensityPhaseOrder::IntensityLastPhase => sets.push(gray),
        }
    }
}
