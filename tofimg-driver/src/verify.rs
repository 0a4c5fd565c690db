use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tofimg_core::{
    common::Freq,
    error::ToFError,
    usecase::{DutyCycle, UseCaseDefinition, VerificationStatus},
};

use crate::ImagerRawFrame;

/// The emission ceiling of a camera module.
///
/// The emission of a raw frame is its duty cycle ratio times its exposure time in
/// microseconds times the optical power factor of its modulation frequency. A raw frame whose
/// emission equals the limit is eye safe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EyeSafetyLimit {
    limit: f64,
    #[serde(default)]
    optical_power_factors: BTreeMap<u32, f64>,
}

impl EyeSafetyLimit {
    /// Ceiling of the illumination driven by an M2450_A12.
    pub const M2450_A12: Self = Self::new(750.);
    /// Ceiling of the illumination driven by an M2453.
    pub const M2453: Self = Self::new(750.);

    /// Creates a limit where every frequency has an optical power factor of one.
    #[must_use]
    pub const fn new(limit: f64) -> Self {
        Self {
            limit,
            optical_power_factors: BTreeMap::new(),
        }
    }

    /// Sets the optical power factor of `frequency`.
    #[must_use]
    pub fn with_optical_power_factor(mut self, frequency: Freq<u32>, factor: f64) -> Self {
        self.optical_power_factors.insert(frequency.hz(), factor);
        self
    }

    /// Returns the limit.
    #[must_use]
    pub const fn limit(&self) -> f64 {
        self.limit
    }

    /// Returns the optical power factor of `frequency`.
    #[must_use]
    pub fn optical_power_factor(&self, frequency: Freq<u32>) -> f64 {
        self.optical_power_factors
            .get(&frequency.hz())
            .copied()
            .unwrap_or(1.)
    }

    /// Returns the emission of `frame`, resolving [`DutyCycle::Auto`] to `default_duty_cycle`.
    #[must_use]
    pub fn emission(&self, frame: &ImagerRawFrame, default_duty_cycle: DutyCycle) -> f64 {
        frame.resolved_duty_cycle(default_duty_cycle).ratio()
            * frame.exposure_time as f64
            * self.optical_power_factor(frame.modulation_frequency)
    }

    /// Returns [`VerificationStatus::EyeSafety`] if a raw frame emits more than the limit.
    #[must_use]
    pub fn verify(
        &self,
        frames: &[ImagerRawFrame],
        default_duty_cycle: DutyCycle,
    ) -> VerificationStatus {
        match frames
            .iter()
            .find(|f| self.emission(f, default_duty_cycle) > self.limit)
        {
            Some(f) => {
                tracing::debug!(
                    "raw frame at {:?} emits {} above {}",
                    f.modulation_frequency,
                    self.emission(f, default_duty_cycle),
                    self.limit
                );
                VerificationStatus::EyeSafety
            }
            None => VerificationStatus::Success,
        }
    }
}

/// Checks `frames` against the ceiling of the imager family and then against the limit of
/// the camera module, which can only lower it.
#[must_use]
pub(crate) fn verify_eye_safety(
    ceiling: &EyeSafetyLimit,
    module: Option<&EyeSafetyLimit>,
    frames: &[ImagerRawFrame],
    default_duty_cycle: DutyCycle,
) -> VerificationStatus {
    std::iter::once(ceiling)
        .chain(module)
        .map(|limit| limit.verify(frames, default_duty_cycle))
        .find(|status| !status.is_success())
        .unwrap_or(VerificationStatus::Success)
}

/// One raw frame per raw frame set of `use_case`, carrying what the emission depends on.
pub(crate) fn emitting_frames(use_case: &UseCaseDefinition) -> Result<Vec<ImagerRawFrame>, ToFError> {
    use_case
        .raw_frame_sets()
        .iter()
        .map(|rfs| {
            Ok(ImagerRawFrame {
                grayscale: rfs.is_grayscale(),
                duty_cycle: rfs.duty_cycle,
                ..ImagerRawFrame::new(
                    rfs.modulation_frequency,
                    use_case.exposure_time_for_raw_frame_set(rfs)?,
                )
            })
        })
        .collect()
}
