use super::{phase_raw_frame_set, place_gray, IntensityPhaseOrder, UseCaseBuilder};
use crate::{
    common::Freq,
    error::ToFError,
    usecase::{Alignment, ExposureGray, Ssc, UseCaseDefinition},
};

/// Gray frame settings of one stream of a [`MixedXHt`] use case.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GraySetting {
    /// Exposure time, zero omits the frame.
    pub exposure: u32,
    /// Illumination of the frame.
    pub illumination: ExposureGray,
}

impl GraySetting {
    /// No gray frame.
    pub const NONE: Self = Self {
        exposure: 0,
        illumination: ExposureGray::Off,
    };
}

/// A mixed mode use case with a hand tracking stream captured `ratio` times per frame of an
/// environment scanning stream.
///
/// The hand tracking stream has one modulation frequency, the environment stream two.
#[derive(Clone, Debug, PartialEq)]
pub struct MixedXHt {
    target_rate: u16,
    ratio: u16,
    frequency_ht: Freq<u32>,
    frequencies_es: [Freq<u32>; 2],
    limits_ht: (u32, u32),
    limits_es: (u32, u32),
    exposure_ht: u32,
    exposure_es: [u32; 2],
    gray_ht: GraySetting,
    gray_es: GraySetting,
    order: IntensityPhaseOrder,
    ssc: Option<(f64, f64, [f64; 3])>,
}

impl MixedXHt {
    /// Creates the builder without gray frames.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        target_rate: u16,
        ratio: u16,
        frequency_ht: Freq<u32>,
        frequencies_es: [Freq<u32>; 2],
        limits_ht: (u32, u32),
        limits_es: (u32, u32),
        exposure_ht: u32,
        exposure_es: [u32; 2],
    ) -> Self {
        Self {
            target_rate,
            ratio,
            frequency_ht,
            frequencies_es,
            limits_ht,
            limits_es,
            exposure_ht,
            exposure_es,
            gray_ht: GraySetting::NONE,
            gray_es: GraySetting::NONE,
            order: IntensityPhaseOrder::IntensityLastPhase,
            ssc: None,
        }
    }

    /// Adds gray frames to the hand tracking and the environment stream.
    #[must_use]
    pub const fn with_gray(mut self, ht: GraySetting, es: GraySetting) -> Self {
        self.gray_ht = ht;
        self.gray_es = es;
        self
    }

    /// Sets the position of the gray frames.
    #[must_use]
    pub const fn with_order(mut self, order: IntensityPhaseOrder) -> Self {
        self.order = order;
        self
    }

    /// Enables spread spectrum modulation with one delta for the hand tracking frequency and
    /// one for each environment frequency.
    #[must_use]
    pub const fn with_ssc(mut self, freq: f64, kspread: f64, delta: [f64; 3]) -> Self {
        self.ssc = Some((freq, kspread, delta));
        self
    }

    fn ssc(&self, i: usize) -> Ssc {
        self.ssc
            .map(|(freq, kspread, delta)| Ssc {
                freq,
                kspread,
                delta: delta[i],
            })
            .unwrap_or_default()
    }
}

impl UseCaseBuilder for MixedXHt {
    fn build(&self) -> Result<UseCaseDefinition, ToFError> {
        let mut uc = UseCaseDefinition::new(format!("MixedXHT_{}", self.ratio), self.target_rate)
            .with_ssc_enabled(self.ssc.is_some());
        if self.ratio == 0 {
            return Err(ToFError::logic(
                "Can't create a mixed use case with zero HT framegroups",
            ));
        }

        let ht_stream = uc.create_stream(0)?;
        let es_stream = uc.create_stream(0)?;
        let ht = uc.create_exposure_group("ht", self.limits_ht, self.exposure_ht)?;
        let es1 = uc.create_exposure_group("es1", self.limits_es, self.exposure_es[0])?;
        let es2 = uc.create_exposure_group("es2", self.limits_es, self.exposure_es[1])?;

        let mut group_ht = vec![phase_raw_frame_set(self.frequency_ht, ht, self.ssc(0))];
        let mut group_es = vec![
            phase_raw_frame_set(self.frequencies_es[0], es1, self.ssc(1)),
            phase_raw_frame_set(self.frequencies_es[1], es2, self.ssc(2)),
        ];

        for (name, setting, limits, group) in [
            ("grayHt", self.gray_ht, self.limits_ht, &mut group_ht),
            ("grayEs", self.gray_es, self.limits_es, &mut group_es),
        ] {
            let gray = if setting.exposure > 0 {
                let idx = uc.create_exposure_group(name, limits, setting.exposure)?;
                Some(UseCaseDefinition::gray_raw_frame_set(
                    idx,
                    setting.illumination,
                    Freq::ZERO,
                ))
            } else {
                None
            };
            place_gray(group, gray, self.order);
        }

        (0..self.ratio).try_for_each(|_| {
            uc.construct_frame_group(ht_stream, group_ht.clone(), Alignment::ClockAligned, false)
        })?;
        uc.construct_frame_group(es_stream, group_es, Alignment::StartAligned, false)?;
        uc.verify_class_invariants()?;
        Ok(uc)
    }
}
