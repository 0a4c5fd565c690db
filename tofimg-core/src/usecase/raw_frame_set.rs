use serde::{Deserialize, Serialize};

use crate::common::Freq;

/// Index of an [`ExposureGroup`] inside a use case.
///
/// [`ExposureGroup`]: super::ExposureGroup
pub type ExposureGroupIdx = u16;

/// Which raw frames a [`RawFrameSet`] produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseDefinition {
    /// One unmodulated raw frame.
    Grayscale,
    /// Four raw frames at 0, 90, 180 and 270 degrees.
    Modulated4PhCw,
}

impl PhaseDefinition {
    /// Returns the phase angles of the raw frames in degrees.
    #[must_use]
    pub const fn phase_angles(&self) -> &'static [u16] {
        match self {
            Self::Grayscale => &[0],
            Self::Modulated4PhCw => &[0, 90, 180, 270],
        }
    }
}

/// Illumination duty cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DutyCycle {
    /// Use the duty cycle of the module configuration.
    #[default]
    Auto,
    /// Illumination off.
    Dc0,
    /// 25 %.
    Dc25,
    /// 25 % trailing, kept for legacy calibrations.
    Dc25Dep,
    /// 37.5 %.
    Dc37_5,
    /// 37.5 % trailing.
    Dc37_5Dep,
    /// 50 %.
    Dc50,
    /// 75 %.
    Dc75,
    /// 100 %.
    Dc100,
}

impl DutyCycle {
    /// Returns the fraction of the exposure during which the illumination is on.
    ///
    /// [`DutyCycle::Auto`] is treated as 50 %.
    #[must_use]
    pub const fn ratio(&self) -> f64 {
        match self {
            Self::Dc0 => 0.,
            Self::Dc25 | Self::Dc25Dep => 0.25,
            Self::Dc37_5 | Self::Dc37_5Dep => 0.375,
            Self::Auto | Self::Dc50 => 0.5,
            Self::Dc75 => 0.75,
            Self::Dc100 => 1.,
        }
    }
}

/// Position of a raw frame set in the measurement sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alignment {
    /// Spread evenly over the sequence by the frame rate clock.
    ClockAligned,
    /// Starts immediately after the previous set.
    #[default]
    StartAligned,
    /// Ends immediately before the next set.
    StopAligned,
    /// Placed at the end of the next block.
    NextStopAligned,
}

/// Spread spectrum parameters of the modulation PLL. All zero means disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ssc {
    /// Frequency of the spread spectrum modulation in Hz.
    pub freq: f64,
    /// Position of the nominal frequency inside the spread band.
    pub kspread: f64,
    /// Relative peak deviation.
    pub delta: f64,
}

impl Ssc {
    /// Returns `true` if spread spectrum modulation is requested.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.freq != 0. || self.delta != 0.
    }
}

/// A set of raw frames sharing one modulation frequency, exposure and illumination setting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawFrameSet {
    /// Modulation frequency, zero for unmodulated frames.
    pub modulation_frequency: Freq<u32>,
    /// Spread spectrum parameters.
    #[serde(default)]
    pub ssc: Ssc,
    /// Number and kind of raw frames.
    pub phase_definition: PhaseDefinition,
    /// Illumination duty cycle.
    pub duty_cycle: DutyCycle,
    /// Exposure group shared with other sets.
    pub exposure_group_idx: ExposureGroupIdx,
    /// Position in the measurement sequence.
    #[serde(default)]
    pub alignment: Alignment,
    /// Minimum pause after the last exposure of this set in seconds.
    #[serde(default)]
    pub t_eye_safety: f64,
}

impl RawFrameSet {
    /// Creates a start aligned raw frame set without spread spectrum and eye-safety pause.
    #[must_use]
    pub const fn new(
        modulation_frequency: Freq<u32>,
        phase_definition: PhaseDefinition,
        duty_cycle: DutyCycle,
        exposure_group_idx: ExposureGroupIdx,
    ) -> Self {
        Self {
            modulation_frequency,
            ssc: Ssc {
                freq: 0.,
                kspread: 0.,
                delta: 0.,
            },
            phase_definition,
            duty_cycle,
            exposure_group_idx,
            alignment: Alignment::StartAligned,
            t_eye_safety: 0.,
        }
    }

    /// Sets the spread spectrum parameters.
    #[must_use]
    pub const fn with_ssc(mut self, ssc: Ssc) -> Self {
        self.ssc = ssc;
        self
    }

    /// Sets the alignment.
    #[must_use]
    pub const fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Returns `true` if the set contains modulated raw frames.
    #[must_use]
    pub const fn is_modulated(&self) -> bool {
        matches!(self.phase_definition, PhaseDefinition::Modulated4PhCw)
    }

    /// Returns `true` if the set contains a single grayscale raw frame.
    #[must_use]
    pub const fn is_grayscale(&self) -> bool {
        matches!(self.phase_definition, PhaseDefinition::Grayscale)
    }

    /// Returns the number of raw frames this set produces.
    #[must_use]
    pub const fn count_raw_frames(&self) -> usize {
        self.phase_definition.phase_angles().len()
    }

    /// Compares two sets without looking at the exposure group they reference.
    #[must_use]
    pub fn eq_ignoring_exposure_group(&self, other: &Self) -> bool {
        Self {
            exposure_group_idx: other.exposure_group_idx,
            ..self.clone()
        } == *other
    }
}
