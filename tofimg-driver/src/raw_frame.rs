use serde::{Deserialize, Serialize};
use tofimg_core::{
    common::Freq,
    usecase::{Alignment, DutyCycle, Ssc},
};

use crate::defined::effective_frequency;

/// A single raw frame as the imager captures it.
///
/// Raw frames of one raw frame set are linked: they are captured back to back and must not be
/// split between measurement blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ImagerRawFrame {
    /// Modulation frequency, zero for grayscale frames.
    pub modulation_frequency: Freq<u32>,
    /// Spread spectrum parameters.
    pub ssc: Ssc,
    /// Unmodulated frame.
    pub grayscale: bool,
    /// Illumination duty cycle.
    pub duty_cycle: DutyCycle,
    /// Phase angle in degrees.
    pub phase_angle: u16,
    /// Exposure time in microseconds.
    pub exposure_time: u32,
    /// Position in the sequence.
    pub alignment: Alignment,
    /// Minimum pause after the exposure in seconds.
    pub t_eye_safety: f64,
    /// First frame of a linked run.
    pub is_start_of_linked_raw_frames: bool,
    /// Last frame of a linked run.
    pub is_end_of_linked_raw_frames: bool,
    /// Last frame of a frame group, after which the imager can be reconfigured.
    pub is_end_of_linked_measurement: bool,
}

impl ImagerRawFrame {
    /// Creates a standalone, clock aligned, modulated raw frame at phase 0.
    #[must_use]
    pub fn new(modulation_frequency: Freq<u32>, exposure_time: u32) -> Self {
        Self {
            modulation_frequency,
            ssc: Ssc::default(),
            grayscale: false,
            duty_cycle: DutyCycle::Auto,
            phase_angle: 0,
            exposure_time,
            alignment: Alignment::ClockAligned,
            t_eye_safety: 0.,
            is_start_of_linked_raw_frames: true,
            is_end_of_linked_raw_frames: true,
            is_end_of_linked_measurement: true,
        }
    }

    /// Returns the frequency in Hz the frame is timed with.
    #[must_use]
    pub const fn timing_frequency(&self) -> u32 {
        effective_frequency(self.modulation_frequency.hz())
    }

    /// Returns the duty cycle with [`DutyCycle::Auto`] replaced by `default`.
    #[must_use]
    pub const fn resolved_duty_cycle(&self, default: DutyCycle) -> DutyCycle {
        match self.duty_cycle {
            DutyCycle::Auto => default,
            dc => dc,
        }
    }
}

#[cfg(test)]
mod tests {
    use tofimg_core::common::MHz;

    use super::*;
    use crate::defined::GRAYSCALE_MODULATION_FREQUENCY;

    #[test]
    fn timing_frequency() {
        assert_eq!(30_000_000, ImagerRawFrame::new(30 * MHz, 100).timing_frequency());
        assert_eq!(
            GRAYSCALE_MODULATION_FREQUENCY,
            ImagerRawFrame::new(Freq::ZERO, 100).timing_frequency()
        );
    }

    #[rstest::rstest]
    #[case(DutyCycle::Dc25, DutyCycle::Auto, DutyCycle::Dc25)]
    #[case(DutyCycle::Dc0, DutyCycle::Dc0, DutyCycle::Dc50)]
    #[case(DutyCycle::Dc37_5, DutyCycle::Dc37_5, DutyCycle::Dc25)]
    fn resolved(#[case] expect: DutyCycle, #[case] dc: DutyCycle, #[case] default: DutyCycle) {
        let frame = ImagerRawFrame {
            duty_cycle: dc,
            ..ImagerRawFrame::new(30 * MHz, 100)
        };
        assert_eq!(expect, frame.resolved_duty_cycle(default));
    }
}
