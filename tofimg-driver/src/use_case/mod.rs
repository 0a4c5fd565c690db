mod adapter;
mod updater;

use std::time::Duration;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tofimg_core::{error::ToFError, usecase::Alignment};

use crate::ImagerRawFrame;

/// Indices of the raw frames of one linked run.
pub type LinkedRun = SmallVec<[usize; 4]>;

/// A use case narrowed to what a software defined imager executes.
///
/// It is created from a [`UseCaseDefinition`] by [`ImagerUseCaseDefinition::from_use_case`] and
/// changed afterwards only through the updater methods.
///
/// [`UseCaseDefinition`]: tofimg_core::usecase::UseCaseDefinition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct ImagerUseCaseDefinition {
    /// Rate of the clock aligned raw frames in Hz.
    #[getset(get_copy = "pub")]
    target_rate: u16,
    #[getset(get = "pub")]
    raw_frames: Vec<ImagerRawFrame>,
    image_columns: u16,
    image_rows: u16,
    roi_column: u16,
    roi_row: u16,
    /// Rate of individual raw frames, zero for as fast as possible.
    #[getset(get_copy = "pub")]
    raw_frame_rate: u16,
    #[getset(get_copy = "pub")]
    ssc_enabled: bool,
    #[getset(get_copy = "pub")]
    mixed_mode: bool,
}

impl ImagerUseCaseDefinition {
    /// Creates a use case from raw frames that are already linked.
    #[must_use]
    pub fn new(target_rate: u16, raw_frames: Vec<ImagerRawFrame>) -> Self {
        Self {
            target_rate,
            raw_frames,
            image_columns: 176,
            image_rows: 120,
            roi_column: 0,
            roi_row: 0,
            raw_frame_rate: 0,
            ssc_enabled: false,
            mixed_mode: false,
        }
    }

    /// Sets the image size and the first active pixel.
    #[must_use]
    pub fn with_image(mut self, image: (u16, u16), roi_start: (u16, u16)) -> Self {
        (self.image_columns, self.image_rows) = image;
        (self.roi_column, self.roi_row) = roi_start;
        self
    }

    /// Sets the raw frame rate.
    #[must_use]
    pub fn with_raw_frame_rate(mut self, raw_frame_rate: u16) -> Self {
        self.raw_frame_rate = raw_frame_rate;
        self
    }

    /// Enables the spread spectrum clock.
    #[must_use]
    pub fn with_ssc_enabled(mut self, enabled: bool) -> Self {
        self.ssc_enabled = enabled;
        self
    }

    /// Enables the mixed mode operation of the sequencer.
    #[must_use]
    pub fn with_mixed_mode(mut self, enabled: bool) -> Self {
        self.mixed_mode = enabled;
        self
    }

    /// Returns the image size as `(columns, rows)`.
    #[must_use]
    pub const fn image(&self) -> (u16, u16) {
        (self.image_columns, self.image_rows)
    }

    /// Returns the zero based `(column, row)` of the first active pixel.
    #[must_use]
    pub const fn roi_start(&self) -> (u16, u16) {
        (self.roi_column, self.roi_row)
    }

    /// Splits the raw frames into linked runs.
    ///
    /// A run ends at a frame marked as end of linked raw frames; trailing frames without such
    /// a mark form a last run.
    #[must_use]
    pub fn linked_runs(&self) -> Vec<LinkedRun> {
        let mut runs = Vec::new();
        let mut run = LinkedRun::new();
        self.raw_frames.iter().enumerate().for_each(|(i, rf)| {
            run.push(i);
            if rf.is_end_of_linked_raw_frames {
                runs.push(std::mem::take(&mut run));
            }
        });
        if !run.is_empty() {
            runs.push(run);
        }
        runs
    }

    /// Returns the time at the end of the sequence during which no raw frame is exposed.
    ///
    /// The tail starts at the last clock aligned raw frame and lasts for one period of the
    /// target rate minus the exposure times of the following raw frames.
    /// A zero target rate is a [`ToFError::Logic`]; exposures that fill the period are
    /// [`ToFError::OutOfBounds`].
    pub fn tail_time(&self) -> Result<Duration, ToFError> {
        if self.target_rate == 0 {
            return Err(ToFError::logic("The target rate must not be zero"));
        }
        let period = 1_000_000 / self.target_rate as u64;
        let first = self
            .raw_frames
            .iter()
            .rposition(|rf| rf.alignment == Alignment::ClockAligned)
            .unwrap_or_default();
        let exposure = self.raw_frames[first..]
            .iter()
            .map(|rf| rf.exposure_time as u64)
            .sum::<u64>();
        if exposure >= period {
            return Err(ToFError::out_of_bounds(
                "Cumulated exposures are too long for the frame rate",
            ));
        }
        Ok(Duration::from_micros(period - exposure))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tofimg_core::common::{Freq, MHz};

    use super::*;

    pub(crate) fn linked(freq: Freq<u32>, exposure: u32, count: usize) -> Vec<ImagerRawFrame> {
        (0..count)
            .map(|i| ImagerRawFrame {
                phase_angle: (i * 90) as u16,
                alignment: Alignment::StartAligned,
                is_start_of_linked_raw_frames: i == 0,
                is_end_of_linked_raw_frames: i + 1 == count,
                is_end_of_linked_measurement: false,
                ..ImagerRawFrame::new(freq, exposure)
            })
            .collect()
    }

    pub(crate) fn four_phase_gray(rate: u16, exposure: u32, gray: u32) -> ImagerUseCaseDefinition {
        let mut frames = linked(30 * MHz, exposure, 4);
        frames[0].alignment = Alignment::ClockAligned;
        let mut gray = linked(Freq::ZERO, gray, 1);
        gray[0].grayscale = true;
        gray[0].is_end_of_linked_measurement = true;
        frames.extend(gray);
        ImagerUseCaseDefinition::new(rate, frames)
    }

    #[test]
    fn linked_runs() {
        let uc = four_phase_gray(5, 1000, 200);
        let runs = uc.linked_runs();
        assert_eq!(2, runs.len());
        assert_eq!(&[0, 1, 2, 3], runs[0].as_slice());
        assert_eq!(&[4], runs[1].as_slice());
    }

    #[test]
    fn unterminated_run() {
        let mut frames = linked(30 * MHz, 100, 3);
        frames[2].is_end_of_linked_raw_frames = false;
        let uc = ImagerUseCaseDefinition::new(5, frames);
        assert_eq!(vec![LinkedRun::from_slice(&[0, 1, 2])], uc.linked_runs());
    }

    #[rstest::rstest]
    #[case(Ok(Duration::from_micros(195_800)), 5, 1000, 200)]
    #[case(Ok(Duration::from_micros(19_500)), 50, 100, 100)]
    #[case(Err(ToFError::out_of_bounds("Cumulated exposures are too long for the frame rate")), 50, 5000, 0)]
    #[case(Err(ToFError::logic("The target rate must not be zero")), 0, 100, 100)]
    fn tail_time(
        #[case] expect: Result<Duration, ToFError>,
        #[case] rate: u16,
        #[case] exposure: u32,
        #[case] gray: u32,
    ) {
        assert_eq!(expect, four_phase_gray(rate, exposure, gray).tail_time());
    }

    #[test]
    fn defaults() {
        let uc = ImagerUseCaseDefinition::new(5, Vec::new())
            .with_image((96, 40), (40, 40))
            .with_raw_frame_rate(150);
        assert_eq!((96, 40), uc.image());
        assert_eq!((40, 40), uc.roi_start());
        assert_eq!(150, uc.raw_frame_rate());
        assert!(!uc.mixed_mode());
        assert!(!uc.ssc_enabled());
    }
}
