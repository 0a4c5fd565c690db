use getset::{CopyGetters, Getters};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::{
    Alignment, DutyCycle, ExposureGroup, ExposureGroupIdx, FrameGroup, PhaseDefinition,
    RawFrameSet, Stream, StreamId, UseCaseIdentifier, DEFAULT_STREAM_ID,
};
use crate::{common::Freq, error::ToFError};

/// Raw frames above this count make 12-bit frame counters ambiguous inside one use case.
pub const MAX_RAW_FRAMES: usize = 2047;

/// How much transfer bandwidth a use case needs from the bridge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandwidthRequirementCategory {
    /// No throttling is applied.
    #[default]
    NoThrottling,
    /// Continuous transfer over a USB 2.0 link.
    Usb2Continuous,
    /// Continuous transfer over a USB 3.0 link.
    Usb3Continuous,
    /// USB 2.0 link with the raw frames of one frame group spread over the frame period.
    Usb2Throttling,
}

/// How raw frames are handed to the receiver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameTransmissionMode {
    /// Each raw frame is transmitted on its own.
    #[default]
    Individual,
    /// All raw frames of a sequence are concatenated into one transfer.
    Superframe,
}

/// Whether a grayscale raw frame set has the illumination switched on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExposureGray {
    /// Illumination on.
    On,
    /// Illumination off.
    Off,
}

/// A hardware independent description of a capture mode.
///
/// Use cases are built by the builders in [`builder`] or loaded from a serialized table.
/// The constructors do not check the class invariants while the use case is assembled; call
/// [`UseCaseDefinition::verify_class_invariants`] once it is complete. The setters check the
/// invariants and leave the use case unchanged when a check fails.
///
/// [`builder`]: super::builder
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct UseCaseDefinition {
    #[getset(get = "pub")]
    type_name: String,
    #[getset(get_copy = "pub")]
    identifier: UseCaseIdentifier,
    image_columns: u16,
    image_rows: u16,
    #[getset(get_copy = "pub")]
    target_rate: u16,
    #[getset(get_copy = "pub")]
    min_rate: u16,
    #[getset(get_copy = "pub")]
    max_rate: u16,
    #[getset(get = "pub")]
    exposure_groups: Vec<ExposureGroup>,
    #[getset(get = "pub")]
    raw_frame_sets: Vec<RawFrameSet>,
    #[getset(get = "pub")]
    streams: Vec<Stream>,
    #[getset(get_copy = "pub")]
    ssc_enabled: bool,
    #[getset(get_copy = "pub")]
    bandwidth_category: BandwidthRequirementCategory,
    #[getset(get_copy = "pub")]
    frame_transmission_mode: FrameTransmissionMode,
}

impl UseCaseDefinition {
    /// Creates an empty use case running at `max_rate`.
    #[must_use]
    pub fn new(type_name: impl Into<String>, max_rate: u16) -> Self {
        Self {
            type_name: type_name.into(),
            identifier: UseCaseIdentifier::NIL,
            image_columns: 176,
            image_rows: 120,
            target_rate: max_rate,
            min_rate: 1,
            max_rate,
            exposure_groups: Vec::new(),
            raw_frame_sets: Vec::new(),
            streams: Vec::new(),
            ssc_enabled: false,
            bandwidth_category: BandwidthRequirementCategory::default(),
            frame_transmission_mode: FrameTransmissionMode::default(),
        }
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: UseCaseIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    /// Sets the image size.
    #[must_use]
    pub fn with_image(mut self, columns: u16, rows: u16) -> Self {
        self.image_columns = columns;
        self.image_rows = rows;
        self
    }

    /// Sets the minimum frame rate.
    #[must_use]
    pub fn with_min_rate(mut self, min_rate: u16) -> Self {
        self.min_rate = min_rate;
        self
    }

    /// Marks the use case as using spread spectrum modulation.
    #[must_use]
    pub fn with_ssc_enabled(mut self, enabled: bool) -> Self {
        self.ssc_enabled = enabled;
        self
    }

    /// Sets the bandwidth requirement.
    #[must_use]
    pub fn with_bandwidth_category(mut self, category: BandwidthRequirementCategory) -> Self {
        self.bandwidth_category = category;
        self
    }

    /// Sets the frame transmission mode.
    #[must_use]
    pub fn with_frame_transmission_mode(mut self, mode: FrameTransmissionMode) -> Self {
        self.frame_transmission_mode = mode;
        self
    }

    /// Returns the image size as `(columns, rows)`.
    #[must_use]
    pub const fn image(&self) -> (u16, u16) {
        (self.image_columns, self.image_rows)
    }

    pub(crate) fn exposure_groups_mut(&mut self) -> &mut [ExposureGroup] {
        &mut self.exposure_groups
    }

    pub(crate) fn set_rates(&mut self, target_rate: u16, max_rate: u16) {
        self.target_rate = target_rate;
        self.max_rate = max_rate;
    }

    /// Checks the structural invariants.
    pub fn verify_class_invariants(&self) -> Result<(), ToFError> {
        if self.type_name.is_empty() {
            return Err(ToFError::logic("Unnamed Use Case"));
        }
        if self.target_rate > self.max_rate || self.min_rate > self.max_rate {
            return Err(ToFError::logic("Exceeds max rate"));
        }
        if self.raw_frame_sets.is_empty() {
            return Err(ToFError::logic("Empty use case (no frames)"));
        }
        if self.raw_frame_count() >= MAX_RAW_FRAMES {
            return Err(ToFError::logic(
                "Huge use case (too many frames for 12-bit counters)",
            ));
        }
        if self.streams.is_empty() {
            return Err(ToFError::logic("Empty use case (no streams)"));
        }
        if self.exposure_groups.is_empty() {
            return Err(ToFError::logic("Use case has no exposure settings"));
        }

        let mut used = vec![false; self.exposure_groups.len()];
        self.raw_frame_sets.iter().try_for_each(|rfs| {
            used.get_mut(rfs.exposure_group_idx as usize)
                .map(|u| *u = true)
                .ok_or_else(|| {
                    ToFError::logic("A RawFrameSet has an out-of-bounds ExposureGroup index")
                })
        })?;
        if used.iter().any(|&u| !u) {
            return Err(ToFError::logic("Unused exposure group"));
        }

        self.exposure_groups.iter().try_for_each(|group| {
            if group.name.is_empty() {
                return Err(ToFError::logic("Unnamed exposure group"));
            }
            if group.exposure_limits.0 > group.exposure_limits.1 {
                return Err(ToFError::logic("Exposure limits are reversed"));
            }
            if !group.is_within_limits() {
                return Err(ToFError::logic(
                    "Exposure time is outside the exposure limits",
                ));
            }
            Ok(())
        })?;

        if !self.streams.iter().map(|s| s.id).all_unique() {
            return Err(ToFError::logic("Duplicate stream id"));
        }
        self.streams
            .iter()
            .try_for_each(|stream| self.verify_stream(stream))
    }

    fn verify_stream(&self, stream: &Stream) -> Result<(), ToFError> {
        if stream.id == 0 {
            return Err(ToFError::logic("Invalid stream id"));
        }
        let Some((first, rest)) = stream.frame_groups.split_first() else {
            return Err(ToFError::logic("Empty stream (no frame groups)"));
        };
        let group_zero = &first.raw_frame_set_indices;
        if group_zero.is_empty() {
            return Err(ToFError::logic("Empty FrameGroup (no frame sets)"));
        }
        let valid = |idx: &usize| *idx < self.raw_frame_sets.len();
        if !stream
            .frame_groups
            .iter()
            .flat_map(|g| g.raw_frame_set_indices.iter())
            .all(valid)
        {
            return Err(ToFError::logic(
                "A FrameGroup has an out-of-bounds RawFrameSet index",
            ));
        }
        rest.iter().try_for_each(|group| {
            if group.raw_frame_set_indices.len() != group_zero.len() {
                return Err(ToFError::logic("Different frame groups in a stream"));
            }
            group_zero
                .iter()
                .zip(group.raw_frame_set_indices.iter())
                .try_for_each(|(&a, &b)| {
                    let (a, b) = (&self.raw_frame_sets[a], &self.raw_frame_sets[b]);
                    let limits = |rfs: &RawFrameSet| {
                        self.exposure_groups[rfs.exposure_group_idx as usize].exposure_limits
                    };
                    if a.eq_ignoring_exposure_group(b) && limits(a) == limits(b) {
                        Ok(())
                    } else {
                        Err(ToFError::logic("Mismatched frames in groups in the stream"))
                    }
                })
        })
    }

    fn modify(&mut self, f: impl FnOnce(&mut Self) -> Result<(), ToFError>) -> Result<(), ToFError> {
        let mut updated = self.clone();
        f(&mut updated)?;
        updated.verify_class_invariants()?;
        *self = updated;
        Ok(())
    }

    /// Sets the target frame rate.
    pub fn set_target_rate(&mut self, rate: u16) -> Result<(), ToFError> {
        if rate < self.min_rate || rate > self.max_rate {
            return Err(ToFError::out_of_bounds(format!(
                "Frame rate {} is outside of [{}, {}]",
                rate, self.min_rate, self.max_rate
            )));
        }
        self.modify(|uc| {
            uc.target_rate = rate;
            Ok(())
        })
    }

    /// Sets the duty cycle given in percent of all raw frame sets, or of the set at `set`.
    pub fn set_duty_cycle(&mut self, percent: f64, set: Option<usize>) -> Result<(), ToFError> {
        let duty_cycle = [
            (0., DutyCycle::Dc0),
            (25., DutyCycle::Dc25),
            (37.5, DutyCycle::Dc37_5),
            (50., DutyCycle::Dc50),
            (75., DutyCycle::Dc75),
            (100., DutyCycle::Dc100),
        ]
        .into_iter()
        .find_map(|(p, dc)| (p == percent).then_some(dc))
        .ok_or_else(|| {
            ToFError::out_of_bounds(format!("Unsupported duty cycle: {}%", percent))
        })?;
        self.modify(|uc| {
            match set {
                Some(idx) => {
                    uc.raw_frame_sets
                        .get_mut(idx)
                        .ok_or_else(|| {
                            ToFError::out_of_bounds(format!("No raw frame set {}", idx))
                        })?
                        .duty_cycle = duty_cycle
                }
                None => uc
                    .raw_frame_sets
                    .iter_mut()
                    .for_each(|rfs| rfs.duty_cycle = duty_cycle),
            }
            Ok(())
        })
    }

    /// Sets the exposure time of the exposure groups used by the modulated raw frame sets of
    /// the first frame group of `stream`.
    pub fn set_exposure_time(&mut self, exposure_time: u32, stream: StreamId) -> Result<(), ToFError> {
        let groups = self
            .modulated_raw_frame_sets(stream)?
            .into_iter()
            .map(|rfs| rfs.exposure_group_idx as usize)
            .collect::<Vec<_>>();
        self.modify(|uc| {
            groups.iter().try_for_each(|&g| {
                uc.exposure_groups
                    .get_mut(g)
                    .ok_or_else(|| no_exposure_group(g))?
                    .exposure_time = exposure_time;
                Ok(())
            })
        })
    }

    /// Sets the exposure times of all exposure groups, in exposure group order.
    pub fn set_exposure_times(&mut self, exposure_times: &[u32]) -> Result<(), ToFError> {
        if exposure_times.len() != self.exposure_groups.len() {
            return Err(ToFError::invalid_value(
                "Vector of exposure times and number of exposure groups mismatch",
            ));
        }
        self.modify(|uc| {
            uc.exposure_groups
                .iter_mut()
                .zip(exposure_times)
                .for_each(|(g, &t)| g.exposure_time = t);
            Ok(())
        })
    }

    /// Returns the exposure times in exposure group order.
    #[must_use]
    pub fn exposure_times(&self) -> Vec<u32> {
        self.exposure_groups.iter().map(|g| g.exposure_time).collect()
    }

    /// Returns the exposure time used by `set`.
    pub fn exposure_time_for_raw_frame_set(&self, set: &RawFrameSet) -> Result<u32, ToFError> {
        self.exposure_groups
            .get(set.exposure_group_idx as usize)
            .map(|g| g.exposure_time)
            .ok_or_else(|| no_exposure_group(set.exposure_group_idx as usize))
    }

    fn modulated_raw_frame_sets(&self, stream: StreamId) -> Result<Vec<&RawFrameSet>, ToFError> {
        self.raw_frame_set_indices(stream, 0)?
            .into_iter()
            .map(|idx| {
                self.raw_frame_sets.get(idx).ok_or_else(|| {
                    ToFError::out_of_bounds(format!("No raw frame set {}", idx))
                })
            })
            .filter(|rfs| rfs.as_ref().map_or(true, |rfs| rfs.is_modulated()))
            .collect()
    }

    /// Returns the exposure limits that hold for all modulated raw frame sets of `stream`.
    pub fn exposure_limits_for_stream(&self, stream: StreamId) -> Result<(u32, u32), ToFError> {
        if self.raw_frame_set_indices(stream, 0)?.is_empty() {
            return Err(ToFError::invalid_value("No exposure groups on stream"));
        }
        let limits = self
            .modulated_raw_frame_sets(stream)?
            .into_iter()
            .map(|rfs| {
                self.exposure_groups
                    .get(rfs.exposure_group_idx as usize)
                    .map(|g| g.exposure_limits)
                    .ok_or_else(|| no_exposure_group(rfs.exposure_group_idx as usize))
            })
            .try_fold((u32::MIN, u32::MAX), |acc, l| {
                l.map(|l| (acc.0.max(l.0), acc.1.min(l.1)))
            })?;
        if limits.0 > limits.1 {
            return Err(ToFError::invalid_value("Invalid exposure limits on stream"));
        }
        Ok(limits)
    }

    /// Returns the exposure limits in exposure group order.
    #[must_use]
    pub fn exposure_limits(&self) -> Vec<(u32, u32)> {
        self.exposure_groups.iter().map(|g| g.exposure_limits).collect()
    }

    /// Returns the ids of all streams.
    #[must_use]
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.streams.iter().map(|s| s.id).collect()
    }

    /// Returns the stream with the given id.
    pub fn stream(&self, id: StreamId) -> Result<&Stream, ToFError> {
        self.streams
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ToFError::invalid_value("Unknown StreamId"))
    }

    fn stream_mut(&mut self, id: StreamId) -> Result<&mut Stream, ToFError> {
        self.streams
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| ToFError::invalid_value("Unknown StreamId"))
    }

    /// Returns the raw frame set indices of frame group `group` of `stream`.
    pub fn raw_frame_set_indices(&self, stream: StreamId, group: usize) -> Result<Vec<usize>, ToFError> {
        self.stream(stream)?
            .frame_groups
            .get(group)
            .map(|g| g.raw_frame_set_indices.clone())
            .ok_or_else(|| {
                ToFError::out_of_bounds(format!("Stream {:#06X} has no frame group {}", stream, group))
            })
    }

    /// Returns the exposure group index of each raw frame set of the first frame group of `stream`.
    pub fn exposure_indices_for_stream(&self, stream: StreamId) -> Result<Vec<ExposureGroupIdx>, ToFError> {
        Ok(self
            .raw_frame_set_indices(stream, 0)?
            .into_iter()
            .map(|idx| self.raw_frame_sets[idx].exposure_group_idx)
            .collect())
    }

    /// Returns the positions in the capture sequence of the raw frames of raw frame set `set`.
    pub fn sequence_indices_for_raw_frame_set(&self, set: usize) -> Result<Vec<u16>, ToFError> {
        let rfs = self
            .raw_frame_sets
            .get(set)
            .ok_or_else(|| ToFError::out_of_bounds(format!("No raw frame set {}", set)))?;
        let first = self.raw_frame_sets[..set]
            .iter()
            .map(RawFrameSet::count_raw_frames)
            .sum::<usize>();
        Ok((first..first + rfs.count_raw_frames())
            .map(|i| i as u16)
            .collect())
    }

    /// Returns the number of raw frames of one pass through all raw frame sets.
    #[must_use]
    pub fn raw_frame_count(&self) -> usize {
        self.raw_frame_sets
            .iter()
            .map(RawFrameSet::count_raw_frames)
            .sum()
    }

    /// Returns the number of frame groups of `stream`.
    pub fn frame_group_count(&self, stream: StreamId) -> Result<usize, ToFError> {
        Ok(self.stream(stream)?.frame_groups.len())
    }

    /// Returns the distinct modulation frequencies in order of first use.
    #[must_use]
    pub fn modulation_frequencies(&self) -> Vec<Freq<u32>> {
        self.raw_frame_sets
            .iter()
            .map(|rfs| rfs.modulation_frequency)
            .unique()
            .collect()
    }

    /// Adds a stream. An `id` of zero picks an unused id.
    pub fn create_stream(&mut self, id: StreamId) -> Result<StreamId, ToFError> {
        let id = match id {
            0 => match self.streams.iter().map(|s| s.id).max() {
                None => DEFAULT_STREAM_ID,
                Some(StreamId::MAX) => {
                    return Err(ToFError::runtime("Can't allocate a StreamId"));
                }
                Some(highest) => highest + 1,
            },
            id => id,
        };
        if self.streams.iter().any(|s| s.id == id) {
            return Err(ToFError::invalid_value("Duplicate StreamId"));
        }
        self.streams.push(Stream::new(id));
        Ok(id)
    }

    /// Adds an exposure group and returns its index.
    pub fn create_exposure_group(
        &mut self,
        name: impl Into<String>,
        limits: (u32, u32),
        exposure_time: u32,
    ) -> Result<ExposureGroupIdx, ToFError> {
        let name = name.into();
        if self.exposure_groups.iter().any(|g| g.name == name) {
            return Err(ToFError::invalid_value("Duplicate exposure group"));
        }
        self.exposure_groups
            .push(ExposureGroup::new(name, limits, exposure_time));
        Ok((self.exposure_groups.len() - 1) as ExposureGroupIdx)
    }

    /// Creates a grayscale raw frame set for `group`.
    #[must_use]
    pub const fn gray_raw_frame_set(
        group: ExposureGroupIdx,
        illumination: ExposureGray,
        modulation_frequency: Freq<u32>,
    ) -> RawFrameSet {
        RawFrameSet::new(
            modulation_frequency,
            PhaseDefinition::Grayscale,
            match illumination {
                ExposureGray::On => DutyCycle::Auto,
                ExposureGray::Off => DutyCycle::Dc0,
            },
            group,
        )
    }

    /// Builds a single stream with a single clock aligned frame group from `sets`.
    pub fn construct_non_mixed(&mut self, sets: Vec<RawFrameSet>) -> Result<(), ToFError> {
        if !self.streams.is_empty() {
            return Err(ToFError::logic(
                "Calling construct_non_mixed after creating a stream",
            ));
        }
        if !self.raw_frame_sets.is_empty() {
            return Err(ToFError::logic(
                "Calling construct_non_mixed after adding raw frame sets",
            ));
        }
        let stream = self.create_stream(DEFAULT_STREAM_ID)?;
        self.construct_frame_group(stream, sets, Alignment::ClockAligned, false)
    }

    /// Appends `sets` to the use case as a frame group of `stream`.
    ///
    /// With `append_previous` the sets are added to the last frame group of the stream instead
    /// of a new one. The alignment of the sets is derived from `alignment`: a clock aligned
    /// group clock aligns its first set, stop aligned groups stop align all sets, all other
    /// sets are start aligned.
    pub fn construct_frame_group(
        &mut self,
        stream: StreamId,
        sets: Vec<RawFrameSet>,
        alignment: Alignment,
        append_previous: bool,
    ) -> Result<(), ToFError> {
        let first_idx = self.raw_frame_sets.len();
        if first_idx == 0 && alignment != Alignment::ClockAligned {
            return Err(ToFError::logic(
                "The first set of the Use Case must be CLOCK_ALIGNED",
            ));
        }
        let stream = self.stream_mut(stream)?;
        if append_previous && stream.frame_groups.is_empty() {
            return Err(ToFError::logic("No frame group to append to"));
        }
        if !append_previous {
            stream.frame_groups.push(FrameGroup::default());
        }
        let indices = first_idx..first_idx + sets.len();
        if let Some(group) = stream.frame_groups.last_mut() {
            group.raw_frame_set_indices.extend(indices);
        }
        self.raw_frame_sets
            .extend(sets.into_iter().enumerate().map(|(i, rfs)| {
                let alignment = match alignment {
                    Alignment::ClockAligned if i == 0 => Alignment::ClockAligned,
                    Alignment::StopAligned => Alignment::StopAligned,
                    Alignment::NextStopAligned => Alignment::NextStopAligned,
                    _ => Alignment::StartAligned,
                };
                rfs.with_alignment(alignment)
            }));
        Ok(())
    }
}

fn no_exposure_group(idx: usize) -> ToFError {
    ToFError::out_of_bounds(format!("No exposure group {}", idx))
}
