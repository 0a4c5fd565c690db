mod assignment;
mod timings;

pub use assignment::{max_safe_reconfig_time_ms, measurement_block_sizes, RawFrameAssignment};
pub use timings::generate_raw_frame_timings;

use serde::{Deserialize, Serialize};

use crate::use_case::ImagerUseCaseDefinition;

/// Register settings of one raw frame in a measurement block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceEntry {
    /// Exposure register value.
    pub exposure: u16,
    /// Frame rate counter.
    pub frame_rate: u16,
    /// Phase shift and illumination setting.
    pub phase_shift: u16,
    /// Index of the PLL look-up table entry.
    pub pll_set: u16,
    /// The raw frame follows its predecessor without waiting for the frame rate counter.
    pub fr_val_eq_zero: bool,
}

/// A group of sequence entries the sequencer runs, possibly repeated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementBlock {
    /// Entries in capture order.
    pub sequence: Vec<SequenceEntry>,
    /// Capacity of the block.
    pub max_sequence_length: usize,
    /// Number of times the block runs.
    pub cycles: u16,
    /// Frame rate counter of the whole block, zero if the imager has none.
    pub frame_rate_counter: u32,
    /// The imager can be reconfigured after this block.
    pub safe_for_reconfig: bool,
}

impl MeasurementBlock {
    /// Creates an empty block running once.
    #[must_use]
    pub const fn new(max_sequence_length: usize) -> Self {
        Self {
            sequence: Vec::new(),
            max_sequence_length,
            cycles: 1,
            frame_rate_counter: 0,
            safe_for_reconfig: false,
        }
    }
}

/// The time a raw frame takes and whether the imager can capture it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawFrameTime {
    /// Duration in seconds.
    pub time: f64,
    /// `false` if the raw frame does not fit into the time budget.
    pub feasible: bool,
}

/// Imager specific timing of a single raw frame.
pub trait RawFrameTiming {
    /// Returns the time from the start of a raw frame until the next one can start.
    ///
    /// `first` marks the first raw frame of a linked run, which needs the full sequencer
    /// setup. If the use case has a raw frame rate the time is stretched to its period and is
    /// infeasible if it exceeds the period.
    fn raw_frame_time(
        &self,
        use_case: &ImagerUseCaseDefinition,
        exposure_time: u32,
        modulation_frequency: u32,
        first: bool,
    ) -> RawFrameTime;
}
