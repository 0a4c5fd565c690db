//! Hardware independent description of capture modes.

/// Builders of the standard use cases.
pub mod builder;
mod definition;
mod exposure_group;
mod identifier;
mod raw_frame_set;
mod status;
mod stream;

pub use definition::{
    BandwidthRequirementCategory, ExposureGray, FrameTransmissionMode, UseCaseDefinition,
    MAX_RAW_FRAMES,
};
pub use exposure_group::ExposureGroup;
pub use identifier::UseCaseIdentifier;
pub use raw_frame_set::{Alignment, DutyCycle, ExposureGroupIdx, PhaseDefinition, RawFrameSet, Ssc};
pub use status::VerificationStatus;
pub use stream::{FrameGroup, Stream, StreamId, DEFAULT_STREAM_ID};
