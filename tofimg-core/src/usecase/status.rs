use serde::{Deserialize, Serialize};

/// The outcome of verifying a use case against an imager.
///
/// A use case that fails verification is not a defect of the caller, so the outcome is a value
/// and not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[non_exhaustive]
pub enum VerificationStatus {
    /// The use case can be executed.
    #[display("success")]
    Success,
    /// The use case violates its own structural invariants.
    #[display("malformed use case definition")]
    Definition,
    /// The measurement blocks do not fit into the sequencer.
    #[display("sequencer capacity exceeded")]
    Sequencer,
    /// An exposure time does not fit into the frame time budget or is not representable.
    #[display("invalid exposure time")]
    ExposureTime,
    /// The region of interest does not fit onto the sensor.
    #[display("invalid region")]
    Region,
    /// A modulation frequency cannot be produced by the PLL.
    #[display("invalid modulation frequency")]
    ModulationFrequency,
    /// The spread spectrum parameters cannot be applied.
    #[display("invalid spread spectrum settings")]
    Ssc,
    /// The frame rate is not achievable.
    #[display("invalid frame rate")]
    Framerate,
    /// A phase definition or a duty cycle is not supported.
    #[display("invalid phase")]
    Phase,
    /// The emitted optical energy exceeds the eye-safety limit.
    #[display("eye-safety limit exceeded")]
    EyeSafety,
    /// The use case is not known to a flash-defined imager.
    #[display("unknown use case identifier")]
    UseCaseIdentifier,
    /// The flash location of the use case is not addressable.
    #[display("invalid flash configuration")]
    FlashConfig,
    /// The stream layout is not supported.
    #[display("invalid stream layout")]
    Stream,
}

impl VerificationStatus {
    /// Returns `true` for [`VerificationStatus::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}
