use thiserror::Error;

use crate::bridge::BridgeError;

/// The error type of the imager core and drivers.
///
/// Verification failures are not errors; they are reported as [`VerificationStatus`].
///
/// [`VerificationStatus`]: crate::usecase::VerificationStatus
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum ToFError {
    /// A contract between caller and callee was violated.
    #[error("Logic error: {0}")]
    Logic(String),
    /// A supplied parameter is out of its valid domain.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// The hardware or the firmware signalled a failure.
    #[error("Runtime error: {0}")]
    Runtime(String),
    /// The operation is not allowed in the current state.
    #[error("Wrong state: {0}")]
    WrongState(String),
    /// An expected status was not reached in time.
    #[error("Timeout: {0}")]
    Timeout(String),
    /// A value or an index is outside of the representable range.
    #[error("Out of bounds: {0}")]
    OutOfBounds(String),
    /// Data a caller should have checked for is absent.
    #[error("Data not found: {0}")]
    DataNotFound(String),
    /// The operation is not supported by this imager.
    #[error("Not implemented: {0}")]
    NotImplemented(String),
    /// Error in the bridge.
    #[error("{0}")]
    Bridge(#[from] BridgeError),
}

impl ToFError {
    #[doc(hidden)]
    pub fn logic(msg: impl Into<String>) -> Self {
        Self::Logic(msg.into())
    }

    #[doc(hidden)]
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    #[doc(hidden)]
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    #[doc(hidden)]
    pub fn wrong_state(msg: impl Into<String>) -> Self {
        Self::WrongState(msg.into())
    }

    #[doc(hidden)]
    pub fn out_of_bounds(msg: impl Into<String>) -> Self {
        Self::OutOfBounds(msg.into())
    }

    /// Returns the firmware defined error code if the device reported one.
    #[must_use]
    pub const fn device_code(&self) -> Option<u32> {
        match self {
            Self::Bridge(BridgeError::DeviceDetected { code, .. }) => Some(*code),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case("Logic error: nullref", ToFError::logic("nullref"))]
    #[case("Invalid value: too many exposure times", ToFError::invalid_value("too many exposure times"))]
    #[case("Wrong state: imager is not capturing", ToFError::wrong_state("imager is not capturing"))]
    #[case("Possibly USB stall: endpoint halted", ToFError::from(BridgeError::PossiblyUsbStall("endpoint halted".to_string())))]
    fn display(#[case] expect: &str, #[case] err: ToFError) {
        assert_eq!(expect, err.to_string());
    }

    #[rstest::rstest]
    #[case(Some(0x21), BridgeError::DeviceDetected { msg: "spi".to_string(), code: 0x21 }.into())]
    #[case(None, BridgeError::PossiblyUsbStall("stall".to_string()).into())]
    #[case(None, ToFError::runtime("mtcu is idle"))]
    fn device_code(#[case] expect: Option<u32>, #[case] err: ToFError) {
        assert_eq!(expect, err.device_code());
    }
}
