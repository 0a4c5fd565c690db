use thiserror::Error;

/// An error produced by the bridge.
#[derive(Error, Debug, PartialEq, Clone)]
#[non_exhaustive]
pub enum BridgeError {
    /// The transport failed and the firmware could not be queried for the cause.
    #[error("Possibly USB stall: {0}")]
    PossiblyUsbStall(String),
    /// The device reported a failure with a firmware defined code.
    #[error("Device detected error ({code:#06X}): {msg}")]
    DeviceDetected {
        /// Description of the failure.
        msg: String,
        /// Firmware defined error code.
        code: u32,
    },
    /// A burst access does not fit into the 16-bit register space.
    #[error("Burst of {1} registers starting at {0:#06X} exceeds the register space")]
    AddressOverflow(u16, usize),
    /// The bridge is closed.
    #[error("Bridge is closed")]
    Closed,
}
