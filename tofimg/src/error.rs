use thiserror::Error;

use tofimg_core::{bridge::BridgeCapabilities, error::ToFError, usecase::VerificationStatus};

/// Errors of a [`Controller`](crate::Controller).
#[derive(Error, Debug, PartialEq)]
pub enum CameraError {
    #[error("Use case not found: {0}")]
    UseCaseNotFound(String),
    #[error("Use case rejected: {0}")]
    VerificationFailed(VerificationStatus),
    #[error("Bridge can not drive an imager, capabilities: {0:?}")]
    UnsupportedBridge(BridgeCapabilities),
    #[error("No external configuration available")]
    ExternalConfigMissing,
    #[error("Controller is closed")]
    Closed,
    #[error("{0}")]
    Internal(ToFError),
}

impl From<ToFError> for CameraError {
    fn from(e: ToFError) -> Self {
        CameraError::Internal(e)
    }
}

impl From<tofimg_core::bridge::BridgeError> for CameraError {
    fn from(e: tofimg_core::bridge::BridgeError) -> Self {
        CameraError::Internal(e.into())
    }
}
