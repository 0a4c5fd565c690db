#[cfg(feature = "bridge-nop")]
pub use crate::bridge::Nop;
pub use crate::{
    bridge::{Bridge, BridgeCapabilities, BridgeError},
    controller::{Controller, ControllerBuilder},
    error::CameraError,
};

pub use tofimg_core::{
    common::MHz,
    config::{CoreConfig, CoreConfigFactory, ExternalConfig},
    error::ToFError,
    pseudodata::PseudoDataInterpreter,
    usecase::{
        builder::{FourPhase, MixedXHt, UseCaseBuilder},
        ExposureGray, UseCaseDefinition, UseCaseIdentifier, VerificationStatus,
    },
};
pub use tofimg_driver::{
    imager::{flash::ImagerM2453, m2450_a12::ImagerM2450A12, ImagerComponent, ImagerState},
    ImagerDirectAccess, ImagerParameters,
};
