#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Compiles use cases into register sequences and drives the imager state machines.

/// Constants shared by the imager implementations.
pub mod defined;
mod direct_access;
/// Imager state machines.
pub mod imager;
/// Measurement blocks and the assignment of raw frames to them.
pub mod measurement;
mod params;
/// Pseudo data interpreters of the supported imagers.
pub mod pseudodata;
mod raw_frame;
/// Register tracking and access helpers.
pub mod register;
/// Generators turning measurement blocks into sequencer registers.
pub mod sequence;
/// Imager specific view of a use case.
pub mod use_case;
/// Eye safety and use case verification helpers.
pub mod verify;

pub use direct_access::ImagerDirectAccess;
pub use params::{ExternalTrigger, IlluminationPad, ImageDataTransfer, ImagerParameters};
pub use raw_frame::ImagerRawFrame;
