#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::unescaped_backticks)]

//! Core traits and types for ToF imagers.

/// The bridge between the host and the imager.
pub mod bridge;
/// Common constants and units.
pub mod common;
/// Module and external imager configurations.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Raw frame rate limits of the transfer.
pub mod flow_control;
pub mod pll;
/// Pseudo data interpretation.
pub mod pseudodata;
/// Region of interest placement.
pub mod roi;
/// Sleep strategies.
pub mod sleep;
pub mod usecase;
