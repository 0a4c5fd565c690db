#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

//! Control of ToF camera modules.
//!
//! A [`Controller`] owns an imager and the use cases of the camera module built around it. The
//! imager is reached through a [`Bridge`](bridge::Bridge).

pub mod bridge;
pub mod controller;
pub mod error;
pub mod prelude;

pub use tofimg_core as core;
pub use tofimg_driver as driver;

pub use controller::Controller;
