//! Module configurations and externally supplied imager configurations.

mod core_config;
mod external;

pub use core_config::{CoreConfig, CoreConfigFactory, UseCaseEntry};
pub use external::{
    ExternalConfig, SequentialRegisterHeader, TimedRegister, TimedRegisterList, UseCaseData,
};
