#[cfg(feature = "bridge-audit")]
#[doc(hidden)]
pub mod audit;
#[cfg(feature = "bridge-nop")]
mod nop;

#[cfg(feature = "bridge-audit")]
#[doc(hidden)]
pub use audit::{Audit, AuditOption};
#[cfg(feature = "bridge-audit")]
#[doc(hidden)]
pub use tofimg_emulator::Access;
#[cfg(feature = "bridge-nop")]
pub use nop::Nop;

pub use tofimg_core::bridge::{Bridge, BridgeCapabilities, BridgeError, NonVolatileStorage};
