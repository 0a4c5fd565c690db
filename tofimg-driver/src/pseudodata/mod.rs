mod m2450_a12;
mod m2453;

pub use m2450_a12::{M2450A12PseudoData, RECONFIG_INDEX};
pub use m2453::M2453PseudoData;
