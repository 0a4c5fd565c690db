mod freq;

pub use freq::*;

/// The number of microseconds per second.
pub const MICROS_PER_SEC: f64 = 1e6;
