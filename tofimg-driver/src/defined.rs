/// Clock of the sequencer of the M2450 family in Hz.
pub const FSYSCLK: f64 = 133_333_333.3;

/// Modulation frequency in Hz used for raw frames without modulation.
///
/// It is the lowest frequency every M245x derivative can produce, which allows the longest
/// exposure times.
pub const GRAYSCALE_MODULATION_FREQUENCY: u32 = 3_152_500;

/// Maximum repeat count of a measurement block.
pub const MB_REPEAT_LIMIT: u16 = 255;

/// Returns the frequency used to time a raw frame with the given modulation frequency.
#[must_use]
pub const fn effective_frequency(modulation_frequency: u32) -> u32 {
    match modulation_frequency {
        0 => GRAYSCALE_MODULATION_FREQUENCY,
        f => f,
    }
}
