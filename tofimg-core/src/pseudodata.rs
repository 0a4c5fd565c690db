//! Interpretation of the pseudo data line the imager prepends to every raw frame.

use crate::error::ToFError;

/// Frame counters and reconfiguration indices are 12-bit values.
pub const FRAME_COUNTER_MASK: u16 = 0x0FFF;

/// Returns the frame number `n` frames after `base`.
#[must_use]
pub const fn following_frame_number(base: u16, n: u16) -> u16 {
    base.wrapping_add(n) & FRAME_COUNTER_MASK
}

/// Returns `true` if `n` is a frame number after `base`.
///
/// A frame is considered later if it is less than half the counter range ahead of `base`.
#[must_use]
pub const fn is_greater_frame(base: u16, n: u16) -> bool {
    n != base && (n.wrapping_sub(base) & FRAME_COUNTER_MASK) < 0x0800
}

/// Returns the number of frames from `lhs` forward to `rhs`.
#[must_use]
pub const fn frame_number_fwd_distance(lhs: u16, rhs: u16) -> u16 {
    rhs.wrapping_sub(lhs) & FRAME_COUNTER_MASK
}

/// Returns word `idx` of a pseudo data line.
pub fn word(pseudo_data: &[u16], idx: usize) -> Result<u16, ToFError> {
    pseudo_data.get(idx).copied().ok_or_else(|| {
        ToFError::OutOfBounds(format!(
            "pseudo data has {} words, word {} requested",
            pseudo_data.len(),
            idx
        ))
    })
}

/// Reads frame metadata out of the pseudo data line of one imager family.
///
/// The frame counter arithmetic defaults to 12-bit wraparound.
pub trait PseudoDataInterpreter: Send + Sync {
    /// Returns the frame counter.
    fn frame_number(&self, pseudo_data: &[u16]) -> Result<u16, ToFError>;

    /// Returns the index of the configuration the frame was captured with.
    fn reconfig_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError>;

    /// Returns the position of the raw frame in the measurement sequence.
    fn sequence_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError>;

    /// Returns the binning exponent.
    fn binning(&self, _pseudo_data: &[u16]) -> Result<u8, ToFError> {
        Ok(0)
    }

    /// Returns the number of columns of the frame.
    fn horizontal_size(&self, _pseudo_data: &[u16]) -> Result<u16, ToFError> {
        Err(ToFError::NotImplemented(
            "horizontal size is not part of the pseudo data".to_string(),
        ))
    }

    /// Returns the number of rows of the frame.
    fn vertical_size(&self, _pseudo_data: &[u16]) -> Result<u16, ToFError> {
        Err(ToFError::NotImplemented(
            "vertical size is not part of the pseudo data".to_string(),
        ))
    }

    /// Returns the imager temperature in degrees Celsius.
    fn temperature(&self, _pseudo_data: &[u16]) -> Result<f32, ToFError> {
        Err(ToFError::NotImplemented(
            "imager temperature is not part of the pseudo data".to_string(),
        ))
    }

    /// Returns the minimum number of words of a row that holds the pseudo data.
    fn required_image_width(&self) -> u16;

    /// See [`following_frame_number`].
    fn following_frame_number(&self, base: u16, n: u16) -> u16 {
        following_frame_number(base, n)
    }

    /// See [`is_greater_frame`].
    fn is_greater_frame(&self, base: u16, n: u16) -> bool {
        is_greater_frame(base, n)
    }

    /// See [`frame_number_fwd_distance`].
    fn frame_number_fwd_distance(&self, lhs: u16, rhs: u16) -> u16 {
        frame_number_fwd_distance(lhs, rhs)
    }
}

// GRCOV_EXCL_START
impl PseudoDataInterpreter for Box<dyn PseudoDataInterpreter> {
    fn frame_number(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        self.as_ref().frame_number(pseudo_data)
    }

    fn reconfig_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        self.as_ref().reconfig_index(pseudo_data)
    }

    fn sequence_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        self.as_ref().sequence_index(pseudo_data)
    }

    fn binning(&self, pseudo_data: &[u16]) -> Result<u8, ToFError> {
        self.as_ref().binning(pseudo_data)
    }

    fn horizontal_size(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        self.as_ref().horizontal_size(pseudo_data)
    }

    fn vertical_size(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        self.as_ref().vertical_size(pseudo_data)
    }

    fn temperature(&self, pseudo_data: &[u16]) -> Result<f32, ToFError> {
        self.as_ref().temperature(pseudo_data)
    }

    fn required_image_width(&self) -> u16 {
        self.as_ref().required_image_width()
    }

    fn following_frame_number(&self, base: u16, n: u16) -> u16 {
        self.as_ref().following_frame_number(base, n)
    }

    fn is_greater_frame(&self, base: u16, n: u16) -> bool {
        self.as_ref().is_greater_frame(base, n)
    }

    fn frame_number_fwd_distance(&self, lhs: u16, rhs: u16) -> u16 {
        self.as_ref().frame_number_fwd_distance(lhs, rhs)
    }
}
// GRCOV_EXCL_STOP
