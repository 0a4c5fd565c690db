use serde::{Deserialize, Serialize};

/// A named exposure setting shared by index between raw frame sets.
///
/// Exposure values are in microseconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct ExposureGroup {
    /// Name, unique inside a use case.
    pub name: String,
    /// Minimum and maximum exposure time.
    pub exposure_limits: (u32, u32),
    /// Current exposure time.
    pub exposure_time: u32,
}

impl ExposureGroup {
    /// Returns `true` if the exposure time lies inside the limits.
    #[must_use]
    pub const fn is_within_limits(&self) -> bool {
        self.exposure_limits.0 <= self.exposure_time && self.exposure_time <= self.exposure_limits.1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(true, (50, 1000), 50)]
    #[case(true, (50, 1000), 1000)]
    #[case(false, (50, 1000), 49)]
    #[case(false, (50, 1000), 1001)]
    fn within_limits(#[case] expect: bool, #[case] limits: (u32, u32), #[case] time: u32) {
        assert_eq!(expect, ExposureGroup::new("gray".to_string(), limits, time).is_within_limits());
    }
}
