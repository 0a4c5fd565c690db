//! Limits of the raw frame rate imposed by the transfer bandwidth of the bridge.

use crate::usecase::{BandwidthRequirementCategory, UseCaseDefinition};

/// Raw frame rate meaning that the imager runs unthrottled.
pub const NO_FLOW_CONTROL: u16 = 0;

/// Usable payload bandwidth of a USB 2.0 bulk endpoint in bytes per second.
pub const USB2_BANDWIDTH: u32 = 35_000_000;

/// A strategy deciding the raw frame rate of a use case.
pub trait FlowControlStrategy: Send + Sync {
    /// Returns the raw frame rate in frames per second, or [`NO_FLOW_CONTROL`].
    fn raw_frame_rate(&self, use_case: &UseCaseDefinition) -> u16;
}

// GRCOV_EXCL_START
impl FlowControlStrategy for Box<dyn FlowControlStrategy> {
    fn raw_frame_rate(&self, use_case: &UseCaseDefinition) -> u16 {
        self.as_ref().raw_frame_rate(use_case)
    }
}
// GRCOV_EXCL_STOP

/// Always returns the same raw frame rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedFlowControl {
    rate: u16,
}

impl FixedFlowControl {
    /// Creates a strategy returning `rate`.
    #[must_use]
    pub const fn new(rate: u16) -> Self {
        Self { rate }
    }
}

impl FlowControlStrategy for FixedFlowControl {
    fn raw_frame_rate(&self, _: &UseCaseDefinition) -> u16 {
        self.rate
    }
}

/// Spreads the raw frames so that the transfer stays within a bandwidth.
///
/// A raw frame is the image plus one pseudo data row with two bytes per pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandwidthFlowControl {
    bytes_per_second: u32,
}

impl BandwidthFlowControl {
    /// Creates a strategy for a link with `bytes_per_second` of payload bandwidth.
    #[must_use]
    pub const fn new(bytes_per_second: u32) -> Self {
        Self { bytes_per_second }
    }
}

impl FlowControlStrategy for BandwidthFlowControl {
    fn raw_frame_rate(&self, use_case: &UseCaseDefinition) -> u16 {
        let (columns, rows) = use_case.image();
        let bytes = columns as u64 * (rows as u64 + 1) * 2;
        if bytes == 0 {
            return NO_FLOW_CONTROL;
        }
        (self.bytes_per_second as u64 / bytes).clamp(1, u16::MAX as u64) as u16
    }
}

/// Returns the flow control strategy for a bandwidth category, or `None` if the raw frames are
/// transferred as fast as the imager produces them.
#[must_use]
pub fn flow_control_for(
    category: BandwidthRequirementCategory,
) -> Option<Box<dyn FlowControlStrategy>> {
    match category {
        BandwidthRequirementCategory::NoThrottling
        | BandwidthRequirementCategory::Usb2Continuous
        | BandwidthRequirementCategory::Usb3Continuous => None,
        BandwidthRequirementCategory::Usb2Throttling => {
            Some(Box::new(BandwidthFlowControl::new(USB2_BANDWIDTH)))
        }
    }
}

/// Returns the raw frame rate for `use_case` using the strategy of its bandwidth category.
#[must_use]
pub fn raw_frame_rate(use_case: &UseCaseDefinition) -> u16 {
    flow_control_for(use_case.bandwidth_category())
        .map_or(NO_FLOW_CONTROL, |s| s.raw_frame_rate(use_case))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(NO_FLOW_CONTROL, BandwidthRequirementCategory::NoThrottling)]
    #[case(NO_FLOW_CONTROL, BandwidthRequirementCategory::Usb2Continuous)]
    #[case(NO_FLOW_CONTROL, BandwidthRequirementCategory::Usb3Continuous)]
    #[case(821, BandwidthRequirementCategory::Usb2Throttling)]
    fn by_category(#[case] expect: u16, #[case] category: BandwidthRequirementCategory) {
        let use_case = UseCaseDefinition::new("test", 5).with_bandwidth_category(category);
        assert_eq!(expect, raw_frame_rate(&use_case));
    }

    #[rstest::rstest]
    #[case(NO_FLOW_CONTROL, 0, 120)]
    #[case(1, 10_000, 10_000)]
    #[case(1732, 100, 100)]
    fn bandwidth(#[case] expect: u16, #[case] columns: u16, #[case] rows: u16) {
        let use_case = UseCaseDefinition::new("test", 5).with_image(columns, rows);
        assert_eq!(
            expect,
            BandwidthFlowControl::new(USB2_BANDWIDTH).raw_frame_rate(&use_case)
        );
    }

    #[test]
    fn fixed() {
        let strategy: Box<dyn FlowControlStrategy> = Box::new(FixedFlowControl::new(150));
        assert_eq!(150, strategy.raw_frame_rate(&UseCaseDefinition::new("test", 5)));
    }
}
