use crate::{
    error::ToFError,
    usecase::{UseCaseDefinition, VerificationStatus},
};

/// Places the region of interest of a use case around the optical center of the lens.
///
/// The design center is the lens center of the module design; the offset is the per device
/// deviation found during calibration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoiLensCenter {
    design_center: (u16, u16),
    offset: (i16, i16),
}

impl RoiLensCenter {
    /// Creates a lens center without offset.
    #[must_use]
    pub const fn new(column: u16, row: u16) -> Self {
        Self {
            design_center: (column, row),
            offset: (0, 0),
        }
    }

    /// Sets the calibrated offset of the lens center.
    pub fn set_lens_offset(&mut self, column: i16, row: i16) {
        self.offset = (column, row);
    }

    /// Returns the lens center including the offset.
    #[must_use]
    pub const fn lens_center(&self) -> (i32, i32) {
        (
            self.design_center.0 as i32 + self.offset.0 as i32,
            self.design_center.1 as i32 + self.offset.1 as i32,
        )
    }

    fn corner(&self, use_case: &UseCaseDefinition) -> Option<(u16, u16)> {
        let (columns, rows) = use_case.image();
        let (c, r) = self.lens_center();
        let c = u16::try_from(c - columns as i32 / 2).ok()?;
        let r = u16::try_from(r - rows as i32 / 2).ok()?;
        Some((c, r))
    }

    /// Returns [`VerificationStatus::Region`] if the image of `use_case` does not fit on the
    /// sensor when centered on the lens.
    ///
    /// The upper limits of the sensor are checked by the imager.
    #[must_use]
    pub fn verify_use_case(&self, use_case: &UseCaseDefinition) -> VerificationStatus {
        match self.corner(use_case) {
            Some(_) => VerificationStatus::Success,
            None => VerificationStatus::Region,
        }
    }

    /// Returns the top-left corner `(column, row)` of the region of interest.
    pub fn roi_corner(&self, use_case: &UseCaseDefinition) -> Result<(u16, u16), ToFError> {
        self.corner(use_case).ok_or_else(|| {
            ToFError::logic(format!(
                "Image of {:?} does not fit around lens center {:?}",
                use_case.image(),
                self.lens_center()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENSOR: (u16, u16) = (160, 96);
    const SMALLER: (u16, u16) = (96, 40);

    fn use_case(image: (u16, u16)) -> UseCaseDefinition {
        UseCaseDefinition::new("FourPhase", 5).with_image(image.0, image.1)
    }

    #[rstest::rstest]
    #[case(Some((0, 0)), (0, 0), SENSOR)]
    #[case(Some((32, 28)), (0, 0), SMALLER)]
    #[case(None, (-1, 1), SENSOR)]
    #[case(Some((31, 29)), (-1, 1), SMALLER)]
    #[case(None, (1, -1), SENSOR)]
    #[case(Some((33, 27)), (1, -1), SMALLER)]
    #[case(Some((1, 1)), (1, 1), SENSOR)]
    #[case(Some((33, 29)), (1, 1), SMALLER)]
    fn corner(#[case] expect: Option<(u16, u16)>, #[case] offset: (i16, i16), #[case] image: (u16, u16)) {
        let mut lens = RoiLensCenter::new(80, 48);
        lens.set_lens_offset(offset.0, offset.1);
        let use_case = use_case(image);

        match expect {
            Some(corner) => {
                assert_eq!(VerificationStatus::Success, lens.verify_use_case(&use_case));
                assert_eq!(Ok(corner), lens.roi_corner(&use_case));
            }
            None => {
                assert_eq!(VerificationStatus::Region, lens.verify_use_case(&use_case));
                assert!(lens.roi_corner(&use_case).is_err());
            }
        }
    }
}
