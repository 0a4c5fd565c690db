use tofimg_core::{
    error::ToFError,
    pseudodata::{word, PseudoDataInterpreter},
};

const RECONFIG_INDEX: usize = 2;
const FRAME_NUMBER: usize = 3;
const SEQUENCE: usize = 4;
const ROI_COLUMN_MIN: usize = 22;
const ROI_COLUMN_MAX: usize = 23;
const ROI_ROW_MIN: usize = 24;
const ROI_ROW_MAX: usize = 25;
const TEMPERATURE_LAST: u16 = 48;

/// Pseudo data of the flash defined M2453 family.
///
/// The image size is derived from the region of interest registers mirrored into the line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct M2453PseudoData;

fn span(pseudo_data: &[u16], min: usize, max: usize) -> Result<u16, ToFError> {
    Ok(1 + word(pseudo_data, max)?.wrapping_sub(word(pseudo_data, min)?))
}

impl PseudoDataInterpreter for M2453PseudoData {
    fn frame_number(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        word(pseudo_data, FRAME_NUMBER)
    }

    fn reconfig_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        word(pseudo_data, RECONFIG_INDEX)
    }

    fn sequence_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        word(pseudo_data, SEQUENCE)
    }

    fn horizontal_size(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        span(pseudo_data, ROI_COLUMN_MIN, ROI_COLUMN_MAX)
    }

    fn vertical_size(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        span(pseudo_data, ROI_ROW_MIN, ROI_ROW_MAX)
    }

    fn required_image_width(&self) -> u16 {
        TEMPERATURE_LAST + 1
    }
}
