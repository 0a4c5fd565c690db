use tofimg_core::{
    error::ToFError,
    pseudodata::{word, PseudoDataInterpreter},
};

/// Position of the reconfiguration counter in the pseudo data line of the all-in-one firmware.
pub const RECONFIG_INDEX: usize = 148;

const FRAME_NUMBER: usize = 0;
const SEQUENCE: usize = 1;
const VERTICAL: usize = 2;
const TEMPERATURE_ADC: usize = 5;
const TEMPERATURE_CALIBRATION: usize = 7;

const KELVIN_OFFSET: f32 = -273.15;
const CALIBRATION_TEMPERATURE: f32 = 85.;

/// Pseudo data of the M2450 A12 running the all-in-one firmware.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct M2450A12PseudoData;

impl PseudoDataInterpreter for M2450A12PseudoData {
    fn frame_number(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        word(pseudo_data, FRAME_NUMBER)
    }

    fn reconfig_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        word(pseudo_data, RECONFIG_INDEX)
    }

    fn sequence_index(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        Ok(word(pseudo_data, SEQUENCE)? >> 7)
    }

    fn binning(&self, pseudo_data: &[u16]) -> Result<u8, ToFError> {
        Ok(((word(pseudo_data, SEQUENCE)? >> 5) & 0x3) as u8)
    }

    fn horizontal_size(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        let binning = self.binning(pseudo_data)?;
        Ok(((word(pseudo_data, SEQUENCE)? & 0x1F) << 4) >> binning)
    }

    fn vertical_size(&self, pseudo_data: &[u16]) -> Result<u16, ToFError> {
        let binning = self.binning(pseudo_data)?;
        Ok((word(pseudo_data, VERTICAL)? & 0x1FF) >> binning)
    }

    fn temperature(&self, pseudo_data: &[u16]) -> Result<f32, ToFError> {
        let adc = word(pseudo_data, TEMPERATURE_ADC)? as f32;
        let calibration = word(pseudo_data, TEMPERATURE_CALIBRATION)? as f32;
        // Linear between 0 K at ADC 2048 and 85 degC at ADC 3447 plus the calibration value.
        let k = (KELVIN_OFFSET - CALIBRATION_TEMPERATURE) / (2048. - (3447. + calibration));
        let d = KELVIN_OFFSET - 2048. * k;
        Ok(adc * k + d)
    }

    fn required_image_width(&self) -> u16 {
        RECONFIG_INDEX.max(TEMPERATURE_CALIBRATION) as u16 + 1
    }
}
