use tofimg_core::error::ToFError;

use super::registers::{CFGCNT_ROS1, ISM_FW_RAM_VERSION_LSB, ISM_FW_RAM_VERSION_MSB};
use crate::register::RegisterMap;

/// Version of the all-in-one firmware the sequencer layout is written for.
pub const AIO_FIRMWARE_VERSION: u32 = 2082;

const VERSION_WORD_MASK: u16 = 0x07FF;
const VERSION_SYSTEM_MASK: u16 = !0x01FF;

const AIO_PAGE1: [(u16, u16); 14] = [
    (0xC000, 0x4D32),
    (0xC001, 0x3435),
    (0xC002, 0x0A12),
    (0xC003, 0x8100),
    (0xC004, 0x1F3C),
    (0xC005, 0x0C21),
    (0xC006, 0x7F00),
    (0xC007, 0x2E04),
    (0xC008, 0x9C0E),
    (0xC009, 0x0004),
    (0xC00A, 0x6A1D),
    (0xC00B, 0xF001),
    (ISM_FW_RAM_VERSION_MSB, (AIO_FIRMWARE_VERSION >> 11) as u16),
    (ISM_FW_RAM_VERSION_LSB, (AIO_FIRMWARE_VERSION & 0x7FF) as u16),
];

const AIO_PAGE2: [(u16, u16); 8] = [
    (0xC000, 0x1C20),
    (0xC001, 0x0E03),
    (0xC002, 0x5A80),
    (0xC003, 0x0012),
    (0xC004, 0x3B41),
    (0xC005, 0xC800),
    (0xC006, 0x0F0F),
    (0xC007, 0xF002),
];

const BASE_CONFIG: [(u16, u16); 8] = [
    (CFGCNT_ROS1, 0x0006),
    (0xB000, 0x1FFF),
    (0xB001, 0x0C05),
    (0xB002, 0x1E1E),
    (0xB003, 0x1F00),
    (0xB081, 0x0F0F),
    (0xB082, 0x0003),
    (0xB0A0, 0x8000),
];

/// Returns the imager specific registers written before the module base configuration.
#[must_use]
pub fn base_config() -> RegisterMap {
    RegisterMap::from(BASE_CONFIG)
}

/// A firmware image of the iSM, split into the two pages of its program memory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Firmware {
    /// Words of the first page, including the version words.
    pub page1: RegisterMap,
    /// Words of the second page.
    pub page2: RegisterMap,
}

impl Firmware {
    /// Returns the all-in-one firmware.
    #[must_use]
    pub fn all_in_one() -> Self {
        Self {
            page1: RegisterMap::from(AIO_PAGE1),
            page2: RegisterMap::from(AIO_PAGE2),
        }
    }

    /// Returns the version encoded in the first page.
    pub fn version(&self) -> Result<u32, ToFError> {
        let word = |address| {
            self.page1
                .get(&address)
                .map(|v| v & VERSION_WORD_MASK)
                .ok_or_else(|| ToFError::DataNotFound("firmware version is missing".to_string()))
        };
        let msb = word(ISM_FW_RAM_VERSION_MSB)?;
        let lsb = word(ISM_FW_RAM_VERSION_LSB)?;
        if msb & VERSION_SYSTEM_MASK != 0 {
            return Err(ToFError::runtime("firmware version system not supported"));
        }
        Ok(((msb as u32) << 11) + lsb as u32)
    }
}
