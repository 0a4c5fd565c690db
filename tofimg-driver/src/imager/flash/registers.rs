//! Register addresses of the M2453 family.

pub const PIXMEM: u16 = 0x0000;
pub const CFGCNT: u16 = 0x9000;

pub const CFGCNT_S00_EXPOTIME: u16 = 0x9000;
pub const CFGCNT_S01_EXPOTIME: u16 = 0x9002;
pub const CFGCNT_FLAGS: u16 = 0x9402;
pub const SEQUENCE_ENTRIES: usize = 64;

pub const SPICFG: u16 = 0xA087;
pub const SPIWRADDR: u16 = 0xA088;
pub const SPIRADDR: u16 = 0xA089;
pub const SPILEN: u16 = 0xA08A;
pub const SPITRIG: u16 = 0xA08B;
pub const SPISTATUS: u16 = 0xA08C;

pub const ANAIP_EFUSEVAL1: u16 = 0xA096;
pub const ANAIP_DESIGNSTEP: u16 = 0xA0A5;

bitflags::bitflags! {
    /// Bits of `CFGCNT_FLAGS`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ConfigFlags: u16 {
        const CONFIG_CHANGED = 1 << 0;
        const USE_CASE_CHANGED = 1 << 1;
    }
}

/// `SPICFG` value enabling the bus at a eighth of the system clock.
pub const SPICFG_ENABLE_DIV8: u16 = 1 << 14 | 2;
/// `SPITRIG` value starting a read from the flash.
pub const SPITRIG_READ: u16 = 2;
/// `SPISTATUS` value of a finished transfer.
pub const SPISTATUS_DONE: u16 = 1;
/// Read command of the flash.
pub const FLASH_READ_COMMAND: u16 = 0x03;
/// `SPILEN` bits enabling sampling of the data line.
pub const SPILEN_READ_ENABLE: u16 = 0x07 << 13;
/// Bits of `SPILEN` holding the byte count minus one.
pub const SPILEN_MASK: u16 = 0x01FF;
