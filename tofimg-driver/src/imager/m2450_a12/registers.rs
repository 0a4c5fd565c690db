//! Register addresses of the M2450 A12 and its all-in-one firmware.

#![allow(missing_docs)]

use bitflags::bitflags;

pub const ANAIP_GPIOMUX4: u16 = 0xB007;
pub const ANAIP_PADGPIOCFG6: u16 = 0xB014;
pub const ANAIP_PADGPIOCFG7: u16 = 0xB015;
pub const ANAIP_DPHYPLLCFG1: u16 = 0xB062;
pub const ANAIP_PSPADCFG: u16 = 0xB086;
pub const ANAIP_PSLVDSCFG: u16 = 0xB087;
pub const ANAIP_EFUSEVAL1: u16 = 0xB09E;
pub const ANAIP_DESIGNSTEP: u16 = 0xB0AD;
pub const ANAIP_SPARE: u16 = 0xB0AE;

pub const CFGCNT_S05_EXPOTIME: u16 = 0xA814;
pub const CFGCNT_S05_FRAMERATE: u16 = 0xA815;
pub const CFGCNT_S20_EXPOTIME: u16 = 0xA850;
pub const CFGCNT_S30_EXPOTIME: u16 = 0xA878;
pub const CFGCNT_S30_FRAMERATE: u16 = 0xA879;
pub const CFGCNT_S30_PS: u16 = 0xA87A;
pub const CFGCNT_S30_PLLSET: u16 = 0xA87B;
pub const CFGCNT_S31_EXPOTIME: u16 = 0xA87C;
pub const CFGCNT_STATUS: u16 = 0xA881;
pub const CFGCNT_CSICFG: u16 = 0xA882;
pub const CFGCNT_PIFCCFG: u16 = 0xA883;
pub const CFGCNT_BINCFG: u16 = 0xA885;
pub const CFGCNT_ROICMINREG: u16 = 0xA886;
pub const CFGCNT_ROICMAXREG: u16 = 0xA887;
pub const CFGCNT_ROIRMINREG: u16 = 0xA888;
pub const CFGCNT_ROIRMAXREG: u16 = 0xA889;
pub const CFGCNT_ROS1: u16 = 0xA88A;
pub const CFGCNT_IFDEL: u16 = 0xA88C;
pub const CFGCNT_CTRLSEQ: u16 = 0xA88D;
pub const CFGCNT_PSOUT: u16 = 0xA892;
pub const CFGCNT_PLLCFG1_LUT1: u16 = 0xA893;
pub const CFGCNT_PLLCFG3_LUT4: u16 = 0xA89E;

pub const ISM_EN: u16 = 0xC400;
pub const ISM_CTRL: u16 = 0xC401;
pub const ISM_MEMPAGE: u16 = 0xC402;
pub const ISM_ISMSTATE: u16 = 0xC40F;
pub const ISM_FW_RAM_VERSION_MSB: u16 = 0xBFF8;
pub const ISM_FW_RAM_VERSION_LSB: u16 = 0xBFF9;
pub const MTCU_STATUS: u16 = 0x9802;

pub const AIO_SF_ENABLE: u16 = 0xC032;
pub const AIO_MX_ENABLE: u16 = 0xC034;
pub const AIO_SSC_ENABLE: u16 = 0xC035;
pub const AIO_SSC_INIT: u16 = 0xC039;
pub const AIO_WARMUP_ENABLE: u16 = 0xC219;
pub const AIO_SSC_PLLCFG4_LUTX: u16 = 0xC24C;
pub const AIO_SSC_PLLCFG_LUT_OFFSET: u16 = 5;

/// Sequencer memory of the firmware, shared by normal and mixed mode.
pub const AIO_SEQ_START: u16 = 0xC320;
pub const AIO_MX_REPEAT_START: u16 = 0xC318;
pub const AIO_MX_MB_OFFSET: u16 = 23;
pub const AIO_MX_MAX_PARAMS: usize = 50;
pub const AIO_NR_LPFSMFR_1: u16 = 0xC3AC;
pub const AIO_NR_LPFSMFR_2: u16 = 0xC3AD;
pub const AIO_NR_PLLCFG1_LUT1: u16 = 0xC3A0;

pub const AIO_SR_TRIGGER: u16 = CFGCNT_S31_EXPOTIME;
pub const AIO_SR_RECONFIG_COUNTER: u16 = CFGCNT_S30_PLLSET;
pub const AIO_SR_RECONFIGFLAGS: u16 = CFGCNT_S30_PS;
pub const AIO_SR_NR_START: u16 = CFGCNT_S20_EXPOTIME;
pub const AIO_SR_NR_LPFSMFR_1: u16 = CFGCNT_S30_EXPOTIME;
pub const AIO_SR_NR_LPFSMFR_2: u16 = CFGCNT_S30_FRAMERATE;
pub const AIO_SR_MX_PARAMSTART: u16 = CFGCNT_S05_EXPOTIME;
pub const AIO_SR_MX_DECODESTART: u16 = CFGCNT_S05_FRAMERATE;

bitflags! {
    /// Bits of `CFGCNT_STATUS`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct SequencerStatus: u16 {
        const WRONG_ROI = 1 << 4;
        const WRONG_INTERFACE = 1 << 5;
        const IDLE = 1 << 15;
    }
}

bitflags! {
    /// Bits of `AIO_SR_RECONFIGFLAGS`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ReconfigFlags: u16 {
        const COPY_PENDING = 1 << 0;
        const PARAMS_PENDING = 1 << 1;
    }
}

bitflags! {
    /// Bits of `ISM_ISMSTATE`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IsmState: u16 {
        const ACTIVE = 1 << 14;
    }
}

bitflags! {
    /// Bits of `MTCU_STATUS`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MtcuStatus: u16 {
        const PLL_LOCK_ERROR = 1 << 2;
    }
}
