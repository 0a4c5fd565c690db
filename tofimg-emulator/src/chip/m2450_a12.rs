use std::collections::{BTreeMap, BTreeSet};

use tofimg_driver::{imager::m2450_a12::registers::*, sequence::SEQ_IDX_OFFSET};

use super::{write_serial, ChipModel};
use crate::RegisterFile;

const DESIGN_STEP: u16 = 0x0A12;
const DEFAULT_SERIAL: [u16; 4] = [0x0A50, 0x2021, 0x0815, 0x4711];
const START_TRIGGER: u16 = 1;
const ISM_ENABLE: u16 = 1;
const RECONFIG_COUNTER_MASK: u16 = 0x0FFF;

/// The M2450 A12 running the all-in-one firmware.
///
/// The sequencer starts when the iSM is enabled while the trigger register holds the start
/// trigger and stops when the trigger is cleared. Reconfigurations of a running normal mode
/// sequence copy the shadow registers written since the last transfer into the sequencer
/// memory, clear the flags and advance the reconfiguration counter.
#[derive(Clone, Debug)]
pub struct M2450A12Chip {
    design_step: u16,
    serial: [u16; 4],
    pll_lock_error: bool,
    reconfig_stalled: bool,
    running: bool,
    frames: u64,
    shadowed: BTreeSet<u16>,
    program: BTreeMap<(u16, u16), u16>,
}

impl Default for M2450A12Chip {
    fn default() -> Self {
        Self::new()
    }
}

impl M2450A12Chip {
    /// Creates an A12 with a 38k sensor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            design_step: DESIGN_STEP,
            serial: DEFAULT_SERIAL,
            pll_lock_error: false,
            reconfig_stalled: false,
            running: false,
            frames: 0,
            shadowed: BTreeSet::new(),
            program: BTreeMap::new(),
        }
    }

    /// Reports `design_step` instead of the A12 revision.
    #[must_use]
    pub const fn with_design_step(mut self, design_step: u16) -> Self {
        self.design_step = design_step;
        self
    }

    /// Sets the fuse words read as serial number.
    #[must_use]
    pub const fn with_serial(mut self, serial: [u16; 4]) -> Self {
        self.serial = serial;
        self
    }

    /// Lets the modulation PLL fail to lock whenever the sequencer starts.
    #[must_use]
    pub const fn with_pll_lock_error(mut self) -> Self {
        self.pll_lock_error = true;
        self
    }

    /// Holds reconfiguration requests pending instead of applying them.
    ///
    /// A pending request is applied by the next [`ChipModel::frame`] after the stall is lifted.
    pub fn set_reconfig_stalled(&mut self, stalled: bool) {
        self.reconfig_stalled = stalled;
    }

    /// Returns the number of frames captured since power-up.
    #[must_use]
    pub const fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns a word of the iSM program memory.
    #[must_use]
    pub fn program_word(&self, page: u16, address: u16) -> Option<u16> {
        self.program.get(&(page, address)).copied()
    }

    fn start(&mut self, regs: &mut RegisterFile) {
        self.running = true;
        regs.clear_bits(CFGCNT_STATUS, SequencerStatus::IDLE.bits());
        if self.pll_lock_error {
            regs.set_bits(MTCU_STATUS, MtcuStatus::PLL_LOCK_ERROR.bits());
        }
        tracing::debug!(
            "sequencer started in {} mode",
            if regs.read(AIO_MX_ENABLE) == 0 {
                "normal"
            } else {
                "mixed"
            }
        );
    }

    fn stop(&mut self, regs: &mut RegisterFile) {
        if self.running {
            tracing::debug!("sequencer stopped after {} frames", self.frames);
        }
        self.running = false;
        regs.set_bits(CFGCNT_STATUS, SequencerStatus::IDLE.bits());
    }

    fn apply_reconfig(&mut self, regs: &mut RegisterFile) {
        let shadowed = std::mem::take(&mut self.shadowed);
        if regs.read(AIO_MX_ENABLE) == 0 {
            shadowed
                .into_iter()
                .for_each(|shadow| regs.write(sequence_address(shadow), regs.read(shadow)));
        }
        regs.write(AIO_SR_RECONFIGFLAGS, 0);
        let counter = regs.read(AIO_SR_RECONFIG_COUNTER);
        regs.write(
            AIO_SR_RECONFIG_COUNTER,
            counter.wrapping_add(1) & RECONFIG_COUNTER_MASK,
        );
        tracing::trace!("reconfiguration {:#05X} applied", counter);
    }
}

/// Maps a normal mode shadow register to the sequencer register it is copied to.
fn sequence_address(shadow: u16) -> u16 {
    match shadow {
        AIO_SR_NR_LPFSMFR_1 => AIO_NR_LPFSMFR_1,
        AIO_SR_NR_LPFSMFR_2 => AIO_NR_LPFSMFR_2,
        _ => {
            let offset = shadow - AIO_SR_NR_START;
            AIO_SEQ_START + offset / 2 * SEQ_IDX_OFFSET + offset % 2
        }
    }
}

impl ChipModel for M2450A12Chip {
    fn name(&self) -> &'static str {
        "M2450 A12"
    }

    fn power_up(&mut self, regs: &mut RegisterFile) {
        regs.clear();
        regs.write(ANAIP_DESIGNSTEP, self.design_step);
        write_serial(regs, ANAIP_EFUSEVAL1, &self.serial);
        regs.write(CFGCNT_STATUS, SequencerStatus::IDLE.bits());
        self.running = false;
        self.frames = 0;
        self.shadowed.clear();
        self.program.clear();
    }

    fn write(&mut self, regs: &mut RegisterFile, address: u16, value: u16) {
        let page = regs.read(ISM_MEMPAGE);
        if page != 0 && !(ISM_EN..=ISM_ISMSTATE).contains(&address) {
            self.program.insert((page, address), value);
            return;
        }
        regs.write(address, value);
        match address {
            ISM_EN if value == ISM_ENABLE && regs.read(AIO_SR_TRIGGER) == START_TRIGGER => {
                self.start(regs)
            }
            AIO_SR_TRIGGER if value != START_TRIGGER => self.stop(regs),
            AIO_SR_RECONFIGFLAGS if value != 0 && self.running && !self.reconfig_stalled => {
                self.apply_reconfig(regs)
            }
            _ if (AIO_SR_NR_START..AIO_SR_RECONFIGFLAGS).contains(&address) => {
                self.shadowed.insert(address);
            }
            _ => {}
        }
    }

    fn frame(&mut self, regs: &mut RegisterFile) {
        if !self.running {
            return;
        }
        self.frames += 1;
        if regs.read(AIO_SR_RECONFIGFLAGS) != 0 && !self.reconfig_stalled {
            self.apply_reconfig(regs);
        }
    }

    fn is_capturing(&self) -> bool {
        self.running
    }
}
