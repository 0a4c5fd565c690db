mod firmware;
mod phase;
pub mod registers;
mod timing;

pub use firmware::{base_config, Firmware, AIO_FIRMWARE_VERSION};
pub use phase::{phase_shift, GRAYSCALE_BIT};
pub use timing::{M2450Timing, ReadoutDelays};

use std::{
    collections::{BTreeMap, BTreeSet},
    time::{Duration, Instant},
};

use tofimg_core::{
    bridge::Bridge,
    error::ToFError,
    flow_control,
    pll::{DphyPllM2450A12, ModPllM2450A12, PllStrategy},
    pseudodata::PseudoDataInterpreter,
    roi::RoiLensCenter,
    usecase::{DutyCycle, UseCaseDefinition, VerificationStatus},
};

use registers::*;

use super::{adapt_use_case, wrong_state, DesignStepInfo, ImagerComponent, ImagerState};
use crate::{
    defined::FSYSCLK,
    measurement::{
        generate_raw_frame_timings, max_safe_reconfig_time_ms, measurement_block_sizes,
        MeasurementBlock, RawFrameAssignment, RawFrameTiming,
    },
    pseudodata::{M2450A12PseudoData, RECONFIG_INDEX},
    register::{consecutive_runs, RegisterAccess, RegisterMap, RegisterTracker},
    sequence::{
        MixedModeGenerator, NormalModeGenerator, SequenceGenerator, MIXED_MODE_BLOCKS,
        MIXED_MODE_CAPACITY, NORMAL_MODE_CAPACITY,
    },
    use_case::ImagerUseCaseDefinition,
    verify::{verify_eye_safety, EyeSafetyLimit},
    ExternalTrigger, IlluminationPad, ImageDataTransfer, ImagerParameters,
};

const DESIGN_STEP: u16 = 0x0A12;
const DEFAULT_SYSTEM_FREQUENCY: u32 = 26_000_000;
const SYSTEM_FREQUENCY_RANGE: std::ops::RangeInclusive<u32> = 10_000_000..=35_000_000;
const SYSTEM_FREQUENCY_STEP: u32 = 100_000;

/// The modulation PLL runs at four times the illumination frequency.
const CLKDIV: u32 = 4;
const MODPLL_LUT_COUNT: u16 = 4;
const LUT_IDX_OFFSET: u16 = 3;

const SENSOR_LIMITS: (u16, u16) = (352, 288);
const SENSOR_LIMITS_19K: (u16, u16) = (176, 121);
const EFUSE_19K: u16 = 1 << 2;

const MIN_EXPOSURE_NORMAL_MODE: u32 = 27;

const START_TRIGGER: u16 = 1;
const END_TRIGGER: u16 = 0;
const ANAIP_SPARE_DEFAULT: u16 = 0xEF00;

/// The M2450 A12 running the all-in-one firmware.
///
/// The imager compiles use cases into the sequencer memory of the firmware. While capturing,
/// exposure times and frame rates are changed through the shadow registers that the firmware
/// copies at the next safe point of the sequence.
pub struct ImagerM2450A12<B: Bridge> {
    bridge: B,
    params: ImagerParameters,
    firmware: Firmware,
    lens_center: Option<RoiLensCenter>,
    mod_pll: ModPllM2450A12,
    tracker: RegisterTracker,
    state: ImagerState,
    trigger: ExternalTrigger,
    limits: (u16, u16),
    lut: BTreeMap<u32, u16>,
    mixed_mode: bool,
    generator: Box<dyn SequenceGenerator>,
    blocks: Vec<MeasurementBlock>,
    assignment: RawFrameAssignment,
    times: Vec<f64>,
    prepared: Option<ImagerUseCaseDefinition>,
    executing: Option<ImagerUseCaseDefinition>,
    last_reconfig_index: u16,
    last_stop: Option<Instant>,
    active_tail: Duration,
    executed_tail: Duration,
}

impl<B: Bridge> ImagerM2450A12<B> {
    /// Creates the imager after checking that `params` describe a module it can drive.
    pub fn new(bridge: B, params: ImagerParameters) -> Result<Self, ToFError> {
        let system_frequency = params.system_frequency();
        if !SYSTEM_FREQUENCY_RANGE.contains(&system_frequency)
            || system_frequency % SYSTEM_FREQUENCY_STEP != 0
        {
            return Err(ToFError::out_of_bounds(
                "the imager does not support camera modules with this system frequency",
            ));
        }
        if params.interface() == ImageDataTransfer::Pif && params.use_superframe() {
            return Err(ToFError::invalid_value(
                "Superframes can only be used with CSI2",
            ));
        }
        if params.illumination_pad() == IlluminationPad::SeN {
            return Err(ToFError::invalid_value(
                "The specified illumination pad is not supported",
            ));
        }
        if params.illumination_pad() == IlluminationPad::Lvds
            && params.duty_cycle() != DutyCycle::Dc50
        {
            return Err(ToFError::invalid_value(
                "The specified dutycycle is not supported for LVDS",
            ));
        }
        if !matches!(
            params.duty_cycle(),
            DutyCycle::Dc0
                | DutyCycle::Dc25
                | DutyCycle::Dc25Dep
                | DutyCycle::Dc37_5
                | DutyCycle::Dc37_5Dep
                | DutyCycle::Dc50
        ) {
            return Err(ToFError::invalid_value(
                "The specified dutycycle is not supported",
            ));
        }

        Ok(Self {
            bridge,
            mod_pll: ModPllM2450A12::new(system_frequency),
            firmware: Firmware::all_in_one(),
            lens_center: None,
            tracker: RegisterTracker::new(),
            state: ImagerState::Virgin,
            trigger: ExternalTrigger::I2c,
            limits: SENSOR_LIMITS,
            lut: BTreeMap::new(),
            mixed_mode: false,
            generator: Box::new(NormalModeGenerator),
            blocks: Vec::new(),
            assignment: RawFrameAssignment::default(),
            times: Vec::new(),
            prepared: None,
            executing: None,
            last_reconfig_index: 0,
            last_stop: None,
            active_tail: Duration::ZERO,
            executed_tail: Duration::ZERO,
            params,
        })
    }

    /// Centers the region of interest of every use case on `lens_center`.
    #[must_use]
    pub fn with_lens_center(mut self, lens_center: RoiLensCenter) -> Self {
        self.lens_center = Some(lens_center);
        self
    }

    /// Replaces the firmware loaded by [`ImagerComponent::initialize`].
    #[must_use]
    pub fn with_firmware(mut self, firmware: Firmware) -> Self {
        self.firmware = firmware;
        self
    }

    /// Returns the bridge.
    #[must_use]
    pub const fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Returns the bridge mutably.
    ///
    /// Registers written through it are not tracked.
    #[must_use]
    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    /// Returns the use case the sequencer runs, or runs next after a start.
    #[must_use]
    pub fn executing_use_case(&self) -> Option<&ImagerUseCaseDefinition> {
        match self.state {
            ImagerState::Capturing => self.executing.as_ref(),
            _ => self.prepared.as_ref(),
        }
    }

    /// Returns the longest time between two points at which a reconfiguration is applied.
    #[must_use]
    pub fn max_safe_reconfig_time_ms(&self) -> u32 {
        max_safe_reconfig_time_ms(&self.blocks, &self.assignment, &self.times)
    }

    fn timing(&self) -> M2450Timing {
        M2450Timing::new(
            self.params.interface(),
            ReadoutDelays::from_registers(&self.tracker),
        )
    }

    fn measurement_blocks(mixed_mode: bool) -> Vec<MeasurementBlock> {
        if mixed_mode {
            vec![MeasurementBlock::new(MIXED_MODE_CAPACITY); MIXED_MODE_BLOCKS]
        } else {
            vec![MeasurementBlock::new(NORMAL_MODE_CAPACITY)]
        }
    }

    fn write(&mut self, address: u16, value: u16) -> Result<(), ToFError> {
        tracing::trace!("write {:#06X} = {:#06X}", address, value);
        Ok(self.bridge.write_register(address, value)?)
    }

    fn read(&mut self, address: u16) -> Result<u16, ToFError> {
        Ok(self.bridge.read_register(address)?)
    }

    fn track(&mut self, registers: &[(u16, u16)]) -> Result<(), ToFError> {
        self.tracker.track_and_write(
            &mut self.bridge,
            &registers.iter().copied().collect::<RegisterMap>(),
        )
    }

    fn ism_active(&mut self) -> Result<bool, ToFError> {
        Ok(IsmState::from_bits_truncate(self.read(ISM_ISMSTATE)?).contains(IsmState::ACTIVE))
    }

    fn reconfig_flags(&mut self) -> Result<ReconfigFlags, ToFError> {
        Ok(ReconfigFlags::from_bits_truncate(
            self.read(AIO_SR_RECONFIGFLAGS)?,
        ))
    }

    fn sequencer_status(&mut self) -> Result<SequencerStatus, ToFError> {
        Ok(SequencerStatus::from_bits_truncate(
            self.read(CFGCNT_STATUS)?,
        ))
    }

    fn verify(&self, use_case: &ImagerUseCaseDefinition) -> VerificationStatus {
        let checks: [fn(&Self, &ImagerUseCaseDefinition) -> VerificationStatus; 6] = [
            Self::verify_modulation,
            Self::verify_raw_frames,
            Self::verify_frame_rate,
            Self::verify_phase,
            Self::verify_eye_safety,
            Self::verify_region,
        ];
        checks
            .iter()
            .map(|check| check(self, use_case))
            .find(|status| !status.is_success())
            .unwrap_or(VerificationStatus::Success)
    }

    fn verify_modulation(&self, use_case: &ImagerUseCaseDefinition) -> VerificationStatus {
        let mut lut = BTreeSet::new();
        for rf in use_case.raw_frames() {
            let frequency = rf.modulation_frequency.hz();
            let valid = match frequency {
                0 => rf.grayscale,
                f => {
                    f <= self.params.max_modulation_frequency()
                        && f % 10_000 == 0
                        && self
                            .mod_pll
                            .pll_settings(f as f64 * CLKDIV as f64, None)
                            .is_ok_and(|cfg| cfg.feasible)
                }
            };
            if !valid {
                tracing::debug!("modulation frequency {} Hz is not supported", frequency);
                return VerificationStatus::ModulationFrequency;
            }
            lut.insert(rf.timing_frequency());
        }
        if lut.is_empty() || lut.len() > MODPLL_LUT_COUNT as usize {
            return VerificationStatus::ModulationFrequency;
        }
        VerificationStatus::Success
    }

    fn verify_raw_frames(&self, use_case: &ImagerUseCaseDefinition) -> VerificationStatus {
        let times = match generate_raw_frame_timings(use_case, &self.timing()) {
            Ok(times) => times,
            Err(_) if use_case.target_rate() == 0 => return VerificationStatus::Framerate,
            Err(_) => return VerificationStatus::Sequencer,
        };
        let mut blocks = Self::measurement_blocks(use_case.mixed_mode());
        if RawFrameAssignment::assign(use_case.raw_frames(), &times, &mut blocks).is_none() {
            return VerificationStatus::Sequencer;
        }

        let frames = use_case.raw_frames();
        let min_exposure = if use_case.mixed_mode() {
            // Worst case of a reconfiguration touching every parameter of the sequence.
            let params = (2 + 2 * frames.len()).min(51);
            (12. + params as f64 * 2.4) as u32
        } else {
            MIN_EXPOSURE_NORMAL_MODE
        };
        if frames.iter().any(|rf| {
            rf.exposure_time < min_exposure
                || exposure_register(rf.exposure_time, rf.timing_frequency()) > u16::MAX as f64
        }) {
            return VerificationStatus::ExposureTime;
        }
        VerificationStatus::Success
    }

    fn verify_frame_rate(&self, use_case: &ImagerUseCaseDefinition) -> VerificationStatus {
        if use_case.target_rate() == 0 || use_case.tail_time().is_err() {
            return VerificationStatus::Framerate;
        }
        let Ok(times) = generate_raw_frame_timings(use_case, &self.timing()) else {
            return VerificationStatus::Framerate;
        };
        let timing = self.timing();
        let fits = use_case.raw_frames().iter().zip(&times).all(|(rf, &target)| {
            // The sequencer has no slot for an eye-safety pause, so a frame asking for one
            // cannot be timed.
            if rf.t_eye_safety > 0. {
                tracing::debug!("eye-safety pauses can not be scheduled");
                return false;
            }
            if target < 0. {
                return false;
            }
            let t = timing.raw_frame_time(
                use_case,
                rf.exposure_time,
                rf.modulation_frequency.hz(),
                false,
            );
            t.feasible && t.time <= target && frame_rate_register(target) <= u16::MAX as f64
        });
        if fits {
            VerificationStatus::Success
        } else {
            VerificationStatus::Framerate
        }
    }

    fn verify_phase(&self, use_case: &ImagerUseCaseDefinition) -> VerificationStatus {
        match use_case.raw_frames().iter().all(|rf| {
            phase_shift(
                rf.resolved_duty_cycle(self.params.duty_cycle()),
                rf.phase_angle,
            )
            .is_some()
        }) {
            true => VerificationStatus::Success,
            false => VerificationStatus::Phase,
        }
    }

    fn verify_eye_safety(&self, use_case: &ImagerUseCaseDefinition) -> VerificationStatus {
        verify_eye_safety(
            &EyeSafetyLimit::M2450_A12,
            self.params.eye_safety().as_ref(),
            use_case.raw_frames(),
            self.params.duty_cycle(),
        )
    }

    fn verify_region(&self, use_case: &ImagerUseCaseDefinition) -> VerificationStatus {
        let (columns, rows) = use_case.image();
        let (column, row) = use_case.roi_start();
        let (column_limit, row_limit) = self.limits;
        let (columns, rows, column, row) = (columns as u32, rows as u32, column as u32, row as u32);
        // The pseudo data line precedes the image.
        if columns < RECONFIG_INDEX as u32
            || rows + 1 + row > row_limit as u32
            || column + columns > column_limit as u32
            || column % 16 != 0
            || columns < 32
            || columns % 16 != 0
        {
            return VerificationStatus::Region;
        }
        VerificationStatus::Success
    }

    fn switch_mode(&mut self, mixed_mode: bool) {
        tracing::debug!("switching sequencer to {} mode", if mixed_mode { "mixed" } else { "normal" });
        if mixed_mode {
            // The firmware overwrites the LUT of the configuration controller in mixed mode.
            self.tracker.forget(CFGCNT_PLLCFG1_LUT1..=CFGCNT_PLLCFG3_LUT4);
            self.generator = Box::new(MixedModeGenerator);
        } else {
            self.generator = Box::new(NormalModeGenerator);
        }
        self.mixed_mode = mixed_mode;
        self.lut.clear();
    }

    fn prepare_modulation(
        &mut self,
        use_case: &ImagerUseCaseDefinition,
    ) -> Result<RegisterMap, ToFError> {
        let used = use_case
            .raw_frames()
            .iter()
            .map(|rf| rf.timing_frequency())
            .collect::<BTreeSet<_>>();
        self.lut.retain(|frequency, _| used.contains(frequency));
        if self.executing.as_ref().is_some_and(|e| e.ssc_enabled()) != use_case.ssc_enabled() {
            self.lut.clear();
        }

        let lut_base = if use_case.mixed_mode() {
            CFGCNT_PLLCFG1_LUT1
        } else {
            AIO_NR_PLLCFG1_LUT1
        };
        let mut registers = RegisterMap::new();
        for rf in use_case.raw_frames() {
            let frequency = rf.timing_frequency();
            if self.lut.contains_key(&frequency) {
                continue;
            }
            let idx = (0..MODPLL_LUT_COUNT)
                .find(|i| !self.lut.values().any(|v| v == i))
                .ok_or_else(|| ToFError::out_of_bounds("failed to acquire a free LUT index"))?;
            let wavegen = use_case.ssc_enabled() && !rf.grayscale && rf.ssc.is_enabled();
            let cfg = self
                .mod_pll
                .pll_settings(frequency as f64 * CLKDIV as f64, wavegen.then_some(&rf.ssc))?;
            tracing::debug!("modulation frequency {} Hz uses LUT {}", frequency, idx);
            self.lut.insert(frequency, idx);

            (0..3u16).for_each(|k| {
                registers.insert(lut_base + LUT_IDX_OFFSET * idx + k, cfg.registers[k as usize]);
            });
            if wavegen {
                (0..5u16).for_each(|k| {
                    registers.insert(
                        AIO_SSC_PLLCFG4_LUTX + AIO_SSC_PLLCFG_LUT_OFFSET * idx + k,
                        cfg.registers[3 + k as usize],
                    );
                });
            }
        }
        Ok(registers)
    }

    /// Fills the measurement blocks for `use_case` and returns every register it needs.
    fn prepare(
        &mut self,
        use_case: &ImagerUseCaseDefinition,
        times: &[f64],
    ) -> Result<RegisterMap, ToFError> {
        // The sequence length is always rewritten.
        self.tracker.forget(CFGCNT_CTRLSEQ..=CFGCNT_CTRLSEQ);

        let mut registers = self.prepare_modulation(use_case)?;

        let raw_frame_rate = use_case.raw_frame_rate();
        let raw_frame_register = match raw_frame_rate {
            0 => 0,
            rate => (FSYSCLK / (1024. * rate as f64)).round() as u16,
        };
        let timing = self.timing();
        let duty_cycle = self.params.duty_cycle();
        for (frame, block, position) in self.assignment.slots() {
            let rf = &use_case.raw_frames()[frame];
            let pll_set = *self
                .lut
                .get(&rf.timing_frequency())
                .ok_or_else(|| ToFError::logic("modulation frequency without LUT entry"))?;
            let phase = phase_shift(rf.resolved_duty_cycle(duty_cycle), rf.phase_angle)
                .ok_or_else(|| ToFError::invalid_value("phase angle is not supported"))?;
            let entry = self
                .blocks
                .get_mut(block)
                .and_then(|mb| mb.sequence.get_mut(position))
                .ok_or_else(|| ToFError::logic("raw frame assigned outside the blocks"))?;

            entry.frame_rate = raw_frame_register;
            entry.fr_val_eq_zero = false;
            if rf.is_end_of_linked_raw_frames {
                let t = timing.raw_frame_time(
                    use_case,
                    rf.exposure_time,
                    rf.modulation_frequency.hz(),
                    rf.is_start_of_linked_raw_frames,
                );
                entry.fr_val_eq_zero = raw_frame_rate == 0 && times[frame] - t.time < 0.1e-9;
                entry.frame_rate = frame_rate_register(times[frame]) as u16;
            }
            entry.exposure = exposure_register(rf.exposure_time, rf.timing_frequency()) as u16;
            entry.phase_shift = if rf.grayscale { GRAYSCALE_BIT } else { 0 } | phase;
            entry.pll_set = pll_set;
        }
        self.blocks
            .iter_mut()
            .for_each(|mb| mb.frame_rate_counter = 0);

        registers.extend(self.generator.generate(&self.blocks)?);

        let (columns, rows) = use_case.image();
        let (column, row) = use_case.roi_start();
        registers.extend([
            (CFGCNT_ROICMINREG, column),
            (CFGCNT_ROICMAXREG, column + columns - 1),
            (CFGCNT_ROIRMINREG, row),
            (CFGCNT_ROIRMAXREG, row + rows),
            (CFGCNT_BINCFG, 4),
        ]);
        Ok(registers)
    }

    fn execute(&mut self, use_case: ImagerUseCaseDefinition) -> Result<(), ToFError> {
        let status = self.verify(&use_case);
        if !status.is_success() {
            return Err(ToFError::invalid_value(format!(
                "use case not supported: {:?}",
                status
            )));
        }
        if use_case.mixed_mode() != self.mixed_mode {
            self.switch_mode(use_case.mixed_mode());
        }

        let mut blocks = Self::measurement_blocks(use_case.mixed_mode());
        let times = generate_raw_frame_timings(&use_case, &self.timing())?;
        self.assignment = RawFrameAssignment::assign(use_case.raw_frames(), &times, &mut blocks)
            .ok_or_else(|| ToFError::logic("raw frames do not fit into the measurement blocks"))?;
        self.blocks = blocks;

        let registers = self.prepare(&use_case, &times)?;
        let changes = self.tracker.resolve(registers);
        tracing::debug!("executing use case with {} register changes", changes.len());
        self.tracker.track_and_write(&mut self.bridge, &changes)?;

        self.times = times;
        self.executed_tail = use_case.tail_time()?;
        self.prepared = Some(use_case);
        Ok(())
    }

    fn reconfigure_running(&mut self, use_case: ImagerUseCaseDefinition) -> Result<u16, ToFError> {
        let executing = self
            .executing
            .as_ref()
            .ok_or_else(|| ToFError::logic("no use case is executing"))?;
        if executing.raw_frames().len() != use_case.raw_frames().len() {
            return Err(ToFError::runtime(
                "reconfiguration failed, it is not allowed to change the sequence length",
            ));
        }
        if executing.mixed_mode() != use_case.mixed_mode() {
            return Err(ToFError::runtime(
                "reconfiguration failed, it is not allowed to change the sequencer mode",
            ));
        }
        for (old, new) in executing.raw_frames().iter().zip(use_case.raw_frames()) {
            if !self.lut.contains_key(&new.timing_frequency()) {
                return Err(ToFError::runtime(
                    "reconfiguration failed, it is not allowed to set a new modulation PLL frequency",
                ));
            }
            if old.duty_cycle != new.duty_cycle {
                return Err(ToFError::runtime(
                    "reconfiguration failed, it is not allowed to change a duty cycle",
                ));
            }
        }
        if !self.verify(&use_case).is_success() {
            return Err(ToFError::runtime(
                "reconfiguration failed, not succeeded to verify configuration",
            ));
        }

        if !self.reconfig_flags()?.is_empty() {
            self.tracker.commit_or_rollback(false);
            return Err(ToFError::runtime(
                "reconfiguration failed, firmware register transfer not successful",
            ));
        }
        self.tracker.commit_or_rollback(true);

        let times = generate_raw_frame_timings(&use_case, &self.timing())?;
        let registers = self.prepare(&use_case, &times)?;
        let changes = self.tracker.resolve(registers);

        let index = self.read(AIO_SR_RECONFIG_COUNTER)?;
        let translated = self
            .generator
            .reconfig_translation(self.blocks.len(), &changes)?;
        self.tracker.track_and_write(&mut self.bridge, &translated)?;
        self.tracker.track_shadowed(&changes)?;
        tracing::debug!(
            "reconfiguration of {} registers staged after index {}",
            changes.len(),
            index
        );

        self.times = times;
        self.executed_tail = use_case.tail_time()?;
        self.executing = Some(use_case);
        self.last_reconfig_index = index;
        Ok(index)
    }

    fn reconfigure_adapted(&mut self, use_case: ImagerUseCaseDefinition) -> Result<u16, ToFError> {
        match self.state {
            ImagerState::Ready => self.execute(use_case).map(|_| 0),
            ImagerState::Capturing => self.reconfigure_running(use_case),
            state => Err(wrong_state("reconfigure", state)),
        }
    }

    fn current_use_case(&self, operation: &str) -> Result<ImagerUseCaseDefinition, ToFError> {
        match self.state {
            ImagerState::Ready | ImagerState::Capturing => self
                .executing_use_case()
                .cloned()
                .ok_or_else(|| ToFError::wrong_state("no use case has been executed")),
            state => Err(wrong_state(operation, state)),
        }
    }

    fn load_firmware(&mut self) -> Result<(), ToFError> {
        if self.firmware.version()? != AIO_FIRMWARE_VERSION {
            return Err(ToFError::runtime("firmware version not supported"));
        }
        let pages = [
            (1 << 6, consecutive_runs(&self.firmware.page1)),
            (1 << 6 | 1 << 5, consecutive_runs(&self.firmware.page2)),
        ];
        for (page, runs) in pages {
            if runs.is_empty() {
                continue;
            }
            self.write(ISM_MEMPAGE, page)?;
            runs.iter()
                .try_for_each(|(first, values)| self.bridge.write_burst(*first, values))?;
        }
        self.write(ISM_MEMPAGE, 0)
    }

    fn start_firmware(&mut self) -> Result<(), ToFError> {
        self.write(ISM_CTRL, 2)?;
        self.load_firmware()?;

        self.track(&[
            (AIO_SSC_INIT, 1),
            (AIO_MX_ENABLE, 2),
            (AIO_SF_ENABLE, self.params.use_superframe() as u16),
            (AIO_SSC_ENABLE, 0),
            (AIO_WARMUP_ENABLE, 0),
        ])?;
        self.write(AIO_SR_TRIGGER, END_TRIGGER)?;
        self.write(ISM_EN, 1)?;
        self.bridge.sleep_for(Duration::from_micros(80));
        self.write(ISM_EN, 2)?;

        if self.ism_active()? {
            return Err(ToFError::runtime("iSM still active"));
        }
        Ok(())
    }

    fn configure_pads(&mut self) -> Result<(), ToFError> {
        let ifdel = 0x4000 | ((self.params.interface_delay() * FSYSCLK) as u16 & 0x07FF);
        self.track(&[(CFGCNT_IFDEL, ifdel)])?;

        let spare = match self.tracker.get(ANAIP_SPARE) {
            None => ANAIP_SPARE_DEFAULT,
            Some(v) if v & ANAIP_SPARE_DEFAULT == ANAIP_SPARE_DEFAULT => v,
            Some(_) => return Err(ToFError::runtime("invalid base config for ANAIP_SPARE")),
        };
        if self.tracker.get(CFGCNT_PSOUT).is_some() {
            return Err(ToFError::runtime(
                "CFGCNT_PSOUT must not be set by a base config",
            ));
        }
        match self.params.illumination_pad() {
            IlluminationPad::SeP => self.track(&[
                (ANAIP_PSPADCFG, 0x1513),
                (CFGCNT_PSOUT, 0x031D),
                (ANAIP_SPARE, spare),
            ])?,
            IlluminationPad::Lvds => self.track(&[
                (CFGCNT_PSOUT, 0x0133),
                (ANAIP_PSLVDSCFG, 0x0001),
                (ANAIP_SPARE, spare),
            ])?,
            IlluminationPad::SeN => {
                return Err(ToFError::NotImplemented(
                    "single ended negative illumination pad".to_string(),
                ))
            }
        }

        let superframe = self.params.use_superframe();
        let interface = match (self.params.interface(), superframe) {
            (ImageDataTransfer::Pif, _) => [(CFGCNT_PIFCCFG, 0x1057), (CFGCNT_CSICFG, 0x0280)],
            (ImageDataTransfer::Mipi1Lane, true) => [(CFGCNT_PIFCCFG, 0), (CFGCNT_CSICFG, 0x0201)],
            (ImageDataTransfer::Mipi1Lane, false) => [(CFGCNT_PIFCCFG, 0), (CFGCNT_CSICFG, 0x0211)],
            (ImageDataTransfer::Mipi2Lane, true) => [(CFGCNT_PIFCCFG, 0), (CFGCNT_CSICFG, 0x0081)],
            (ImageDataTransfer::Mipi2Lane, false) => [(CFGCNT_PIFCCFG, 0), (CFGCNT_CSICFG, 0x0091)],
        };
        self.track(&interface)?;

        match self.trigger {
            ExternalTrigger::Gpio13 => {
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_GPIOMUX4, 0x03E0, 0x0180, 0)?;
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_PADGPIOCFG6, 0xFF00, 0x1A00, 0x1313)
            }
            ExternalTrigger::Gpio14 => {
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_GPIOMUX4, 0x7C00, 0x3000, 0)?;
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_PADGPIOCFG7, 0x00FF, 0x001A, 0x1313)
            }
            ExternalTrigger::I2c => Ok(()),
        }
    }

    fn shut_down_sequencer(&mut self) -> Result<(), ToFError> {
        self.write(AIO_SR_TRIGGER, END_TRIGGER)?;
        let sleep = self.max_safe_reconfig_time_ms() as u64 + 10;
        self.bridge.sleep_for(Duration::from_millis(sleep));
        if !self.sequencer_status()?.contains(SequencerStatus::IDLE) {
            return Err(ToFError::Timeout(
                "stopping the sequencer not succeeded".to_string(),
            ));
        }
        self.last_stop = Some(Instant::now());

        if !self.reconfig_flags()?.is_empty() {
            self.tracker.commit_or_rollback(false);
            return Err(ToFError::runtime(
                "stop failed, firmware register transfer still pending",
            ));
        }
        self.tracker.commit_or_rollback(true);

        self.write(ISM_EN, 2)?;
        self.bridge.sleep_for(Duration::from_micros(10));
        if self.ism_active()? {
            return Err(ToFError::runtime("iSM active"));
        }
        Ok(())
    }
}

fn exposure_register(exposure_time: u32, frequency: u32) -> f64 {
    (exposure_time as f64 * frequency as f64 / 8e6).floor()
}

fn frame_rate_register(time: f64) -> f64 {
    (FSYSCLK * time / 1024.).round()
}

impl<B: Bridge> ImagerComponent for ImagerM2450A12<B> {
    fn state(&self) -> ImagerState {
        self.state
    }

    fn design_step_info(&self) -> DesignStepInfo {
        DesignStepInfo::new(ANAIP_DESIGNSTEP, vec![DESIGN_STEP])
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn wake(&mut self) -> Result<(), ToFError> {
        if self.state != ImagerState::PowerDown {
            return Err(wrong_state("wake", self.state));
        }
        self.tracker.clear();
        self.lut.clear();
        self.mixed_mode = false;
        self.generator = Box::new(NormalModeGenerator);
        self.prepared = None;
        self.executing = None;

        self.bridge.sleep_for(Duration::from_micros(1));
        self.bridge.set_reset(false)?;
        self.state = ImagerState::PowerUp;
        tracing::debug!("imager powered up");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn sleep(&mut self) -> Result<(), ToFError> {
        if !matches!(
            self.state,
            ImagerState::Virgin | ImagerState::PowerUp | ImagerState::Ready
        ) {
            return Err(wrong_state("sleep", self.state));
        }
        self.bridge.set_reset(true)?;
        self.state = ImagerState::PowerDown;
        self.last_stop = Some(Instant::now());
        tracing::debug!("imager powered down");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn initialize(&mut self) -> Result<(), ToFError> {
        if self.state != ImagerState::PowerUp {
            return Err(wrong_state("initialize", self.state));
        }
        self.lut.clear();

        let design_step = self.read(ANAIP_DESIGNSTEP)?;
        if !self.design_step_info().accepts(design_step) {
            return Err(ToFError::runtime("wrong design step"));
        }
        if self.read(ANAIP_EFUSEVAL1)? & EFUSE_19K != 0 {
            self.limits = SENSOR_LIMITS_19K;
        }

        let system_frequency = self.params.system_frequency();
        if system_frequency != DEFAULT_SYSTEM_FREQUENCY {
            let cfg = DphyPllM2450A12::new(system_frequency).pll_settings(FSYSCLK * 3., None)?;
            if !cfg.feasible {
                return Err(ToFError::runtime("Invalid dphy pll frequency specified"));
            }
            tracing::debug!("DPHY PLL reconfigured for {} Hz", system_frequency);
            self.bridge.write_burst(ANAIP_DPHYPLLCFG1, &cfg.registers)?;
        }

        self.tracker
            .track_and_write(&mut self.bridge, &base_config())?;
        let module_config = self.params.base_config().clone();
        self.tracker
            .track_and_transfer_timed(&mut self.bridge, &module_config)?;

        self.configure_pads()?;

        self.write(ISM_CTRL, 1)?;
        self.write(ISM_EN, 1)?;
        self.bridge.sleep_for(Duration::from_micros(200));
        if self.ism_active()? {
            return Err(ToFError::runtime("iSMx is currently enabled"));
        }
        if MtcuStatus::from_bits_truncate(self.read(MTCU_STATUS)?)
            .contains(MtcuStatus::PLL_LOCK_ERROR)
        {
            return Err(ToFError::runtime("pll locking error"));
        }

        self.start_firmware()?;

        self.state = ImagerState::Ready;
        tracing::debug!("imager initialized");
        Ok(())
    }

    fn verify_use_case(&self, use_case: &UseCaseDefinition) -> VerificationStatus {
        let corner = self.lens_center.as_ref().map(|lens| lens.roi_corner(use_case));
        let roi_start = match &corner {
            Some(Ok(corner)) => *corner,
            _ => (0, 0),
        };
        if let Err(e) = use_case.verify_class_invariants() {
            tracing::debug!("{}", e);
            return VerificationStatus::Definition;
        }
        let Ok(adapted) = ImagerUseCaseDefinition::from_use_case(
            use_case,
            roi_start,
            flow_control::raw_frame_rate(use_case),
        ) else {
            return VerificationStatus::Stream;
        };
        match self.verify(&adapted) {
            VerificationStatus::Success if matches!(corner, Some(Err(_))) => {
                VerificationStatus::Region
            }
            status => status,
        }
    }

    #[tracing::instrument(level = "debug", skip(self, use_case), fields(use_case = %use_case.type_name()))]
    fn reconfigure(&mut self, use_case: &UseCaseDefinition) -> Result<u16, ToFError> {
        let adapted = adapt_use_case(use_case, self.lens_center.as_ref())?;
        self.reconfigure_adapted(adapted)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn reconfigure_exposure_times(&mut self, exposure_times: &[u32]) -> Result<u16, ToFError> {
        let mut use_case = self.current_use_case("reconfigure exposure times")?;
        use_case.set_exposure_times(exposure_times)?;
        self.reconfigure_adapted(use_case)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn reconfigure_target_frame_rate(&mut self, rate: u16) -> Result<u16, ToFError> {
        let mut use_case = self.current_use_case("reconfigure target frame rate")?;
        use_case.set_target_frame_rate(rate)?;
        self.reconfigure_adapted(use_case)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn start_capture(&mut self) -> Result<(), ToFError> {
        if self.state != ImagerState::Ready {
            return Err(wrong_state("start capture", self.state));
        }
        let prepared = self
            .prepared
            .clone()
            .ok_or_else(|| ToFError::wrong_state("no use case has been executed"))?;

        // Keep the pause of the previous use case if the new one has a longer tail.
        if let (Some(stop), Some(pause)) = (
            self.last_stop,
            self.executed_tail.checked_sub(self.active_tail),
        ) {
            let wait = pause.saturating_sub(stop.elapsed());
            if !wait.is_zero() {
                self.bridge.sleep_for(wait);
            }
        }
        self.active_tail = self.executed_tail;

        if !self.sequencer_status()?.contains(SequencerStatus::IDLE) {
            tracing::debug!("startCapture failed, mtcu is busy");
            return Err(ToFError::logic("startCapture failed, mtcu is busy"));
        }

        match self.trigger {
            ExternalTrigger::Gpio13 => {
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_GPIOMUX4, 0x03E0, 0x00A0, 0)?
            }
            ExternalTrigger::Gpio14 => {
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_GPIOMUX4, 0x7C00, 0x1400, 0)?
            }
            ExternalTrigger::I2c => {}
        }
        self.track(&[
            (AIO_MX_ENABLE, prepared.mixed_mode() as u16),
            (AIO_SSC_ENABLE, prepared.ssc_enabled() as u16),
        ])?;
        let internal_trigger = self.trigger == ExternalTrigger::I2c;
        if internal_trigger {
            self.write(AIO_SR_TRIGGER, START_TRIGGER)?;
        }
        self.write(ISM_EN, 1)?;
        self.executing = Some(prepared);

        // The firmware copies the shadow configuration and locks the PLL.
        self.bridge.sleep_for(Duration::from_micros(320));
        self.bridge.sleep_for(Duration::from_micros(200));

        if MtcuStatus::from_bits_truncate(self.read(MTCU_STATUS)?)
            .contains(MtcuStatus::PLL_LOCK_ERROR)
        {
            return Err(ToFError::runtime("error modpll lock"));
        }
        if internal_trigger {
            let status = self.sequencer_status()?;
            if status.contains(SequencerStatus::WRONG_INTERFACE) {
                return Err(ToFError::runtime(
                    "startCapture failed, wrong interface setting",
                ));
            }
            if status.contains(SequencerStatus::WRONG_ROI) {
                return Err(ToFError::runtime("startCapture failed, wrong roi setting"));
            }
            if status.contains(SequencerStatus::IDLE) {
                return Err(ToFError::runtime("startCapture failed, mtcu is idle"));
            }
        }

        self.state = ImagerState::Capturing;
        tracing::debug!("capture started");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn stop_capture(&mut self) -> Result<u16, ToFError> {
        if self.state != ImagerState::Capturing {
            return Err(wrong_state("stop capture", self.state));
        }

        if self.reconfig_flags()?.is_empty() {
            self.tracker.commit_or_rollback(true);
        } else {
            let wait = 2 * self.max_safe_reconfig_time_ms() as u64;
            self.bridge.sleep_for(Duration::from_millis(wait));
            self.tracker.commit_or_rollback(false);
        }

        match self.trigger {
            ExternalTrigger::Gpio13 => {
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_GPIOMUX4, 0x03E0, 0x0180, 0)?
            }
            ExternalTrigger::Gpio14 => {
                self.tracker
                    .masked_write(&mut self.bridge, ANAIP_GPIOMUX4, 0x7C00, 0x3000, 0)?
            }
            ExternalTrigger::I2c => {
                if self.sequencer_status()?.contains(SequencerStatus::IDLE) {
                    tracing::debug!("stopCapture failed, mtcu is idle");
                    return Err(ToFError::logic("stopCapture failed, mtcu is idle"));
                }
            }
        }

        self.shut_down_sequencer()?;

        self.state = ImagerState::Ready;
        self.prepared = self.executing.clone();
        tracing::debug!("capture stopped");
        Ok(self.last_reconfig_index)
    }

    fn measurement_block_sizes(&self) -> Result<Vec<usize>, ToFError> {
        match self.executing_use_case() {
            Some(_) => Ok(measurement_block_sizes(&self.blocks)),
            None => Err(ToFError::wrong_state("no use case has been executed")),
        }
    }

    fn create_pseudo_data_interpreter(&self) -> Box<dyn PseudoDataInterpreter> {
        Box::new(M2450A12PseudoData)
    }

    fn set_external_trigger(&mut self, enabled: bool) -> Result<(), ToFError> {
        if !matches!(
            self.state,
            ImagerState::Virgin | ImagerState::PowerDown | ImagerState::PowerUp
        ) {
            return Err(ToFError::wrong_state(
                "Wrong imager state to change the external trigger",
            ));
        }
        self.trigger = match (enabled, self.params.trigger()) {
            (false, _) => ExternalTrigger::I2c,
            (true, ExternalTrigger::I2c) => {
                return Err(ToFError::invalid_value(
                    "Module doesn't support external triggering",
                ))
            }
            (true, trigger) => trigger,
        };
        Ok(())
    }

    fn serial_registers(&mut self) -> Result<Vec<u16>, ToFError> {
        Ok(self.bridge.read_burst(ANAIP_EFUSEVAL1, 4)?)
    }

    fn read_registers(&mut self, addresses: &[u16]) -> Result<Vec<u16>, ToFError> {
        RegisterAccess::new(&mut self.bridge).read_registers(addresses)
    }

    fn write_registers(&mut self, addresses: &[u16], values: &[u16]) -> Result<(), ToFError> {
        RegisterAccess::new(&mut self.bridge).write_registers(addresses, values)?;
        addresses
            .iter()
            .for_each(|&address| self.tracker.forget(address..=address));
        Ok(())
    }
}
