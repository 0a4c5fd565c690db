pub mod registers;

use std::time::{Duration, Instant};

use tofimg_core::{
    bridge::Bridge,
    config::{ExternalConfig, UseCaseData},
    error::ToFError,
    pseudodata::PseudoDataInterpreter,
    usecase::{DutyCycle, UseCaseDefinition, UseCaseIdentifier, VerificationStatus},
};

use registers::*;

use super::{wrong_state, DesignStepInfo, ImagerComponent, ImagerState};
use crate::{
    pseudodata::M2453PseudoData,
    register::RegisterAccess,
    verify::{emitting_frames, verify_eye_safety, EyeSafetyLimit},
    ImagerParameters,
};

const DESIGN_STEP: u16 = 0x0A11;

/// Maximum payload of one SPI transfer in registers.
pub const MAX_PAYLOAD: usize = 128;
const REGISTER_SIZE: u32 = 2;
/// One command word and one address word precede the payload, `SPILEN` counts bytes minus one.
const SPI_HEADER_BYTES: u16 = 3;

const BLOCK_TRANSFER_TIME: Duration = Duration::from_micros(150);
const POLLING_INTERVAL: Duration = Duration::from_millis(10);

const PRESCALERS: [u32; 4] = [1, 8, 32, 128];
const CONFIG_COUNTER_MASK: u16 = 0x0FFF;
const FLASH_ADDRESS_BITS: u32 = 24;

/// Exposure word of a sequence entry.
#[bitfield_struct::bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct ExposureWord {
    #[bits(14)]
    pub counter: u16,
    #[bits(2)]
    pub prescaler: u8,
}

impl ExposureWord {
    /// Encodes `exposure_time` in microseconds with the smallest prescaler that fits.
    pub fn encode(exposure_time: u32, modulation_frequency: u32) -> Result<Self, ToFError> {
        PRESCALERS
            .iter()
            .enumerate()
            .find_map(|(idx, &prescaler)| {
                let counter = (exposure_time as f64 * modulation_frequency as f64
                    / (1e6 * prescaler as f64))
                    .floor();
                (counter <= 0x3FFF as f64).then(|| {
                    Self::new()
                        .with_counter(counter as u16)
                        .with_prescaler(idx as u8)
                })
            })
            .ok_or_else(|| {
                ToFError::out_of_bounds("Exposure time can not be represented to the imager")
            })
    }
}

/// An imager whose use cases are stored in an external configuration, usually in the flash
/// attached to it.
///
/// Use cases are selected by their identifier. Only the exposure times can be changed while
/// capturing.
pub struct ImagerM2453<B: Bridge> {
    bridge: B,
    config: ExternalConfig,
    duty_cycle: DutyCycle,
    eye_safety: Option<EyeSafetyLimit>,
    state: ImagerState,
    executing: Option<UseCaseIdentifier>,
    config_counter: u16,
    last_stop: Option<Instant>,
}

impl<B: Bridge> ImagerM2453<B> {
    /// Creates the imager from the external configuration in `params`.
    pub fn new(bridge: B, params: &ImagerParameters) -> Result<Self, ToFError> {
        let config = params.external_config().clone().ok_or_else(|| {
            ToFError::runtime("this imager needs to have an external configuration provided")
        })?;
        if config.use_cases.is_empty() {
            return Err(ToFError::runtime(
                "the external configuration needs to contain at least one use case",
            ));
        }
        Ok(Self {
            bridge,
            config,
            duty_cycle: params.duty_cycle(),
            eye_safety: params.eye_safety().clone(),
            state: ImagerState::Virgin,
            executing: None,
            config_counter: 0,
            last_stop: None,
        })
    }

    /// Returns the bridge.
    #[must_use]
    pub const fn bridge(&self) -> &B {
        &self.bridge
    }

    /// Returns the bridge mutably.
    #[must_use]
    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    /// Returns the external configuration.
    #[must_use]
    pub const fn config(&self) -> &ExternalConfig {
        &self.config
    }

    fn use_case_data(&self, guid: &UseCaseIdentifier) -> Result<&UseCaseData, ToFError> {
        self.config.use_case(guid).ok_or_else(|| {
            ToFError::invalid_value(
                "A valid use case identifier must be provided to this function call",
            )
        })
    }

    fn executing_data(&self) -> Result<&UseCaseData, ToFError> {
        self.executing
            .as_ref()
            .and_then(|guid| self.config.use_case(guid))
            .ok_or_else(|| ToFError::logic("No use case was executed before"))
    }

    fn transfer(&mut self, registers: &[tofimg_core::config::TimedRegister]) -> Result<(), ToFError> {
        RegisterAccess::new(&mut self.bridge).transfer_timed(registers)
    }

    fn config_change_pending(&mut self) -> Result<bool, ToFError> {
        let flags = ConfigFlags::from_bits_truncate(self.bridge.read_register(CFGCNT_FLAGS)?);
        Ok(flags.intersects(ConfigFlags::CONFIG_CHANGED | ConfigFlags::USE_CASE_CHANGED))
    }

    /// Sets the config-changed flag and returns the counter of the frames still captured with
    /// the previous configuration.
    fn trigger_config_change(&mut self) -> Result<u16, ToFError> {
        self.bridge
            .write_register(CFGCNT_FLAGS, ConfigFlags::CONFIG_CHANGED.bits())?;
        let index = self.config_counter;
        self.config_counter = (self.config_counter + 1) & CONFIG_COUNTER_MASK;
        Ok(index)
    }

    fn flash_to_imager(&mut self, data: &UseCaseData) -> Result<(), ToFError> {
        let header = data.sequential_register_header;
        if header.flash_config_size % REGISTER_SIZE != 0 {
            return Err(ToFError::logic(
                "Data size is not a multiple of the number of bytes per register",
            ));
        }
        if header.imager_address != 0 && header.imager_address != CFGCNT {
            return Err(ToFError::NotImplemented(
                "Loading a use case from SPI to an unexpected address".to_string(),
            ));
        }
        let count = (header.flash_config_size / REGISTER_SIZE) as usize;
        tracing::debug!(
            "loading {} registers from flash address {:#08X}",
            count,
            header.flash_config_address
        );
        (0..count).step_by(MAX_PAYLOAD).try_for_each(|offset| {
            self.flash_block_to_imager(
                header.flash_config_address + offset as u32 * REGISTER_SIZE,
                offset as u16,
                MAX_PAYLOAD.min(count - offset),
            )
        })
    }

    fn flash_block_to_imager(
        &mut self,
        flash_address: u32,
        offset: u16,
        payload: usize,
    ) -> Result<(), ToFError> {
        let spi_len = ((payload as u16) << 1) + SPI_HEADER_BYTES;
        let bridge = &mut self.bridge;
        bridge.write_register(SPICFG, SPICFG_ENABLE_DIV8)?;
        // The command and the flash address are sent from the pixel memory.
        bridge.write_register(SPIWRADDR, PIXMEM)?;
        bridge.write_register(PIXMEM, FLASH_READ_COMMAND << 8 | (flash_address >> 16) as u16)?;
        bridge.write_register(PIXMEM + 1, (flash_address & 0xFFFF) as u16)?;
        bridge.write_register(SPIRADDR, CFGCNT + offset)?;
        bridge.write_register(SPILEN, SPILEN_READ_ENABLE | spi_len)?;
        bridge.write_register(SPITRIG, SPITRIG_READ)?;
        RegisterAccess::new(bridge).poll_until(
            SPISTATUS,
            SPISTATUS_DONE,
            BLOCK_TRANSFER_TIME,
            POLLING_INTERVAL,
        )
    }
}

impl<B: Bridge> ImagerComponent for ImagerM2453<B> {
    fn state(&self) -> ImagerState {
        self.state
    }

    fn design_step_info(&self) -> DesignStepInfo {
        DesignStepInfo::new(ANAIP_DESIGNSTEP, vec![DESIGN_STEP])
    }

    fn wake(&mut self) -> Result<(), ToFError> {
        if self.state != ImagerState::PowerDown {
            return Err(wrong_state("wake", self.state));
        }
        self.bridge.sleep_for(Duration::from_micros(1));
        self.bridge.set_reset(false)?;
        self.state = ImagerState::PowerUp;
        Ok(())
    }

    fn sleep(&mut self) -> Result<(), ToFError> {
        if !matches!(
            self.state,
            ImagerState::Virgin | ImagerState::PowerUp | ImagerState::Ready
        ) {
            return Err(wrong_state("sleep", self.state));
        }
        self.bridge.set_reset(true)?;
        self.config_counter = 0;
        self.state = ImagerState::PowerDown;
        self.last_stop = Some(Instant::now());
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn initialize(&mut self) -> Result<(), ToFError> {
        if self.state != ImagerState::PowerUp {
            return Err(wrong_state("initialize", self.state));
        }
        let design_step = self.bridge.read_register(ANAIP_DESIGNSTEP)?;
        if !self.design_step_info().accepts(design_step) {
            return Err(ToFError::runtime("wrong design step"));
        }

        let maps = [
            self.config.initialization_map.clone(),
            self.config.firmware_page1.clone(),
            self.config.firmware_page2.clone(),
            self.config.firmware_start_map.clone(),
        ];
        maps.iter().try_for_each(|map| self.transfer(map))?;

        self.state = ImagerState::Ready;
        Ok(())
    }

    fn verify_use_case(&self, use_case: &UseCaseDefinition) -> VerificationStatus {
        match self.config.use_case(&use_case.identifier()) {
            None => VerificationStatus::UseCaseIdentifier,
            Some(data)
                if data.sequential_register_header.flash_config_address >> FLASH_ADDRESS_BITS
                    != 0 =>
            {
                VerificationStatus::FlashConfig
            }
            Some(_) => match emitting_frames(use_case) {
                Ok(frames) => verify_eye_safety(
                    &EyeSafetyLimit::M2453,
                    self.eye_safety.as_ref(),
                    &frames,
                    self.duty_cycle,
                ),
                Err(e) => {
                    tracing::debug!("{}", e);
                    VerificationStatus::Definition
                }
            },
        }
    }

    #[tracing::instrument(level = "debug", skip(self, use_case), fields(use_case = %use_case.identifier()))]
    fn reconfigure(&mut self, use_case: &UseCaseDefinition) -> Result<u16, ToFError> {
        if self.state != ImagerState::Ready {
            return Err(wrong_state("execute use case", self.state));
        }
        self.executing = None;
        let data = self.use_case_data(&use_case.identifier())?.clone();
        if data.sequential_register_header.is_empty() {
            self.transfer(&data.register_map)?;
        } else {
            self.flash_to_imager(&data)?;
        }
        self.executing = Some(data.guid);
        Ok(0)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn reconfigure_exposure_times(&mut self, exposure_times: &[u32]) -> Result<u16, ToFError> {
        if self.state != ImagerState::Capturing {
            return Err(wrong_state("reconfigure exposure times", self.state));
        }
        let frequencies = self.executing_data()?.modulation_frequencies.clone();
        if frequencies.len() > SEQUENCE_ENTRIES {
            return Err(ToFError::logic(
                "Imager config has too many sequence entries!",
            ));
        }
        if exposure_times.len() != frequencies.len() {
            return Err(ToFError::invalid_value(
                "Number of exposure times doesn't fit current usecase",
            ));
        }
        let stride = CFGCNT_S01_EXPOTIME - CFGCNT_S00_EXPOTIME;
        let words = exposure_times
            .iter()
            .zip(&frequencies)
            .enumerate()
            .map(|(idx, (&exposure, &frequency))| {
                Ok((
                    CFGCNT_S00_EXPOTIME + idx as u16 * stride,
                    ExposureWord::encode(exposure, frequency)?.into_bits(),
                ))
            })
            .collect::<Result<Vec<_>, ToFError>>()?;

        if self.config_change_pending()? {
            return Err(ToFError::runtime(
                "Can't update exposure times while config change is still pending",
            ));
        }
        words
            .into_iter()
            .try_for_each(|(address, value)| self.bridge.write_register(address, value))?;
        self.trigger_config_change()
    }

    fn reconfigure_target_frame_rate(&mut self, _: u16) -> Result<u16, ToFError> {
        Err(ToFError::NotImplemented(
            "changing the frame rate is not supported by flash defined imagers".to_string(),
        ))
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn start_capture(&mut self) -> Result<(), ToFError> {
        if self.state != ImagerState::Ready {
            return Err(wrong_state("start capture", self.state));
        }
        let wait = self.executing_data()?.wait();
        if let Some(stop) = self.last_stop {
            let remaining = wait.saturating_sub(stop.elapsed());
            if !remaining.is_zero() {
                self.bridge.sleep_for(remaining);
            }
        }
        let start = self.config.start_map.clone();
        self.transfer(&start)?;
        self.state = ImagerState::Capturing;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    fn stop_capture(&mut self) -> Result<u16, ToFError> {
        if self.state != ImagerState::Capturing {
            return Err(wrong_state("stop capture", self.state));
        }
        let stop = self.config.stop_map.clone();
        self.transfer(&stop)?;
        self.state = ImagerState::Ready;
        self.last_stop = Some(Instant::now());
        Ok(0)
    }

    fn measurement_block_sizes(&self) -> Result<Vec<usize>, ToFError> {
        Ok(self.executing_data()?.image_stream_block_sizes.clone())
    }

    fn create_pseudo_data_interpreter(&self) -> Box<dyn PseudoDataInterpreter> {
        Box::new(M2453PseudoData)
    }

    fn set_external_trigger(&mut self, _: bool) -> Result<(), ToFError> {
        Err(ToFError::invalid_value(
            "Module doesn't support external triggering",
        ))
    }

    fn serial_registers(&mut self) -> Result<Vec<u16>, ToFError> {
        Ok(self.bridge.read_burst(ANAIP_EFUSEVAL1, 4)?)
    }

    fn read_registers(&mut self, addresses: &[u16]) -> Result<Vec<u16>, ToFError> {
        RegisterAccess::new(&mut self.bridge).read_registers(addresses)
    }

    fn write_registers(&mut self, addresses: &[u16], values: &[u16]) -> Result<(), ToFError> {
        RegisterAccess::new(&mut self.bridge).write_registers(addresses, values)
    }
}
