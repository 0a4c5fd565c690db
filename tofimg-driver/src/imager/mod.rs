/// Flash defined imagers.
pub mod flash;
/// The M2450 A12 with the all-in-one firmware.
pub mod m2450_a12;

use tofimg_core::{
    error::ToFError,
    flow_control,
    pseudodata::PseudoDataInterpreter,
    roi::RoiLensCenter,
    usecase::{UseCaseDefinition, VerificationStatus},
};

use crate::use_case::ImagerUseCaseDefinition;

/// Lifecycle state of an imager.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ImagerState {
    /// Constructed, the reset line is in an unknown state.
    Virgin,
    /// Held in reset.
    PowerDown,
    /// Out of reset but not configured.
    PowerUp,
    /// Configured and idle.
    Ready,
    /// The sequencer is running.
    Capturing,
}

/// The design step register of an imager family and the silicon revisions it accepts.
#[derive(Clone, Debug, PartialEq, Eq, derive_new::new)]
pub struct DesignStepInfo {
    /// Address of the design step register.
    pub address: u16,
    /// Accepted register values.
    pub design_steps: Vec<u16>,
}

impl DesignStepInfo {
    /// Returns `true` if `value` is an accepted design step.
    #[must_use]
    pub fn accepts(&self, value: u16) -> bool {
        self.design_steps.contains(&value)
    }
}

/// The operations every imager family provides.
///
/// Calls are serialized by the owner; an imager owns exclusive access to its bridge.
pub trait ImagerComponent: Send {
    /// Returns the current lifecycle state.
    #[must_use]
    fn state(&self) -> ImagerState;

    /// Returns the design step register and the accepted revisions.
    #[must_use]
    fn design_step_info(&self) -> DesignStepInfo;

    /// Releases the reset line. `PowerDown -> PowerUp`.
    fn wake(&mut self) -> Result<(), ToFError>;

    /// Holds the imager in reset. Allowed from `Virgin`, `PowerUp` and `Ready`.
    fn sleep(&mut self) -> Result<(), ToFError>;

    /// Checks the design step and loads the base configuration. `PowerUp -> Ready`.
    fn initialize(&mut self) -> Result<(), ToFError>;

    /// Checks whether `use_case` can be executed on this imager.
    #[must_use]
    fn verify_use_case(&self, use_case: &UseCaseDefinition) -> VerificationStatus;

    /// Applies `use_case`.
    ///
    /// When `Ready` the use case is written directly and 0 is returned. When `Capturing` the
    /// change is applied at the next safe point and the returned index identifies the frames
    /// that still carry the previous configuration.
    fn reconfigure(&mut self, use_case: &UseCaseDefinition) -> Result<u16, ToFError>;

    /// Changes the exposure times of the running use case, one per exposure slot.
    fn reconfigure_exposure_times(&mut self, exposure_times: &[u32]) -> Result<u16, ToFError>;

    /// Changes the target frame rate of the running use case.
    fn reconfigure_target_frame_rate(&mut self, rate: u16) -> Result<u16, ToFError>;

    /// Starts the sequencer. `Ready -> Capturing`.
    fn start_capture(&mut self) -> Result<(), ToFError>;

    /// Stops the sequencer. `Capturing -> Ready`.
    fn stop_capture(&mut self) -> Result<u16, ToFError>;

    /// Returns the number of raw frames of each measurement block of the executed use case.
    fn measurement_block_sizes(&self) -> Result<Vec<usize>, ToFError>;

    /// Creates the interpreter of the pseudo data lines this imager produces.
    #[must_use]
    fn create_pseudo_data_interpreter(&self) -> Box<dyn PseudoDataInterpreter>;

    /// Switches between register and external triggering.
    fn set_external_trigger(&mut self, enabled: bool) -> Result<(), ToFError>;

    /// Reads the fuse registers identifying the device.
    fn serial_registers(&mut self) -> Result<Vec<u16>, ToFError>;

    /// Reads `addresses` from the imager.
    fn read_registers(&mut self, addresses: &[u16]) -> Result<Vec<u16>, ToFError>;

    /// Writes `values` to `addresses` of the imager.
    fn write_registers(&mut self, addresses: &[u16], values: &[u16]) -> Result<(), ToFError>;

    /// Returns the serial number derived from [`ImagerComponent::serial_registers`].
    fn serial_number(&mut self) -> Result<String, ToFError> {
        Ok(self
            .serial_registers()?
            .iter()
            .map(|v| format!("{:04X}", v))
            .collect::<Vec<_>>()
            .join("-"))
    }
}

// GRCOV_EXCL_START
impl ImagerComponent for Box<dyn ImagerComponent> {
    fn state(&self) -> ImagerState {
        self.as_ref().state()
    }

    fn design_step_info(&self) -> DesignStepInfo {
        self.as_ref().design_step_info()
    }

    fn wake(&mut self) -> Result<(), ToFError> {
        self.as_mut().wake()
    }

    fn sleep(&mut self) -> Result<(), ToFError> {
        self.as_mut().sleep()
    }

    fn initialize(&mut self) -> Result<(), ToFError> {
        self.as_mut().initialize()
    }

    fn verify_use_case(&self, use_case: &UseCaseDefinition) -> VerificationStatus {
        self.as_ref().verify_use_case(use_case)
    }

    fn reconfigure(&mut self, use_case: &UseCaseDefinition) -> Result<u16, ToFError> {
        self.as_mut().reconfigure(use_case)
    }

    fn reconfigure_exposure_times(&mut self, exposure_times: &[u32]) -> Result<u16, ToFError> {
        self.as_mut().reconfigure_exposure_times(exposure_times)
    }

    fn reconfigure_target_frame_rate(&mut self, rate: u16) -> Result<u16, ToFError> {
        self.as_mut().reconfigure_target_frame_rate(rate)
    }

    fn start_capture(&mut self) -> Result<(), ToFError> {
        self.as_mut().start_capture()
    }

    fn stop_capture(&mut self) -> Result<u16, ToFError> {
        self.as_mut().stop_capture()
    }

    fn measurement_block_sizes(&self) -> Result<Vec<usize>, ToFError> {
        self.as_ref().measurement_block_sizes()
    }

    fn create_pseudo_data_interpreter(&self) -> Box<dyn PseudoDataInterpreter> {
        self.as_ref().create_pseudo_data_interpreter()
    }

    fn set_external_trigger(&mut self, enabled: bool) -> Result<(), ToFError> {
        self.as_mut().set_external_trigger(enabled)
    }

    fn serial_registers(&mut self) -> Result<Vec<u16>, ToFError> {
        self.as_mut().serial_registers()
    }

    fn read_registers(&mut self, addresses: &[u16]) -> Result<Vec<u16>, ToFError> {
        self.as_mut().read_registers(addresses)
    }

    fn write_registers(&mut self, addresses: &[u16], values: &[u16]) -> Result<(), ToFError> {
        self.as_mut().write_registers(addresses, values)
    }

    fn serial_number(&mut self) -> Result<String, ToFError> {
        self.as_mut().serial_number()
    }
}
// GRCOV_EXCL_STOP

pub(crate) fn wrong_state(operation: &str, state: ImagerState) -> ToFError {
    ToFError::WrongState(format!("{} is not allowed in state {}", operation, state))
}

/// Narrows `use_case` for a software defined imager.
///
/// The region of interest is centered on `lens_center` if given and starts at the first pixel
/// otherwise. The raw frame rate comes from the flow control of the bandwidth category.
pub(crate) fn adapt_use_case(
    use_case: &UseCaseDefinition,
    lens_center: Option<&RoiLensCenter>,
) -> Result<ImagerUseCaseDefinition, ToFError> {
    let roi_start = match lens_center {
        Some(lens) => lens.roi_corner(use_case)?,
        None => (0, 0),
    };
    ImagerUseCaseDefinition::from_use_case(
        use_case,
        roi_start,
        flow_control::raw_frame_rate(use_case),
    )
}
