use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use tofimg_core::{
    config::{ExternalConfig, TimedRegisterList},
    error::ToFError,
    usecase::DutyCycle,
};

use crate::verify::EyeSafetyLimit;

/// How the capture of a raw frame is triggered.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExternalTrigger {
    /// Triggered by a register write.
    #[default]
    I2c,
    /// Triggered by GPIO 13.
    Gpio13,
    /// Triggered by GPIO 14.
    Gpio14,
}

/// The image data interface between imager and bridge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageDataTransfer {
    /// Parallel interface.
    Pif,
    /// CSI-2 with one lane.
    #[default]
    Mipi1Lane,
    /// CSI-2 with two lanes.
    Mipi2Lane,
}

/// The pad driving the illumination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IlluminationPad {
    /// Single ended, positive.
    #[default]
    SeP,
    /// Single ended, negative.
    SeN,
    /// Low voltage differential signaling.
    Lvds,
}

/// Properties of the camera module an imager is built into.
///
/// The imager validates the parameters when it is constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct ImagerParameters {
    /// Reference clock of the imager in Hz.
    #[getset(get_copy = "pub")]
    system_frequency: u32,
    /// Highest modulation frequency of the illumination in Hz.
    #[getset(get_copy = "pub")]
    max_modulation_frequency: u32,
    #[getset(get_copy = "pub")]
    interface: ImageDataTransfer,
    #[getset(get_copy = "pub")]
    use_superframe: bool,
    #[getset(get_copy = "pub")]
    trigger: ExternalTrigger,
    #[getset(get_copy = "pub")]
    illumination_pad: IlluminationPad,
    /// Delay between the end of the readout and the interface transfer in seconds.
    #[getset(get_copy = "pub")]
    interface_delay: f64,
    /// Replaces [`DutyCycle::Auto`].
    #[getset(get_copy = "pub")]
    duty_cycle: DutyCycle,
    /// Module specific registers written after the base configuration of the imager.
    #[serde(default)]
    #[getset(get = "pub")]
    base_config: TimedRegisterList,
    #[serde(default)]
    #[getset(get = "pub")]
    eye_safety: Option<EyeSafetyLimit>,
    /// Configuration of a flash defined imager.
    #[serde(default)]
    #[getset(get = "pub")]
    external_config: Option<ExternalConfig>,
}

impl ImagerParameters {
    /// Creates the parameters of a module with a CSI-2 single lane interface, triggered by
    /// register writes and illuminated through the positive single ended pad at 50 %.
    #[must_use]
    pub fn new(system_frequency: u32) -> Self {
        Self {
            system_frequency,
            max_modulation_frequency: 100_000_000,
            interface: ImageDataTransfer::default(),
            use_superframe: false,
            trigger: ExternalTrigger::default(),
            illumination_pad: IlluminationPad::default(),
            interface_delay: 0.,
            duty_cycle: DutyCycle::Dc50,
            base_config: TimedRegisterList::new(),
            eye_safety: None,
            external_config: None,
        }
    }

    /// Sets the highest modulation frequency.
    #[must_use]
    pub fn with_max_modulation_frequency(mut self, frequency: u32) -> Self {
        self.max_modulation_frequency = frequency;
        self
    }

    /// Sets the image data interface.
    #[must_use]
    pub fn with_interface(mut self, interface: ImageDataTransfer) -> Self {
        self.interface = interface;
        self
    }

    /// Concatenates the raw frames of a sequence into one transfer.
    #[must_use]
    pub fn with_superframe(mut self, use_superframe: bool) -> Self {
        self.use_superframe = use_superframe;
        self
    }

    /// Sets the trigger.
    #[must_use]
    pub fn with_trigger(mut self, trigger: ExternalTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Sets the illumination pad.
    #[must_use]
    pub fn with_illumination_pad(mut self, pad: IlluminationPad) -> Self {
        self.illumination_pad = pad;
        self
    }

    /// Sets the interface delay in seconds.
    #[must_use]
    pub fn with_interface_delay(mut self, delay: f64) -> Self {
        self.interface_delay = delay;
        self
    }

    /// Sets the duty cycle used for [`DutyCycle::Auto`].
    #[must_use]
    pub fn with_duty_cycle(mut self, duty_cycle: DutyCycle) -> Self {
        self.duty_cycle = duty_cycle;
        self
    }

    /// Sets the module specific base configuration.
    #[must_use]
    pub fn with_base_config(mut self, base_config: TimedRegisterList) -> Self {
        self.base_config = base_config;
        self
    }

    /// Sets the eye safety limit of the module.
    ///
    /// Verification checks it in addition to the ceiling of the imager family, so a limit above
    /// that ceiling has no effect.
    #[must_use]
    pub fn with_eye_safety(mut self, limit: EyeSafetyLimit) -> Self {
        self.eye_safety = Some(limit);
        self
    }

    /// Sets the configuration of a flash defined imager.
    #[must_use]
    pub fn with_external_config(mut self, config: ExternalConfig) -> Self {
        self.external_config = Some(config);
        self
    }

    /// Parses parameters stored as JSON.
    pub fn from_json(json: &str) -> Result<Self, ToFError> {
        serde_json::from_str(json)
            .map_err(|e| ToFError::InvalidValue(format!("Malformed imager parameters: {}", e)))
    }

    /// Serializes the parameters to JSON.
    pub fn to_json(&self) -> Result<String, ToFError> {
        serde_json::to_string_pretty(self).map_err(|e| ToFError::runtime(e.to_string()))
    }
}
