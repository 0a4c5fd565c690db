use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::ToFError, usecase::UseCaseIdentifier};

/// A register write followed by an optional pause.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct TimedRegister {
    /// Register address.
    pub address: u16,
    /// Register value.
    pub value: u16,
    /// Pause after the write in microseconds.
    #[new(value = "0")]
    #[serde(default)]
    pub sleep_time: u32,
}

impl TimedRegister {
    /// Sets the pause after the write.
    #[must_use]
    pub const fn with_sleep(mut self, sleep_time: u32) -> Self {
        self.sleep_time = sleep_time;
        self
    }

    /// Returns the pause after the write.
    #[must_use]
    pub const fn sleep(&self) -> Duration {
        Duration::from_micros(self.sleep_time as u64)
    }
}

/// An ordered list of register writes with pauses.
pub type TimedRegisterList = Vec<TimedRegister>;

/// Location of a register block stored in the flash attached to the imager.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct SequentialRegisterHeader {
    /// Byte address in the flash.
    pub flash_config_address: u32,
    /// Size in bytes.
    pub flash_config_size: u32,
    /// First imager register the block is copied to.
    pub imager_address: u16,
}

impl SequentialRegisterHeader {
    /// Returns `true` if no flash block is referenced.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.flash_config_size == 0
    }
}

/// A use case of an imager whose configuration is supplied externally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UseCaseData {
    /// Identifier unique across all configurations.
    pub guid: UseCaseIdentifier,
    /// Human readable name.
    pub name: String,
    /// Number of raw frames of each image stream block.
    pub image_stream_block_sizes: Vec<usize>,
    /// Modulation frequency of each raw frame in the sequencer order.
    pub modulation_frequencies: Vec<u32>,
    /// Flash block holding the sequencer registers.
    #[serde(default)]
    pub sequential_register_header: SequentialRegisterHeader,
    /// Register writes executed when the flash block is empty.
    #[serde(default)]
    pub register_map: TimedRegisterList,
    /// Minimum time in microseconds between stopping and restarting the capture.
    #[serde(default)]
    pub wait_time: u64,
}

impl UseCaseData {
    /// Creates a use case configured through a register map.
    #[must_use]
    pub fn with_register_map(
        guid: UseCaseIdentifier,
        name: impl Into<String>,
        image_stream_block_sizes: Vec<usize>,
        modulation_frequencies: Vec<u32>,
        register_map: TimedRegisterList,
    ) -> Self {
        Self {
            guid,
            name: name.into(),
            image_stream_block_sizes,
            modulation_frequencies,
            sequential_register_header: SequentialRegisterHeader::default(),
            register_map,
            wait_time: 0,
        }
    }

    /// Creates a use case configured through a flash block.
    #[must_use]
    pub fn with_flash_block(
        guid: UseCaseIdentifier,
        name: impl Into<String>,
        image_stream_block_sizes: Vec<usize>,
        modulation_frequencies: Vec<u32>,
        header: SequentialRegisterHeader,
    ) -> Self {
        Self {
            sequential_register_header: header,
            ..Self::with_register_map(
                guid,
                name,
                image_stream_block_sizes,
                modulation_frequencies,
                Vec::new(),
            )
        }
    }

    /// Returns the minimum time between stopping and restarting the capture.
    #[must_use]
    pub const fn wait(&self) -> Duration {
        Duration::from_micros(self.wait_time)
    }
}

/// The configuration of an imager that is not defined in software, usually read from the
/// non-volatile storage of the camera module.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalConfig {
    /// Written by `initialize` after the design step check.
    #[serde(default)]
    pub initialization_map: TimedRegisterList,
    /// First firmware page.
    #[serde(default)]
    pub firmware_page1: TimedRegisterList,
    /// Second firmware page.
    #[serde(default)]
    pub firmware_page2: TimedRegisterList,
    /// Starts the firmware.
    #[serde(default)]
    pub firmware_start_map: TimedRegisterList,
    /// Starts capturing.
    #[serde(default)]
    pub start_map: TimedRegisterList,
    /// Stops capturing.
    #[serde(default)]
    pub stop_map: TimedRegisterList,
    /// The supported use cases.
    #[serde(default)]
    pub use_cases: Vec<UseCaseData>,
}

impl ExternalConfig {
    /// Returns the use case with the given identifier.
    #[must_use]
    pub fn use_case(&self, guid: &UseCaseIdentifier) -> Option<&UseCaseData> {
        self.use_cases.iter().find(|u| u.guid == *guid)
    }

    /// Parses a configuration stored as JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ToFError> {
        serde_json::from_slice(bytes).map_err(|e| {
            ToFError::InvalidValue(format!("Malformed external configuration: {}", e))
        })
    }

    /// Serializes the configuration to JSON.
    pub fn to_vec(&self) -> Result<Vec<u8>, ToFError> {
        serde_json::to_vec(self).map_err(|e| ToFError::runtime(e.to_string()))
    }
}
