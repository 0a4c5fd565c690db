use getset::{CopyGetters, Getters};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::ToFError,
    usecase::{BandwidthRequirementCategory, FrameTransmissionMode, UseCaseDefinition},
};

/// A use case offered by a camera module under a client visible name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Getters, derive_new::new)]
pub struct UseCaseEntry {
    #[new(into)]
    #[getset(get = "pub")]
    name: String,
    #[getset(get = "pub")]
    definition: UseCaseDefinition,
}

/// The static configuration of a camera module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Getters, CopyGetters)]
pub struct CoreConfig {
    #[getset(get = "pub")]
    camera_name: String,
    /// Lens center of the module design as `(column, row)`.
    #[getset(get_copy = "pub")]
    lens_center_design: (u16, u16),
    /// Sensor size as `(columns, rows)`.
    #[getset(get_copy = "pub")]
    max_image: (u16, u16),
    #[getset(get = "pub")]
    use_cases: Vec<UseCaseEntry>,
    #[getset(get_copy = "pub")]
    frame_transmission_mode: FrameTransmissionMode,
    #[getset(get_copy = "pub")]
    bandwidth_category: BandwidthRequirementCategory,
    /// Temperature in degrees Celsius above which a warning is raised.
    #[getset(get_copy = "pub")]
    temperature_limit_soft: f32,
    /// Temperature in degrees Celsius above which capturing is stopped.
    #[getset(get_copy = "pub")]
    temperature_limit_hard: f32,
    #[getset(get_copy = "pub")]
    auto_exposure_supported: bool,
}

impl CoreConfig {
    /// Returns the use case with the given name.
    pub fn use_case(&self, name: &str) -> Option<&UseCaseDefinition> {
        self.use_cases
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.definition)
    }

    /// Returns the names of the use cases in the order they were added.
    pub fn use_case_names(&self) -> impl Iterator<Item = &str> {
        self.use_cases.iter().map(|e| e.name.as_str())
    }

    /// Checks that the use case names are unique and that every use case is consistent.
    pub fn verify(&self) -> Result<(), ToFError> {
        if let Some(name) = self.use_cases.iter().map(|e| &e.name).duplicates().next() {
            return Err(ToFError::logic(format!("Duplicate use case name: {}", name)));
        }
        self.use_cases
            .iter()
            .try_for_each(|e| e.definition.verify_class_invariants())
    }

    /// Parses and verifies a configuration stored as JSON.
    pub fn from_json(json: &str) -> Result<Self, ToFError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ToFError::InvalidValue(format!("Malformed core configuration: {}", e)))?;
        config.verify()?;
        Ok(config)
    }

    /// Serializes the configuration to JSON.
    pub fn to_json(&self) -> Result<String, ToFError> {
        serde_json::to_string_pretty(self).map_err(|e| ToFError::runtime(e.to_string()))
    }
}

/// Builds a [`CoreConfig`].
#[derive(Clone, Debug)]
pub struct CoreConfigFactory {
    config: CoreConfig,
}

impl CoreConfigFactory {
    /// Creates a factory for a module with a 176 x 120 sensor and no use cases.
    #[must_use]
    pub fn new(camera_name: impl Into<String>) -> Self {
        Self {
            config: CoreConfig {
                camera_name: camera_name.into(),
                lens_center_design: (88, 60),
                max_image: (176, 120),
                use_cases: Vec::new(),
                frame_transmission_mode: FrameTransmissionMode::default(),
                bandwidth_category: BandwidthRequirementCategory::default(),
                temperature_limit_soft: 60.,
                temperature_limit_hard: 65.,
                auto_exposure_supported: true,
            },
        }
    }

    /// Sets the sensor size and puts the design lens center in its middle.
    #[must_use]
    pub fn with_max_image(mut self, columns: u16, rows: u16) -> Self {
        self.config.max_image = (columns, rows);
        self.config.lens_center_design = (columns / 2, rows / 2);
        self
    }

    /// Sets the design lens center.
    #[must_use]
    pub fn with_lens_center(mut self, column: u16, row: u16) -> Self {
        self.config.lens_center_design = (column, row);
        self
    }

    /// Sets the frame transmission mode.
    #[must_use]
    pub fn with_frame_transmission_mode(mut self, mode: FrameTransmissionMode) -> Self {
        self.config.frame_transmission_mode = mode;
        self
    }

    /// Sets the bandwidth category.
    #[must_use]
    pub fn with_bandwidth_category(mut self, category: BandwidthRequirementCategory) -> Self {
        self.config.bandwidth_category = category;
        self
    }

    /// Sets the soft and hard temperature limits.
    #[must_use]
    pub fn with_temperature_limits(mut self, soft: f32, hard: f32) -> Self {
        self.config.temperature_limit_soft = soft;
        self.config.temperature_limit_hard = hard;
        self
    }

    /// Adds a use case.
    #[must_use]
    pub fn with_use_case(mut self, name: impl Into<String>, definition: UseCaseDefinition) -> Self {
        self.config
            .use_cases
            .push(UseCaseEntry::new(name, definition));
        self
    }

    /// Builds the configuration. Duplicate use case names are a [`ToFError::Logic`].
    pub fn build(self) -> Result<CoreConfig, ToFError> {
        self.config.verify()?;
        Ok(self.config)
    }
}
