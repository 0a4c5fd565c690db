mod builder;

use getset::Getters;
use tofimg_core::{
    config::CoreConfig, error::ToFError, pseudodata::PseudoDataInterpreter,
    usecase::VerificationStatus,
};
use tofimg_driver::{
    imager::{ImagerComponent, ImagerState},
    ImagerDirectAccess,
};

use crate::error::CameraError;

pub use builder::ControllerBuilder;

/// A camera module: an imager together with the use cases the module offers.
///
/// The controller is opened through a [`ControllerBuilder`] and powers the imager down when it is
/// closed or dropped.
#[derive(Getters)]
pub struct Controller<I: ImagerComponent> {
    imager: I,
    #[getset(get = "pub")]
    core_config: CoreConfig,
    use_case: Option<String>,
    is_open: bool,
}

impl Controller<Box<dyn ImagerComponent>> {
    #[must_use]
    pub fn builder(config: CoreConfig) -> ControllerBuilder {
        ControllerBuilder::new(config)
    }
}

impl<I: ImagerComponent> Controller<I> {
    #[tracing::instrument(skip(self))]
    pub(crate) fn open_impl(mut self) -> Result<Self, CameraError> {
        self.imager.sleep()?;
        self.imager.wake()?;
        self.imager.initialize()?;
        self.is_open = true;
        tracing::info!("{} opened", self.core_config.camera_name());
        Ok(self)
    }

    #[must_use]
    pub const fn imager(&self) -> &I {
        &self.imager
    }

    pub fn imager_mut(&mut self) -> &mut I {
        &mut self.imager
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.is_open
    }

    /// Returns the name of the use case executed last.
    #[must_use]
    pub fn current_use_case(&self) -> Option<&str> {
        self.use_case.as_deref()
    }

    pub fn use_case_names(&self) -> impl Iterator<Item = &str> {
        self.core_config.use_case_names()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.imager.state() == ImagerState::Capturing
    }

    /// Executes the use case `name`.
    ///
    /// A capturing imager is stopped and restarted with the new use case. Returns the frame
    /// number from which on the new use case is in effect.
    #[tracing::instrument(skip(self))]
    pub fn set_use_case(&mut self, name: &str) -> Result<u16, CameraError> {
        self.check_open()?;
        let definition = self
            .core_config
            .use_case(name)
            .ok_or_else(|| CameraError::UseCaseNotFound(name.to_string()))?;
        match self.imager.verify_use_case(definition) {
            VerificationStatus::Success => {}
            status => return Err(CameraError::VerificationFailed(status)),
        }

        let restart = self.is_capturing();
        if restart {
            self.imager.stop_capture()?;
        }
        let frame = self.imager.reconfigure(definition)?;
        self.use_case = Some(name.to_string());
        if restart {
            self.imager.start_capture()?;
        }
        Ok(frame)
    }

    pub fn start_capture(&mut self) -> Result<(), CameraError> {
        self.check_open()?;
        if self.use_case.is_none() {
            return Err(ToFError::wrong_state("no use case has been set").into());
        }
        self.imager.start_capture()?;
        Ok(())
    }

    /// Stops capturing and returns the number of the last frame.
    pub fn stop_capture(&mut self) -> Result<u16, CameraError> {
        self.check_open()?;
        Ok(self.imager.stop_capture()?)
    }

    /// Changes the exposure times of the current use case while capturing.
    pub fn set_exposure_times(&mut self, exposure_times: &[u32]) -> Result<u16, CameraError> {
        self.check_open()?;
        Ok(self.imager.reconfigure_exposure_times(exposure_times)?)
    }

    /// Changes the frame rate of the current use case while capturing.
    pub fn set_frame_rate(&mut self, rate: u16) -> Result<u16, CameraError> {
        self.check_open()?;
        Ok(self.imager.reconfigure_target_frame_rate(rate)?)
    }

    pub fn set_external_trigger(&mut self, enabled: bool) -> Result<(), CameraError> {
        self.check_open()?;
        Ok(self.imager.set_external_trigger(enabled)?)
    }

    pub fn serial_number(&mut self) -> Result<String, CameraError> {
        self.check_open()?;
        Ok(self.imager.serial_number()?)
    }

    /// Returns the number of raw frames of each measurement block of the current use case.
    pub fn measurement_block_sizes(&self) -> Result<Vec<usize>, CameraError> {
        self.check_open()?;
        Ok(self.imager.measurement_block_sizes()?)
    }

    #[must_use]
    pub fn pseudo_data_interpreter(&self) -> Box<dyn PseudoDataInterpreter> {
        self.imager.create_pseudo_data_interpreter()
    }

    /// Gives register level access to the imager.
    pub fn direct_access(&mut self) -> Result<ImagerDirectAccess<'_, I>, CameraError> {
        self.check_open()?;
        Ok(ImagerDirectAccess::new(&mut self.imager))
    }

    /// Stops capturing and powers the imager down.
    pub fn close(&mut self) -> Result<(), CameraError> {
        if !self.is_open {
            return Ok(());
        }
        self.is_open = false;
        if self.is_capturing() {
            self.imager.stop_capture()?;
        }
        self.imager.sleep()?;
        tracing::info!("{} closed", self.core_config.camera_name());
        Ok(())
    }

    fn check_open(&self) -> Result<(), CameraError> {
        if !self.is_open {
            return Err(CameraError::Closed);
        }
        Ok(())
    }
}

impl<I: ImagerComponent> Drop for Controller<I> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("Failed to close controller: {}", e);
        }
    }
}
