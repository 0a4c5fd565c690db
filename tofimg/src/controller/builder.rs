use tofimg_core::{
    bridge::Bridge,
    config::{CoreConfig, ExternalConfig},
    roi::RoiLensCenter,
};
use tofimg_driver::{
    imager::{flash::ImagerM2453, m2450_a12::ImagerM2450A12, ImagerComponent},
    ImagerParameters,
};

use super::Controller;
use crate::error::CameraError;

/// Builder for [`Controller`].
#[derive(Clone, Debug)]
pub struct ControllerBuilder {
    config: CoreConfig,
    lens_offset: (i16, i16),
}

impl ControllerBuilder {
    pub(crate) fn new(config: CoreConfig) -> Self {
        Self {
            config,
            lens_offset: (0, 0),
        }
    }

    /// Sets the calibrated deviation of the lens center from the module design.
    #[must_use]
    pub fn with_lens_offset(mut self, column: i16, row: i16) -> Self {
        self.lens_offset = (column, row);
        self
    }

    /// Opens a controller for an M2450 A12 behind `bridge`.
    pub fn open_m2450_a12<B: Bridge>(
        self,
        bridge: B,
        params: ImagerParameters,
    ) -> Result<Controller<ImagerM2450A12<B>>, CameraError> {
        check_capabilities(&bridge)?;
        let (column, row) = self.config.lens_center_design();
        let mut lens_center = RoiLensCenter::new(column, row);
        lens_center.set_lens_offset(self.lens_offset.0, self.lens_offset.1);
        let imager = ImagerM2450A12::new(bridge, params)?.with_lens_center(lens_center);
        self.open(imager)
    }

    /// Opens a controller for an M2453 behind `bridge`.
    ///
    /// Without an external configuration in `params`, the configuration is read from the
    /// storage of the bridge.
    pub fn open_m2453<B: Bridge>(
        self,
        mut bridge: B,
        params: ImagerParameters,
    ) -> Result<Controller<ImagerM2453<B>>, CameraError> {
        check_capabilities(&bridge)?;
        let params = match params.external_config() {
            Some(_) => params,
            None => {
                let blob = bridge
                    .storage()
                    .ok_or(CameraError::ExternalConfigMissing)?
                    .read_storage()?;
                tracing::debug!("external configuration of {} bytes read from storage", blob.len());
                params.with_external_config(ExternalConfig::from_slice(&blob)?)
            }
        };
        let imager = ImagerM2453::new(bridge, &params)?;
        self.open(imager)
    }

    /// Opens a controller for an already constructed imager.
    ///
    /// The imager is powered down once, woken and initialized.
    pub fn open<I: ImagerComponent>(self, imager: I) -> Result<Controller<I>, CameraError> {
        self.config.verify()?;
        Controller {
            imager,
            core_config: self.config,
            use_case: None,
            is_open: false,
        }
        .open_impl()
    }
}

fn check_capabilities<B: Bridge>(bridge: &B) -> Result<(), CameraError> {
    let capabilities = bridge.capabilities();
    if !capabilities.supports_imager() {
        return Err(CameraError::UnsupportedBridge(capabilities));
    }
    Ok(())
}
