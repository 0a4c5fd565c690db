//! Numeric strategies computing PLL register words.

mod charge_pump;
mod dphy;
mod fractional;
mod modulation;

pub use charge_pump::{charge_pump_current, ChargePumpBreakpoint};
pub use dphy::{DphyPllM2450A12, DphyPllM2452};
pub use modulation::ModPllM2450A12;

use crate::{error::ToFError, usecase::Ssc};

/// Number of register words of a PLL configuration.
pub const PLL_CFG_WORDS: usize = 8;

/// Register words of a PLL configuration and whether they produce a usable clock.
///
/// The words are computed even if the configuration is not feasible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PllConfig {
    /// Register words in the order they are written to the imager.
    pub registers: [u16; PLL_CFG_WORDS],
    /// `false` if the frequency is not achievable or lies in a forbidden band.
    pub feasible: bool,
}

/// Human readable values recovered from PLL register words.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReversePllSettings {
    /// Output frequency in Hz.
    pub out_freq: f64,
    /// VCO frequency in Hz.
    pub vco_freq: f64,
    /// Internal reference clock in Hz.
    pub ref_clk_freq: f64,
    /// Spread spectrum modulation frequency in Hz.
    pub ssc_freq: f64,
    /// Relative spread spectrum deviation.
    pub ssc_delta: f64,
    /// Position of the nominal frequency inside the spread band.
    pub ssc_kspread: f64,
    /// Spread spectrum wave generator enabled.
    pub wavegen: bool,
    /// Sigma delta modulator enabled.
    pub sdm: bool,
    /// Constant sigma delta input enabled.
    pub const_sdm_enabled: bool,
    /// Signed constant sigma delta input.
    pub const_sdm: i32,
    /// Reference clock is the system clock halved.
    pub input_div_2: bool,
    /// External divider ratio enabled.
    pub ext_mmd_enabled: bool,
    /// External divider ratio.
    pub ext_mmd_div_ratio: u16,
    /// Multi modulus divider input.
    pub mmd_in: u16,
    /// Post divider between the VCO and the output.
    pub post_divider: u16,
}

/// A strategy computing the register words of one PLL macro of one imager family.
pub trait PllStrategy: Send + Sync {
    /// Computes the register words for `frequency` in Hz.
    ///
    /// With `ssc` the spread spectrum wave generator is enabled. It is a [`ToFError::Logic`] if
    /// the spread spectrum frequency is not positive.
    fn pll_settings(&self, frequency: f64, ssc: Option<&Ssc>) -> Result<PllConfig, ToFError>;

    /// Recovers frequencies and flags from register words.
    fn reverse_pll_settings(&self, registers: &[u16]) -> Result<ReversePllSettings, ToFError>;
}

// GRCOV_EXCL_START
impl PllStrategy for Box<dyn PllStrategy> {
    fn pll_settings(&self, frequency: f64, ssc: Option<&Ssc>) -> Result<PllConfig, ToFError> {
        self.as_ref().pll_settings(frequency, ssc)
    }

    fn reverse_pll_settings(&self, registers: &[u16]) -> Result<ReversePllSettings, ToFError> {
        self.as_ref().reverse_pll_settings(registers)
    }
}
// GRCOV_EXCL_STOP

/// Returns `true` if the VCO frequency is too close to a multiple of the reference clock or of
/// half the reference clock, or if VCO or output leave the range of the DPHY PLL.
#[must_use]
pub fn is_forbidden_frequency(ref_clk: f64, vco: f64, frequency: f64) -> bool {
    fractional::is_seeking_forbidden(ref_clk, vco) || vco > 960e6 || frequency < 200e6
}
