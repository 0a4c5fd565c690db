use super::{
    fractional::{is_seeking_forbidden, FractionalN, Quantization},
    PllConfig, PllStrategy, ReversePllSettings,
};
use crate::{error::ToFError, usecase::Ssc};

const MOD_FREQ_MIN: f64 = 12.6e6;
const MOD_FREQ_MAX: f64 = 400e6;
const VCO_MIN: f64 = 400e6;
const POST_DIVIDER_SEL_MAX: u16 = 4;

/// Modulation PLL of the M2450 A12 imager.
///
/// The fractional-N core runs between 400 MHz and 800 MHz and is followed by a post divider of
/// `2^(sel + 1)` with `sel` in `0..=4`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModPllM2450A12 {
    core: FractionalN,
}

impl ModPllM2450A12 {
    /// Creates the strategy for the given system clock in Hz.
    #[must_use]
    pub const fn new(system_frequency: u32) -> Self {
        Self {
            core: FractionalN::new(system_frequency, Quantization::Truncate, 0),
        }
    }

    /// Returns the post divider selection bringing `frequency` into the VCO range.
    fn post_divider_sel(frequency: f64) -> u16 {
        (0..POST_DIVIDER_SEL_MAX)
            .find(|&sel| frequency * post_divider(sel) as f64 >= VCO_MIN)
            .unwrap_or(POST_DIVIDER_SEL_MAX)
    }
}

const fn post_divider(sel: u16) -> u16 {
    1 << (sel + 1)
}

impl PllStrategy for ModPllM2450A12 {
    fn pll_settings(&self, frequency: f64, ssc: Option<&Ssc>) -> Result<PllConfig, ToFError> {
        let sel = Self::post_divider_sel(frequency);
        let vco = frequency * post_divider(sel) as f64;
        let config = self.core.compute(vco, sel, ssc)?;
        let (ref_clk, _) = self.core.ref_clk();
        let in_range = (MOD_FREQ_MIN..=MOD_FREQ_MAX).contains(&frequency);
        Ok(PllConfig {
            feasible: config.feasible && in_range && !is_seeking_forbidden(ref_clk, vco),
            ..config
        })
    }

    fn reverse_pll_settings(&self, registers: &[u16]) -> Result<ReversePllSettings, ToFError> {
        self.core
            .reverse(registers, |sel| post_divider(sel.min(POST_DIVIDER_SEL_MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ssc(freq: f64, kspread: f64, delta: f64) -> Ssc {
        Ssc {
            freq,
            kspread,
            delta,
        }
    }

    #[rstest::rstest]
    #[case(false, 12_600_000. - 1., None)]
    #[case(false, 400_000_000. + 1., None)]
    #[case(false, 12_600_000., Some(ssc(100_001., 0.5, 0.001)))]
    #[case(false, 13_340_000., Some(ssc(10000., 0.5, 0.0125)))]
    #[case(true, 30_000_000., None)]
    #[case(true, 60_240_000., Some(ssc(10000., 0.5, 0.0166)))]
    #[case(true, 80_320_000., None)]
    fn feasibility(#[case] expect: bool, #[case] frequency: f64, #[case] ssc: Option<Ssc>) -> anyhow::Result<()> {
        let pll = ModPllM2450A12::new(26_000_000);
        assert_eq!(expect, pll.pll_settings(frequency, ssc.as_ref())?.feasible);
        Ok(())
    }

    #[rstest::rstest]
    #[case(false, 26_000_000, 100_625_000.)]
    #[case(true, 26_000_000, 100_624_999.)]
    #[case(false, 26_000_000, 100_875_000.)]
    #[case(true, 26_000_000, 100_875_001.)]
    #[case(false, 26_000_000, 12_600_000.)]
    #[case(false, 26_000_000, 400_000_000.)]
    #[case(true, 24_000_000, 12_600_000.)]
    #[case(false, 24_000_000, 12_600_000. - 1.)]
    #[case(true, 24_000_000, 400_000_000.)]
    #[case(false, 24_000_000, 400_000_000. + 1.)]
    fn band_and_range_edges(
        #[case] expect: bool,
        #[case] system_frequency: u32,
        #[case] frequency: f64,
    ) -> anyhow::Result<()> {
        let pll = ModPllM2450A12::new(system_frequency);
        assert_eq!(expect, pll.pll_settings(frequency, None)?.feasible);
        Ok(())
    }

    #[test]
    fn zero_ssc_frequency() {
        let pll = ModPllM2450A12::new(26_000_000);
        assert!(matches!(
            pll.pll_settings(12_600_000., Some(&ssc(0., 0., 0.))),
            Err(ToFError::Logic(_))
        ));
    }

    #[rstest::rstest]
    #[case(3, 30e6)]
    #[case(2, 60.24e6)]
    #[case(1, 100e6)]
    #[case(0, 400e6)]
    #[case(4, 12.6e6)]
    fn post_divider_selection(#[case] expect: u16, #[case] frequency: f64) {
        assert_eq!(expect, ModPllM2450A12::post_divider_sel(frequency));
    }

    #[test]
    fn registers_30mhz() -> anyhow::Result<()> {
        let pll = ModPllM2450A12::new(26_000_000);
        let config = pll.pll_settings(30e6, None)?;
        assert_eq!([8707, 21803, 0, 0, 0, 0, 5041, 955], config.registers);
        let settings = pll.reverse_pll_settings(&config.registers)?;
        assert_eq!(16, settings.post_divider);
        approx::assert_relative_eq!(30e6, settings.out_freq, max_relative = 1e-6);
        approx::assert_relative_eq!(480e6, settings.vco_freq, max_relative = 1e-6);
        Ok(())
    }

    #[test]
    fn ssc_round_trip() -> anyhow::Result<()> {
        let pll = ModPllM2450A12::new(26_000_000);
        let config = pll.pll_settings(60.24e6, Some(&ssc(10000., 0.5, 0.0166)))?;
        assert_eq!([16899, 21802, 54870, 33456, 35087, 2, 34683, 1732], config.registers);
        let settings = pll.reverse_pll_settings(&config.registers)?;
        approx::assert_relative_eq!(60.24e6, settings.out_freq, max_relative = 1e-6);
        approx::assert_abs_diff_eq!(10000., settings.ssc_freq, epsilon = 150.);
        approx::assert_abs_diff_eq!(0.5, settings.ssc_kspread, epsilon = 0.01);
        approx::assert_abs_diff_eq!(0.0166, settings.ssc_delta, epsilon = 0.001);
        assert!(settings.wavegen);
        Ok(())
    }
}
