use super::{
    fractional::{FractionalN, Quantization},
    is_forbidden_frequency, PllConfig, PllStrategy, ReversePllSettings,
};
use crate::{error::ToFError, usecase::Ssc};

/// The DPHY output is half the VCO frequency.
const DPHY_POST_DIVIDER: u16 = 2;

fn dphy_settings(core: &FractionalN, frequency: f64, ssc: Option<&Ssc>) -> Result<PllConfig, ToFError> {
    let vco = frequency * DPHY_POST_DIVIDER as f64;
    let config = core.compute(vco, 0, ssc)?;
    let (ref_clk, _) = core.ref_clk();
    Ok(PllConfig {
        feasible: config.feasible && !is_forbidden_frequency(ref_clk, vco, frequency),
        ..config
    })
}

/// DPHY PLL of the M2450 A12 imager.
///
/// Above 20 MHz the system clock is halved to form the reference clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DphyPllM2450A12 {
    core: FractionalN,
}

impl DphyPllM2450A12 {
    /// Creates the strategy for the given system clock in Hz.
    #[must_use]
    pub const fn new(system_frequency: u32) -> Self {
        Self {
            core: FractionalN::new(system_frequency, Quantization::Truncate, 0),
        }
    }
}

impl PllStrategy for DphyPllM2450A12 {
    fn pll_settings(&self, frequency: f64, ssc: Option<&Ssc>) -> Result<PllConfig, ToFError> {
        dphy_settings(&self.core, frequency, ssc)
    }

    fn reverse_pll_settings(&self, registers: &[u16]) -> Result<ReversePllSettings, ToFError> {
        self.core.reverse(registers, |_| DPHY_POST_DIVIDER)
    }
}

/// DPHY PLL of the M2452 imager.
///
/// Same macro as [`DphyPllM2450A12`] with rounded spread spectrum words and bit 11 of the last
/// word tied high.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DphyPllM2452 {
    core: FractionalN,
}

impl DphyPllM2452 {
    /// Creates the strategy for the given system clock in Hz.
    #[must_use]
    pub const fn new(system_frequency: u32) -> Self {
        Self {
            core: FractionalN::new(system_frequency, Quantization::Round, 1 << 11),
        }
    }
}

impl PllStrategy for DphyPllM2452 {
    fn pll_settings(&self, frequency: f64, ssc: Option<&Ssc>) -> Result<PllConfig, ToFError> {
        dphy_settings(&self.core, frequency, ssc)
    }

    fn reverse_pll_settings(&self, registers: &[u16]) -> Result<ReversePllSettings, ToFError> {
        self.core.reverse(registers, |_| DPHY_POST_DIVIDER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SSC_22MHZ: Ssc = Ssc {
        freq: 30000.,
        kspread: 0.,
        delta: 0.005,
    };

    #[rstest::rstest]
    #[case(false, [38049, 21928, 0, 0, 0, 0, 0, 0], 10_000_000, 400e6, None)]
    #[case(true, [42019, 21928, 17873, 32535, 46624, 0, 35746, 1582], 22_000_000, 400e6, Some(SSC_22MHZ))]
    fn m2450_a12(
        #[case] feasible: bool,
        #[case] registers: [u16; 8],
        #[case] system_frequency: u32,
        #[case] frequency: f64,
        #[case] ssc: Option<Ssc>,
    ) -> anyhow::Result<()> {
        let pll = DphyPllM2450A12::new(system_frequency);
        let config = pll.pll_settings(frequency, ssc.as_ref())?;
        assert_eq!(feasible, config.feasible);
        assert_eq!(registers, config.registers);
        Ok(())
    }

    #[rstest::rstest]
    #[case([38049, 21928, 0, 0, 0, 0, 0, 2048], None)]
    #[case([33953, 21928, 26214, 21222, 42535, 0, 0, 3584], Some(Ssc { freq: 30000., kspread: 0., delta: 0.005 }))]
    fn m2452(#[case] registers: [u16; 8], #[case] ssc: Option<Ssc>) -> anyhow::Result<()> {
        let pll = DphyPllM2452::new(10_000_000);
        let config = pll.pll_settings(400e6, ssc.as_ref())?;
        assert!(!config.feasible);
        assert_eq!(registers, config.registers);
        Ok(())
    }

    #[test]
    fn reverse_with_ssc() -> anyhow::Result<()> {
        let pll = DphyPllM2450A12::new(22_000_000);
        let settings = pll.reverse_pll_settings(&[42019, 21928, 17873, 32535, 46624, 0, 35746, 1582])?;
        approx::assert_abs_diff_eq!(400e6, settings.out_freq, epsilon = 3.);
        approx::assert_abs_diff_eq!(800e6, settings.vco_freq, epsilon = 6.);
        approx::assert_abs_diff_eq!(11e6, settings.ref_clk_freq);
        approx::assert_abs_diff_eq!(30000., settings.ssc_freq, epsilon = 150.);
        approx::assert_abs_diff_eq!(0., settings.ssc_kspread, epsilon = 0.01);
        approx::assert_abs_diff_eq!(0.005, settings.ssc_delta, epsilon = 0.001);
        assert!(settings.wavegen);
        assert!(settings.sdm);
        assert!(!settings.ext_mmd_enabled);
        assert!(settings.input_div_2);
        Ok(())
    }

    #[rstest::rstest]
    #[case(10_000_000)]
    #[case(19_200_000)]
    #[case(22_000_000)]
    #[case(26_000_000)]
    fn round_trip(#[case] system_frequency: u32) -> anyhow::Result<()> {
        use rand::Rng;

        let pll = DphyPllM2450A12::new(system_frequency);
        let mut rng = rand::rng();
        let mut checked = 0;
        while checked < 200 {
            let frequency = rng.random_range(200e6..480e6);
            let ssc = rng.random_bool(0.5).then(|| Ssc {
                freq: [10000., 20000., 30000.][rng.random_range(0..3)],
                kspread: [0., 0.5, 1.][rng.random_range(0..3)],
                delta: [0.005, 0.0125, 0.015][rng.random_range(0..3)],
            });
            let config = pll.pll_settings(frequency, ssc.as_ref())?;
            if !config.feasible {
                continue;
            }
            checked += 1;
            let settings = pll.reverse_pll_settings(&config.registers)?;
            approx::assert_relative_eq!(frequency, settings.out_freq, max_relative = 1e-6);
            if let Some(ssc) = ssc {
                approx::assert_abs_diff_eq!(ssc.freq, settings.ssc_freq, epsilon = 150.);
                approx::assert_abs_diff_eq!(ssc.kspread, settings.ssc_kspread, epsilon = 0.01);
                approx::assert_abs_diff_eq!(ssc.delta, settings.ssc_delta, epsilon = 0.001);
            }
        }
        Ok(())
    }

    #[test]
    fn zero_ssc_frequency() {
        let ssc = Ssc {
            freq: 0.,
            kspread: 0.5,
            delta: 0.01,
        };
        assert_eq!(
            Err(ToFError::logic("fssc must be greater than zero")),
            DphyPllM2450A12::new(26_000_000).pll_settings(400e6, Some(&ssc))
        );
    }

    #[rstest::rstest]
    #[case(true, 10e6, 800.5e6, 400e6)]
    #[case(false, 10e6, 800_500_001., 400e6)]
    #[case(true, 10e6, 799.5e6, 400e6)]
    #[case(false, 10e6, 799_499_999., 400e6)]
    #[case(true, 10e6, 805.5e6, 400e6)]
    #[case(false, 13e6, 960e6, 480e6)]
    #[case(true, 13e6, 960_000_001., 480e6)]
    #[case(false, 13e6, 460e6, 200e6)]
    #[case(true, 13e6, 460e6, 199_999_999.)]
    fn forbidden_bands(#[case] expect: bool, #[case] ref_clk: f64, #[case] vco: f64, #[case] frequency: f64) {
        assert_eq!(expect, is_forbidden_frequency(ref_clk, vco, frequency));
    }

    #[rstest::rstest]
    #[case(false, 201_250_000.)]
    #[case(true, 201_249_999.)]
    #[case(false, 201_750_000.)]
    #[case(true, 201_750_001.)]
    #[case(true, 200_000_000.)]
    #[case(false, 199_999_999.)]
    #[case(true, 480_000_000.)]
    #[case(false, 480_000_001.)]
    fn forbidden_bands_in_settings(#[case] feasible: bool, #[case] frequency: f64) -> anyhow::Result<()> {
        let strategies: [&dyn PllStrategy; 2] =
            [&DphyPllM2450A12::new(26_000_000), &DphyPllM2452::new(26_000_000)];
        for pll in strategies {
            assert_eq!(feasible, pll.pll_settings(frequency, None)?.feasible);
        }
        Ok(())
    }
}
