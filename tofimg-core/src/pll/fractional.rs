use super::{charge_pump_current, PllConfig, ReversePllSettings, PLL_CFG_WORDS};
use crate::{error::ToFError, usecase::Ssc};

const TWO_POW_21: f64 = (1u32 << 21) as f64;
const TWO_POW_23: f64 = (1u32 << 23) as f64;

const SSC_FREQ_MAX: f64 = 100_000.;
const SEEKING_MARGIN: f64 = 500_000.;

const LF_RES_SEL: u16 = 0;
const BOOST_UP_EN: u16 = 1;
const BOOST_UP_MAXCURR_EN: u16 = 0;
const CP_FORCE_FIX_BIAS: u16 = 0;
const CURRENT_SEL_TESTOPA: u16 = 1;
const CURRENT_SEL_LFOPA: u16 = 1;
const CURRENT_SEL_ITEST: u16 = 1;
const CURRENT_SEL_CPOTA: u16 = 1;
const CP_REF_SEL: u16 = 5;

/// How the spread spectrum words are quantized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Quantization {
    Truncate,
    Round,
}

impl Quantization {
    fn apply(self, v: f64) -> f64 {
        match self {
            Self::Truncate => v.trunc(),
            Self::Round => v.round(),
        }
    }
}

/// The fractional-N PLL core shared by the DPHY and modulation PLLs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct FractionalN {
    system_frequency: u32,
    quantization: Quantization,
    /// Bits that are always set in the last configuration word.
    cfg7_fixed: u16,
}

pub(crate) fn is_seeking_forbidden(ref_clk: f64, vco: f64) -> bool {
    let margin = |period: f64| {
        let rem = vco % period;
        rem.min(period - rem)
    };
    margin(ref_clk) <= SEEKING_MARGIN || margin(ref_clk / 2.) <= SEEKING_MARGIN
}

fn sign_extend(value: u32, width: u32) -> i32 {
    let shift = 32 - width;
    ((value << shift) as i32) >> shift
}

impl FractionalN {
    pub(crate) const fn new(system_frequency: u32, quantization: Quantization, cfg7_fixed: u16) -> Self {
        Self {
            system_frequency,
            quantization,
            cfg7_fixed,
        }
    }

    /// Returns the internal reference clock and whether the input divider is enabled.
    pub(crate) fn ref_clk(&self) -> (f64, bool) {
        if self.system_frequency as f64 <= 20e6 {
            (self.system_frequency as f64, false)
        } else {
            (self.system_frequency as f64 / 2., true)
        }
    }

    /// Computes the register words for a VCO frequency. `out_sel` is written to the post divider
    /// field. The returned feasibility only covers the spread spectrum limits.
    pub(crate) fn compute(&self, vco: f64, out_sel: u16, ssc: Option<&Ssc>) -> Result<PllConfig, ToFError> {
        let (ref_clk, input_div_2) = self.ref_clk();
        let mut cfg = [0u16; PLL_CFG_WORDS];
        let mut bad_ssc = false;

        let base_div_ratio = vco / ref_clk;
        let divmod_frac58 = 18. + 2. * ((base_div_ratio - 19.) / 2.).floor();
        let swallow_frac58 = 2. * (base_div_ratio % divmod_frac58);
        let (divmod_frac, swallow_frac) = if swallow_frac58 > 5.8 {
            bad_ssc |= ssc.is_some();
            let divmod = divmod_frac58 + 2.;
            (divmod, 2. * (base_div_ratio % divmod))
        } else {
            (divmod_frac58, swallow_frac58)
        };

        let const_sdm = ((swallow_frac - 4.) * TWO_POW_21).floor();
        let const_sdm_24 = if const_sdm < 0. {
            (0x0100_0000 - ((-const_sdm) as u32 & 0x7F_FFFF)) & 0xFF_FFFF
        } else {
            const_sdm as u32 & 0x7F_FFFF
        };
        let ctr_preset = divmod_frac / 2. - 2.;
        let is_fractional = base_div_ratio % 0.5 != 0.;

        let (enable_ext, enable_const) = match (ssc.is_some(), is_fractional) {
            (true, _) => (0u16, 0u16),
            (false, true) => (0, 1),
            (false, false) => (1, 0),
        };
        let (pll_ensdm, en_const_sdm) = if enable_ext == 1 {
            (0u16, 0u16)
        } else {
            (1, enable_const)
        };
        let mmd_in = ctr_preset as u16;
        let ext_mmd_div_ratio = swallow_frac as u16;
        let cp_i_sel = charge_pump_current(ref_clk, vco);

        if let Some(ssc) = ssc {
            if ssc.freq <= 0. {
                return Err(ToFError::logic("fssc must be greater than zero"));
            }
            let vco_min_possible = ref_clk * (2. * (ctr_preset + 2.) + 0.5);
            let vco_max_possible = ref_clk * (2. * (ctr_preset + 2.) + 3.);
            let vco_min = vco * (1. + ssc.delta * (ssc.kspread - 1.));
            let vco_max = vco * (1. + ssc.kspread * ssc.delta);
            bad_ssc |= vco_min_possible > vco_min || vco_max_possible < vco_max;

            let min_base_div_ratio = vco * (1. - ssc.delta + ssc.kspread * ssc.delta) / ref_clk;
            let min_swallow = 2. * (min_base_div_ratio % divmod_frac58);
            let minipeak = self.quantization.apply((min_swallow - 4.) * TWO_POW_21);
            let limit = (1i64 << 23) as f64;
            let minipeak = minipeak.clamp(-limit, limit - 1.) as i32;

            let increment_num = vco * ssc.delta / ref_clk;
            let increment_den = ref_clk / (2. * ssc.freq);
            let increment = self
                .quantization
                .apply(increment_num * TWO_POW_21 / increment_den * 2.)
                .clamp(0., u16::MAX as f64) as u64;
            let cyclesby2 = self
                .quantization
                .apply(ref_clk / (2. * ssc.freq) - 1.)
                .clamp(0., ((1 << 14) - 1) as f64) as u64;

            let sscmod = (cyclesby2 << 40) | (increment << 24) | (minipeak as u32 & 0xFF_FFFF) as u64;
            cfg[2] = (sscmod & 0xFFFF) as u16;
            cfg[3] = ((sscmod >> 16) & 0xFFFF) as u16;
            cfg[4] = ((sscmod >> 32) & 0xFFFF) as u16;
            cfg[5] = ((sscmod >> 48) & 0x3F) as u16;

            bad_ssc |= ssc.freq > SSC_FREQ_MAX;
        }

        cfg[0] = ext_mmd_div_ratio << 13
            | enable_ext << 12
            | mmd_in << 5
            | LF_RES_SEL << 4
            | CP_FORCE_FIX_BIAS << 3
            | BOOST_UP_MAXCURR_EN << 2
            | (input_div_2 as u16) << 1
            | BOOST_UP_EN;
        cfg[1] = CURRENT_SEL_TESTOPA << 14
            | CURRENT_SEL_LFOPA << 12
            | CURRENT_SEL_ITEST << 10
            | CURRENT_SEL_CPOTA << 8
            | cp_i_sel << 6
            | CP_REF_SEL << 3
            | (out_sel & 0x7);
        cfg[6] = (const_sdm_24 & 0xFFFF) as u16;
        cfg[7] = self.cfg7_fixed
            | (ssc.is_some() as u16) << 10
            | pll_ensdm << 9
            | en_const_sdm << 8
            | ((const_sdm_24 >> 16) & 0xFF) as u16;

        Ok(PllConfig {
            registers: cfg,
            feasible: !bad_ssc,
        })
    }

    /// Recovers the settings. `post_divider` maps the post divider field to the division ratio.
    pub(crate) fn reverse(
        &self,
        registers: &[u16],
        post_divider: impl Fn(u16) -> u16,
    ) -> Result<ReversePllSettings, ToFError> {
        let Some(cfg) = registers.first_chunk::<PLL_CFG_WORDS>() else {
            return Err(ToFError::logic(
                "register list must contain minimum 8 registers",
            ));
        };
        let bits = |reg: u16, from: u32, width: u32| (reg as u32 >> from) & ((1 << width) - 1);

        let input_div_2 = bits(cfg[0], 1, 1) == 1;
        let ext_mmd_enabled = bits(cfg[0], 12, 1) == 1;
        let ext_mmd_div_ratio = bits(cfg[0], 13, 3) as u16;
        let mmd_in = bits(cfg[0], 5, 7) as u16;
        let post_divider = post_divider(bits(cfg[1], 0, 3) as u16);
        let const_sdm = sign_extend((cfg[7] as u32 & 0xFF) << 16 | cfg[6] as u32, 24);
        let const_sdm_enabled = bits(cfg[7], 8, 1) == 1;
        let sdm = bits(cfg[7], 9, 1) == 1;
        let wavegen = bits(cfg[7], 10, 1) == 1;

        let ref_clk = self.system_frequency as f64 / if input_div_2 { 2. } else { 1. };
        let swallow_frac = const_sdm as f64 / TWO_POW_21 + 4.;
        let div = if ext_mmd_enabled {
            ext_mmd_div_ratio as f64 / 2. + 2. * mmd_in as f64 + 4.
        } else {
            swallow_frac / 2. + 2. * mmd_in as f64 + 4.
        };
        let vco = div * ref_clk;

        let sscmod = (cfg[5] as u64 & 0x3F) << 48
            | (cfg[4] as u64) << 32
            | (cfg[3] as u64) << 16
            | cfg[2] as u64;
        let minipeak = sign_extend((sscmod & 0xFF_FFFF) as u32, 24);
        let increment = ((sscmod >> 24) & 0xFFFF) as f64;
        let cyclesby2 = ((sscmod >> 40) & 0x3FFF) as f64;

        let min_swallow = minipeak as f64 / TWO_POW_21 + 4.;
        let divmod = 18. + 2. * ((div - 19.) / 2.).floor();
        let min_base_div_ratio = min_swallow / 2. + divmod;
        let ssc_freq = ref_clk / ((cyclesby2 + 1.) * 2.);
        let ssc_delta = ref_clk * ref_clk * increment / (TWO_POW_23 * vco * ssc_freq);
        let ssc_kspread = if ssc_delta == 0. {
            0.
        } else {
            (min_base_div_ratio * ref_clk / vco - 1. + ssc_delta) / ssc_delta
        };

        Ok(ReversePllSettings {
            out_freq: vco / post_divider as f64,
            vco_freq: vco,
            ref_clk_freq: ref_clk,
            ssc_freq,
            ssc_delta,
            ssc_kspread,
            wavegen,
            sdm,
            const_sdm_enabled,
            const_sdm,
            input_div_2,
            ext_mmd_enabled,
            ext_mmd_div_ratio,
            mmd_in,
            post_divider,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(-1, 0xFF_FFFF)]
    #[case(-0x80_0000, 0x80_0000)]
    #[case(0x7F_FFFF, 0x7F_FFFF)]
    #[case(0, 0)]
    fn sign_extend_24(#[case] expect: i32, #[case] value: u32) {
        assert_eq!(expect, sign_extend(value, 24));
    }

    #[test]
    fn reverse_needs_eight_words() {
        let core = FractionalN::new(10_000_000, Quantization::Truncate, 0);
        assert_eq!(
            Err(ToFError::logic(
                "register list must contain minimum 8 registers"
            )),
            core.reverse(&[0; 7], |_| 2)
        );
    }
}
