/// The lowest VCO frequency at which a charge pump current code may be used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChargePumpBreakpoint {
    /// VCO frequency in Hz.
    pub vco: f64,
    /// Current selection code.
    pub code: u16,
}

const fn bp(vco: f64, code: u16) -> ChargePumpBreakpoint {
    ChargePumpBreakpoint { vco, code }
}

/// Breakpoints for reference clocks up to 15 MHz, ascending.
const LOW_REF: &[ChargePumpBreakpoint] = &[bp(0., 0), bp(570e6, 1), bp(800e6, 2)];
/// Breakpoints for reference clocks above 15 MHz, ascending.
const HIGH_REF: &[ChargePumpBreakpoint] = &[bp(0., 0), bp(650e6, 1)];

/// Selects the charge pump current for a reference clock and a VCO frequency.
///
/// The highest code whose breakpoint is not above `vco` wins.
#[must_use]
pub fn charge_pump_current(ref_clk: f64, vco: f64) -> u16 {
    let table = if ref_clk <= 15e6 { LOW_REF } else { HIGH_REF };
    table
        .iter()
        .take_while(|b| b.vco <= vco)
        .last()
        .map_or(0, |b| b.code)
}
