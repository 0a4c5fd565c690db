use tofimg_core::usecase::DutyCycle;

/// Grayscale marker of the phase shift word.
pub const GRAYSCALE_BIT: u16 = 0x2000;

const fn ps(clock: u16, shift: u16) -> u16 {
    clock << 5 | shift << 1
}

/// Returns the phase shift word for the illumination clock divided by four.
///
/// `None` if the duty cycle or the phase angle has no mapping.
#[must_use]
pub const fn phase_shift(duty_cycle: DutyCycle, phase_angle: u16) -> Option<u16> {
    let words = match duty_cycle {
        DutyCycle::Dc0 => [0, 0, 0, 0],
        DutyCycle::Dc25 => [ps(0, 6), ps(2, 0), ps(4, 2), ps(6, 4)],
        DutyCycle::Dc25Dep => [ps(0, 2), ps(2, 4), ps(4, 6), ps(6, 0)],
        DutyCycle::Dc37_5 => [10, 78, 130, 198],
        DutyCycle::Dc37_5Dep => [ps(0, 3), ps(2, 5), ps(4, 7), ps(6, 1)],
        DutyCycle::Dc50 => [8, 76 | 2 << 9, 128 | 4 << 9, 196 | 6 << 9],
        _ => return None,
    };
    match phase_angle {
        0 => Some(words[0]),
        90 => Some(words[1]),
        180 => Some(words[2]),
        270 => Some(words[3]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rstest::rstest]
    #[case(Some(0x000C), DutyCycle::Dc25, 0)]
    #[case(Some(0x0040), DutyCycle::Dc25, 90)]
    #[case(Some(0x00C8), DutyCycle::Dc25, 270)]
    #[case(Some(0x008C), DutyCycle::Dc25Dep, 180)]
    #[case(Some(0x004A), DutyCycle::Dc37_5Dep, 90)]
    #[case(Some(0x0880), DutyCycle::Dc50, 180)]
    #[case(Some(0x0008), DutyCycle::Dc50, 0)]
    #[case(Some(0), DutyCycle::Dc0, 270)]
    #[case(None, DutyCycle::Dc75, 0)]
    #[case(None, DutyCycle::Auto, 0)]
    #[case(None, DutyCycle::Dc50, 45)]
    fn mapping(#[case] expect: Option<u16>, #[case] dc: DutyCycle, #[case] angle: u16) {
        assert_eq!(expect, phase_shift(dc, angle));
    }
}
