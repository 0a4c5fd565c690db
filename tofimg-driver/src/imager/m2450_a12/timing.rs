use crate::{
    defined::{effective_frequency, FSYSCLK},
    measurement::{RawFrameTime, RawFrameTiming},
    register::RegisterTracker,
    use_case::ImagerUseCaseDefinition,
    ImageDataTransfer,
};

use super::registers::{CFGCNT_IFDEL, CFGCNT_ROS1};

const SEQUENCE_CFG_TIME_FIRST: f64 = 12.6e-6;
const SEQUENCE_CFG_TIME_REGULAR: f64 = 3.8e-6;
const EXPOSURE_PRE_ILLU_CYC: f64 = 16.;
const EXPOSURE_WARMUP_CYC: f64 = 0.;
const EXPOSURE_PRE_MOD_SCALE_CYC: f64 = 1.;
const EXPOSURE_RH_DELAY_CYC: f64 = 3.;
const POWER_UP_TIME: f64 = 12e-6;
const IF_TRIG_AND_READOUT_CFG_TIME: f64 = 2e-6;
const PREPARE_FRAME_START_TIME: f64 = 1e-6;
const DUMMY_CONV_CYC: f64 = 2.;
const CC_BINSTAT_CYC: f64 = 2.;
const BINSTAT_CYC: f64 = 2.;
const CC_IFTRIG_CYC: f64 = 3.;
const SHUTDOWN_CYC: f64 = 50.;

/// Readout delays in sequencer cycles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReadoutDelays {
    /// Interface delay.
    pub if_delay: f64,
    /// Line blanking.
    pub line_blank: f64,
    /// Start of conversion delay of the ADC.
    pub adc_socd: f64,
    /// Odd delay of the ADC.
    pub adc_oddd: f64,
}

impl Default for ReadoutDelays {
    fn default() -> Self {
        Self {
            if_delay: 0.,
            line_blank: 132.,
            adc_socd: 2.,
            adc_oddd: 20.,
        }
    }
}

impl ReadoutDelays {
    /// Decodes the delays from the registers written to the imager.
    #[must_use]
    pub fn from_registers(tracker: &RegisterTracker) -> Self {
        let mut delays = Self::default();
        if let Some(ifdel) = tracker.get(CFGCNT_IFDEL) {
            delays.if_delay = (ifdel & 0x7FF) as f64;
        }
        if let Some(ros1) = tracker.get(CFGCNT_ROS1) {
            delays.adc_socd = 2. * (1. + ((ros1 >> 11) & 3) as f64);
            delays.adc_oddd = 20. + 2. * ((ros1 >> 13) & 7) as f64;
            let lowro = 2f64.powi(((ros1 >> 6) & 3) as i32);
            delays.line_blank = lowro * (delays.adc_socd + delays.adc_oddd) * (ros1 & 0x3F) as f64;
        }
        delays
    }
}

/// Raw frame timing of the M2450 sequencer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct M2450Timing {
    interface: ImageDataTransfer,
    delays: ReadoutDelays,
}

impl M2450Timing {
    /// Creates the timing for `interface` with the given readout delays.
    #[must_use]
    pub const fn new(interface: ImageDataTransfer, delays: ReadoutDelays) -> Self {
        Self { interface, delays }
    }

    fn interface_cycles(&self, pixels: f64) -> f64 {
        match self.interface {
            ImageDataTransfer::Pif => (((2. * pixels + 1.) / 11.).ceil() + 1.) * 11.,
            ImageDataTransfer::Mipi1Lane => 77. + pixels * 2. + 52.,
            ImageDataTransfer::Mipi2Lane => 74. + pixels + 55.,
        }
    }

    fn exposure_time(exposure_time: u32, modulation_frequency: u32) -> f64 {
        let clk_illu = FSYSCLK / modulation_frequency as f64;
        let reg_exposure = (exposure_time as f64 * modulation_frequency as f64 / 8e6).floor();
        let cycles = ((6.
            + EXPOSURE_PRE_ILLU_CYC
            + EXPOSURE_WARMUP_CYC
            + 8. * EXPOSURE_PRE_MOD_SCALE_CYC
            + 8. * reg_exposure
            + 1.
            + EXPOSURE_RH_DELAY_CYC)
            * clk_illu
            + 3.)
            .ceil()
            + (1. + 2. * clk_illu + 1.).ceil();
        cycles / FSYSCLK
    }

    fn readout_time(&self, columns: u16, rows: u16) -> f64 {
        let ReadoutDelays {
            if_delay,
            line_blank,
            adc_socd,
            adc_oddd,
        } = self.delays;
        let pixels = columns as f64;
        // One pseudo data line precedes the image.
        let lines = 1. + rows as f64;
        let adc = adc_socd + adc_oddd;

        let dark = adc;
        let precharge = adc;
        let readout = 2. * adc_socd + adc_oddd;
        let dummy = (DUMMY_CONV_CYC + 1.) * adc;
        let conversion = pixels / 16. * adc;
        let first_line_extra = dummy + adc - line_blank;
        let wait = ((precharge
            + readout
            + CC_BINSTAT_CYC
            + BINSTAT_CYC
            + if_delay
            + CC_IFTRIG_CYC
            + self.interface_cycles(pixels))
            / adc)
            .ceil()
            * adc
            - (adc + conversion);
        let line = line_blank + dark + precharge + conversion + wait + adc;
        ((lines - 1.) * line + first_line_extra) / FSYSCLK
    }
}

impl RawFrameTiming for M2450Timing {
    fn raw_frame_time(
        &self,
        use_case: &ImagerUseCaseDefinition,
        exposure_time: u32,
        modulation_frequency: u32,
        first: bool,
    ) -> RawFrameTime {
        let (columns, rows) = use_case.image();
        let sequence_cfg = if first {
            SEQUENCE_CFG_TIME_FIRST
        } else {
            SEQUENCE_CFG_TIME_REGULAR
        };
        let time = sequence_cfg
            + Self::exposure_time(exposure_time, effective_frequency(modulation_frequency))
            + POWER_UP_TIME
            + IF_TRIG_AND_READOUT_CFG_TIME
            + PREPARE_FRAME_START_TIME
            + self.readout_time(columns, rows)
            + SHUTDOWN_CYC / FSYSCLK;

        match use_case.raw_frame_rate() {
            0 => RawFrameTime {
                time,
                feasible: true,
            },
            rate => {
                let period = 1. / rate as f64;
                if time <= period {
                    RawFrameTime {
                        time: period,
                        feasible: true,
                    }
                } else {
                    RawFrameTime {
                        time,
                        feasible: false,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tofimg_core::common::MHz;

    use super::*;
    use crate::{register::RegisterMap, ImagerRawFrame};

    fn use_case(raw_frame_rate: u16) -> ImagerUseCaseDefinition {
        ImagerUseCaseDefinition::new(5, vec![ImagerRawFrame::new(30 * MHz, 1000)])
            .with_raw_frame_rate(raw_frame_rate)
    }

    #[test]
    fn delays_from_registers() -> anyhow::Result<()> {
        let mut bridge = crate::register::tracker::tests::RecordingBridge::default();
        let mut tracker = RegisterTracker::new();
        assert_eq!(ReadoutDelays::default(), ReadoutDelays::from_registers(&tracker));

        // socd 1, oddd 2, lowro 1, lblank 3
        let ros1 = 1 << 11 | 2 << 13 | 1 << 6 | 3;
        tracker.track_and_write(
            &mut bridge,
            &RegisterMap::from([(CFGCNT_IFDEL, 0x4000 | 0x0123), (CFGCNT_ROS1, ros1)]),
        )?;
        let delays = ReadoutDelays::from_registers(&tracker);
        assert_relative_eq!(291., delays.if_delay);
        assert_relative_eq!(4., delays.adc_socd);
        assert_relative_eq!(24., delays.adc_oddd);
        assert_relative_eq!(2. * 28. * 3., delays.line_blank);
        Ok(())
    }

    #[test]
    fn longer_for_first_and_longer_exposure() {
        let timing = M2450Timing::new(ImageDataTransfer::Mipi1Lane, ReadoutDelays::default());
        let uc = use_case(0);
        let regular = timing.raw_frame_time(&uc, 1000, 30_000_000, false);
        let first = timing.raw_frame_time(&uc, 1000, 30_000_000, true);
        let long = timing.raw_frame_time(&uc, 2000, 30_000_000, false);
        assert!(regular.feasible);
        assert_relative_eq!(8.8e-6, first.time - regular.time, max_relative = 1e-9);
        assert!(long.time - regular.time > 0.99e-3);
        assert!(regular.time > 1e-3 && regular.time < 3e-3);
    }

    #[rstest::rstest]
    #[case(ImageDataTransfer::Pif)]
    #[case(ImageDataTransfer::Mipi2Lane)]
    fn interfaces_are_faster_than_single_lane(#[case] interface: ImageDataTransfer) {
        let uc = use_case(0);
        let single = M2450Timing::new(ImageDataTransfer::Mipi1Lane, ReadoutDelays::default())
            .raw_frame_time(&uc, 100, 30_000_000, false);
        let other = M2450Timing::new(interface, ReadoutDelays::default())
            .raw_frame_time(&uc, 100, 30_000_000, false);
        assert!(other.time <= single.time);
    }

    #[rstest::rstest]
    #[case(true, 0.01, 100)]
    #[case(false, 0., 1000)]
    fn raw_frame_rate(#[case] feasible: bool, #[case] expect: f64, #[case] rate: u16) {
        let timing = M2450Timing::new(ImageDataTransfer::Mipi1Lane, ReadoutDelays::default());
        let t = timing.raw_frame_time(&use_case(rate), 1000, 30_000_000, false);
        assert_eq!(feasible, t.feasible);
        if feasible {
            assert_relative_eq!(expect, t.time);
        } else {
            assert!(t.time > 1. / rate as f64);
        }
    }
}
