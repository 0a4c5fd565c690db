use tofimg_core::{error::ToFError, usecase::Alignment};

use super::RawFrameTiming;
use crate::use_case::ImagerUseCaseDefinition;

/// Returns the time budget in seconds of each raw frame.
///
/// Clock aligned frames start a period of the target rate. Start aligned frames follow their
/// predecessor, which keeps only its own raw frame time. Stop aligned frames are placed at the
/// end of the period of the nearest preceding start or clock aligned frame, next-stop aligned
/// frames directly after it if they follow it immediately.
pub fn generate_raw_frame_timings(
    use_case: &ImagerUseCaseDefinition,
    timing: &dyn RawFrameTiming,
) -> Result<Vec<f64>, ToFError> {
    if use_case.target_rate() == 0 {
        return Err(ToFError::logic("The target rate must not be zero"));
    }
    let period = 1. / use_case.target_rate() as f64;
    let frames = use_case.raw_frames();
    let mut times = vec![0.; frames.len()];

    for (i, rf) in frames.iter().enumerate() {
        if i == 0 && rf.alignment != Alignment::ClockAligned {
            return Err(ToFError::logic("The first raw frame must be clock aligned"));
        }
        match rf.alignment {
            Alignment::ClockAligned => times[i] = period,
            Alignment::StartAligned => {
                let prev = &frames[i - 1];
                if matches!(
                    prev.alignment,
                    Alignment::StopAligned | Alignment::NextStopAligned
                ) {
                    return Err(ToFError::logic(
                        "A start aligned raw frame must not follow a stop aligned one",
                    ));
                }
                let t_prev = timing
                    .raw_frame_time(
                        use_case,
                        prev.exposure_time,
                        prev.modulation_frequency.hz(),
                        prev.is_start_of_linked_raw_frames,
                    )
                    .time;
                times[i] = times[i - 1] - t_prev;
                times[i - 1] = t_prev;
            }
            Alignment::StopAligned | Alignment::NextStopAligned => {
                if rf.alignment == Alignment::StopAligned
                    && frames[i - 1].alignment == Alignment::NextStopAligned
                {
                    return Err(ToFError::logic(
                        "A stop aligned raw frame must not follow a next-stop aligned one",
                    ));
                }
                let last_ref = frames[..i]
                    .iter()
                    .rposition(|f| {
                        matches!(
                            f.alignment,
                            Alignment::ClockAligned | Alignment::StartAligned
                        )
                    })
                    .unwrap_or_default();
                let t = timing
                    .raw_frame_time(
                        use_case,
                        rf.exposure_time,
                        rf.modulation_frequency.hz(),
                        rf.is_start_of_linked_raw_frames,
                    )
                    .time;
                times[i] = t;
                if rf.alignment == Alignment::NextStopAligned && i - last_ref == 1 {
                    times[last_ref] += period - t;
                } else {
                    times[last_ref] -= t;
                }
            }
        }
    }
    Ok(times)
}

#[cfg(test)]
pub(crate) mod tests {
    use approx::assert_abs_diff_eq;
    use tofimg_core::common::MHz;

    use super::*;
    use crate::{
        measurement::RawFrameTime,
        use_case::tests::{four_phase_gray, linked},
    };

    /// One millisecond plus the exposure, two for the first of a run.
    pub(crate) struct LinearTiming;

    impl RawFrameTiming for LinearTiming {
        fn raw_frame_time(
            &self,
            _: &ImagerUseCaseDefinition,
            exposure_time: u32,
            _: u32,
            first: bool,
        ) -> RawFrameTime {
            RawFrameTime {
                time: if first { 2e-3 } else { 1e-3 } + exposure_time as f64 * 1e-6,
                feasible: true,
            }
        }
    }

    #[test]
    fn start_aligned() -> anyhow::Result<()> {
        let uc = four_phase_gray(5, 1000, 200);
        let times = generate_raw_frame_timings(&uc, &LinearTiming)?;
        let expect = [3e-3, 2e-3, 2e-3, 2e-3, 0.2 - 9e-3];
        assert_eq!(expect.len(), times.len());
        expect
            .iter()
            .zip(&times)
            .for_each(|(e, t)| assert_abs_diff_eq!(e, t, epsilon = 1e-12));
        assert_abs_diff_eq!(0.2, times.iter().sum::<f64>(), epsilon = 1e-12);
        Ok(())
    }

    #[rstest::rstest]
    #[case(Alignment::StopAligned, [0.2 - 2.2e-3, 2.2e-3])]
    #[case(Alignment::NextStopAligned, [0.4 - 2.2e-3, 2.2e-3])]
    fn stop_aligned(#[case] alignment: Alignment, #[case] expect: [f64; 2]) -> anyhow::Result<()> {
        let mut frames = linked(30 * MHz, 1000, 1);
        frames[0].alignment = Alignment::ClockAligned;
        let mut gray = linked(30 * MHz, 200, 1);
        gray[0].alignment = alignment;
        frames.extend(gray);
        let uc = ImagerUseCaseDefinition::new(5, frames);
        let times = generate_raw_frame_timings(&uc, &LinearTiming)?;
        assert_abs_diff_eq!(expect[0], times[0], epsilon = 1e-12);
        assert_abs_diff_eq!(expect[1], times[1], epsilon = 1e-12);
        Ok(())
    }

    #[rstest::rstest]
    #[case("The first raw frame must be clock aligned", [Alignment::StartAligned, Alignment::StartAligned, Alignment::StartAligned])]
    #[case("A start aligned raw frame must not follow a stop aligned one", [Alignment::ClockAligned, Alignment::StopAligned, Alignment::StartAligned])]
    #[case("A stop aligned raw frame must not follow a next-stop aligned one", [Alignment::ClockAligned, Alignment::NextStopAligned, Alignment::StopAligned])]
    fn invalid_order(#[case] msg: &str, #[case] alignments: [Alignment; 3]) {
        let frames = alignments
            .into_iter()
            .map(|alignment| crate::ImagerRawFrame {
                alignment,
                ..crate::ImagerRawFrame::new(30 * MHz, 100)
            })
            .collect();
        let uc = ImagerUseCaseDefinition::new(5, frames);
        assert_eq!(
            Err(ToFError::logic(msg)),
            generate_raw_frame_timings(&uc, &LinearTiming)
        );
    }

    #[test]
    fn zero_rate() {
        let uc = four_phase_gray(0, 1000, 200);
        assert!(generate_raw_frame_timings(&uc, &LinearTiming).is_err());
    }
}
