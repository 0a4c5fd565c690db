use std::collections::BTreeSet;

use tofimg_core::{
    error::ToFError,
    usecase::{Alignment, UseCaseDefinition},
};

use super::ImagerUseCaseDefinition;
use crate::ImagerRawFrame;

impl ImagerUseCaseDefinition {
    /// Narrows `use_case` to the raw frames the imager captures.
    ///
    /// `roi_start` is the first active pixel as returned by the lens center and
    /// `raw_frame_rate` the rate of the flow control, zero for unthrottled transfer.
    #[tracing::instrument(level = "debug", skip(use_case), fields(use_case = %use_case.type_name()))]
    pub fn from_use_case(
        use_case: &UseCaseDefinition,
        roi_start: (u16, u16),
        raw_frame_rate: u16,
    ) -> Result<Self, ToFError> {
        use_case.verify_class_invariants()?;

        let safe = reconfiguration_points(use_case)?;

        let raw_frames = use_case
            .raw_frame_sets()
            .iter()
            .map(|rfs| {
                let exposure_time = use_case.exposure_time_for_raw_frame_set(rfs)?;
                let angles = rfs.phase_definition.phase_angles();
                Ok(angles
                    .iter()
                    .enumerate()
                    .map(move |(i, &phase_angle)| ImagerRawFrame {
                        modulation_frequency: rfs.modulation_frequency,
                        ssc: rfs.ssc,
                        grayscale: rfs.is_grayscale(),
                        duty_cycle: rfs.duty_cycle,
                        phase_angle,
                        exposure_time,
                        alignment: match rfs.alignment {
                            Alignment::ClockAligned if i > 0 => Alignment::StartAligned,
                            alignment => alignment,
                        },
                        t_eye_safety: rfs.t_eye_safety,
                        is_start_of_linked_raw_frames: i == 0,
                        is_end_of_linked_raw_frames: i + 1 == angles.len(),
                        is_end_of_linked_measurement: false,
                    }))
            })
            .collect::<Result<Vec<_>, ToFError>>()?
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(i, mut rf)| {
                rf.is_end_of_linked_measurement =
                    rf.is_end_of_linked_raw_frames && safe.contains(&(i as u16));
                rf
            })
            .collect::<Vec<_>>();

        tracing::debug!("{} raw frames, {} safe points", raw_frames.len(), safe.len());

        Ok(Self {
            target_rate: use_case.target_rate(),
            raw_frames,
            image_columns: use_case.image().0,
            image_rows: use_case.image().1,
            roi_column: roi_start.0,
            roi_row: roi_start.1,
            raw_frame_rate,
            ssc_enabled: use_case.ssc_enabled(),
            mixed_mode: use_case.streams().len() > 1,
        })
    }
}

/// Returns the sequence indices after which the sequencer can be reconfigured.
///
/// These are the last raw frames of each frame group, except for those that lie inside the
/// span of another frame group.
fn reconfiguration_points(use_case: &UseCaseDefinition) -> Result<BTreeSet<u16>, ToFError> {
    let groups = use_case
        .streams()
        .iter()
        .flat_map(|s| s.frame_groups.iter())
        .filter_map(|g| {
            let first = g.raw_frame_set_indices.iter().min()?;
            let last = g.raw_frame_set_indices.iter().max()?;
            Some((*first, *last))
        })
        .collect::<Vec<_>>();

    let mut possibly_safe = BTreeSet::new();
    let mut not_safe = BTreeSet::new();
    for &(first, last) in &groups {
        if let Some(&idx) = use_case.sequence_indices_for_raw_frame_set(last)?.last() {
            possibly_safe.insert(idx);
        }
        for set in first..last {
            not_safe.extend(use_case.sequence_indices_for_raw_frame_set(set)?);
        }
    }
    Ok(possibly_safe.difference(&not_safe).copied().collect())
}
