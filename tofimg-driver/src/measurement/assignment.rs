use std::collections::BTreeMap;

use super::{MeasurementBlock, SequenceEntry};
use crate::{defined::MB_REPEAT_LIMIT, ImagerRawFrame};

/// Two blocks whose summed times differ by less than this are considered equally long.
const BLOCK_TIME_EPSILON: f64 = 0.1e-9;

/// The measurement block each raw frame is captured in.
///
/// Raw frames represented by the repeat counter of an earlier block are not assigned.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawFrameAssignment {
    blocks: BTreeMap<usize, usize>,
}

impl RawFrameAssignment {
    /// Distributes `frames` over `blocks` and sizes their sequences.
    ///
    /// A linked run is never split between blocks. When a run does not fit into the current
    /// block and that block equals its predecessor, the predecessor's repeat counter is
    /// increased and the current block is refilled. A block is safe for reconfiguration if its
    /// last raw frame ends a linked measurement.
    ///
    /// Returns `None` if a linked run exceeds the block capacity or the blocks are exhausted.
    #[must_use]
    pub fn assign(
        frames: &[ImagerRawFrame],
        times: &[f64],
        blocks: &mut [MeasurementBlock],
    ) -> Option<Self> {
        let mut assignment = Self::default();
        let mut fill = vec![0usize; blocks.len()];
        let mut current = 0;

        for (i, _) in frames.iter().enumerate() {
            let remaining_in_run = frames[i..]
                .iter()
                .position(|f| f.is_end_of_linked_raw_frames)
                .map_or(frames.len() - i, |p| p + 1);

            let block = blocks.get(current)?;
            if remaining_in_run > block.max_sequence_length {
                return None;
            }
            if block.max_sequence_length - fill[current] < remaining_in_run {
                if current > 0
                    && blocks[current - 1].cycles < MB_REPEAT_LIMIT
                    && assignment.blocks_equal(frames, times, current - 1, current)
                {
                    blocks[current - 1].cycles += 1;
                    fill[current] = 0;
                    assignment.blocks.retain(|_, b| *b != current);
                } else {
                    blocks[current].safe_for_reconfig = frames[i - 1].is_end_of_linked_measurement;
                    current += 1;
                    if current >= blocks.len() {
                        return None;
                    }
                }
            }
            assignment.blocks.insert(i, current);
            fill[current] += 1;
        }

        if let (Some(last), Some(block)) = (frames.last(), blocks.get_mut(current)) {
            block.safe_for_reconfig = last.is_end_of_linked_measurement;
        }
        blocks
            .iter_mut()
            .zip(fill)
            .for_each(|(block, n)| block.sequence.resize(n, SequenceEntry::default()));

        tracing::trace!("raw frame assignment {:?}", assignment.blocks);
        Some(assignment)
    }

    fn blocks_equal(&self, frames: &[ImagerRawFrame], times: &[f64], a: usize, b: usize) -> bool {
        let members = |block: usize| {
            self.blocks
                .iter()
                .filter(move |(_, &m)| m == block)
                .map(|(&i, _)| i)
                .collect::<Vec<_>>()
        };
        let (first, second) = (members(a), members(b));
        let time = |idx: &[usize]| idx.iter().map(|&i| times[i]).sum::<f64>();
        (time(&first) - time(&second)).abs() <= BLOCK_TIME_EPSILON
            && first.len() == second.len()
            && first
                .iter()
                .zip(&second)
                .all(|(&x, &y)| frames[x] == frames[y])
    }

    /// Returns the block of raw frame `frame`.
    #[must_use]
    pub fn block_of(&self, frame: usize) -> Option<usize> {
        self.blocks.get(&frame).copied()
    }

    /// Iterates the assigned raw frames in sequence order as `(frame, block, position)`.
    pub fn slots(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let mut positions = BTreeMap::<usize, usize>::new();
        self.blocks.iter().map(move |(&frame, &block)| {
            let position = positions.entry(block).or_default();
            let slot = (frame, block, *position);
            *position += 1;
            slot
        })
    }

    /// Returns the summed raw frame times of `block`.
    #[must_use]
    pub fn block_time(&self, times: &[f64], block: usize) -> f64 {
        self.blocks
            .iter()
            .filter(|(_, &b)| b == block)
            .map(|(&i, _)| times[i])
            .sum()
    }
}

/// Returns the number of raw frames of each run of the blocks, repeats included.
///
/// Empty blocks are skipped.
#[must_use]
pub fn measurement_block_sizes(blocks: &[MeasurementBlock]) -> Vec<usize> {
    blocks
        .iter()
        .filter(|b| !b.sequence.is_empty())
        .flat_map(|b| std::iter::repeat(b.sequence.len()).take(b.cycles as usize))
        .collect()
}

/// Returns the longest time in milliseconds between two points at which the imager accepts a
/// reconfiguration.
///
/// Repeats of a block only count if the block itself is not safe for reconfiguration.
#[must_use]
pub fn max_safe_reconfig_time_ms(
    blocks: &[MeasurementBlock],
    assignment: &RawFrameAssignment,
    times: &[f64],
) -> u32 {
    let (max, _) = blocks
        .iter()
        .enumerate()
        .fold((0f64, 0f64), |(max, sum), (i, block)| {
            let t = assignment.block_time(times, i);
            let sum = sum
                + if block.safe_for_reconfig {
                    t
                } else {
                    t * block.cycles as f64
                };
            if block.safe_for_reconfig {
                (max.max(sum), 0.)
            } else {
                (max, sum)
            }
        });
    (1000. * max) as u32
}

#[cfg(test)]
mod tests {
    use tofimg_core::common::{Freq, MHz};

    use super::*;
    use crate::use_case::tests::linked;

    fn blocks(count: usize, capacity: usize) -> Vec<MeasurementBlock> {
        vec![MeasurementBlock::new(capacity); count]
    }

    fn safe(mut frames: Vec<ImagerRawFrame>) -> Vec<ImagerRawFrame> {
        if let Some(last) = frames.last_mut() {
            last.is_end_of_linked_measurement = true;
        }
        frames
    }

    #[test]
    fn single_block() {
        let mut frames = linked(30 * MHz, 1000, 4);
        frames.extend(safe(linked(Freq::ZERO, 200, 1)));
        let times = vec![1e-3; 5];
        let mut mbs = blocks(1, 20);
        let assignment = RawFrameAssignment::assign(&frames, &times, &mut mbs);
        assert!(assignment.is_some());
        assert_eq!(5, mbs[0].sequence.len());
        assert!(mbs[0].safe_for_reconfig);
        assert_eq!(vec![5], measurement_block_sizes(&mbs));
    }

    #[test]
    fn repeated_blocks() -> anyhow::Result<()> {
        let frames = (0..5)
            .flat_map(|_| safe(linked(80 * MHz, 400, 4)))
            .chain(linked(60 * MHz, 300, 4))
            .chain(safe(linked(80 * MHz, 300, 4)))
            .collect::<Vec<_>>();
        let times = vec![1e-3; frames.len()];
        let mut mbs = blocks(8, 5);
        let assignment = RawFrameAssignment::assign(&frames, &times, &mut mbs)
            .ok_or(anyhow::anyhow!("not assigned"))?;

        assert_eq!(5, mbs[0].cycles);
        assert_eq!(4, mbs[1].sequence.len());
        assert_eq!(4, mbs[2].sequence.len());
        assert!(mbs[3..].iter().all(|mb| mb.sequence.is_empty()));
        assert!(mbs[0].safe_for_reconfig);
        assert!(!mbs[1].safe_for_reconfig);
        assert!(mbs[2].safe_for_reconfig);
        assert_eq!(vec![4; 7], measurement_block_sizes(&mbs));

        assert_eq!(Some(0), assignment.block_of(0));
        assert_eq!(None, assignment.block_of(4));
        assert_eq!(Some(1), assignment.block_of(20));
        assert_eq!(Some(2), assignment.block_of(27));
        assert_eq!(
            vec![(0, 0, 0), (1, 0, 1), (2, 0, 2), (3, 0, 3), (20, 1, 0)],
            assignment.slots().take(5).collect::<Vec<_>>()
        );

        // Two unsafe ES blocks are summed, the HT block repeats are not.
        assert_eq!(8, max_safe_reconfig_time_ms(&mbs, &assignment, &times));
        Ok(())
    }

    #[test]
    fn different_times_are_not_compressed() -> anyhow::Result<()> {
        let frames = (0..4)
            .flat_map(|_| safe(linked(80 * MHz, 400, 4)))
            .collect::<Vec<_>>();
        let mut times = vec![1e-3; frames.len()];
        times[3] = 2e-3;
        let mut mbs = blocks(8, 5);
        RawFrameAssignment::assign(&frames, &times, &mut mbs)
            .ok_or(anyhow::anyhow!("not assigned"))?;
        assert_eq!(vec![1, 2, 1], mbs[..3].iter().map(|mb| mb.cycles).collect::<Vec<_>>());
        assert_eq!(vec![4, 4, 4, 4], measurement_block_sizes(&mbs));
        Ok(())
    }

    #[rstest::rstest]
    #[case(true, 1, 20, 20)]
    #[case(false, 1, 20, 21)]
    #[case(false, 1, 3, 4)]
    #[case(true, 8, 5, 32)]
    fn capacity(#[case] expect: bool, #[case] count: usize, #[case] block_capacity: usize, #[case] n: usize) {
        let frames = (0..n / 4)
            .flat_map(|i| linked((i as u32 + 1) * 10 * MHz, 100, 4))
            .chain(linked(30 * MHz, 100, n % 4))
            .collect::<Vec<_>>();
        let times = vec![1e-3; frames.len()];
        let mut mbs = blocks(count, block_capacity);
        assert_eq!(
            expect,
            RawFrameAssignment::assign(&frames, &times, &mut mbs).is_some()
        );
    }
}
