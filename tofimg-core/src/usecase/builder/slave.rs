use super::UseCaseBuilder;
use crate::{error::ToFError, usecase::UseCaseDefinition};

/// Derives the use case of a slave camera from the use case of its master.
///
/// The slave runs one frame per second faster than the master so that it never waits for a
/// trigger that has not arrived yet. The maximum exposure times shrink by the same ratio as
/// the frame period, current exposure times are clamped to the new limits.
#[derive(Clone, Debug, PartialEq)]
pub struct Slave {
    master: UseCaseDefinition,
}

impl Slave {
    /// Creates the builder from the master use case.
    #[must_use]
    pub const fn new(master: UseCaseDefinition) -> Self {
        Self { master }
    }
}

impl UseCaseBuilder for Slave {
    fn build(&self) -> Result<UseCaseDefinition, ToFError> {
        let old_rate = self.master.target_rate();
        let new_rate = old_rate
            .checked_add(1)
            .ok_or_else(|| ToFError::out_of_bounds("Frame rate of the master is too high"))?;

        let mut uc = self.master.clone();
        uc.set_rates(new_rate, uc.max_rate().max(new_rate));
        uc.exposure_groups_mut().iter_mut().for_each(|group| {
            let (min, max) = group.exposure_limits;
            let max = (max as u64 * old_rate as u64 / new_rate as u64) as u32;
            let max = max.max(min);
            group.exposure_limits = (min, max);
            group.exposure_time = group.exposure_time.clamp(min, max);
        });
        uc.verify_class_invariants()?;
        Ok(uc)
    }
}
