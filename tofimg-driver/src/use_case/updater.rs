use tofimg_core::error::ToFError;

use super::ImagerUseCaseDefinition;

impl ImagerUseCaseDefinition {
    /// Changes the rate of the clock aligned raw frames.
    pub fn set_target_frame_rate(&mut self, rate: u16) -> Result<(), ToFError> {
        if rate == 0 {
            return Err(ToFError::invalid_value("The target rate must not be zero"));
        }
        self.target_rate = rate;
        Ok(())
    }

    /// Sets one exposure time per linked run, in sequence order.
    ///
    /// The use case is left unchanged if the number of exposure times does not match the
    /// number of linked runs.
    pub fn set_exposure_times(&mut self, exposure_times: &[u32]) -> Result<(), ToFError> {
        let runs = self.linked_runs();
        match exposure_times.len().cmp(&runs.len()) {
            std::cmp::Ordering::Greater => {
                return Err(ToFError::invalid_value("too many exposure times"))
            }
            std::cmp::Ordering::Less => {
                return Err(ToFError::invalid_value("not enough exposure times"))
            }
            std::cmp::Ordering::Equal => {}
        }
        runs.iter()
            .zip(exposure_times)
            .for_each(|(run, &exposure)| {
                run.iter()
                    .for_each(|&i| self.raw_frames[i].exposure_time = exposure)
            });
        Ok(())
    }
}
