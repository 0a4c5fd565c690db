use std::ops::RangeBounds;

use tofimg_core::{bridge::Bridge, config::TimedRegister, error::ToFError};

use super::{consecutive_runs, RegisterAccess, RegisterMap};

/// Remembers the register values written to the imager.
///
/// Shadowed registers are copied by the firmware at a safe point of the sequence; until the
/// copy is confirmed their value on the imager is unknown and they are held back as pending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterTracker {
    downloaded: RegisterMap,
    pending_shadow: RegisterMap,
}

impl RegisterTracker {
    /// Creates a tracker without known registers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registers whose value on the imager is known.
    #[must_use]
    pub const fn downloaded(&self) -> &RegisterMap {
        &self.downloaded
    }

    /// Returns the value written to `address`, if known.
    #[must_use]
    pub fn get(&self, address: u16) -> Option<u16> {
        self.downloaded.get(&address).copied()
    }

    /// Forgets all registers, e.g. after a reset of the imager.
    pub fn clear(&mut self) {
        self.downloaded.clear();
        self.pending_shadow.clear();
    }

    /// Forgets the registers in `range`.
    pub fn forget(&mut self, range: impl RangeBounds<u16>) {
        self.downloaded.retain(|address, _| !range.contains(address));
    }

    /// Writes `registers`, batching consecutive addresses into bursts, and remembers them.
    pub fn track_and_write(
        &mut self,
        bridge: &mut dyn Bridge,
        registers: &RegisterMap,
    ) -> Result<(), ToFError> {
        consecutive_runs(registers)
            .into_iter()
            .try_for_each(|(first, values)| -> Result<(), ToFError> {
                match values.as_slice() {
                    [value] => {
                        tracing::trace!("write {:#06X} = {:#06X}", first, value);
                        bridge.write_register(first, *value)?
                    }
                    values => {
                        tracing::trace!("burst {:#06X} {:04X?}", first, values);
                        bridge.write_burst(first, values)?
                    }
                }
                self.downloaded.extend(
                    values
                        .iter()
                        .enumerate()
                        .map(|(i, &v)| (first + i as u16, v)),
                );
                Ok(())
            })
    }

    /// Writes `registers` honoring their pauses and remembers them.
    pub fn track_and_transfer_timed(
        &mut self,
        bridge: &mut dyn Bridge,
        registers: &[TimedRegister],
    ) -> Result<(), ToFError> {
        RegisterAccess::new(bridge).transfer_timed(registers)?;
        self.downloaded
            .extend(registers.iter().map(|r| (r.address, r.value)));
        Ok(())
    }

    /// Marks `registers` as written to shadow registers whose transfer is not yet confirmed.
    pub fn track_shadowed(&mut self, registers: &RegisterMap) -> Result<(), ToFError> {
        if !self.pending_shadow.is_empty() {
            return Err(ToFError::logic(
                "Multiple shadowed-register operations are in flight",
            ));
        }
        registers.keys().for_each(|address| {
            self.downloaded.remove(address);
        });
        self.pending_shadow = registers.clone();
        Ok(())
    }

    /// Remembers the pending shadowed registers if the firmware confirmed the transfer, and
    /// drops them in any case.
    pub fn commit_or_rollback(&mut self, success: bool) {
        let pending = std::mem::take(&mut self.pending_shadow);
        if success {
            self.downloaded.extend(pending);
        } else if !pending.is_empty() {
            tracing::warn!("rolled back {} shadowed registers", pending.len());
        }
    }

    /// Returns `true` if a shadowed transfer is awaiting confirmation.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_shadow.is_empty()
    }

    /// Changes the bits of `mask` in `address` to those of `value`.
    ///
    /// The other bits are taken from the remembered value or from `reset` if the register was
    /// not written yet.
    pub fn masked_write(
        &mut self,
        bridge: &mut dyn Bridge,
        address: u16,
        mask: u16,
        value: u16,
        reset: u16,
    ) -> Result<(), ToFError> {
        let old = self.get(address).unwrap_or(reset);
        let new = (old & !mask) | (value & mask);
        self.track_and_write(bridge, &RegisterMap::from([(address, new)]))
    }

    /// Returns the registers of `registers` that are unknown or differ from the remembered
    /// values.
    #[must_use]
    pub fn resolve(&self, registers: RegisterMap) -> RegisterMap {
        registers
            .into_iter()
            .filter(|(address, value)| self.downloaded.get(address) != Some(value))
            .collect()
    }
}
