mod access;
pub(crate) mod tracker;

use std::collections::BTreeMap;

pub use access::RegisterAccess;
pub use tracker::RegisterTracker;

/// Register values keyed by address.
pub type RegisterMap = BTreeMap<u16, u16>;

/// Splits `registers` into runs of consecutive addresses.
///
/// Each run is returned as its first address and its values.
#[must_use]
pub fn consecutive_runs(registers: &RegisterMap) -> Vec<(u16, Vec<u16>)> {
    registers
        .iter()
        .fold(Vec::<(u16, Vec<u16>)>::new(), |mut runs, (&address, &value)| {
            match runs.last_mut() {
                Some((first, values)) if *first as usize + values.len() == address as usize => {
                    values.push(value)
                }
                _ => runs.push((address, vec![value])),
            }
            runs
        })
}
