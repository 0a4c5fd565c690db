mod capabilities;
mod error;

use std::time::Duration;

pub use capabilities::BridgeCapabilities;
pub use error::BridgeError;

/// Access to a non-volatile storage attached to the bridge.
pub trait NonVolatileStorage {
    /// Reads the whole external configuration blob.
    fn read_storage(&mut self) -> Result<Vec<u8>, BridgeError>;
}

/// A trait that provides register access to an imager.
///
/// All calls are blocking. Burst operations address consecutive registers starting at `first`.
pub trait Bridge: Send {
    /// Returns the interfaces this bridge provides.
    #[must_use]
    fn capabilities(&self) -> BridgeCapabilities;

    /// Reads a single register.
    fn read_register(&mut self, address: u16) -> Result<u16, BridgeError>;

    /// Writes a single register.
    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BridgeError>;

    /// Reads `count` consecutive registers.
    fn read_burst(&mut self, first: u16, count: usize) -> Result<Vec<u16>, BridgeError> {
        check_burst_range(first, count)?;
        (0..count)
            .map(|i| self.read_register(first + i as u16))
            .collect()
    }

    /// Writes `values` to consecutive registers.
    fn write_burst(&mut self, first: u16, values: &[u16]) -> Result<(), BridgeError> {
        check_burst_range(first, values.len())?;
        values
            .iter()
            .enumerate()
            .try_for_each(|(i, &v)| self.write_register(first + i as u16, v))
    }

    /// Asserts or releases the imager reset line.
    fn set_reset(&mut self, reset: bool) -> Result<(), BridgeError>;

    /// Blocks for the given duration.
    fn sleep_for(&mut self, duration: Duration);

    /// Returns the non-volatile storage if the bridge has one.
    fn storage(&mut self) -> Option<&mut dyn NonVolatileStorage> {
        None
    }
}

/// Checks that a burst of `count` registers starting at `first` stays inside the register space.
pub fn check_burst_range(first: u16, count: usize) -> Result<(), BridgeError> {
    if first as usize + count > u16::MAX as usize + 1 {
        return Err(BridgeError::AddressOverflow(first, count));
    }
    Ok(())
}

// GRCOV_EXCL_START
impl Bridge for Box<dyn Bridge> {
    fn capabilities(&self) -> BridgeCapabilities {
        self.as_ref().capabilities()
    }

    fn read_register(&mut self, address: u16) -> Result<u16, BridgeError> {
        self.as_mut().read_register(address)
    }

    fn write_register(&mut self, address: u16, value: u16) -> Result<(), BridgeError> {
        self.as_mut().write_register(address, value)
    }

    fn read_burst(&mut self, first: u16, count: usize) -> Result<Vec<u16>, BridgeError> {
        self.as_mut().read_burst(first, count)
    }

    fn write_burst(&mut self, first: u16, values: &[u16]) -> Result<(), BridgeError> {
        self.as_mut().write_burst(first, values)
    }

    fn set_reset(&mut self, reset: bool) -> Result<(), BridgeError> {
        self.as_mut().set_reset(reset)
    }

    fn sleep_for(&mut self, duration: Duration) {
        self.as_mut().sleep_for(duration)
    }

    fn storage(&mut self) -> Option<&mut dyn NonVolatileStorage> {
        self.as_mut().storage()
    }
}
// GRCOV_EXCL_STOP

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Default)]
    struct MapBridge {
        regs: BTreeMap<u16, u16>,
        slept: Duration,
    }

    impl Bridge for MapBridge {
        fn capabilities(&self) -> BridgeCapabilities {
            BridgeCapabilities::REGISTER
        }

        fn read_register(&mut self, address: u16) -> Result<u16, BridgeError> {
            Ok(self.regs.get(&address).copied().unwrap_or_default())
        }

        fn write_register(&mut self, address: u16, value: u16) -> Result<(), BridgeError> {
            self.regs.insert(address, value);
            Ok(())
        }

        fn set_reset(&mut self, _: bool) -> Result<(), BridgeError> {
            Ok(())
        }

        fn sleep_for(&mut self, duration: Duration) {
            self.slept += duration;
        }
    }

    #[test]
    fn default_burst() -> anyhow::Result<()> {
        let mut bridge: Box<dyn Bridge> = Box::new(MapBridge::default());
        bridge.write_burst(0xA000, &[1, 2, 3])?;
        assert_eq!(vec![1, 2, 3], bridge.read_burst(0xA000, 3)?);
        assert_eq!(2, bridge.read_register(0xA001)?);
        assert!(bridge.storage().is_none());
        Ok(())
    }

    #[rstest::rstest]
    #[case(Ok(()), 0xFFFF, 1)]
    #[case(Ok(()), 0x0000, 0x10000)]
    #[case(Err(BridgeError::AddressOverflow(0xFFFF, 2)), 0xFFFF, 2)]
    #[case(Err(BridgeError::AddressOverflow(0x0001, 0x10000)), 0x0001, 0x10000)]
    fn burst_range(#[case] expect: Result<(), BridgeError>, #[case] first: u16, #[case] count: usize) {
        assert_eq!(expect, check_burst_range(first, count));
    }

    #[test]
    fn burst_overflow_does_not_write() {
        let mut bridge = MapBridge::default();
        assert_eq!(
            Err(BridgeError::AddressOverflow(0xFFFE, 3)),
            bridge.write_burst(0xFFFE, &[1, 2, 3])
        );
        assert!(bridge.regs.is_empty());
        bridge.sleep_for(Duration::from_millis(3));
        assert_eq!(Duration::from_millis(3), bridge.slept);
    }
}
