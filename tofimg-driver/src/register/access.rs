use std::time::Duration;

use tofimg_core::{bridge::Bridge, config::TimedRegister, error::ToFError};

/// Number of reads after the first one before [`RegisterAccess::poll_until`] gives up.
const POLL_RETRIES: usize = 4;

/// Register access helpers on top of a [`Bridge`].
pub struct RegisterAccess<'a> {
    bridge: &'a mut dyn Bridge,
}

impl<'a> RegisterAccess<'a> {
    /// Wraps `bridge`.
    pub fn new(bridge: &'a mut dyn Bridge) -> Self {
        Self { bridge }
    }

    /// Writes `registers` in order and sleeps after each entry with a pause.
    ///
    /// Consecutive addresses without a pause in between are written as one burst.
    pub fn transfer_timed(&mut self, registers: &[TimedRegister]) -> Result<(), ToFError> {
        let mut rest = registers;
        while let Some(first) = rest.first() {
            let len = rest
                .windows(2)
                .take_while(|w| w[0].sleep_time == 0 && w[0].address.wrapping_add(1) == w[1].address)
                .count()
                + 1;
            let (batch, tail) = rest.split_at(len);
            if let [reg] = batch {
                self.bridge.write_register(reg.address, reg.value)?;
            } else {
                let values = batch.iter().map(|r| r.value).collect::<Vec<_>>();
                self.bridge.write_burst(first.address, &values)?;
            }
            if let Some(last) = batch.last().filter(|r| r.sleep_time > 0) {
                self.bridge.sleep_for(last.sleep());
            }
            rest = tail;
        }
        tracing::debug!("transferred {} timed registers", registers.len());
        Ok(())
    }

    /// Sleeps for `first`, then reads `address` until it holds `expected`, sleeping for
    /// `interval` between the reads.
    pub fn poll_until(
        &mut self,
        address: u16,
        expected: u16,
        first: Duration,
        interval: Duration,
    ) -> Result<(), ToFError> {
        self.bridge.sleep_for(first);
        if self.bridge.read_register(address)? == expected {
            return Ok(());
        }
        for _ in 0..POLL_RETRIES {
            self.bridge.sleep_for(interval);
            if self.bridge.read_register(address)? == expected {
                return Ok(());
            }
        }
        Err(ToFError::Timeout(
            "Expected value not read even after polling".to_string(),
        ))
    }

    /// Writes `values` to `addresses`, as one burst if the addresses are consecutive.
    pub fn write_registers(&mut self, addresses: &[u16], values: &[u16]) -> Result<(), ToFError> {
        if addresses.len() != values.len() {
            return Err(ToFError::logic("vector length mismatch of arguments"));
        }
        match addresses {
            [] => Ok(()),
            [first, ..] if addresses.len() > 1 && is_consecutive(addresses) => {
                Ok(self.bridge.write_burst(*first, values)?)
            }
            _ => addresses
                .iter()
                .zip(values)
                .try_for_each(|(&a, &v)| self.bridge.write_register(a, v))
                .map_err(ToFError::from),
        }
    }

    /// Reads `addresses`, as one burst if they are consecutive.
    pub fn read_registers(&mut self, addresses: &[u16]) -> Result<Vec<u16>, ToFError> {
        match addresses {
            [] => Ok(Vec::new()),
            [first, ..] if is_consecutive(addresses) => {
                Ok(self.bridge.read_burst(*first, addresses.len())?)
            }
            _ => addresses
                .iter()
                .map(|&a| self.bridge.read_register(a))
                .collect::<Result<Vec<_>, _>>()
                .map_err(ToFError::from),
        }
    }
}

fn is_consecutive(addresses: &[u16]) -> bool {
    addresses
        .windows(2)
        .all(|w| w[0].checked_add(1) == Some(w[1]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::register::tracker::tests::{Access, RecordingBridge};

    #[test]
    fn transfer_timed() -> anyhow::Result<()> {
        let mut bridge = RecordingBridge::default();
        RegisterAccess::new(&mut bridge).transfer_timed(&[
            TimedRegister::new(0xA000, 1),
            TimedRegister::new(0xA001, 2).with_sleep(100),
            TimedRegister::new(0xA002, 3),
            TimedRegister::new(0xA003, 4),
            TimedRegister::new(0xB000, 5).with_sleep(20),
        ])?;
        assert_eq!(
            vec![
                Access::Burst(0xA000, vec![1, 2]),
                Access::Sleep(Duration::from_micros(100)),
                Access::Burst(0xA002, vec![3, 4]),
                Access::Write(0xB000, 5),
                Access::Sleep(Duration::from_micros(20)),
            ],
            bridge.log
        );
        Ok(())
    }

    #[rstest::rstest]
    #[case(Ok(()), 1, 1)]
    #[case(Err(ToFError::Timeout("Expected value not read even after polling".to_string())), 0, 5)]
    fn poll_until(#[case] expect: Result<(), ToFError>, #[case] value: u16, #[case] reads: usize) {
        let mut bridge = RecordingBridge::default();
        bridge.regs.insert(0xA08C, value);
        let result = RegisterAccess::new(&mut bridge).poll_until(
            0xA08C,
            1,
            Duration::from_micros(150),
            Duration::from_millis(10),
        );
        assert_eq!(expect, result);
        assert_eq!(
            reads,
            bridge
                .log
                .iter()
                .filter(|a| matches!(a, Access::Read(_)))
                .count()
        );
        assert_eq!(Some(&Access::Sleep(Duration::from_micros(150))), bridge.log.first());
    }

    #[test]
    fn write_registers() -> anyhow::Result<()> {
        let mut bridge = RecordingBridge::default();
        let mut access = RegisterAccess::new(&mut bridge);
        access.write_registers(&[0x10, 0x11, 0x12], &[1, 2, 3])?;
        access.write_registers(&[0x20, 0x22], &[4, 5])?;
        access.write_registers(&[0x30], &[6])?;
        assert_eq!(
            Err(ToFError::logic("vector length mismatch of arguments")),
            access.write_registers(&[0x30], &[6, 7])
        );
        assert_eq!(
            vec![
                Access::Burst(0x10, vec![1, 2, 3]),
                Access::Write(0x20, 4),
                Access::Write(0x22, 5),
                Access::Write(0x30, 6),
            ],
            bridge.log
        );
        Ok(())
    }

    #[test]
    fn read_registers() -> anyhow::Result<()> {
        let mut bridge = RecordingBridge::default();
        bridge.regs.extend([(0x10, 1), (0x11, 2), (0x20, 3)]);
        let mut access = RegisterAccess::new(&mut bridge);
        assert_eq!(vec![1, 2], access.read_registers(&[0x10, 0x11])?);
        assert_eq!(vec![3], access.read_registers(&[0x20])?);
        assert_eq!(vec![3, 1], access.read_registers(&[0x20, 0x10])?);
        assert!(access.read_registers(&[])?.is_empty());
        assert_eq!(
            vec![
                Access::ReadBurst(0x10, 2),
                Access::ReadBurst(0x20, 1),
                Access::Read(0x20),
                Access::Read(0x10),
            ],
            bridge.log
        );
        Ok(())
    }
}
