use tofimg_core::error::ToFError;

use crate::imager::ImagerComponent;

/// Raw register access to an imager for diagnostics.
///
/// Addresses are given as text, either hexadecimal with a `0x` prefix or decimal. Registers
/// written this way are unknown to the register tracking of the imager and are rewritten by
/// the next use case that touches them.
pub struct ImagerDirectAccess<'a, I: ImagerComponent + ?Sized> {
    imager: &'a mut I,
}

impl<'a, I: ImagerComponent + ?Sized> ImagerDirectAccess<'a, I> {
    /// Wraps `imager`.
    pub fn new(imager: &'a mut I) -> Self {
        Self { imager }
    }

    /// Returns the wrapped imager.
    pub fn imager(&mut self) -> &mut I {
        &mut *self.imager
    }

    /// Parses a register address.
    pub fn parse_address(address: &str) -> Result<u16, ToFError> {
        let address = address.trim();
        let parsed = match address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
        {
            Some(hex) => u16::from_str_radix(hex, 16),
            None => address.parse(),
        };
        parsed.map_err(|_| ToFError::invalid_value(format!("invalid register address {}", address)))
    }

    /// Writes `registers` as pairs of address and value.
    pub fn write_registers<S: AsRef<str>>(&mut self, registers: &[(S, u16)]) -> Result<(), ToFError> {
        let addresses = registers
            .iter()
            .map(|(address, _)| Self::parse_address(address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let values = registers.iter().map(|&(_, value)| value).collect::<Vec<_>>();
        tracing::debug!("direct write of {} registers", addresses.len());
        self.imager.write_registers(&addresses, &values)
    }

    /// Reads the registers at `addresses`.
    pub fn read_registers<S: AsRef<str>>(&mut self, addresses: &[S]) -> Result<Vec<u16>, ToFError> {
        let addresses = addresses
            .iter()
            .map(|address| Self::parse_address(address.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        self.imager.read_registers(&addresses)
    }
}
