const REGISTER_COUNT: usize = 1 << 16;

/// The 16-bit register space of an imager.
#[derive(Clone, PartialEq, Eq)]
pub struct RegisterFile {
    words: Vec<u16>,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegisterFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterFile")
            .field("non_zero", &self.words.iter().filter(|&&w| w != 0).count())
            .finish()
    }
}

impl RegisterFile {
    /// Creates a register file with every register cleared.
    #[must_use]
    pub fn new() -> Self {
        Self {
            words: vec![0x0000; REGISTER_COUNT],
        }
    }

    /// Reads the register at `address`.
    #[must_use]
    pub fn read(&self, address: u16) -> u16 {
        self.words[address as usize]
    }

    /// Writes the register at `address`.
    pub fn write(&mut self, address: u16, value: u16) {
        self.words[address as usize] = value;
    }

    /// Sets the bits of `mask` in the register at `address`.
    pub fn set_bits(&mut self, address: u16, mask: u16) {
        self.words[address as usize] |= mask;
    }

    /// Clears the bits of `mask` in the register at `address`.
    pub fn clear_bits(&mut self, address: u16, mask: u16) {
        self.words[address as usize] &= !mask;
    }

    /// Returns `count` consecutive registers, clipped at the end of the register space.
    #[must_use]
    pub fn slice(&self, first: u16, count: usize) -> &[u16] {
        let first = first as usize;
        &self.words[first..(first + count).min(REGISTER_COUNT)]
    }

    /// Clears every register.
    pub fn clear(&mut self) {
        self.words.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    #[test]
    fn read_write() {
        let mut rng = rand::rng();
        let mut regs = RegisterFile::new();
        let values = (0..16).map(|_| rng.random::<u16>()).collect::<Vec<_>>();
        values
            .iter()
            .enumerate()
            .for_each(|(i, &v)| regs.write(0xFFF0 + i as u16, v));
        assert_eq!(values.as_slice(), regs.slice(0xFFF0, 16));
        assert_eq!(values.as_slice(), regs.slice(0xFFF0, 100));

        regs.clear();
        assert!(regs.slice(0xFFF0, 16).iter().all(|&v| v == 0));
    }

    #[rstest::rstest]
    #[case(0x8001, 0x0001, 0x8000, true)]
    #[case(0x0001, 0x8001, 0x8000, false)]
    fn bits(#[case] expect: u16, #[case] initial: u16, #[case] mask: u16, #[case] set: bool) {
        let mut regs = RegisterFile::new();
        regs.write(0xA881, initial);
        if set {
            regs.set_bits(0xA881, mask);
        } else {
            regs.clear_bits(0xA881, mask);
        }
        assert_eq!(expect, regs.read(0xA881));
    }
}
