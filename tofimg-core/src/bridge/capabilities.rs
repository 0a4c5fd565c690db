use bitflags::bitflags;

bitflags! {
    /// The set of interfaces a bridge provides, fixed when the bridge is constructed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BridgeCapabilities: u8 {
        /// Single register read and write access to the imager.
        const REGISTER = 1 << 0;
        /// Burst access to consecutive registers.
        const BURST = 1 << 1;
        /// Control of the imager reset line.
        const RESET = 1 << 2;
        /// Non-volatile storage holding an external imager configuration.
        const STORAGE = 1 << 3;
        /// Reception of captured raw frames.
        const DATA_RECEIVER = 1 << 4;
    }
}

impl BridgeCapabilities {
    /// The capabilities required to drive a software defined imager.
    pub const IMAGER: Self = Self::REGISTER.union(Self::RESET);

    /// Returns `true` if the bridge can drive an imager.
    #[must_use]
    pub const fn supports_imager(&self) -> bool {
        self.contains(Self::IMAGER)
    }
}
