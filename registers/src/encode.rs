//! Field enum decoding support.

/// Returned when a bit pattern does not name any variant of a field enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownVariant<T>(T);

impl<T: Copy> UnknownVariant<T> {
    pub const fn new(bits: T) -> Self {
        Self(bits)
    }

    /// The offending bit pattern.
    pub fn bits(&self) -> T {
        self.0
    }
}

impl<T: core::fmt::LowerHex> core::fmt::Display for UnknownVariant<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown field encoding 0x{:x}", self.0)
    }
}
