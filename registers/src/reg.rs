//! Raw register value conversion.

use num_traits::PrimInt;

/// A typed view of one hardware register value.
///
/// Implementors are `repr(transparent)` wrappers over the raw register word;
/// conversion in both directions is lossless.
pub trait Register: Copy {
    /// Storage width of the register.
    type Regwidth: PrimInt;

    /// Build the typed value from the raw word read from hardware.
    fn from_raw(val: Self::Regwidth) -> Self;

    /// Raw word to write to hardware.
    fn to_raw(self) -> Self::Regwidth;
}
