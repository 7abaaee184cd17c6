use vermilion_registers::encode::UnknownVariant;

/// The sixteen X11 raster operations (GXclear .. GXset), in protocol order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rop {
    Clear = 0x0,
    And = 0x1,
    AndReverse = 0x2,
    Copy = 0x3,
    AndInverted = 0x4,
    NoOp = 0x5,
    Xor = 0x6,
    Or = 0x7,
    Nor = 0x8,
    Equiv = 0x9,
    Invert = 0xA,
    OrReverse = 0xB,
    CopyInverted = 0xC,
    OrInverted = 0xD,
    Nand = 0xE,
    Set = 0xF,
}

/// Ternary ROP codes with the source as operand (S = 0xCC, D = 0xAA).
const COPY_ROPS: [u8; 16] = [
    0x00, 0x88, 0x44, 0xCC, 0x22, 0xAA, 0x66, 0xEE, 0x11, 0x99, 0x55, 0xDD, 0x33, 0xBB, 0x77, 0xFF,
];

/// Ternary ROP codes with the pattern as operand (P = 0xF0, D = 0xAA).
const PATTERN_ROPS: [u8; 16] = [
    0x00, 0xA0, 0x50, 0xF0, 0x0A, 0xAA, 0x5A, 0xFA, 0x05, 0xA5, 0x55, 0xF5, 0x0F, 0xAF, 0x5F, 0xFF,
];

impl Rop {
    const ALL: [Rop; 16] = [
        Rop::Clear,
        Rop::And,
        Rop::AndReverse,
        Rop::Copy,
        Rop::AndInverted,
        Rop::NoOp,
        Rop::Xor,
        Rop::Or,
        Rop::Nor,
        Rop::Equiv,
        Rop::Invert,
        Rop::OrReverse,
        Rop::CopyInverted,
        Rop::OrInverted,
        Rop::Nand,
        Rop::Set,
    ];

    /// Hardware ROP for source-to-destination blits.
    #[must_use]
    pub const fn copy_rop(self) -> u8 {
        COPY_ROPS[self as usize]
    }

    /// Hardware ROP for solid fills, where the fill color is the pattern.
    #[must_use]
    pub const fn pattern_rop(self) -> u8 {
        PATTERN_ROPS[self as usize]
    }
}

impl TryFrom<u8> for Rop {
    type Error = UnknownVariant<u8>;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(usize::from(code))
            .copied()
            .ok_or(UnknownVariant::new(code))
    }
}
