//! MBX 2D core: FIFO status register and slave-port command grammar.
//!
//! Commands are streams of 32-bit words written to a single slave-port
//! address. Bits 31:28 of a word that starts a block carry the block header;
//! the words following it are operands whose count depends on the block.

/// Global interrupt status; bits 23:16 report occupied FIFO slots.
pub const INT_STATUS: usize = 0x012C;
pub const FREEVCOUNT_OFFSET: usize = 16;
pub const FREEVCOUNT_MASK: u32 = 0xFF;

/// Slave port offset inside the MBX register window.
pub const SLAVE_PORT: usize = 0x00A0_0000;

/// Slave-port FIFO capacity in words. Includes a 5-slot safety margin for
/// the latency of the fullness register.
pub const SP_FIFO_DWSIZE: u32 = 123;

/// Occupied FIFO slots reported by an INT_STATUS value.
#[inline(always)]
#[must_use]
pub const fn fifo_occupancy(status: u32) -> u32 {
    (status >> FREEVCOUNT_OFFSET) & FREEVCOUNT_MASK
}

pub const HEADER_OFFSET: usize = 28;
pub const HEADER_MASK: u32 = 0xF;

/// Field Enum: block header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockHeaderE {
    /// Control block (source color key)
    Ctrl = 0x2,
    /// Source offset for the next blit
    SrcOff = 0x3,
    /// Flush between two blits
    Fence = 0x7,
    /// Blit execute
    Blit = 0x8,
    /// Source surface descriptor
    SrcCtrl = 0x9,
    /// Destination surface descriptor
    DstCtrl = 0xA,
}

impl BlockHeaderE {
    /// Decode a bit pattern into an encoded enum variant.
    ///
    /// # Errors
    /// Returns an error if the bit pattern does not match any encoded variants.
    pub const fn from_bits(bits: u8) -> Result<Self, crate::encode::UnknownVariant<u8>> {
        match bits {
            0x2 => Ok(Self::Ctrl),
            0x3 => Ok(Self::SrcOff),
            0x7 => Ok(Self::Fence),
            0x8 => Ok(Self::Blit),
            0x9 => Ok(Self::SrcCtrl),
            0xA => Ok(Self::DstCtrl),
            bits => Err(crate::encode::UnknownVariant::new(bits)),
        }
    }

    /// The bit pattern of the variant
    #[must_use]
    pub const fn bits(&self) -> u8 {
        *self as u8
    }

    /// Header placed in bits 31:28 of a command word.
    #[must_use]
    pub const fn word(&self) -> u32 {
        (self.bits() as u32) << HEADER_OFFSET
    }

    /// Header of a raw command word.
    ///
    /// # Errors
    /// Returns an error if bits 31:28 name no block.
    pub const fn of(word: u32) -> Result<Self, crate::encode::UnknownVariant<u8>> {
        Self::from_bits(((word >> HEADER_OFFSET) & HEADER_MASK) as u8)
    }
}

pub const CTRL_BH: u32 = BlockHeaderE::Ctrl.word();
pub const SRC_OFF_BH: u32 = BlockHeaderE::SrcOff.word();
pub const FENCE_BH: u32 = BlockHeaderE::Fence.word();
pub const BLIT_BH: u32 = BlockHeaderE::Blit.word();
pub const SRC_CTRL_BH: u32 = BlockHeaderE::SrcCtrl.word();
pub const DST_CTRL_BH: u32 = BlockHeaderE::DstCtrl.word();

/// Blit flag: use the pattern path.
pub const USE_PAT: u32 = 0x0001_0000;

/// Blit copy direction bits.
pub const TEXTCOPY_TL2BR: u32 = 0x0000_0000;
pub const TEXTCOPY_TR2BL: u32 = 0x0080_0000;
pub const TEXTCOPY_BL2TR: u32 = 0x0100_0000;

/// Blit flag: reject source pixels matching the color key.
pub const SRCCK_REJECT: u32 = 0x0010_0000;
/// Control block selector: source color key (followed by key and mask words).
pub const SRCCK_CTRL: u32 = 0x0000_0001;

/// Surface descriptor: surface lives in framebuffer memory.
pub const SRC_FBMEM: u32 = 0x0400_0000;
/// Surface descriptor pixel formats.
pub const SRC_555RGB: u32 = 0x0004_0000;
pub const SRC_8888ARGB: u32 = 0x0006_0000;
/// Surface descriptor stride field (bytes), bits 16:0. The pixel format
/// sits directly above it.
pub const STRIDE_MASK: u32 = 0x0001_FFFF;

/// ROP fields of a blit word: foreground in bits 15:8, background in 7:0.
pub const ROP_FG_OFFSET: usize = 8;
pub const ROP_MASK: u32 = 0xFF;

/// Blit-execute word carrying the same ROP for foreground and background.
#[inline(always)]
#[must_use]
pub const fn blit_word(flags: u32, rop: u8) -> u32 {
    BLIT_BH | flags | ((rop as u32 & ROP_MASK) << ROP_FG_OFFSET) | (rop as u32 & ROP_MASK)
}

/// Coordinate pair `(hi & 0xffff) << 16 | (lo & 0xffff)`.
#[inline(always)]
#[must_use]
pub const fn pack_xy(hi: i32, lo: i32) -> u32 {
    (((hi as u32) & 0xFFFF) << 16) | ((lo as u32) & 0xFFFF)
}

/// Source-offset word. The x field sits at bit 14, overlapping the top two
/// bits of the 16-bit y field, matching the layout the 2D core decodes.
pub const SRC_OFF_X_OFFSET: usize = 14;

#[inline(always)]
#[must_use]
pub const fn src_offset_word(x: i32, y: i32) -> u32 {
    SRC_OFF_BH | (((x as u32) & 0xFFFF) << SRC_OFF_X_OFFSET) | ((y as u32) & 0xFFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_sit_in_top_nibble() {
        assert_eq!(CTRL_BH, 0x2000_0000);
        assert_eq!(SRC_OFF_BH, 0x3000_0000);
        assert_eq!(FENCE_BH, 0x7000_0000);
        assert_eq!(BLIT_BH, 0x8000_0000);
        assert_eq!(SRC_CTRL_BH, 0x9000_0000);
        assert_eq!(DST_CTRL_BH, 0xA000_0000);
        assert_eq!(BlockHeaderE::of(0xA006_1000), Ok(BlockHeaderE::DstCtrl));
        assert!(BlockHeaderE::of(0x1000_0000).is_err());
    }

    #[test]
    fn occupancy_extraction() {
        assert_eq!(fifo_occupancy(0x0012_0000), 0x12);
        assert_eq!(fifo_occupancy(0xFF00_FFFF), 0);
    }

    #[test]
    fn coordinates_are_masked_to_16_bits() {
        assert_eq!(pack_xy(1, 1), 0x0001_0001);
        assert_eq!(pack_xy(0x1_0005, -1), 0x0005_FFFF);
    }

    #[test]
    fn blit_word_duplicates_rop() {
        assert_eq!(blit_word(0, 0xF0), 0x8000_F0F0);
        assert_eq!(blit_word(USE_PAT, 0xCC), 0x8001_CCCC);
    }
}
