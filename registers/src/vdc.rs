//! Display controller (VDC) registers, pipe A only.
//!
//! All offsets are byte offsets into the VDC MMIO window (PCI BAR 0 of the
//! 0x8086:0x5009 function).

/// Graphics plane control.
pub const DSPCCNTR: usize = 0x0007_2180;
/// Graphics plane start address, pixel aligned.
pub const DSPCADDR: usize = 0x0007_2184;
/// Graphics plane stride in bytes.
pub const DSPCSTRIDE: usize = 0x0007_2188;
/// Graphics plane position.
pub const DSPCPOS: usize = 0x0007_218C;
/// Graphics plane size, `(height-1) << 16 | (width-1)`.
pub const DSPCSIZE: usize = 0x0007_2190;

pub const HTOTAL_A: usize = 0x0006_0000;
pub const HBLANK_A: usize = 0x0006_0004;
pub const HSYNC_A: usize = 0x0006_0008;
pub const VTOTAL_A: usize = 0x0006_000C;
pub const VBLANK_A: usize = 0x0006_0010;
pub const VSYNC_A: usize = 0x0006_0014;
/// Pipe source image size, `(width-1) << 16 | (height-1)`. Programmable while
/// the pipe is enabled.
pub const PIPEASRC: usize = 0x0006_001C;
/// Border color pattern (10-bit RGB).
pub const BCLRPAT_A: usize = 0x0006_0020;
/// Canvas color (10-bit RGB).
pub const CANVSCLR_A: usize = 0x0006_0024;
pub const PIPEACONF: usize = 0x0007_0008;
/// Display FIFO arbitration.
pub const DSPARB: usize = 0x0007_0030;
/// Default FIFO arbitration watermark for pipe A.
pub const DSPARB_DEFAULT: u32 = 0x0000_1D9C;
/// MDVO rcomp status and pad control.
pub const RCOMPSTAT: usize = 0x0007_0048;

/// Pipe timing pair: HTOTAL, HBLANK, HSYNC, VTOTAL, VBLANK, VSYNC, PIPEASRC
/// and DSPCSIZE all share this layout.
///
/// Each half holds a count minus one: `LOW` in bits 15:0, `HIGH` in bits 31:16.
/// For HTOTAL_A that is `(active-1) | (total-1) << 16`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct TimingPairReg(u32);

impl crate::reg::Register for TimingPairReg {
    type Regwidth = u32;

    fn from_raw(val: u32) -> Self {
        Self(val)
    }

    fn to_raw(self) -> u32 {
        self.0
    }
}

impl TimingPairReg {
    pub const LOW_OFFSET: usize = 0;
    pub const LOW_WIDTH: usize = 16;
    pub const LOW_MASK: u32 = 0xFFFF;

    pub const HIGH_OFFSET: usize = 16;
    pub const HIGH_WIDTH: usize = 16;
    pub const HIGH_MASK: u32 = 0xFFFF;

    /// Encode two 1-based counts. A count of zero wraps to 0xFFFF in its field.
    #[inline(always)]
    #[must_use]
    pub const fn from_counts(low: u32, high: u32) -> Self {
        Self(
            ((low.wrapping_sub(1) & Self::LOW_MASK) << Self::LOW_OFFSET)
                | ((high.wrapping_sub(1) & Self::HIGH_MASK) << Self::HIGH_OFFSET),
        )
    }

    /// LOW field, raw (count minus one).
    #[inline(always)]
    #[must_use]
    pub const fn low(&self) -> u16 {
        ((self.0 >> Self::LOW_OFFSET) & Self::LOW_MASK) as u16
    }

    /// HIGH field, raw (count minus one).
    #[inline(always)]
    #[must_use]
    pub const fn high(&self) -> u16 {
        ((self.0 >> Self::HIGH_OFFSET) & Self::HIGH_MASK) as u16
    }

    /// Decode both halves back into 1-based counts `(low, high)`.
    #[inline(always)]
    #[must_use]
    pub const fn counts(&self) -> (u32, u32) {
        (self.low() as u32 + 1, self.high() as u32 + 1)
    }

    #[inline(always)]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Debug for TimingPairReg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TimingPairReg")
            .field("low", &self.low())
            .field("high", &self.high())
            .finish()
    }
}

/// Field Enum: graphics plane pixel format (DSPCCNTR bits 29:26).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneFormatE {
    /// 1-5-5-5 ARGB, used at depth 15
    Argb1555 = 0x3,
    /// x-8-8-8 RGB, used at depth 24
    Rgb0888 = 0x6,
    /// 8-8-8-8 ARGB
    Argb8888 = 0x7,
}

impl PlaneFormatE {
    /// Decode a bit pattern into an encoded enum variant.
    ///
    /// # Errors
    /// Returns an error if the bit pattern does not match any encoded variants.
    pub const fn from_bits(bits: u8) -> Result<Self, crate::encode::UnknownVariant<u8>> {
        match bits {
            0x3 => Ok(Self::Argb1555),
            0x6 => Ok(Self::Rgb0888),
            0x7 => Ok(Self::Argb8888),
            bits => Err(crate::encode::UnknownVariant::new(bits)),
        }
    }

    /// The bit pattern of the variant
    #[must_use]
    pub const fn bits(&self) -> u8 {
        *self as u8
    }
}

/// Register: DSPCCNTR
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct PlaneControlReg(u32);

impl crate::reg::Register for PlaneControlReg {
    type Regwidth = u32;

    fn from_raw(val: u32) -> Self {
        Self(val)
    }

    fn to_raw(self) -> u32 {
        self.0
    }
}

impl PlaneControlReg {
    pub const ENABLE_OFFSET: usize = 31;
    pub const ENABLE_MASK: u32 = 0x1;

    pub const GAMMA_BYPASS_OFFSET: usize = 30;
    pub const GAMMA_BYPASS_MASK: u32 = 0x1;

    pub const FORMAT_OFFSET: usize = 26;
    pub const FORMAT_WIDTH: usize = 4;
    pub const FORMAT_MASK: u32 = 0xF;

    pub const CONST_ALPHA_OFFSET: usize = 0;
    pub const CONST_ALPHA_WIDTH: usize = 8;
    pub const CONST_ALPHA_MASK: u32 = 0xFF;

    pub const ENABLE: u32 = Self::ENABLE_MASK << Self::ENABLE_OFFSET;

    #[inline(always)]
    #[must_use]
    pub fn enable(&self) -> bool {
        (self.0 >> Self::ENABLE_OFFSET) & Self::ENABLE_MASK != 0
    }

    #[inline(always)]
    pub fn set_enable(&mut self, val: bool) {
        self.0 = (self.0 & !(Self::ENABLE_MASK << Self::ENABLE_OFFSET))
            | ((val as u32 & Self::ENABLE_MASK) << Self::ENABLE_OFFSET);
    }

    #[inline(always)]
    #[must_use]
    pub fn gamma_bypass(&self) -> bool {
        (self.0 >> Self::GAMMA_BYPASS_OFFSET) & Self::GAMMA_BYPASS_MASK != 0
    }

    #[inline(always)]
    pub fn set_gamma_bypass(&mut self, val: bool) {
        self.0 = (self.0 & !(Self::GAMMA_BYPASS_MASK << Self::GAMMA_BYPASS_OFFSET))
            | ((val as u32 & Self::GAMMA_BYPASS_MASK) << Self::GAMMA_BYPASS_OFFSET);
    }

    /// FORMAT
    ///
    /// # Errors
    /// Returns an error if the field holds an encoding with no variant.
    #[inline(always)]
    pub fn format(&self) -> Result<PlaneFormatE, crate::encode::UnknownVariant<u8>> {
        PlaneFormatE::from_bits(((self.0 >> Self::FORMAT_OFFSET) & Self::FORMAT_MASK) as u8)
    }

    #[inline(always)]
    pub fn set_format(&mut self, val: PlaneFormatE) {
        self.0 = (self.0 & !(Self::FORMAT_MASK << Self::FORMAT_OFFSET))
            | ((val.bits() as u32 & Self::FORMAT_MASK) << Self::FORMAT_OFFSET);
    }

    #[inline(always)]
    #[must_use]
    pub fn const_alpha(&self) -> u8 {
        ((self.0 >> Self::CONST_ALPHA_OFFSET) & Self::CONST_ALPHA_MASK) as u8
    }

    #[inline(always)]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Debug for PlaneControlReg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PlaneControlReg")
            .field("enable", &self.enable())
            .field("gamma_bypass", &self.gamma_bypass())
            .field("format", &self.format())
            .field("const_alpha", &self.const_alpha())
            .finish()
    }
}

/// Register: PIPEACONF
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct PipeConfReg(u32);

impl crate::reg::Register for PipeConfReg {
    type Regwidth = u32;

    fn from_raw(val: u32) -> Self {
        Self(val)
    }

    fn to_raw(self) -> u32 {
        self.0
    }
}

impl PipeConfReg {
    pub const ENABLE_OFFSET: usize = 31;
    pub const FORCE_BORDER_OFFSET: usize = 25;
    pub const PLANES_OFF_OFFSET: usize = 19;
    pub const ARGB_OUTPUT_OFFSET: usize = 18;
    pub const BIT_MASK: u32 = 0x1;

    pub const ENABLE: u32 = Self::BIT_MASK << Self::ENABLE_OFFSET;
    pub const FORCE_BORDER: u32 = Self::BIT_MASK << Self::FORCE_BORDER_OFFSET;

    #[inline(always)]
    #[must_use]
    pub fn enable(&self) -> bool {
        (self.0 >> Self::ENABLE_OFFSET) & Self::BIT_MASK != 0
    }

    #[inline(always)]
    pub fn set_enable(&mut self, val: bool) {
        self.0 = (self.0 & !(Self::BIT_MASK << Self::ENABLE_OFFSET))
            | ((val as u32) << Self::ENABLE_OFFSET);
    }

    #[inline(always)]
    #[must_use]
    pub fn force_border(&self) -> bool {
        (self.0 >> Self::FORCE_BORDER_OFFSET) & Self::BIT_MASK != 0
    }

    #[inline(always)]
    pub fn set_force_border(&mut self, val: bool) {
        self.0 = (self.0 & !(Self::BIT_MASK << Self::FORCE_BORDER_OFFSET))
            | ((val as u32) << Self::FORCE_BORDER_OFFSET);
    }

    #[inline(always)]
    #[must_use]
    pub fn planes_off(&self) -> bool {
        (self.0 >> Self::PLANES_OFF_OFFSET) & Self::BIT_MASK != 0
    }

    #[inline(always)]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Debug for PipeConfReg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PipeConfReg")
            .field("enable", &self.enable())
            .field("force_border", &self.force_border())
            .field("planes_off", &self.planes_off())
            .finish()
    }
}

/// Register: RCOMPSTAT
///
/// Writing PAD_ENABLE powers the MDVO output pad; the hardware raises
/// RCOMP_READY once pad compensation has settled, both on enable and on
/// disable.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Default)]
pub struct RcompStatReg(u32);

impl crate::reg::Register for RcompStatReg {
    type Regwidth = u32;

    fn from_raw(val: u32) -> Self {
        Self(val)
    }

    fn to_raw(self) -> u32 {
        self.0
    }
}

impl RcompStatReg {
    pub const RCOMP_READY: u32 = 0x8000_0000;
    pub const PAD_ENABLE: u32 = 0x0000_0004;

    #[inline(always)]
    #[must_use]
    pub fn rcomp_ready(&self) -> bool {
        self.0 & Self::RCOMP_READY != 0
    }

    #[inline(always)]
    #[must_use]
    pub fn pad_enable(&self) -> bool {
        self.0 & Self::PAD_ENABLE != 0
    }

    #[inline(always)]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }
}

impl core::fmt::Debug for RcompStatReg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RcompStatReg")
            .field("rcomp_ready", &self.rcomp_ready())
            .field("pad_enable", &self.pad_enable())
            .finish()
    }
}
