//! Carillo Ranch chipset registers.
//!
//! The pixel clock select lives in the MCH (host bridge) MMIO window; the
//! LVDS, panel power and backlight controls sit on the GPIO port of the LPC
//! (ISA) bridge.

pub const VENDOR_INTEL: u16 = 0x8086;

/// Host bridge, expected at 00:00.0.
pub const DEVICE_MCH: u16 = 0x5001;
/// MCHBAR config register.
pub const REG_MCHBAR: u8 = 0x44;
/// Device enable config register.
pub const REG_MCHEN: u8 = 0x54;
pub const MCHEN_BIT: u32 = 1 << 28;
pub const MCHMAP_SIZE: usize = 4096;

/// Pixel clock select register, offset in the MCH window.
pub const REG_CLOCK: usize = 0x0C3C;
pub const CLOCK_OFFSET: usize = 8;
pub const CLOCK_MASK: u32 = 0x0000_0F00;

/// LPC bridge, expected at 00:1f.0.
pub const DEVICE_LPC: u16 = 0x27B8;
/// GPIO base address config register; low 6 bits are flags.
pub const REG_GPIOBAR: u8 = 0x48;
pub const GPIOBAR_MASK: u32 = !0x3F;
/// GPIO enable config register (byte).
pub const REG_GPIOEN: u8 = 0x4C;
pub const GPIOEN_BIT: u8 = 1 << 4;

/// Panel control latch, offset from the GPIO base.
pub const PANEL_PORT: u16 = 0x38;
pub const LVDS_ON: u32 = 0x0000_0001;
pub const PANEL_ON: u32 = 0x0000_0002;
pub const BACKLIGHT_OFF: u32 = 0x0000_0004;

/// Encode a clock-table control value into the clock-select field.
#[inline(always)]
#[must_use]
pub const fn clock_field(bits: u32) -> u32 {
    (bits << CLOCK_OFFSET) & CLOCK_MASK
}
