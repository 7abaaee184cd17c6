//! Display timings, color depths and the panel table.

use fixed::types::U8F8;
use vermilion_registers::{mbx, vdc::PlaneFormatE};

use crate::error::DriverError;

/// One display timing. Horizontal values in pixels, vertical in lines, all
/// 1-based counts as they appear in a modeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimingDescriptor {
    /// Requested pixel clock, kHz.
    pub clock: u32,
    pub h_active: u32,
    pub h_blank_start: u32,
    pub h_blank_end: u32,
    pub h_sync_start: u32,
    pub h_sync_end: u32,
    pub h_total: u32,
    pub v_active: u32,
    pub v_blank_start: u32,
    pub v_blank_end: u32,
    pub v_sync_start: u32,
    pub v_sync_end: u32,
    pub v_total: u32,
    pub interlace: bool,
}

impl TimingDescriptor {
    /// Build a progressive timing from modeline values. Blanking spans the
    /// whole inactive region, from the end of the active area to the total.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn from_modeline(
        clock: u32,
        h_active: u32,
        h_sync_start: u32,
        h_sync_end: u32,
        h_total: u32,
        v_active: u32,
        v_sync_start: u32,
        v_sync_end: u32,
        v_total: u32,
    ) -> Self {
        Self {
            clock,
            h_active,
            h_blank_start: h_active,
            h_blank_end: h_total,
            h_sync_start,
            h_sync_end,
            h_total,
            v_active,
            v_blank_start: v_active,
            v_blank_end: v_total,
            v_sync_start,
            v_sync_end,
            v_total,
            interlace: false,
        }
    }

    /// Horizontal refresh at `pixel_clock` kHz, in kHz.
    #[must_use]
    pub fn h_refresh_khz(&self, pixel_clock: u32) -> f32 {
        if self.h_total == 0 {
            return 0.0;
        }
        pixel_clock as f32 / self.h_total as f32
    }

    /// Vertical refresh at `pixel_clock` kHz, in Hz.
    #[must_use]
    pub fn v_refresh_hz(&self, pixel_clock: u32) -> f32 {
        if self.v_total == 0 {
            return 0.0;
        }
        self.h_refresh_khz(pixel_clock) / self.v_total as f32 * 1000.0
    }
}

/// XGA 60 Hz, the native timing of the board's fixed panel.
pub const XGA_60: TimingDescriptor =
    TimingDescriptor::from_modeline(65_000, 1024, 1048, 1184, 1344, 768, 771, 777, 806);

/// Supported framebuffer depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorDepth {
    /// 1-5-5-5, 16 bits per pixel.
    Depth15,
    /// x-8-8-8, 32 bits per pixel.
    Depth24,
}

impl ColorDepth {
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Depth15 => 15,
            Self::Depth24 => 24,
        }
    }

    /// Bytes per pixel.
    #[must_use]
    pub const fn cpp(self) -> u32 {
        match self {
            Self::Depth15 => 2,
            Self::Depth24 => 4,
        }
    }

    /// Scanout format of the graphics plane.
    #[must_use]
    pub const fn plane_format(self) -> PlaneFormatE {
        match self {
            Self::Depth15 => PlaneFormatE::Argb1555,
            Self::Depth24 => PlaneFormatE::Rgb0888,
        }
    }

    /// Surface format field of MBX surface descriptors.
    #[must_use]
    pub const fn mbx_format(self) -> u32 {
        match self {
            Self::Depth15 => mbx::SRC_555RGB,
            Self::Depth24 => mbx::SRC_8888ARGB,
        }
    }
}

impl TryFrom<u8> for ColorDepth {
    type Error = DriverError;

    fn try_from(depth: u8) -> Result<Self, Self::Error> {
        match depth {
            15 => Ok(Self::Depth15),
            24 => Ok(Self::Depth24),
            other => Err(DriverError::UnsupportedDepth(other)),
        }
    }
}

/// Electrical limits of an LCD panel. Clocks in kHz, horizontal period in
/// nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelSpec {
    pub name: &'static str,
    pub clock_max: u32,
    pub clock_min: u32,
    pub h_act_max: u32,
    pub h_act_min: u32,
    pub h_tot_max: u32,
    pub h_tot_min: u32,
    pub v_act_max: u32,
    pub v_act_min: u32,
    pub v_tot_max: u32,
    pub v_tot_min: u32,
    pub h_per_max: u32,
    pub h_per_min: u32,
    pub gamma: U8F8,
}

pub const PANELS: &[PanelSpec] = &[PanelSpec {
    name: "SHARP LQ150X1LGN2A",
    clock_max: 80_000,
    clock_min: 50_000,
    h_act_max: 1024,
    h_act_min: 1024,
    h_tot_max: 1720,
    h_tot_min: 1056,
    v_act_max: 768,
    v_act_min: 768,
    v_tot_max: 990,
    v_tot_min: 773,
    h_per_max: 23_400,
    h_per_min: 16_000,
    gamma: U8F8::ONE,
}];

/// Look up a panel by index.
///
/// # Errors
/// `UnknownPanel` when `index` is past the end of [`PANELS`].
pub fn panel(index: usize) -> Result<&'static PanelSpec, DriverError> {
    PANELS.get(index).ok_or(DriverError::UnknownPanel(index))
}
