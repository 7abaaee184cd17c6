//! MBX 2D command engine: solid fills and screen-to-screen copies streamed
//! through the slave port, with fence-based completion.
//!
//! Every drawing primitive ends with a FENCE block so blits never overlap.
//! [`BlitEngine::sync`] additionally writes a counter value into a reserved
//! word at the end of the framebuffer and waits until it lands, proving that
//! everything queued before it has executed.

use vermilion_hal::{DelayNs, RegisterWindow};
use vermilion_registers::mbx;

use crate::config::PollConfig;
use crate::error::{DriverError, Result};
use crate::mode::Surface;
use crate::poll::poll_until;
use crate::timing::ColorDepth;

mod fifo;
mod rop;

pub use fifo::{FenceCounter, FifoSlots};
pub use rop::Rop;

/// Bytes reserved at the end of the framebuffer for the fence mirror word.
pub const SYNC_MAP_SIZE: u32 = 4;

/// Highest pixmap row the 2D core can address.
pub const MAX_PIXMAP_LINES: u32 = 4095;

const SYNC_PACKET_WORDS: usize = 7;
const FILL_SETUP_WORDS: usize = 2;
const COPY_KEY_WORDS: usize = 3;
const COPY_SETUP_WORDS: usize = 4;
const RECT_WORDS: usize = 5;

/// Alpha bit forced on depth-15 fill colors so the pixel is opaque.
const DEPTH15_ALPHA: u32 = 0x8000;

/// Copy direction, chosen by the caller so overlapping copies do not read
/// already-written pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyDirection {
    /// Right to left.
    pub x_reverse: bool,
    /// Bottom to top.
    pub y_reverse: bool,
}

impl CopyDirection {
    /// Direction from signed step values; negative means reverse.
    #[must_use]
    pub const fn from_steps(xdir: i32, ydir: i32) -> Self {
        Self {
            x_reverse: xdir < 0,
            y_reverse: ydir < 0,
        }
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        let mut bits = mbx::TEXTCOPY_TL2BR;
        if self.x_reverse {
            bits |= mbx::TEXTCOPY_TR2BL;
        }
        if self.y_reverse {
            bits |= mbx::TEXTCOPY_BL2TR;
        }
        bits
    }
}

/// State left behind by the last setup call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Setup {
    None,
    Fill { rop: u8, color: u32 },
    Copy { rop: u8, flags: u32 },
}

#[derive(Debug)]
pub struct BlitEngine<W> {
    mbx_regs: W,
    fb: W,
    surface: Surface,
    poll: PollConfig,
    slots: FifoSlots,
    fence: FenceCounter,
    setup: Setup,
}

impl<W: RegisterWindow> BlitEngine<W> {
    /// Take over the MBX register window and the framebuffer window. The
    /// fence counter continues from the current mirror word.
    pub fn new(mbx_regs: W, mut fb: W, surface: Surface, poll: PollConfig) -> Self {
        let mirror = fb.read32(Self::mirror_offset(&surface));
        let fence = FenceCounter::seeded(mirror);
        log::debug!("blit engine: fence seeded at {:#06x}", fence.last());
        Self {
            mbx_regs,
            fb,
            surface,
            poll,
            slots: FifoSlots::new(),
            fence,
            setup: Setup::None,
        }
    }

    fn mirror_offset(surface: &Surface) -> usize {
        surface.fb_size.saturating_sub(SYNC_MAP_SIZE) as usize
    }

    /// Device address of the fence mirror word.
    #[must_use]
    pub fn sync_address(&self) -> u32 {
        self.surface
            .fb_base
            .wrapping_add(self.surface.fb_size.saturating_sub(SYNC_MAP_SIZE))
    }

    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    #[must_use]
    pub fn slots(&self) -> &FifoSlots {
        &self.slots
    }

    /// Last fence value issued.
    #[must_use]
    pub fn last_fence(&self) -> u16 {
        self.fence.last()
    }

    /// Framebuffer rows available to offscreen pixmaps: everything below the
    /// visible lines up to the mirror word, capped at the core's 12-bit row
    /// limit.
    #[must_use]
    pub fn pixmap_lines(&self) -> u32 {
        if self.surface.stride == 0 {
            return 0;
        }
        let lines = self.surface.fb_size.saturating_sub(SYNC_MAP_SIZE) / self.surface.stride;
        lines.min(MAX_PIXMAP_LINES)
    }

    /// Reserve `n` FIFO slots.
    ///
    /// # Errors
    /// `BatchTooLarge` or `Timeout`.
    pub fn acquire_slots<D: DelayNs>(&mut self, n: u32, delay: &mut D) -> Result<()> {
        self.slots
            .acquire(&mut self.mbx_regs, delay, self.poll.fifo, n)
    }

    /// Write `words` to the slave port in order. Slots must already be
    /// reserved.
    pub fn write_batch(&mut self, words: &[u32]) {
        for &word in words {
            log::trace!("slave port <- {word:#010x}");
            self.mbx_regs.write32(mbx::SLAVE_PORT, word);
        }
    }

    /// Reserve room for `words` and write them.
    ///
    /// # Errors
    /// As [`Self::acquire_slots`]; nothing is written on failure.
    pub fn submit<D: DelayNs>(&mut self, words: &[u32], delay: &mut D) -> Result<()> {
        self.acquire_slots(words.len() as u32, delay)?;
        self.write_batch(words);
        Ok(())
    }

    fn surface_word(&self, header: u32) -> u32 {
        header | self.surface.depth.mbx_format() | (self.surface.stride & mbx::STRIDE_MASK)
    }

    /// Block until everything queued so far has executed.
    ///
    /// Returns the fence value observed.
    ///
    /// # Errors
    /// `Timeout` if the mirror word never shows the fence. The fence value
    /// is consumed either way.
    pub fn sync<D: DelayNs>(&mut self, delay: &mut D) -> Result<u16> {
        let value = self.fence.peek();
        let packet: [u32; SYNC_PACKET_WORDS] = [
            mbx::DST_CTRL_BH | mbx::SRC_8888ARGB,
            self.sync_address(),
            mbx::blit_word(0, Rop::Copy.pattern_rop()),
            u32::from(value),
            mbx::pack_xy(0, 0),
            mbx::pack_xy(1, 1),
            mbx::FENCE_BH,
        ];
        self.submit(&packet, delay)?;
        self.fence.advance();
        // The packet retargeted the destination surface.
        self.setup = Setup::None;

        let offset = Self::mirror_offset(&self.surface);
        let fb = &mut self.fb;
        poll_until(self.poll.fence, delay, "fence", || {
            fb.read32(offset) == u32::from(value)
        })?;
        log::trace!("fence {value:#06x} reached");
        Ok(value)
    }

    /// Prepare solid fills with `color` combined through `rop`.
    ///
    /// # Errors
    /// As [`Self::submit`].
    pub fn setup_fill<D: DelayNs>(&mut self, color: u32, rop: Rop, delay: &mut D) -> Result<()> {
        let color = match self.surface.depth {
            ColorDepth::Depth15 => color | DEPTH15_ALPHA,
            ColorDepth::Depth24 => color,
        };
        let words: [u32; FILL_SETUP_WORDS] =
            [self.surface_word(mbx::DST_CTRL_BH), self.surface.fb_base];
        self.setup = Setup::None;
        self.submit(&words, delay)?;
        self.setup = Setup::Fill {
            rop: rop.pattern_rop(),
            color,
        };
        Ok(())
    }

    /// Fill the `w` x `h` rectangle at `(x, y)`.
    ///
    /// # Errors
    /// `NoBlitSetup` without a preceding [`Self::setup_fill`], else as
    /// [`Self::submit`].
    pub fn fill_rect<D: DelayNs>(
        &mut self,
        x: i32,
        y: i32,
        w: i32,
        h: i32,
        delay: &mut D,
    ) -> Result<()> {
        let Setup::Fill { rop, color } = self.setup else {
            return Err(DriverError::NoBlitSetup("solid fill"));
        };
        let words: [u32; RECT_WORDS] = [
            mbx::blit_word(0, rop),
            color,
            mbx::pack_xy(x, y),
            mbx::pack_xy(x.wrapping_add(w), y.wrapping_add(h)),
            mbx::FENCE_BH,
        ];
        self.submit(&words, delay)
    }

    /// Prepare screen-to-screen copies. A `transparency` key makes source
    /// pixels of that color leave the destination untouched.
    ///
    /// # Errors
    /// As [`Self::submit`].
    pub fn setup_copy<D: DelayNs>(
        &mut self,
        direction: CopyDirection,
        rop: Rop,
        transparency: Option<u32>,
        delay: &mut D,
    ) -> Result<()> {
        self.setup = Setup::None;
        let mut flags = mbx::USE_PAT | direction.bits();

        if let Some(key) = transparency {
            flags |= mbx::SRCCK_REJECT;
            let key = match self.surface.depth {
                ColorDepth::Depth15 => key | (key << 16),
                ColorDepth::Depth24 => key,
            };
            let words: [u32; COPY_KEY_WORDS] = [mbx::CTRL_BH | mbx::SRCCK_CTRL, key, 0xFFFF_FFFF];
            self.submit(&words, delay)?;
        }

        let words: [u32; COPY_SETUP_WORDS] = [
            self.surface_word(mbx::SRC_CTRL_BH | mbx::SRC_FBMEM),
            self.surface.fb_base,
            self.surface_word(mbx::DST_CTRL_BH),
            self.surface.fb_base,
        ];
        self.submit(&words, delay)?;
        self.setup = Setup::Copy {
            rop: rop.copy_rop(),
            flags,
        };
        Ok(())
    }

    /// Copy the `w` x `h` rectangle at `(src_x, src_y)` to `(dst_x, dst_y)`.
    ///
    /// # Errors
    /// `NoBlitSetup` without a preceding [`Self::setup_copy`], else as
    /// [`Self::submit`].
    #[allow(clippy::too_many_arguments)]
    pub fn copy_rect<D: DelayNs>(
        &mut self,
        src_x: i32,
        src_y: i32,
        dst_x: i32,
        dst_y: i32,
        w: i32,
        h: i32,
        delay: &mut D,
    ) -> Result<()> {
        let Setup::Copy { rop, flags } = self.setup else {
            return Err(DriverError::NoBlitSetup("screen to screen copy"));
        };
        let words: [u32; RECT_WORDS] = [
            mbx::src_offset_word(src_x, src_y),
            mbx::blit_word(flags, rop),
            mbx::pack_xy(dst_x, dst_y),
            mbx::pack_xy(dst_x.wrapping_add(w), dst_y.wrapping_add(h)),
            mbx::FENCE_BH,
        ];
        self.submit(&words, delay)
    }

    /// Framebuffer window, for CPU access to video memory.
    pub fn framebuffer(&mut self) -> &mut W {
        &mut self.fb
    }

    /// Give the windows back for unmapping.
    pub fn into_windows(self) -> (W, W) {
        (self.mbx_regs, self.fb)
    }
}
