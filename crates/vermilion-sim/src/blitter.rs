//! Slave-port command decoder.
//!
//! Words are collected until a block is complete, then executed against
//! framebuffer memory. Blits that read the source surface carry `USE_PAT`
//! and two coordinate operands; solid blits carry a color operand first.

use vermilion_registers::mbx::{self, BlockHeaderE};

/// Result of a ternary raster op on packed pixels. Bit `k` of `rop` gives
/// the output for pattern/source/destination bits `(k>>2, k>>1, k) & 1`.
#[must_use]
pub fn rop3(rop: u8, pattern: u32, source: u32, dest: u32) -> u32 {
    let mut out = 0;
    for k in 0..8u8 {
        if rop & (1 << k) == 0 {
            continue;
        }
        let p = if k & 4 != 0 { pattern } else { !pattern };
        let s = if k & 2 != 0 { source } else { !source };
        let d = if k & 1 != 0 { dest } else { !dest };
        out |= p & s & d;
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct SurfaceDesc {
    address: u32,
    stride: u32,
    bytes_per_pixel: u32,
}

impl SurfaceDesc {
    fn from_words(header: u32, address: u32) -> Self {
        let bytes_per_pixel = if header & mbx::SRC_8888ARGB == mbx::SRC_8888ARGB {
            4
        } else {
            2
        };
        Self {
            address,
            stride: header & mbx::STRIDE_MASK,
            bytes_per_pixel,
        }
    }

    fn pixel_address(&self, x: u32, y: u32) -> u32 {
        self.address
            .wrapping_add(y.wrapping_mul(self.stride))
            .wrapping_add(x.wrapping_mul(self.bytes_per_pixel))
    }
}

/// Counters of executed blocks, for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlitStats {
    pub fills: u32,
    pub copies: u32,
    pub fences: u32,
    pub pixels: u64,
    /// Words that did not start any known block.
    pub bad_words: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Blitter {
    pending: Vec<u32>,
    dst: SurfaceDesc,
    src: SurfaceDesc,
    src_offset: (u32, u32),
    color_key: Option<(u32, u32)>,
    pub(crate) stats: BlitStats,
}

/// Framebuffer memory seen by the decoder.
pub(crate) struct Vram<'a> {
    pub base: u32,
    pub bytes: &'a mut [u8],
}

impl Vram<'_> {
    fn offset(&self, address: u32, width: u32) -> Option<usize> {
        let offset = address.checked_sub(self.base)? as usize;
        (offset + width as usize <= self.bytes.len()).then_some(offset)
    }

    fn read(&self, address: u32, width: u32) -> u32 {
        let Some(offset) = self.offset(address, width) else {
            return 0;
        };
        let mut raw = [0u8; 4];
        raw[..width as usize].copy_from_slice(&self.bytes[offset..offset + width as usize]);
        u32::from_le_bytes(raw)
    }

    fn write(&mut self, address: u32, width: u32, value: u32) {
        if let Some(offset) = self.offset(address, width) {
            let raw = value.to_le_bytes();
            self.bytes[offset..offset + width as usize].copy_from_slice(&raw[..width as usize]);
        } else {
            log::warn!("sim: blit write outside video memory at {address:#010x}");
        }
    }
}

impl Blitter {
    /// Operand words still expected after the block's first word.
    fn block_len(first: u32) -> Option<usize> {
        let header = BlockHeaderE::of(first).ok()?;
        Some(match header {
            BlockHeaderE::Ctrl if first & mbx::SRCCK_CTRL != 0 => 2,
            BlockHeaderE::Ctrl | BlockHeaderE::SrcOff | BlockHeaderE::Fence => 0,
            BlockHeaderE::Blit if first & mbx::USE_PAT != 0 => 2,
            BlockHeaderE::Blit => 3,
            BlockHeaderE::SrcCtrl | BlockHeaderE::DstCtrl => 1,
        })
    }

    pub(crate) fn push(&mut self, word: u32, vram: &mut Vram<'_>) {
        self.pending.push(word);
        let first = self.pending[0];
        let Some(len) = Self::block_len(first) else {
            self.stats.bad_words += 1;
            self.pending.clear();
            return;
        };
        if self.pending.len() < len + 1 {
            return;
        }
        let block = std::mem::take(&mut self.pending);
        self.execute(&block, vram);
    }

    fn execute(&mut self, block: &[u32], vram: &mut Vram<'_>) {
        let first = block[0];
        match BlockHeaderE::of(first) {
            Ok(BlockHeaderE::DstCtrl) => self.dst = SurfaceDesc::from_words(first, block[1]),
            Ok(BlockHeaderE::SrcCtrl) => self.src = SurfaceDesc::from_words(first, block[1]),
            Ok(BlockHeaderE::Ctrl) => {
                self.color_key = (first & mbx::SRCCK_CTRL != 0).then(|| (block[1], block[2]));
            }
            Ok(BlockHeaderE::SrcOff) => {
                self.src_offset = ((first >> mbx::SRC_OFF_X_OFFSET) & 0x3FFF, first & 0x3FFF);
            }
            Ok(BlockHeaderE::Fence) => self.stats.fences += 1,
            Ok(BlockHeaderE::Blit) if first & mbx::USE_PAT != 0 => {
                self.copy(first, block[1], block[2], vram);
            }
            Ok(BlockHeaderE::Blit) => self.fill(first, block[1], block[2], block[3], vram),
            Err(_) => self.stats.bad_words += 1,
        }
    }

    fn rect(top_left: u32, bottom_right: u32) -> (u32, u32, u32, u32) {
        (
            top_left >> 16,
            top_left & 0xFFFF,
            bottom_right >> 16,
            bottom_right & 0xFFFF,
        )
    }

    fn fill(&mut self, blit: u32, color: u32, top_left: u32, bottom_right: u32, vram: &mut Vram<'_>) {
        let rop = (blit & mbx::ROP_MASK) as u8;
        let (x1, y1, x2, y2) = Self::rect(top_left, bottom_right);
        let width = self.dst.bytes_per_pixel;
        for y in y1..y2 {
            for x in x1..x2 {
                let address = self.dst.pixel_address(x, y);
                let dest = vram.read(address, width);
                vram.write(address, width, rop3(rop, color, 0, dest));
                self.stats.pixels += 1;
            }
        }
        self.stats.fills += 1;
    }

    fn copy(&mut self, blit: u32, top_left: u32, bottom_right: u32, vram: &mut Vram<'_>) {
        let rop = (blit & mbx::ROP_MASK) as u8;
        let (x1, y1, x2, y2) = Self::rect(top_left, bottom_right);
        let (sx, sy) = self.src_offset;
        let width = self.dst.bytes_per_pixel;
        let pixel_mask = if width == 4 { u32::MAX } else { 0xFFFF };
        let key = self
            .color_key
            .filter(|_| blit & mbx::SRCCK_REJECT != 0)
            .map(|(key, mask)| key & mask & pixel_mask);

        // Snapshot the source first so overlapping copies behave as if the
        // direction bits were chosen correctly.
        let mut source = Vec::new();
        for y in 0..y2.saturating_sub(y1) {
            for x in 0..x2.saturating_sub(x1) {
                source.push(vram.read(self.src.pixel_address(sx + x, sy + y), width));
            }
        }

        let mut pixels = source.into_iter();
        for y in y1..y2 {
            for x in x1..x2 {
                let Some(src) = pixels.next() else { break };
                if key == Some(src & pixel_mask) {
                    continue;
                }
                let address = self.dst.pixel_address(x, y);
                let dest = vram.read(address, width);
                vram.write(address, width, rop3(rop, 0, src, dest) & pixel_mask);
                self.stats.pixels += 1;
            }
        }
        self.stats.copies += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rop3_basic_codes() {
        assert_eq!(rop3(0xF0, 0x1234, 0, 0xFFFF), 0x1234);
        assert_eq!(rop3(0xCC, 0, 0x55, 0xAA), 0x55);
        assert_eq!(rop3(0xAA, 0x11, 0x22, 0x33), 0x33);
        assert_eq!(rop3(0x66, 0, 0x0F, 0xFF), 0xF0);
        assert_eq!(rop3(0x00, 1, 2, 3), 0);
    }

    #[test]
    fn solid_fill_block() {
        let mut memory = vec![0u8; 64];
        let mut vram = Vram {
            base: 0x1000,
            bytes: &mut memory,
        };
        let mut blitter = Blitter::default();
        for word in [
            mbx::DST_CTRL_BH | mbx::SRC_8888ARGB | 16,
            0x1000,
            mbx::blit_word(0, 0xF0),
            0xAABB_CCDD,
            mbx::pack_xy(1, 0),
            mbx::pack_xy(3, 1),
            mbx::FENCE_BH,
        ] {
            blitter.push(word, &mut vram);
        }
        assert_eq!(blitter.stats.fills, 1);
        assert_eq!(blitter.stats.fences, 1);
        assert_eq!(vram.read(0x1000, 4), 0);
        assert_eq!(vram.read(0x1004, 4), 0xAABB_CCDD);
        assert_eq!(vram.read(0x1008, 4), 0xAABB_CCDD);
        assert_eq!(vram.read(0x100C, 4), 0);
    }
}
