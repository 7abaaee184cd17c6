//! Mode controller: pipe A timing, graphics plane C and the MDVO output pad.

use vermilion_hal::{DelayNs, RegisterWindow};
use vermilion_registers::vdc::{self, PipeConfReg, PlaneControlReg, RcompStatReg, TimingPairReg};
use vermilion_registers::Register;

use crate::board::{nearest_clock_index, BoardOps};
use crate::error::{DriverError, Result};
use crate::poll::{poll_until, PollPolicy};
use crate::timing::{ColorDepth, PanelSpec, TimingDescriptor};
use crate::validate::{validate, ModeStatus};

/// One frame at 50 Hz, long enough for a plane disable to latch.
const VBLANK_WAIT_MS: u32 = 20;

/// Scanout surface in framebuffer memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Surface {
    /// Device address of the framebuffer.
    pub fb_base: u32,
    /// Framebuffer size in bytes.
    pub fb_size: u32,
    /// Bytes per line.
    pub stride: u32,
    pub depth: ColorDepth,
}

impl Surface {
    /// Device address of pixel `(x, y)`.
    #[must_use]
    pub fn address_of(&self, x: u32, y: u32) -> u32 {
        self.fb_base
            .wrapping_add(y.wrapping_mul(self.stride))
            .wrapping_add(x.wrapping_mul(self.depth.cpp()))
    }
}

/// Pipe shutdown progress. The pipe only comes back to `Enabled` through a
/// successful mode set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeState {
    Enabled,
    PadDisabling,
    PlaneDisabling,
    PipeDisabled,
}

/// Register values for one mode, computed up front so nothing is written
/// for a mode that cannot be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRegisters {
    pub htotal: TimingPairReg,
    pub hblank: TimingPairReg,
    pub hsync: TimingPairReg,
    pub vtotal: TimingPairReg,
    pub vblank: TimingPairReg,
    pub vsync: TimingPairReg,
    /// Source image size, width in the high half.
    pub pipesrc: TimingPairReg,
    /// Plane size, height in the high half.
    pub dspsize: TimingPairReg,
    pub dspcntr: PlaneControlReg,
    pub stride: u32,
}

impl ModeRegisters {
    #[must_use]
    pub fn compute(timing: &TimingDescriptor, surface: &Surface) -> Self {
        let mut dspcntr = PlaneControlReg::default();
        dspcntr.set_enable(true);
        dspcntr.set_gamma_bypass(true);
        dspcntr.set_format(surface.depth.plane_format());

        Self {
            htotal: TimingPairReg::from_counts(timing.h_active, timing.h_total),
            hblank: TimingPairReg::from_counts(timing.h_blank_start, timing.h_blank_end),
            hsync: TimingPairReg::from_counts(timing.h_sync_start, timing.h_sync_end),
            vtotal: TimingPairReg::from_counts(timing.v_active, timing.v_total),
            vblank: TimingPairReg::from_counts(timing.v_blank_start, timing.v_blank_end),
            vsync: TimingPairReg::from_counts(timing.v_sync_start, timing.v_sync_end),
            pipesrc: TimingPairReg::from_counts(timing.v_active, timing.h_active),
            dspsize: TimingPairReg::from_counts(timing.h_active, timing.v_active),
            dspcntr,
            stride: surface.stride,
        }
    }
}

/// Everything a mode set needs besides the hardware handles.
#[derive(Debug, Clone, Copy)]
pub struct ModeRequest<'a> {
    pub timing: &'a TimingDescriptor,
    /// Clocks the screen may use.
    pub clocks: &'a [u32],
    pub panel: Option<&'a PanelSpec>,
    pub surface: &'a Surface,
    /// Scanout offset into the framebuffer, pixels.
    pub viewport: (u32, u32),
}

#[derive(Debug)]
pub struct ModeController {
    state: PipeState,
    pad_poll: PollPolicy,
    debug: bool,
    current: Option<TimingDescriptor>,
}

impl ModeController {
    /// The pipe state is unknown at start-up; assume it is running so the
    /// first mode set performs a full shutdown.
    #[must_use]
    pub fn new(pad_poll: PollPolicy, debug: bool) -> Self {
        Self {
            state: PipeState::Enabled,
            pad_poll,
            debug,
            current: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> PipeState {
        self.state
    }

    /// Last successfully programmed timing.
    #[must_use]
    pub fn current(&self) -> Option<&TimingDescriptor> {
        self.current.as_ref()
    }

    /// Shut the output down: pad, then plane, then (after a vblank) the pipe.
    ///
    /// # Errors
    /// `Timeout` if the pad never reports compensation done. The plane and
    /// pipe are still forced off in that case.
    pub fn disable_pipe<W: RegisterWindow, D: DelayNs>(
        &mut self,
        vdc: &mut W,
        delay: &mut D,
    ) -> Result<()> {
        vdc.write32(vdc::RCOMPSTAT, 0);
        self.transition(PipeState::PadDisabling);
        if let Err(e) = poll_until(self.pad_poll, delay, "MDVO pad disable", || {
            RcompStatReg::from_raw(vdc.read32(vdc::RCOMPSTAT)).rcomp_ready()
        }) {
            self.force_off(vdc);
            return Err(e);
        }

        let cntr = vdc.read32(vdc::DSPCCNTR);
        vdc.write32(vdc::DSPCCNTR, cntr & !PlaneControlReg::ENABLE);
        let _ = vdc.read32(vdc::DSPCCNTR);
        self.transition(PipeState::PlaneDisabling);

        delay.delay_ms(VBLANK_WAIT_MS);

        vdc.write32(vdc::PIPEACONF, 0);
        let _ = vdc.read32(vdc::PIPEACONF);
        self.transition(PipeState::PipeDisabled);
        Ok(())
    }

    /// Program `request.timing`.
    ///
    /// # Errors
    /// `InvalidMode` when validation rejects the timing (nothing written),
    /// the board's clock error, or `Timeout` on the pad. Any failure after
    /// the pipe was disabled leaves it disabled.
    pub fn set_mode<W, B, D>(
        &mut self,
        vdc: &mut W,
        board: &mut B,
        delay: &mut D,
        request: ModeRequest<'_>,
    ) -> Result<()>
    where
        W: RegisterWindow,
        B: BoardOps,
        D: DelayNs,
    {
        let timing = request.timing;
        let status = validate(timing, request.clocks, request.panel);
        if status != ModeStatus::Ok {
            log::warn!(
                "rejecting {}x{} @ {} kHz: {status}",
                timing.h_active,
                timing.v_active,
                timing.clock
            );
            return Err(DriverError::InvalidMode(status));
        }

        let pixel_clock = nearest_clock_index(request.clocks, timing.clock)
            .map(|i| request.clocks[i])
            .ok_or(DriverError::UnsupportedClock {
                clock: timing.clock,
            })?;
        log::info!("requested pixel clock {} kHz", timing.clock);

        let regs = ModeRegisters::compute(timing, request.surface);
        if self.debug {
            log_timing(&regs, timing, pixel_clock);
        }

        self.disable_pipe(vdc, delay)?;
        vdc.barrier();

        board.set_clock(pixel_clock)?;

        vdc.write32(vdc::HTOTAL_A, regs.htotal.bits());
        vdc.write32(vdc::HBLANK_A, regs.hblank.bits());
        vdc.write32(vdc::HSYNC_A, regs.hsync.bits());
        vdc.write32(vdc::VTOTAL_A, regs.vtotal.bits());
        vdc.write32(vdc::VBLANK_A, regs.vblank.bits());
        vdc.write32(vdc::VSYNC_A, regs.vsync.bits());
        vdc.write32(vdc::DSPCSTRIDE, regs.stride);
        vdc.write32(vdc::DSPCSIZE, regs.dspsize.bits());
        vdc.write32(vdc::DSPCPOS, 0);
        vdc.write32(vdc::DSPARB, vdc::DSPARB_DEFAULT);
        // Black border and canvas.
        vdc.write32(vdc::BCLRPAT_A, 0);
        vdc.write32(vdc::CANVSCLR_A, 0);
        vdc.write32(vdc::PIPEASRC, regs.pipesrc.bits());
        let _ = vdc.read32(vdc::PIPEASRC);
        vdc.barrier();

        // Pipe first, then the plane on top of it.
        vdc.write32(vdc::PIPEACONF, PipeConfReg::ENABLE);
        let _ = vdc.read32(vdc::PIPEACONF);
        vdc.barrier();

        vdc.write32(vdc::DSPCCNTR, regs.dspcntr.bits());
        let (x, y) = request.viewport;
        set_graphics_offset(vdc, request.surface, x, y);

        vdc.write32(vdc::RCOMPSTAT, RcompStatReg::PAD_ENABLE);
        let pad_ready = RcompStatReg::PAD_ENABLE | RcompStatReg::RCOMP_READY;
        if let Err(e) = poll_until(self.pad_poll, delay, "MDVO pad enable", || {
            vdc.read32(vdc::RCOMPSTAT) & pad_ready == pad_ready
        }) {
            self.force_off(vdc);
            return Err(e);
        }

        self.transition(PipeState::Enabled);
        self.current = Some(*timing);
        log::info!(
            "mode {}x{} set, pixel clock {} kHz",
            timing.h_active,
            timing.v_active,
            pixel_clock
        );
        if self.debug {
            dump_registers(vdc);
        }
        Ok(())
    }

    /// Pad, plane and pipe off with no status polling. Recovery path for a
    /// pad that never settles.
    fn force_off<W: RegisterWindow>(&mut self, vdc: &mut W) {
        log::warn!("forcing display pipe off");
        vdc.write32(vdc::RCOMPSTAT, 0);
        let cntr = vdc.read32(vdc::DSPCCNTR);
        vdc.write32(vdc::DSPCCNTR, cntr & !PlaneControlReg::ENABLE);
        vdc.write32(vdc::PIPEACONF, 0);
        let _ = vdc.read32(vdc::PIPEACONF);
        self.transition(PipeState::PipeDisabled);
    }

    fn transition(&mut self, next: PipeState) {
        log::debug!("pipe: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Show the border color instead of the plane (`true`) or the plane again.
pub fn blank<W: RegisterWindow>(vdc: &mut W, blank: bool) {
    let mut conf = PipeConfReg::from_raw(vdc.read32(vdc::PIPEACONF));
    conf.set_force_border(blank);
    vdc.write32(vdc::PIPEACONF, conf.bits());
    let _ = vdc.read32(vdc::PIPEACONF);
}

/// Point the plane at pixel `(x, y)` of `surface`.
pub fn set_graphics_offset<W: RegisterWindow>(vdc: &mut W, surface: &Surface, x: u32, y: u32) {
    vdc.write32(vdc::DSPCADDR, surface.address_of(x, y));
    let _ = vdc.read32(vdc::DSPCADDR);
}

/// Registers shown by [`dump_registers`], in dump order.
pub const DUMPED_REGISTERS: [(&str, usize); 17] = [
    ("HTOTAL_A", vdc::HTOTAL_A),
    ("HBLANK_A", vdc::HBLANK_A),
    ("HSYNC_A", vdc::HSYNC_A),
    ("VTOTAL_A", vdc::VTOTAL_A),
    ("VBLANK_A", vdc::VBLANK_A),
    ("VSYNC_A", vdc::VSYNC_A),
    ("DSPCSTRIDE", vdc::DSPCSTRIDE),
    ("DSPCSIZE", vdc::DSPCSIZE),
    ("DSPCPOS", vdc::DSPCPOS),
    ("DSPARB", vdc::DSPARB),
    ("DSPCADDR", vdc::DSPCADDR),
    ("BCLRPAT_A", vdc::BCLRPAT_A),
    ("CANVSCLR_A", vdc::CANVSCLR_A),
    ("PIPEASRC", vdc::PIPEASRC),
    ("PIPEACONF", vdc::PIPEACONF),
    ("DSPCCNTR", vdc::DSPCCNTR),
    ("RCOMPSTAT", vdc::RCOMPSTAT),
];

/// Log every modesetting register.
pub fn dump_registers<W: RegisterWindow>(vdc: &mut W) {
    log::info!("modesetting register dump:");
    for (name, offset) in DUMPED_REGISTERS {
        log::info!("\t{name:<16} : {:#010x}", vdc.read32(offset));
    }
    log::info!("end of modesetting register dump");
}

fn log_timing(regs: &ModeRegisters, timing: &TimingDescriptor, pixel_clock: u32) {
    let pair = |reg: TimingPairReg| reg.counts();
    let (hact, htot) = pair(regs.htotal);
    let (hbs, hbe) = pair(regs.hblank);
    let (hss, hse) = pair(regs.hsync);
    let (vact, vtot) = pair(regs.vtotal);
    let (vbs, vbe) = pair(regs.vblank);
    let (vss, vse) = pair(regs.vsync);
    let (src_v, src_h) = pair(regs.pipesrc);
    let (size_h, size_v) = pair(regs.dspsize);
    log::info!(
        "hact: {hact} htot: {htot} hbstart: {hbs} hbend: {hbe} hsyncstart: {hss} hsyncend: {hse}"
    );
    log::info!(
        "vact: {vact} vtot: {vtot} vbstart: {vbs} vbend: {vbe} vsyncstart: {vss} vsyncend: {vse}"
    );
    log::info!("pipesrc: {src_h}x{src_v}, dspsize: {size_h}x{size_v}");
    log::info!(
        "actual pixel clock is {pixel_clock} kHz, horizontal {:.1} kHz, vertical {:.1} Hz",
        timing.h_refresh_khz(pixel_clock),
        timing.v_refresh_hz(pixel_clock)
    );
}
