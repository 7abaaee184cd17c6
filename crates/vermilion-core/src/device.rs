//! The display device: discovery, screen bring-up, VT switching, blanking
//! and power management on top of the board, mode and blit layers.

use vermilion_hal::{DelayNs, PciAddress, PciConfig, PortIo, Region, RegisterWindow, WindowMapper};
use vermilion_registers::cr::VENDOR_INTEL;
use vermilion_registers::mbx;

use crate::accel::{BlitEngine, CopyDirection, Rop};
use crate::board::{Board, BoardOps, ClockList};
use crate::config::{DriverConfig, PanelSelection};
use crate::error::{DriverError, Result};
use crate::mode::{self, ModeController, ModeRequest, PipeState, Surface};
use crate::timing::{self, ColorDepth, PanelSpec, TimingDescriptor};

pub const DEVICE_VDC: u16 = 0x5009;
pub const DEVICE_MBX: u16 = 0x5002;

/// Fill word for a cleared depth-15 framebuffer: two black pixels with the
/// alpha bit set.
const DEPTH15_CLEAR: u32 = 0x8000_8000;

/// One PCI function as found by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciFunction {
    pub address: PciAddress,
    pub vendor: u16,
    pub device: u16,
    /// Register BAR.
    pub bar: Region,
}

/// What the host knows about the hardware before the driver touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Display controller, 8086:5009.
    pub vdc: PciFunction,
    /// MBX 2D core, 8086:5002.
    pub mbx: PciFunction,
    /// Contiguous video memory handed out by the kernel. `base` is the
    /// device address.
    pub framebuffer: Region,
    /// Virtual screen size in pixels.
    pub virtual_size: (u32, u32),
}

/// Display power management levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dpms {
    On,
    Standby,
    Suspend,
    Off,
}

/// Per-screen state threaded through every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    pub depth: ColorDepth,
    pub surface: Surface,
    pub virtual_size: (u32, u32),
    /// Scanout offset, pixels.
    pub viewport: (u32, u32),
    /// Panel table index, `None` when driving a plain CRT.
    pub panel: Option<usize>,
    /// Clocks modes may use; a single entry with a fused clock.
    pub clocks: ClockList,
    pub fused_clock: Option<usize>,
    pub accel: bool,
    pub debug: bool,
    /// The driver owns the display (last mode set succeeded and the VT is
    /// ours).
    pub active: bool,
}

#[derive(Debug)]
pub struct Device<W, P, D> {
    state: DeviceState,
    vdc: W,
    board: Board<W>,
    engine: BlitEngine<W>,
    mode: ModeController,
    port: P,
    delay: D,
}

fn check_function(what: &'static str, function: &PciFunction, device: u16) -> Result<()> {
    if function.vendor != VENDOR_INTEL || function.device != device {
        log::error!(
            "{what} at {} has id {:04x}:{:04x}",
            function.address,
            function.vendor,
            function.device
        );
        return Err(DriverError::WrongDevice {
            what,
            vendor: function.vendor,
            device: function.device,
        });
    }
    Ok(())
}

fn map_window<M: WindowMapper>(mapper: &mut M, what: &'static str, region: Region) -> Result<M::Window> {
    mapper.map(what, region).map_err(|e| {
        log::error!("could not map {what} memory at {:#x}: {e:?}", region.base);
        DriverError::Map {
            what,
            message: format!("{e:?}"),
        }
    })
}

/// Bytes per line of the virtual screen. The blitter carries the stride in
/// a 17-bit field.
fn line_stride(width: u32, depth: ColorDepth) -> Result<u32> {
    width
        .checked_mul(depth.cpp())
        .filter(|stride| *stride <= mbx::STRIDE_MASK)
        .ok_or_else(|| {
            log::error!("virtual width {width} too large at depth {}", depth.bits());
            DriverError::InvalidGeometry {
                what: "virtual screen",
                message: format!("width {width} at {} bytes per pixel", depth.cpp()),
            }
        })
}

/// Resolve the panel option against the board and the panel table.
fn select_panel<B: BoardOps>(board: &B, selection: PanelSelection) -> Result<Option<usize>> {
    let index = match selection {
        PanelSelection::BoardDefault => board.fixed_panel_index(),
        PanelSelection::Fixed(index) => index,
        PanelSelection::Disabled => {
            log::info!("not using panel");
            return Ok(None);
        }
    };
    let spec = timing::panel(index)?;
    log::info!("using panel type {index}, which is a {}", spec.name);
    Ok(Some(index))
}

/// Board clocks, restricted to a single entry when a fused clock is set.
fn select_clocks<B: BoardOps>(board: &B, fused: Option<usize>) -> Result<ClockList> {
    let clocks = board.clocks();
    let Some(index) = fused else {
        return Ok(clocks);
    };
    let clock = *clocks
        .get(index)
        .ok_or(DriverError::InvalidFusedClock(index))?;
    log::info!("fused dotclock index {index} which is {clock} kHz");
    let mut fused_list = ClockList::new();
    let _ = fused_list.push(clock);
    Ok(fused_list)
}

impl<W: RegisterWindow, P: PortIo, D: DelayNs> Device<W, P, D> {
    /// Identify the hardware, discover the board and map every window.
    ///
    /// # Errors
    /// Identification, configuration, discovery and mapping errors. Windows
    /// mapped before the failure are released.
    pub fn open<M, C>(
        mapper: &mut M,
        pci: &mut C,
        port: P,
        delay: D,
        info: DeviceInfo,
        config: DriverConfig,
    ) -> Result<Self>
    where
        M: WindowMapper<Window = W>,
        C: PciConfig,
    {
        check_function("video controller", &info.vdc, DEVICE_VDC)?;
        check_function("MBX", &info.mbx, DEVICE_MBX)?;
        let depth = ColorDepth::try_from(config.depth).inspect_err(|_| {
            log::error!("invalid depth {}, only 15 and 24 supported", config.depth);
        })?;
        let fb_base = u32::try_from(info.framebuffer.base).map_err(|_| DriverError::Map {
            what: "framebuffer",
            message: format!("{:#x} is outside the 32-bit device space", info.framebuffer.base),
        })?;
        let fb_size = u32::try_from(info.framebuffer.size).map_err(|_| DriverError::Map {
            what: "framebuffer",
            message: format!("size {:#x} too large", info.framebuffer.size),
        })?;
        if fb_size % 4 != 0 {
            log::error!("framebuffer size {fb_size:#x} is not a whole number of words");
            return Err(DriverError::InvalidGeometry {
                what: "framebuffer",
                message: format!("size {fb_size:#x} is not 4-byte aligned"),
            });
        }
        let stride = line_stride(info.virtual_size.0, depth)?;

        let board = Board::discover(mapper, pci, &config)?;
        let identity = board.identity();
        log::info!(
            "subsystem vendor {:04x} device {:04x}, this is a {} board",
            identity.vendor,
            identity.device,
            identity.name
        );

        let selected = select_panel(&board, config.panel)
            .and_then(|panel| Ok((panel, select_clocks(&board, config.fused_clock)?)));
        let (panel, clocks) = match selected {
            Ok(selected) => selected,
            Err(e) => {
                board.destroy(mapper);
                return Err(e);
            }
        };

        let fb = match map_window(mapper, "framebuffer", info.framebuffer) {
            Ok(window) => window,
            Err(e) => {
                board.destroy(mapper);
                return Err(e);
            }
        };
        let mbx_regs = match map_window(mapper, "MBX", info.mbx.bar) {
            Ok(window) => window,
            Err(e) => {
                mapper.unmap(fb);
                board.destroy(mapper);
                return Err(e);
            }
        };
        let vdc = match map_window(mapper, "video controller", info.vdc.bar) {
            Ok(window) => window,
            Err(e) => {
                mapper.unmap(mbx_regs);
                mapper.unmap(fb);
                board.destroy(mapper);
                return Err(e);
            }
        };

        let surface = Surface {
            fb_base,
            fb_size,
            stride,
            depth,
        };
        log::info!(
            "linear framebuffer at {fb_base:#x}, {} kB, stride {}",
            fb_size / 1024,
            surface.stride
        );
        log::info!(
            "modesetting debugging printout is {}abled",
            if config.debug { "en" } else { "dis" }
        );

        Ok(Self {
            state: DeviceState {
                depth,
                surface,
                virtual_size: info.virtual_size,
                viewport: (0, 0),
                panel,
                clocks,
                fused_clock: config.fused_clock,
                accel: config.accel,
                debug: config.debug,
                active: false,
            },
            vdc,
            board,
            engine: BlitEngine::new(mbx_regs, fb, surface, config.poll),
            mode: ModeController::new(config.poll.pad, config.debug),
            port,
            delay,
        })
    }

    #[must_use]
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    #[must_use]
    pub fn board(&self) -> &Board<W> {
        &self.board
    }

    #[must_use]
    pub fn pipe_state(&self) -> PipeState {
        self.mode.state()
    }

    #[must_use]
    pub fn current_mode(&self) -> Option<&TimingDescriptor> {
        self.mode.current()
    }

    #[must_use]
    pub fn panel_spec(&self) -> Option<&'static PanelSpec> {
        self.state.panel.and_then(|index| timing::PANELS.get(index))
    }

    /// Blit engine, for inspection.
    #[must_use]
    pub fn blit_engine(&self) -> &BlitEngine<W> {
        &self.engine
    }

    /// Drawing handle, `None` when acceleration is off.
    pub fn accel(&mut self) -> Option<Accel<'_, W, D>> {
        if !self.state.accel {
            return None;
        }
        Some(Accel {
            engine: &mut self.engine,
            delay: &mut self.delay,
        })
    }

    /// Bring the screen up: snapshot the board, clear the framebuffer, power
    /// the panel, set the first mode and leave it blanked.
    ///
    /// # Errors
    /// As [`Self::set_mode`].
    pub fn init_screen(&mut self, timing: &TimingDescriptor) -> Result<()> {
        self.board.save_state(&mut self.port);
        let (x, y) = self.state.viewport;
        self.set_viewport(x, y);

        let clear = match self.state.depth {
            ColorDepth::Depth15 => DEPTH15_CLEAR,
            ColorDepth::Depth24 => 0,
        };
        self.clear_framebuffer(clear);

        if self.state.panel.is_some() {
            self.board.panel_power_on(&mut self.port, &mut self.delay);
        }
        self.set_mode(timing)?;
        self.save_screen(false);
        Ok(())
    }

    /// Program `timing`. The device is active afterwards only on success.
    ///
    /// # Errors
    /// See [`ModeController::set_mode`].
    pub fn set_mode(&mut self, timing: &TimingDescriptor) -> Result<()> {
        let request = ModeRequest {
            timing,
            clocks: &self.state.clocks,
            panel: self.panel_spec(),
            surface: &self.state.surface,
            viewport: self.state.viewport,
        };
        let result = self
            .mode
            .set_mode(&mut self.vdc, &mut self.board, &mut self.delay, request);
        self.state.active = result.is_ok();
        result
    }

    /// Mode switch requested by the host: drain the engine first.
    ///
    /// # Errors
    /// A fence timeout, or as [`Self::set_mode`].
    pub fn switch_mode(&mut self, timing: &TimingDescriptor) -> Result<()> {
        self.sync_engine()?;
        self.set_mode(timing)
    }

    /// Screen saver hook. `on` shows the picture, otherwise the border color
    /// is forced and the backlight goes off.
    pub fn save_screen(&mut self, on: bool) {
        if !self.state.active {
            return;
        }
        mode::blank(&mut self.vdc, !on);
        if self.state.panel.is_some() {
            if on {
                self.board.backlight_on(&mut self.port);
            } else {
                self.board.backlight_off(&mut self.port);
            }
        }
    }

    /// Pan the scanout to `(x, y)`.
    pub fn set_viewport(&mut self, x: u32, y: u32) {
        self.state.viewport = (x, y);
        if self.state.active {
            mode::set_graphics_offset(&mut self.vdc, &self.state.surface, x, y);
        }
    }

    /// Take the display back: restore the viewport and mode, power the panel.
    ///
    /// # Errors
    /// `NotActive` if no mode was ever set, else as [`Self::set_mode`].
    pub fn enter_vt(&mut self) -> Result<()> {
        let timing = *self.mode.current().ok_or(DriverError::NotActive)?;
        let (x, y) = self.state.viewport;
        self.set_viewport(x, y);
        self.set_mode(&timing)?;
        if self.state.panel.is_some() {
            self.board.panel_power_on(&mut self.port, &mut self.delay);
        }
        Ok(())
    }

    /// Hand the display back: drain the engine, clear the screen, shut the
    /// pipe and restore the board snapshot. Every step runs even if an
    /// earlier one failed; the first error is returned.
    ///
    /// # Errors
    /// Fence or pad timeouts, `NothingSaved`.
    pub fn leave_vt(&mut self) -> Result<()> {
        let synced = self.sync_engine();
        self.clear_framebuffer(0);
        let disabled = self.mode.disable_pipe(&mut self.vdc, &mut self.delay);
        let restored = self.board.restore_state(&mut self.port, &mut self.delay);
        self.state.active = false;
        synced.and(disabled).and(restored)
    }

    /// DPMS transition. Ignored while the device is not active.
    ///
    /// # Errors
    /// As [`Self::set_mode`] for `On`, pad timeouts for `Off`.
    pub fn set_power_mode(&mut self, level: Dpms) -> Result<()> {
        if !self.state.active {
            return Ok(());
        }
        log::debug!("DPMS {level:?}");
        let panel = self.state.panel.is_some();
        match level {
            Dpms::On => {
                if panel {
                    self.board.panel_power_on(&mut self.port, &mut self.delay);
                    self.board.backlight_on(&mut self.port);
                }
                let timing = *self.mode.current().ok_or(DriverError::NotActive)?;
                self.set_mode(&timing)?;
            }
            Dpms::Standby => {
                if panel {
                    self.board.backlight_off(&mut self.port);
                }
            }
            Dpms::Suspend | Dpms::Off => {
                if panel {
                    self.board.backlight_off(&mut self.port);
                    self.board.panel_power_off(&mut self.port, &mut self.delay);
                }
                if level == Dpms::Off {
                    self.mode.disable_pipe(&mut self.vdc, &mut self.delay)?;
                }
            }
        }
        Ok(())
    }

    /// Log the modesetting registers.
    pub fn dump_registers(&mut self) {
        mode::dump_registers(&mut self.vdc);
    }

    /// Tear down: drain the engine, give the display back if we own it and
    /// unmap everything. The first error is returned after all windows are
    /// released.
    ///
    /// # Errors
    /// As [`Self::leave_vt`].
    pub fn close<M: WindowMapper<Window = W>>(mut self, mapper: &mut M) -> Result<()> {
        let mut result = self.sync_engine();
        if self.state.active {
            let disabled = self.mode.disable_pipe(&mut self.vdc, &mut self.delay);
            let restored = self.board.restore_state(&mut self.port, &mut self.delay);
            result = result.and(disabled).and(restored);
            self.state.active = false;
        }

        let (mbx_regs, fb) = self.engine.into_windows();
        mapper.unmap(self.vdc);
        mapper.unmap(mbx_regs);
        mapper.unmap(fb);
        self.board.destroy(mapper);
        log::info!("device closed");
        result
    }

    fn sync_engine(&mut self) -> Result<()> {
        if self.state.accel {
            self.engine.sync(&mut self.delay)?;
        }
        Ok(())
    }

    /// Fill the visible framebuffer with `word`.
    fn clear_framebuffer(&mut self, word: u32) {
        let surface = self.state.surface;
        let lines = self.state.virtual_size.1;
        let bytes = u64::from(lines) * u64::from(surface.stride);
        let bytes = bytes.min(u64::from(surface.fb_size)) as usize & !3;
        let fb = self.engine.framebuffer();
        for offset in (0..bytes).step_by(4) {
            fb.write32(offset, word);
        }
    }
}

/// Drawing handle borrowed from a [`Device`].
pub struct Accel<'a, W, D> {
    engine: &'a mut BlitEngine<W>,
    delay: &'a mut D,
}

impl<W: RegisterWindow, D: DelayNs> Accel<'_, W, D> {
    #[must_use]
    pub fn engine(&self) -> &BlitEngine<W> {
        &*self.engine
    }

    /// # Errors
    /// See [`BlitEngine::setup_fill`].
    pub fn setup_fill(&mut self, color: u32, rop: Rop) -> Result<()> {
        self.engine.setup_fill(color, rop, &mut *self.delay)
    }

    /// # Errors
    /// See [`BlitEngine::fill_rect`].
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32) -> Result<()> {
        self.engine.fill_rect(x, y, w, h, &mut *self.delay)
    }

    /// # Errors
    /// See [`BlitEngine::setup_copy`].
    pub fn setup_copy(
        &mut self,
        direction: CopyDirection,
        rop: Rop,
        transparency: Option<u32>,
    ) -> Result<()> {
        self.engine.setup_copy(direction, rop, transparency, &mut *self.delay)
    }

    /// # Errors
    /// See [`BlitEngine::copy_rect`].
    pub fn copy_rect(
        &mut self,
        (src_x, src_y): (i32, i32),
        (dst_x, dst_y): (i32, i32),
        w: i32,
        h: i32,
    ) -> Result<()> {
        self.engine
            .copy_rect(src_x, src_y, dst_x, dst_y, w, h, &mut *self.delay)
    }

    /// # Errors
    /// See [`BlitEngine::sync`].
    pub fn sync(&mut self) -> Result<u16> {
        self.engine.sync(&mut *self.delay)
    }

    #[must_use]
    pub fn pixmap_lines(&self) -> u32 {
        self.engine.pixmap_lines()
    }
}
