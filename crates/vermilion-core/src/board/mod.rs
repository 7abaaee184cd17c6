//! Board layer: everything that differs between boards carrying the
//! Vermilion display controller. Pixel clock routing, panel power and
//! backlight control live here.

use vermilion_hal::{DelayNs, PciConfig, PortIo, RegisterWindow, WindowMapper};

use crate::config::DriverConfig;
use crate::error::Result;

mod carillo_ranch;

pub use carillo_ranch::CarilloRanch;

/// Upper bound on the size of any board clock table.
pub const MAX_CLOCKS: usize = 16;

pub type ClockList = heapless::Vec<u32, MAX_CLOCKS>;

/// Name and PCI id of a board, as reported by its host bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardIdentity {
    pub name: &'static str,
    pub vendor: u16,
    pub device: u16,
}

/// Index of the entry of `clocks` closest to `clock`. Ties resolve to the
/// lower index. `None` for an empty table.
#[must_use]
pub fn nearest_clock_index(clocks: &[u32], clock: u32) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, &candidate) in clocks.iter().enumerate() {
        let gap = candidate.abs_diff(clock);
        match best {
            Some((_, best_gap)) if gap >= best_gap => {}
            _ => best = Some((index, gap)),
        }
    }
    best.map(|(index, _)| index)
}

/// Board operations. Port I/O and delays are borrowed per call so the board
/// value only owns what it mapped.
pub trait BoardOps {
    type Window: RegisterWindow;

    fn identity(&self) -> BoardIdentity;

    /// Snapshot the board registers the driver will touch.
    fn save_state<P: PortIo>(&mut self, port: &mut P);

    /// Re-apply the last snapshot.
    ///
    /// # Errors
    /// `NothingSaved` when no snapshot was taken.
    fn restore_state<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D) -> Result<()>;

    /// Release the board's mapped windows.
    fn destroy<M: WindowMapper<Window = Self::Window>>(self, mapper: &mut M);

    fn supports_programmable_clock(&self) -> bool;

    /// Lowest and highest pixel clock the board can generate, kHz.
    fn clock_range(&self) -> (u32, u32);

    /// Achievable pixel clocks, kHz.
    fn clocks(&self) -> ClockList;

    /// Route `clock` to the pipe.
    ///
    /// # Errors
    /// `UnsupportedClock` unless `clock` is exactly one of [`Self::clocks`];
    /// no register is touched in that case.
    fn set_clock(&mut self, clock: u32) -> Result<()>;

    /// Panel table index of the panel wired to this board.
    fn fixed_panel_index(&self) -> usize;

    fn panel_power_on<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D);

    fn panel_power_off<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D);

    fn backlight_on<P: PortIo>(&mut self, port: &mut P);

    fn backlight_off<P: PortIo>(&mut self, port: &mut P);
}

/// Every supported board.
#[derive(Debug)]
pub enum Board<W> {
    CarilloRanch(CarilloRanch<W>),
}

impl<W: RegisterWindow> Board<W> {
    /// Identify the board the display controller sits on.
    ///
    /// Carillo Ranch is the only board this driver knows, so discovery is a
    /// probe for it. Nothing stays mapped on failure.
    ///
    /// # Errors
    /// The probe's discovery or mapping error.
    pub fn discover<M, C>(mapper: &mut M, pci: &mut C, config: &DriverConfig) -> Result<Self>
    where
        M: WindowMapper<Window = W>,
        C: PciConfig,
    {
        let board = CarilloRanch::probe(mapper, pci, config.preserve_clock_bits)?;
        let identity = board.identity();
        log::info!(
            "board: {} ({:04x}:{:04x})",
            identity.name,
            identity.vendor,
            identity.device
        );
        Ok(Self::CarilloRanch(board))
    }
}

impl<W: RegisterWindow> BoardOps for Board<W> {
    type Window = W;

    fn identity(&self) -> BoardIdentity {
        match self {
            Self::CarilloRanch(b) => b.identity(),
        }
    }

    fn save_state<P: PortIo>(&mut self, port: &mut P) {
        match self {
            Self::CarilloRanch(b) => b.save_state(port),
        }
    }

    fn restore_state<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D) -> Result<()> {
        match self {
            Self::CarilloRanch(b) => b.restore_state(port, delay),
        }
    }

    fn destroy<M: WindowMapper<Window = W>>(self, mapper: &mut M) {
        match self {
            Self::CarilloRanch(b) => b.destroy(mapper),
        }
    }

    fn supports_programmable_clock(&self) -> bool {
        match self {
            Self::CarilloRanch(b) => b.supports_programmable_clock(),
        }
    }

    fn clock_range(&self) -> (u32, u32) {
        match self {
            Self::CarilloRanch(b) => b.clock_range(),
        }
    }

    fn clocks(&self) -> ClockList {
        match self {
            Self::CarilloRanch(b) => b.clocks(),
        }
    }

    fn set_clock(&mut self, clock: u32) -> Result<()> {
        match self {
            Self::CarilloRanch(b) => b.set_clock(clock),
        }
    }

    fn fixed_panel_index(&self) -> usize {
        match self {
            Self::CarilloRanch(b) => b.fixed_panel_index(),
        }
    }

    fn panel_power_on<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D) {
        match self {
            Self::CarilloRanch(b) => b.panel_power_on(port, delay),
        }
    }

    fn panel_power_off<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D) {
        match self {
            Self::CarilloRanch(b) => b.panel_power_off(port, delay),
        }
    }

    fn backlight_on<P: PortIo>(&mut self, port: &mut P) {
        match self {
            Self::CarilloRanch(b) => b.backlight_on(port),
        }
    }

    fn backlight_off<P: PortIo>(&mut self, port: &mut P) {
        match self {
            Self::CarilloRanch(b) => b.backlight_off(port),
        }
    }
}
