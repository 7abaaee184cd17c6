//! Software model of a Carillo Ranch board with a Vermilion display
//! controller and MBX 2D core.
//!
//! Every handle ([`SimMapper`], [`SimPci`], [`SimPort`], [`SimDelay`] and
//! the mapped [`SimWindow`]s) shares one [`SimDevice`] state, so a test can
//! drive the display core through the `vermilion-hal` traits and then
//! inspect the register trace, the panel latch and framebuffer memory.
//!
//! The model is deliberately small:
//! - registers read back what was last written, except `RCOMPSTAT` (see
//!   [`PadModel`]) and the MBX `INT_STATUS` FIFO occupancy
//! - slave-port words are decoded and executed against framebuffer memory
//!   as soon as they are written, unless the engine is stalled
//! - delays are recorded, never slept

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use vermilion_hal::PciAddress;
use vermilion_registers::{cr, mbx, vdc};

mod blitter;
mod bus;
mod window;

pub use blitter::{rop3, BlitStats};
pub use bus::{SimDelay, SimPci, SimPort};
pub use window::{SimError, SimMapper, SimWindow};

use blitter::{Blitter, Vram};

pub const MCH_ADDRESS: PciAddress = PciAddress::new(0x00, 0x00, 0);
pub const VDC_ADDRESS: PciAddress = PciAddress::new(0x00, 0x02, 0);
pub const MBX_ADDRESS: PciAddress = PciAddress::new(0x00, 0x03, 0);
pub const LPC_ADDRESS: PciAddress = PciAddress::new(0x00, 0x1f, 0);

pub const DEVICE_VDC: u16 = 0x5009;
pub const DEVICE_MBX: u16 = 0x5002;

/// FIFO depth of the modelled slave port. The driver keeps a 5-slot margin
/// below this.
pub const FIFO_DEPTH: u32 = mbx::SP_FIFO_DWSIZE + 5;

/// Which mapped window an access went to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Vdc,
    Mbx,
    Mch,
    Framebuffer,
}

/// One traced hardware interaction. Framebuffer accesses are not traced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Write {
        window: WindowKind,
        offset: usize,
        value: u32,
    },
    Read {
        window: WindowKind,
        offset: usize,
        value: u32,
    },
    PortOut {
        port: u16,
        value: u32,
    },
    PortIn {
        port: u16,
        value: u32,
    },
    Delay {
        ns: u64,
    },
    Map {
        name: String,
        window: WindowKind,
    },
    Unmap {
        window: WindowKind,
    },
}

/// How the MDVO pad answers `RCOMPSTAT` reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PadModel {
    /// Compensation completes immediately after every write.
    #[default]
    Settles,
    /// `RCOMP_READY` never comes up.
    NeverReady,
    /// Shutting the pad down works, enabling it never completes.
    EnableNeverReady,
}

/// Physical layout and power-on register values of the modelled machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Device address of video memory.
    pub fb_base: u32,
    pub fb_size: usize,
    pub mch_bar: u32,
    pub vdc_bar: u32,
    pub vdc_size: usize,
    pub mbx_bar: u32,
    pub mbx_size: usize,
    pub gpio_base: u16,
    /// Panel latch as left by the firmware.
    pub panel_latch: u32,
    /// Clock select register as left by the firmware.
    pub clock_register: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fb_base: 0x0800_0000,
            fb_size: 4 << 20,
            mch_bar: 0xFED1_4000,
            vdc_bar: 0xD000_0000,
            vdc_size: 0x8_0000,
            mbx_bar: 0xD100_0000,
            mbx_size: 0x100_0000,
            gpio_base: 0x0480,
            panel_latch: cr::LVDS_ON | cr::PANEL_ON,
            clock_register: cr::clock_field(0x04),
        }
    }
}

impl SimConfig {
    /// Port address of the panel control latch.
    #[must_use]
    pub fn panel_port(&self) -> u16 {
        self.gpio_base + cr::PANEL_PORT
    }

    /// Device address of the last framebuffer word.
    #[must_use]
    pub fn sync_address(&self) -> u32 {
        self.fb_base + self.fb_size as u32 - 4
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SimFunction {
    pub address: PciAddress,
    pub vendor: u16,
    pub device: u16,
    pub config: [u8; 256],
}

impl SimFunction {
    fn new(address: PciAddress, vendor: u16, device: u16) -> Self {
        let mut function = Self {
            address,
            vendor,
            device,
            config: [0; 256],
        };
        function.write32(0, u32::from(vendor) | (u32::from(device) << 16));
        function
    }

    fn write32(&mut self, reg: u8, value: u32) {
        let reg = usize::from(reg & !3);
        self.config[reg..reg + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn read32(&self, reg: u8) -> u32 {
        let reg = usize::from(reg & !3);
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.config[reg..reg + 4]);
        u32::from_le_bytes(raw)
    }
}

#[derive(Debug)]
pub(crate) struct SimState {
    pub config: SimConfig,
    pub registers: HashMap<(WindowKind, usize), u32>,
    pub ports: HashMap<u16, u32>,
    pub pci: Vec<SimFunction>,
    pub fb: Vec<u8>,
    pub events: Vec<Event>,
    pub pad: PadModel,
    pub fifo_occupancy: u32,
    /// Words retired per `INT_STATUS` read; `None` drains everything.
    pub fifo_drain: Option<u32>,
    pub fifo_overflows: u32,
    pub stalled: bool,
    pub held: Vec<u32>,
    pub slave_words: Vec<u32>,
    pub blitter: Blitter,
    pub live_windows: HashMap<WindowKind, usize>,
    pub refused: Vec<String>,
    pub total_delay_ns: u64,
}

impl SimState {
    fn new(config: SimConfig) -> Self {
        let mut pci = vec![
            SimFunction::new(MCH_ADDRESS, cr::VENDOR_INTEL, cr::DEVICE_MCH),
            SimFunction::new(VDC_ADDRESS, cr::VENDOR_INTEL, DEVICE_VDC),
            SimFunction::new(MBX_ADDRESS, cr::VENDOR_INTEL, DEVICE_MBX),
            SimFunction::new(LPC_ADDRESS, cr::VENDOR_INTEL, cr::DEVICE_LPC),
        ];
        pci[0].write32(cr::REG_MCHEN, cr::MCHEN_BIT);
        pci[0].write32(cr::REG_MCHBAR, config.mch_bar);
        pci[1].write32(0x10, config.vdc_bar);
        pci[2].write32(0x10, config.mbx_bar);
        pci[3].write32(cr::REG_GPIOBAR, u32::from(config.gpio_base) | 1);
        pci[3].write32(cr::REG_GPIOEN, u32::from(cr::GPIOEN_BIT));

        let mut registers = HashMap::new();
        registers.insert((WindowKind::Mch, cr::REG_CLOCK), config.clock_register);
        registers.insert(
            (WindowKind::Vdc, vdc::PIPEACONF),
            vdc::PipeConfReg::ENABLE,
        );
        registers.insert(
            (WindowKind::Vdc, vdc::DSPCCNTR),
            vdc::PlaneControlReg::ENABLE,
        );
        registers.insert(
            (WindowKind::Vdc, vdc::RCOMPSTAT),
            vdc::RcompStatReg::PAD_ENABLE,
        );

        let mut ports = HashMap::new();
        ports.insert(config.panel_port(), config.panel_latch);

        Self {
            fb: vec![0; config.fb_size],
            config,
            registers,
            ports,
            pci,
            events: Vec::new(),
            pad: PadModel::default(),
            fifo_occupancy: 0,
            fifo_drain: None,
            fifo_overflows: 0,
            stalled: false,
            held: Vec::new(),
            slave_words: Vec::new(),
            blitter: Blitter::default(),
            live_windows: HashMap::new(),
            refused: Vec::new(),
            total_delay_ns: 0,
        }
    }

    pub(crate) fn read(&mut self, window: WindowKind, offset: usize) -> u32 {
        let value = match (window, offset) {
            (WindowKind::Framebuffer, _) => return self.fb_read32(offset),
            (WindowKind::Vdc, vdc::RCOMPSTAT) => self.rcompstat(),
            (WindowKind::Mbx, mbx::INT_STATUS) => {
                let status = self.fifo_occupancy.min(mbx::FREEVCOUNT_MASK) << mbx::FREEVCOUNT_OFFSET;
                self.drain_fifo();
                status
            }
            _ => self.registers.get(&(window, offset)).copied().unwrap_or(0),
        };
        self.events.push(Event::Read {
            window,
            offset,
            value,
        });
        value
    }

    pub(crate) fn write(&mut self, window: WindowKind, offset: usize, value: u32) {
        match (window, offset) {
            (WindowKind::Framebuffer, _) => return self.fb_write32(offset, value),
            (WindowKind::Mbx, mbx::SLAVE_PORT) => self.slave_port(value),
            _ => {
                self.registers.insert((window, offset), value);
            }
        }
        self.events.push(Event::Write {
            window,
            offset,
            value,
        });
    }

    fn rcompstat(&self) -> u32 {
        use vdc::RcompStatReg;
        let written = self
            .registers
            .get(&(WindowKind::Vdc, vdc::RCOMPSTAT))
            .copied()
            .unwrap_or(0);
        let ready = match self.pad {
            PadModel::Settles => true,
            PadModel::NeverReady => false,
            PadModel::EnableNeverReady => written & RcompStatReg::PAD_ENABLE == 0,
        };
        if ready {
            written | RcompStatReg::RCOMP_READY
        } else {
            written & !RcompStatReg::RCOMP_READY
        }
    }

    fn slave_port(&mut self, word: u32) {
        self.slave_words.push(word);
        if self.fifo_occupancy >= FIFO_DEPTH {
            log::warn!("sim: slave port FIFO overflow, word {word:#010x}");
            self.fifo_overflows += 1;
        }
        self.fifo_occupancy += 1;
        self.held.push(word);
        if !self.stalled && self.fifo_drain.is_none() {
            self.run_held();
        }
    }

    fn drain_fifo(&mut self) {
        if self.stalled {
            return;
        }
        let retired = self.fifo_drain.unwrap_or(self.fifo_occupancy);
        self.fifo_occupancy = self.fifo_occupancy.saturating_sub(retired);
        self.run_held();
    }

    /// Execute every word the engine has accepted so far.
    fn run_held(&mut self) {
        let words = std::mem::take(&mut self.held);
        let mut vram = Vram {
            base: self.config.fb_base,
            bytes: &mut self.fb,
        };
        for word in words {
            self.blitter.push(word, &mut vram);
        }
        if self.fifo_drain.is_none() {
            self.fifo_occupancy = 0;
        }
    }

    fn fb_read32(&self, offset: usize) -> u32 {
        match self.fb.get(offset..offset + 4) {
            Some(bytes) => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            None => {
                log::warn!("sim: framebuffer read past end at {offset:#x}");
                0
            }
        }
    }

    fn fb_write32(&mut self, offset: usize, value: u32) {
        match self.fb.get_mut(offset..offset + 4) {
            Some(bytes) => bytes.copy_from_slice(&value.to_le_bytes()),
            None => log::warn!("sim: framebuffer write past end at {offset:#x}"),
        }
    }
}

/// Handle on the modelled machine. Cloning shares the same state.
#[derive(Debug, Clone)]
pub struct SimDevice {
    state: Rc<RefCell<SimState>>,
}

impl Default for SimDevice {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimDevice {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self {
            state: Rc::new(RefCell::new(SimState::new(config))),
        }
    }

    #[must_use]
    pub fn config(&self) -> SimConfig {
        self.state.borrow().config.clone()
    }

    #[must_use]
    pub fn mapper(&self) -> SimMapper {
        SimMapper::new(Rc::clone(&self.state))
    }

    #[must_use]
    pub fn pci(&self) -> SimPci {
        SimPci::new(Rc::clone(&self.state))
    }

    #[must_use]
    pub fn port(&self) -> SimPort {
        SimPort::new(Rc::clone(&self.state))
    }

    #[must_use]
    pub fn delay(&self) -> SimDelay {
        SimDelay::new(Rc::clone(&self.state))
    }

    // Trace

    #[must_use]
    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// Values written to `offset` of `window`, oldest first.
    #[must_use]
    pub fn writes_to(&self, window: WindowKind, offset: usize) -> Vec<u32> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Write {
                    window: w,
                    offset: o,
                    value,
                } if w == window && o == offset => Some(value),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn last_write_to(&self, window: WindowKind, offset: usize) -> Option<u32> {
        self.writes_to(window, offset).last().copied()
    }

    /// Register writes in trace order, slave-port words excluded.
    #[must_use]
    pub fn register_writes(&self, window: WindowKind) -> Vec<(usize, u32)> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Write {
                    window: w,
                    offset,
                    value,
                } if w == window && !(w == WindowKind::Mbx && offset == mbx::SLAVE_PORT) => {
                    Some((offset, value))
                }
                _ => None,
            })
            .collect()
    }

    /// Recorded delays in nanoseconds.
    #[must_use]
    pub fn delays(&self) -> Vec<u64> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match *event {
                Event::Delay { ns } => Some(ns),
                _ => None,
            })
            .collect()
    }

    /// Sum of every delay since start, including cleared events.
    #[must_use]
    pub fn total_delay_ns(&self) -> u64 {
        self.state.borrow().total_delay_ns
    }

    // Registers and ports

    /// Current backing value of a register, without tracing.
    #[must_use]
    pub fn register(&self, window: WindowKind, offset: usize) -> u32 {
        self.state
            .borrow()
            .registers
            .get(&(window, offset))
            .copied()
            .unwrap_or(0)
    }

    pub fn set_register(&self, window: WindowKind, offset: usize, value: u32) {
        self.state
            .borrow_mut()
            .registers
            .insert((window, offset), value);
    }

    #[must_use]
    pub fn port_value(&self, port: u16) -> u32 {
        self.state.borrow().ports.get(&port).copied().unwrap_or(0)
    }

    pub fn set_port_value(&self, port: u16, value: u32) {
        self.state.borrow_mut().ports.insert(port, value);
    }

    /// Panel latch contents.
    #[must_use]
    pub fn panel_latch(&self) -> u32 {
        let port = self.state.borrow().config.panel_port();
        self.port_value(port)
    }

    pub fn set_pad_model(&self, pad: PadModel) {
        self.state.borrow_mut().pad = pad;
    }

    // PCI

    /// Overwrite a config dword of the function at `address`.
    pub fn set_config32(&self, address: PciAddress, reg: u8, value: u32) {
        let mut state = self.state.borrow_mut();
        if let Some(function) = state.pci.iter_mut().find(|f| f.address == address) {
            function.write32(reg, value);
        }
    }

    /// Overwrite a config byte of the function at `address`.
    pub fn set_config8(&self, address: PciAddress, reg: u8, value: u8) {
        let mut state = self.state.borrow_mut();
        if let Some(function) = state.pci.iter_mut().find(|f| f.address == address) {
            function.config[usize::from(reg)] = value;
        }
    }

    /// Take every `vendor:device` function off the bus.
    pub fn remove_pci_device(&self, vendor: u16, device: u16) {
        self.state
            .borrow_mut()
            .pci
            .retain(|f| f.vendor != vendor || f.device != device);
    }

    /// Move the function at `from` to `to`.
    pub fn move_pci_device(&self, from: PciAddress, to: PciAddress) {
        let mut state = self.state.borrow_mut();
        if let Some(function) = state.pci.iter_mut().find(|f| f.address == from) {
            function.address = to;
        }
    }

    // Mappings

    /// Make the next mapping requests named `name` fail.
    pub fn refuse_map(&self, name: &str) {
        self.state.borrow_mut().refused.push(name.to_owned());
    }

    /// Windows mapped and not yet unmapped.
    #[must_use]
    pub fn live_mappings(&self) -> usize {
        self.state.borrow().live_windows.values().sum()
    }

    #[must_use]
    pub fn is_mapped(&self, window: WindowKind) -> bool {
        self.state
            .borrow()
            .live_windows
            .get(&window)
            .is_some_and(|&n| n > 0)
    }

    // MBX

    pub fn set_fifo_occupancy(&self, words: u32) {
        self.state.borrow_mut().fifo_occupancy = words;
    }

    #[must_use]
    pub fn fifo_occupancy(&self) -> u32 {
        self.state.borrow().fifo_occupancy
    }

    /// Words retired per `INT_STATUS` read. `None` (the default) retires
    /// everything and executes words as they arrive.
    pub fn set_fifo_drain(&self, per_read: Option<u32>) {
        self.state.borrow_mut().fifo_drain = per_read;
    }

    /// Words written while the FIFO was already full.
    #[must_use]
    pub fn fifo_overflows(&self) -> u32 {
        self.state.borrow().fifo_overflows
    }

    /// A stalled engine accepts words but neither executes nor retires them.
    pub fn set_engine_stalled(&self, stalled: bool) {
        let mut state = self.state.borrow_mut();
        state.stalled = stalled;
        if !stalled {
            state.run_held();
        }
    }

    /// Every word written to the slave port.
    #[must_use]
    pub fn slave_port_words(&self) -> Vec<u32> {
        self.state.borrow().slave_words.clone()
    }

    pub fn clear_slave_port_words(&self) {
        self.state.borrow_mut().slave_words.clear();
    }

    #[must_use]
    pub fn blit_stats(&self) -> BlitStats {
        self.state.borrow().blit_stats()
    }

    // Video memory

    /// Word at byte `offset` into video memory.
    #[must_use]
    pub fn fb_read32(&self, offset: usize) -> u32 {
        self.state.borrow().fb_read32(offset)
    }

    pub fn fb_write32(&self, offset: usize, value: u32) {
        self.state.borrow_mut().fb_write32(offset, value);
    }

    /// Halfword at byte `offset` into video memory.
    #[must_use]
    pub fn fb_read16(&self, offset: usize) -> u16 {
        let state = self.state.borrow();
        match state.fb.get(offset..offset + 2) {
            Some(bytes) => u16::from_le_bytes([bytes[0], bytes[1]]),
            None => 0,
        }
    }

    /// True when every byte in `range` equals `byte`.
    #[must_use]
    pub fn fb_all(&self, range: std::ops::Range<usize>, byte: u8) -> bool {
        self.state
            .borrow()
            .fb
            .get(range)
            .is_some_and(|bytes| bytes.iter().all(|&b| b == byte))
    }
}

impl SimState {
    fn blit_stats(&self) -> BlitStats {
        self.blitter.stats
    }
}
