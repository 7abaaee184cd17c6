use std::cell::RefCell;
use std::rc::Rc;

use vermilion_hal::{DelayNs, PciAddress, PciConfig, PortIo};

use crate::{Event, SimState};

/// Configuration space of the simulated functions.
#[derive(Debug, Clone)]
pub struct SimPci {
    state: Rc<RefCell<SimState>>,
}

impl SimPci {
    pub(crate) fn new(state: Rc<RefCell<SimState>>) -> Self {
        Self { state }
    }
}

impl PciConfig for SimPci {
    fn find_device(&mut self, vendor: u16, device: u16, index: usize) -> Option<PciAddress> {
        self.state
            .borrow()
            .pci
            .iter()
            .filter(|f| f.vendor == vendor && f.device == device)
            .nth(index)
            .map(|f| f.address)
    }

    fn config_read32(&mut self, addr: PciAddress, reg: u8) -> u32 {
        self.state
            .borrow()
            .pci
            .iter()
            .find(|f| f.address == addr)
            .map_or(0xFFFF_FFFF, |f| f.read32(reg))
    }

    fn config_read8(&mut self, addr: PciAddress, reg: u8) -> u8 {
        self.state
            .borrow()
            .pci
            .iter()
            .find(|f| f.address == addr)
            .map_or(0xFF, |f| f.config[usize::from(reg)])
    }
}

/// x86 I/O ports. Unwritten ports read as zero.
#[derive(Debug, Clone)]
pub struct SimPort {
    state: Rc<RefCell<SimState>>,
}

impl SimPort {
    pub(crate) fn new(state: Rc<RefCell<SimState>>) -> Self {
        Self { state }
    }
}

impl PortIo for SimPort {
    fn inl(&mut self, port: u16) -> u32 {
        let mut state = self.state.borrow_mut();
        let value = state.ports.get(&port).copied().unwrap_or(0);
        state.events.push(Event::PortIn { port, value });
        value
    }

    fn outl(&mut self, port: u16, value: u32) {
        let mut state = self.state.borrow_mut();
        state.ports.insert(port, value);
        state.events.push(Event::PortOut { port, value });
    }
}

/// Records requested delays instead of sleeping.
#[derive(Debug, Clone)]
pub struct SimDelay {
    state: Rc<RefCell<SimState>>,
}

impl SimDelay {
    pub(crate) fn new(state: Rc<RefCell<SimState>>) -> Self {
        Self { state }
    }

    fn record(&mut self, ns: u64) {
        let mut state = self.state.borrow_mut();
        state.total_delay_ns += ns;
        state.events.push(Event::Delay { ns });
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.record(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        self.record(u64::from(us) * 1_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.record(u64::from(ms) * 1_000_000);
    }
}
