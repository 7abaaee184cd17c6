use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use vermilion_hal::{Region, RegisterWindow, WindowMapper};

use crate::{Event, SimState, WindowKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("no simulated device at {base:#x}")]
    UnknownRegion { base: u64 },
    #[error("{name} mapping of {size:#x} bytes exceeds the device window")]
    TooLarge { name: String, size: usize },
    #[error("mapping of {0} refused")]
    Refused(String),
}

/// A mapped window onto one simulated device.
#[derive(Debug)]
pub struct SimWindow {
    kind: WindowKind,
    state: Rc<RefCell<SimState>>,
}

impl SimWindow {
    #[must_use]
    pub fn kind(&self) -> WindowKind {
        self.kind
    }
}

impl RegisterWindow for SimWindow {
    fn read32(&mut self, offset: usize) -> u32 {
        self.state.borrow_mut().read(self.kind, offset)
    }

    fn write32(&mut self, offset: usize, value: u32) {
        self.state.borrow_mut().write(self.kind, offset, value);
    }
}

#[derive(Debug, Clone)]
pub struct SimMapper {
    state: Rc<RefCell<SimState>>,
}

impl SimMapper {
    pub(crate) fn new(state: Rc<RefCell<SimState>>) -> Self {
        Self { state }
    }
}

impl WindowMapper for SimMapper {
    type Window = SimWindow;
    type Error = SimError;

    fn map(&mut self, name: &'static str, region: Region) -> Result<SimWindow, SimError> {
        let mut state = self.state.borrow_mut();
        if let Some(pos) = state.refused.iter().position(|refused| refused == name) {
            state.refused.remove(pos);
            return Err(SimError::Refused(name.to_owned()));
        }

        let config = &state.config;
        let windows = [
            (config.fb_base, config.fb_size, WindowKind::Framebuffer),
            (config.vdc_bar, config.vdc_size, WindowKind::Vdc),
            (config.mbx_bar, config.mbx_size, WindowKind::Mbx),
            (config.mch_bar, vermilion_registers::cr::MCHMAP_SIZE, WindowKind::Mch),
        ];
        let (_, size, kind) = windows
            .into_iter()
            .find(|&(base, _, _)| u64::from(base) == region.base)
            .ok_or(SimError::UnknownRegion { base: region.base })?;
        if region.size > size {
            return Err(SimError::TooLarge {
                name: name.to_owned(),
                size: region.size,
            });
        }

        *state.live_windows.entry(kind).or_insert(0) += 1;
        state.events.push(Event::Map {
            name: name.to_owned(),
            window: kind,
        });
        log::debug!("sim: mapped {name} ({kind:?}) at {:#x}", region.base);
        Ok(SimWindow {
            kind,
            state: Rc::clone(&self.state),
        })
    }

    fn unmap(&mut self, window: SimWindow) {
        let mut state = self.state.borrow_mut();
        if let Some(count) = state.live_windows.get_mut(&window.kind) {
            *count = count.saturating_sub(1);
        }
        state.events.push(Event::Unmap {
            window: window.kind,
        });
    }
}
