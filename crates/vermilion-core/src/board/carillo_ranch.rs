use vermilion_hal::{DelayNs, PciAddress, PciConfig, PortIo, Region, RegisterWindow, WindowMapper};
use vermilion_registers::cr;

use super::{nearest_clock_index, BoardIdentity, BoardOps, ClockList};
use crate::error::{DriverError, Result};

const NAME: &str = "Carillo Ranch";

const MCH_ADDRESS: PciAddress = PciAddress::new(0x00, 0x00, 0);
const LPC_ADDRESS: PciAddress = PciAddress::new(0x00, 0x1f, 0);

/// Clocks wired on this board, kHz. The chipset has more, but they are
/// disabled here.
const CLOCKS: [u32; 9] = [6750, 13500, 27000, 29700, 37125, 54000, 59400, 74250, 120_000];

/// Clock-select control value for each entry of [`CLOCKS`].
const CLOCK_BITS: [u32; 9] = [0x0a, 0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x0b];

const CLOCK_RANGE: (u32, u32) = (6500, 120_000);

/// Panel power sequencing settle time.
const PANEL_SETTLE_MS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SavedState {
    panel: u32,
    clock: u32,
}

/// Carillo Ranch: clock select in the MCH window, panel control on the LPC
/// bridge GPIO port.
#[derive(Debug)]
pub struct CarilloRanch<W> {
    mch: W,
    gpio_base: u16,
    saved: Option<SavedState>,
    preserve_clock_bits: bool,
}

impl<W: RegisterWindow> CarilloRanch<W> {
    /// Locate the MCH and LPC functions, map the MCH window and read the
    /// GPIO base.
    ///
    /// # Errors
    /// `DeviceNotFound` / `DeviceDisabled` for a missing function, `Map` when
    /// the MCH window cannot be mapped.
    pub fn probe<M, C>(mapper: &mut M, pci: &mut C, preserve_clock_bits: bool) -> Result<Self>
    where
        M: WindowMapper<Window = W>,
        C: PciConfig,
    {
        if pci.find_device(cr::VENDOR_INTEL, cr::DEVICE_MCH, 0) != Some(MCH_ADDRESS) {
            log::error!("could not find {NAME} MCH device");
            return Err(DriverError::DeviceNotFound("Carillo Ranch MCH device"));
        }
        if pci.config_read32(MCH_ADDRESS, cr::REG_MCHEN) & cr::MCHEN_BIT == 0 {
            log::error!("{NAME} MCH device was not enabled");
            return Err(DriverError::DeviceDisabled("Carillo Ranch MCH device"));
        }

        let mch_bar = pci.config_read32(MCH_ADDRESS, cr::REG_MCHBAR);
        let mch = mapper
            .map("MCH", Region::new(u64::from(mch_bar), cr::MCHMAP_SIZE))
            .map_err(|e| DriverError::Map {
                what: "MCH",
                message: format!("{e:?}"),
            })?;

        match Self::gpio_base(pci) {
            Ok(gpio_base) => {
                log::debug!("{NAME}: MCH at {mch_bar:#010x}, GPIO at {gpio_base:#06x}");
                Ok(Self {
                    mch,
                    gpio_base,
                    saved: None,
                    preserve_clock_bits,
                })
            }
            Err(e) => {
                mapper.unmap(mch);
                Err(e)
            }
        }
    }

    fn gpio_base<C: PciConfig>(pci: &mut C) -> Result<u16> {
        if pci.find_device(cr::VENDOR_INTEL, cr::DEVICE_LPC, 0) != Some(LPC_ADDRESS) {
            log::error!("could not find {NAME} LPC device");
            return Err(DriverError::DeviceNotFound("Carillo Ranch LPC device"));
        }
        if pci.config_read8(LPC_ADDRESS, cr::REG_GPIOEN) & cr::GPIOEN_BIT == 0 {
            log::error!("{NAME} GPIO was not enabled");
            return Err(DriverError::DeviceDisabled("Carillo Ranch GPIO"));
        }
        // I/O space BAR; ports are 16 bits wide.
        let bar = pci.config_read32(LPC_ADDRESS, cr::REG_GPIOBAR) & cr::GPIOBAR_MASK;
        Ok((bar & 0xFFFF) as u16)
    }

    fn panel_port(&self) -> u16 {
        self.gpio_base.wrapping_add(cr::PANEL_PORT)
    }

    /// Panel power-up. The LVDS transmitter follows when `lvds` is set and
    /// is left down otherwise.
    fn panel_up<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D, lvds: bool) {
        let addr = self.panel_port();
        let mut cur = port.inl(addr);

        if cur & cr::PANEL_ON == 0 {
            // LVDS controller must be down before the panel powers up.
            if cur & cr::LVDS_ON != 0 {
                cur &= !cr::LVDS_ON;
                port.outl(addr, cur);
            }
            delay.delay_ms(PANEL_SETTLE_MS);
            cur |= cr::PANEL_ON;
            port.outl(addr, cur);
        }

        if lvds && cur & cr::LVDS_ON == 0 {
            delay.delay_ms(PANEL_SETTLE_MS);
            port.outl(addr, cur | cr::LVDS_ON);
        } else if !lvds && cur & cr::LVDS_ON != 0 {
            port.outl(addr, cur & !cr::LVDS_ON);
        }
    }
}

impl<W: RegisterWindow> BoardOps for CarilloRanch<W> {
    type Window = W;

    fn identity(&self) -> BoardIdentity {
        BoardIdentity {
            name: NAME,
            vendor: cr::VENDOR_INTEL,
            device: cr::DEVICE_MCH,
        }
    }

    fn save_state<P: PortIo>(&mut self, port: &mut P) {
        let saved = SavedState {
            panel: port.inl(self.panel_port()),
            clock: self.mch.read32(cr::REG_CLOCK),
        };
        log::debug!(
            "{NAME}: saved panel latch {:#x}, clock {:#010x}",
            saved.panel,
            saved.clock
        );
        self.saved = Some(saved);
    }

    fn restore_state<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D) -> Result<()> {
        let saved = self.saved.ok_or(DriverError::NothingSaved)?;

        if saved.panel & cr::BACKLIGHT_OFF != 0 {
            self.backlight_off(port);
        } else {
            self.backlight_on(port);
        }

        // LVDS is never brought up while the panel is off, whatever the
        // snapshot says.
        if saved.panel & cr::PANEL_ON != 0 {
            self.panel_up(port, delay, saved.panel & cr::LVDS_ON != 0);
        } else {
            self.panel_power_off(port, delay);
        }

        self.mch.write32(cr::REG_CLOCK, saved.clock);
        let _ = self.mch.read32(cr::REG_CLOCK);
        log::debug!("{NAME}: restored board state");
        Ok(())
    }

    fn destroy<M: WindowMapper<Window = W>>(self, mapper: &mut M) {
        mapper.unmap(self.mch);
    }

    fn supports_programmable_clock(&self) -> bool {
        false
    }

    fn clock_range(&self) -> (u32, u32) {
        CLOCK_RANGE
    }

    fn clocks(&self) -> ClockList {
        let mut list = ClockList::new();
        for clock in CLOCKS {
            // MAX_CLOCKS covers the table.
            let _ = list.push(clock);
        }
        list
    }

    fn set_clock(&mut self, clock: u32) -> Result<()> {
        let index = nearest_clock_index(&CLOCKS, clock)
            .filter(|&i| CLOCKS[i] == clock)
            .ok_or(DriverError::UnsupportedClock { clock })?;

        let field = cr::clock_field(CLOCK_BITS[index]);
        let value = if self.preserve_clock_bits {
            (self.mch.read32(cr::REG_CLOCK) & !cr::CLOCK_MASK) | field
        } else {
            field
        };
        self.mch.write32(cr::REG_CLOCK, value);
        let _ = self.mch.read32(cr::REG_CLOCK);
        log::debug!("{NAME}: pixel clock {clock} kHz (select {:#x})", CLOCK_BITS[index]);
        Ok(())
    }

    fn fixed_panel_index(&self) -> usize {
        0
    }

    fn panel_power_on<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D) {
        self.panel_up(port, delay, true);
        log::debug!("{NAME}: panel on");
    }

    fn panel_power_off<P: PortIo, D: DelayNs>(&mut self, port: &mut P, delay: &mut D) {
        let addr = self.panel_port();
        let mut cur = port.inl(addr);

        // LVDS first, to avoid high currents.
        if cur & cr::LVDS_ON != 0 {
            cur &= !cr::LVDS_ON;
            port.outl(addr, cur);
        }
        if cur & cr::PANEL_ON != 0 {
            delay.delay_ms(PANEL_SETTLE_MS);
            port.outl(addr, cur & !cr::PANEL_ON);
        }
        log::debug!("{NAME}: panel off");
    }

    fn backlight_on<P: PortIo>(&mut self, port: &mut P) {
        let addr = self.panel_port();
        let cur = port.inl(addr);
        if cur & cr::BACKLIGHT_OFF != 0 {
            port.outl(addr, cur & !cr::BACKLIGHT_OFF);
        }
    }

    fn backlight_off<P: PortIo>(&mut self, port: &mut P) {
        let addr = self.panel_port();
        let cur = port.inl(addr);
        if cur & cr::BACKLIGHT_OFF == 0 {
            port.outl(addr, cur | cr::BACKLIGHT_OFF);
        }
    }
}
