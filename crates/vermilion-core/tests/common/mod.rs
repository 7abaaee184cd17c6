//! Shared fixtures: a simulated Carillo Ranch machine and helpers to open a
//! device on it.

#![allow(dead_code)]

use vermilion_core::{Device, DeviceInfo, DriverConfig, PciFunction, PollConfig, PollPolicy};
use vermilion_hal::Region;
use vermilion_sim::{SimDelay, SimDevice, SimPort, SimWindow, MBX_ADDRESS, VDC_ADDRESS};

pub type SimDisplay = Device<SimWindow, SimPort, SimDelay>;

/// Host-side description of the simulated hardware.
pub fn device_info(sim: &SimDevice) -> DeviceInfo {
    let config = sim.config();
    DeviceInfo {
        vdc: PciFunction {
            address: VDC_ADDRESS,
            vendor: 0x8086,
            device: 0x5009,
            bar: Region::new(config.vdc_bar.into(), config.vdc_size),
        },
        mbx: PciFunction {
            address: MBX_ADDRESS,
            vendor: 0x8086,
            device: 0x5002,
            bar: Region::new(config.mbx_bar.into(), config.mbx_size),
        },
        framebuffer: Region::new(config.fb_base.into(), config.fb_size),
        virtual_size: (1024, 768),
    }
}

/// Budgets small enough that timeout tests finish quickly.
pub fn short_polls() -> PollConfig {
    PollConfig {
        fifo: PollPolicy::new(50, 1),
        pad: PollPolicy::new(20, 10),
        fence: PollPolicy::new(50, 10),
    }
}

pub fn open_with(sim: &SimDevice, config: DriverConfig) -> vermilion_core::Result<SimDisplay> {
    open_info(sim, device_info(sim), config)
}

pub fn open_info(
    sim: &SimDevice,
    info: DeviceInfo,
    config: DriverConfig,
) -> vermilion_core::Result<SimDisplay> {
    let mut mapper = sim.mapper();
    let mut pci = sim.pci();
    Device::open(&mut mapper, &mut pci, sim.port(), sim.delay(), info, config)
}

pub fn open(sim: &SimDevice) -> SimDisplay {
    open_with(
        sim,
        DriverConfig {
            poll: short_polls(),
            ..DriverConfig::default()
        },
    )
    .expect("device opens on the default machine")
}
