//! Debug host for the Vermilion display core.
//!
//! Runs the core against the simulated Carillo Ranch board so mode
//! validation, the modesetting sequence and 2D command streams can be
//! inspected without hardware. `RUST_LOG=debug` shows the driver's log.

mod options;

use anyhow::Context;
use clap::Parser;
use vermilion_core::accel::{CopyDirection, Rop};
use vermilion_core::timing::{TimingDescriptor, XGA_60};
use vermilion_core::validate::validate;
use vermilion_core::{Device, DeviceInfo, PciFunction};
use vermilion_hal::Region;
use vermilion_sim::{Event, SimDelay, SimDevice, SimPort, SimWindow, MBX_ADDRESS, VDC_ADDRESS};

use options::{Cli, Command};

type SimDisplay = Device<SimWindow, SimPort, SimDelay>;

/// Modelines tried by `modes`.
const MODELINES: [(&str, TimingDescriptor); 5] = [
    (
        "800x600@60",
        TimingDescriptor::from_modeline(40_000, 800, 840, 968, 1056, 600, 601, 605, 628),
    ),
    ("1024x768@60", XGA_60),
    (
        "1024x768@70",
        TimingDescriptor::from_modeline(75_000, 1024, 1048, 1184, 1328, 768, 771, 777, 806),
    ),
    (
        "1280x1024@60",
        TimingDescriptor::from_modeline(108_000, 1280, 1328, 1440, 1688, 1024, 1025, 1028, 1066),
    ),
    ("1024x768i", interlaced(XGA_60)),
];

const fn interlaced(mut timing: TimingDescriptor) -> TimingDescriptor {
    timing.interlace = true;
    timing
}

fn device_info(sim: &SimDevice) -> DeviceInfo {
    let config = sim.config();
    DeviceInfo {
        vdc: PciFunction {
            address: VDC_ADDRESS,
            vendor: 0x8086,
            device: vermilion_sim::DEVICE_VDC,
            bar: Region::new(config.vdc_bar.into(), config.vdc_size),
        },
        mbx: PciFunction {
            address: MBX_ADDRESS,
            vendor: 0x8086,
            device: vermilion_sim::DEVICE_MBX,
            bar: Region::new(config.mbx_bar.into(), config.mbx_size),
        },
        framebuffer: Region::new(config.fb_base.into(), config.fb_size),
        virtual_size: (1024, 768),
    }
}

fn open(sim: &SimDevice, cli: &Cli) -> anyhow::Result<SimDisplay> {
    Device::open(
        &mut sim.mapper(),
        &mut sim.pci(),
        sim.port(),
        sim.delay(),
        device_info(sim),
        cli.driver.config(),
    )
    .context("opening the display device")
}

fn modes(sim: &SimDevice, cli: &Cli) -> anyhow::Result<()> {
    let dev = open(sim, cli)?;
    let clocks = &dev.state().clocks;
    match dev.panel_spec() {
        Some(panel) => println!("panel: {}", panel.name),
        None => println!("panel: none"),
    }
    println!("clocks: {clocks:?}");
    for (name, timing) in &MODELINES {
        let status = validate(timing, clocks, dev.panel_spec());
        println!("{name:<14} {:>7} kHz  {status}", timing.clock);
    }
    dev.close(&mut sim.mapper())?;
    Ok(())
}

fn demo(sim: &SimDevice, cli: &Cli, trace: bool) -> anyhow::Result<()> {
    let mut dev = open(sim, cli)?;
    dev.init_screen(&XGA_60).context("bringing the screen up")?;
    dev.save_screen(true);

    if let Some(mut accel) = dev.accel() {
        accel.setup_fill(0x0000_7FFF, Rop::Copy)?;
        accel.fill_rect(0, 0, 1024, 768)?;
        accel.setup_fill(0x0000_001F, Rop::Copy)?;
        for i in 0..8 {
            accel.fill_rect(64 + i * 96, 64, 64, 64)?;
        }
        accel.setup_copy(CopyDirection::default(), Rop::Copy, None)?;
        accel.copy_rect((64, 64), (64, 256), 768, 64)?;
        accel.setup_copy(CopyDirection::from_steps(1, -1), Rop::Xor, None)?;
        accel.copy_rect((64, 256), (64, 288), 768, 64)?;
        let fence = accel.sync()?;
        println!("fence {fence:#06x} reached");
    } else {
        println!("acceleration disabled, skipping 2D commands");
    }

    let stats = sim.blit_stats();
    println!(
        "{} fills, {} copies, {} fences, {} pixels, {} slave-port words",
        stats.fills,
        stats.copies,
        stats.fences,
        stats.pixels,
        sim.slave_port_words().len()
    );

    dev.leave_vt().context("leaving the VT")?;
    dev.close(&mut sim.mapper())?;

    if trace {
        for event in sim.events() {
            print_event(&event);
        }
    }
    println!("total delay {} us", sim.total_delay_ns() / 1_000);
    Ok(())
}

fn dump(sim: &SimDevice, cli: &Cli) -> anyhow::Result<()> {
    let mut dev = open(sim, cli)?;
    dev.set_mode(&XGA_60).context("setting 1024x768")?;
    dev.dump_registers();
    for (name, offset) in vermilion_core::mode::DUMPED_REGISTERS {
        println!(
            "{name:<16} {:#010x}",
            sim.register(vermilion_sim::WindowKind::Vdc, offset)
        );
    }
    dev.close(&mut sim.mapper())?;
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::Write {
            window,
            offset,
            value,
        } => println!("W {window:?}[{offset:#08x}] <- {value:#010x}"),
        Event::Read {
            window,
            offset,
            value,
        } => println!("R {window:?}[{offset:#08x}] -> {value:#010x}"),
        Event::PortOut { port, value } => println!("O port {port:#06x} <- {value:#x}"),
        Event::PortIn { port, value } => println!("I port {port:#06x} -> {value:#x}"),
        Event::Delay { ns } => println!("D {} us", ns / 1_000),
        Event::Map { name, window } => println!("M {name} ({window:?})"),
        Event::Unmap { window } => println!("U {window:?}"),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    log::info!("vermilion: {:?}", cli.command);

    let sim = SimDevice::default();
    match cli.command {
        Command::Modes => modes(&sim, &cli),
        Command::Demo { trace } => demo(&sim, &cli, trace),
        Command::Dump => dump(&sim, &cli),
    }
}
