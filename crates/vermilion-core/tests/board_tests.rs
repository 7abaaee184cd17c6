//! Carillo Ranch board layer against the simulated chipset: discovery,
//! clock routing, panel power sequencing and the save/restore snapshot.

use vermilion_core::board::{nearest_clock_index, Board, BoardOps};
use vermilion_core::{DriverConfig, DriverError};
use vermilion_registers::cr;
use vermilion_sim::{Event, SimDevice, SimWindow, WindowKind, LPC_ADDRESS, MCH_ADDRESS};

const CLOCKS: [u32; 9] = [6750, 13500, 27000, 29700, 37125, 54000, 59400, 74250, 120_000];
const SETTLE_NS: u64 = 100_000_000;

fn discover(sim: &SimDevice) -> vermilion_core::Result<Board<SimWindow>> {
    discover_with(sim, &DriverConfig::default())
}

fn discover_with(sim: &SimDevice, config: &DriverConfig) -> vermilion_core::Result<Board<SimWindow>> {
    Board::discover(&mut sim.mapper(), &mut sim.pci(), config)
}

/// Port writes and delays, the observable panel sequencing.
fn panel_sequence(sim: &SimDevice) -> Vec<Event> {
    sim.events()
        .into_iter()
        .filter(|event| matches!(event, Event::PortOut { .. } | Event::Delay { .. }))
        .collect()
}

/// Port the board drives the panel latch through, seen from a backlight
/// toggle.
fn latch_port(sim: &SimDevice, board: &mut Board<SimWindow>) -> u16 {
    sim.clear_events();
    board.backlight_off(&mut sim.port());
    sim.events()
        .into_iter()
        .find_map(|event| match event {
            Event::PortOut { port, .. } => Some(port),
            _ => None,
        })
        .expect("backlight toggle writes the latch")
}

#[test]
fn discovery_maps_mch_and_reads_gpio_base() {
    let sim = SimDevice::default();
    let mut board = discover(&sim).unwrap();

    let identity = board.identity();
    assert_eq!(identity.name, "Carillo Ranch");
    assert_eq!((identity.vendor, identity.device), (0x8086, 0x5001));
    assert!(sim.is_mapped(WindowKind::Mch));
    assert_eq!(sim.live_mappings(), 1);

    assert_eq!(
        latch_port(&sim, &mut board),
        sim.config().gpio_base + cr::PANEL_PORT
    );

    board.destroy(&mut sim.mapper());
    assert_eq!(sim.live_mappings(), 0);
}

#[test]
fn gpio_base_drops_flag_bits() {
    let sim = SimDevice::default();
    sim.set_config32(LPC_ADDRESS, cr::REG_GPIOBAR, 0x0000_0501);
    let mut board = discover(&sim).unwrap();
    assert_eq!(latch_port(&sim, &mut board), 0x0500 + cr::PANEL_PORT);
}

#[test]
fn discovery_failures_leave_nothing_mapped() {
    let sim = SimDevice::default();
    sim.remove_pci_device(cr::VENDOR_INTEL, cr::DEVICE_MCH);
    assert!(matches!(
        discover(&sim),
        Err(DriverError::DeviceNotFound(_))
    ));
    assert_eq!(sim.live_mappings(), 0);

    let sim = SimDevice::default();
    sim.move_pci_device(MCH_ADDRESS, vermilion_hal::PciAddress::new(0, 1, 0));
    assert!(matches!(
        discover(&sim),
        Err(DriverError::DeviceNotFound(_))
    ));

    let sim = SimDevice::default();
    sim.set_config32(MCH_ADDRESS, cr::REG_MCHEN, 0);
    assert!(matches!(
        discover(&sim),
        Err(DriverError::DeviceDisabled(_))
    ));
    assert_eq!(sim.live_mappings(), 0);

    let sim = SimDevice::default();
    sim.refuse_map("MCH");
    assert!(matches!(
        discover(&sim),
        Err(DriverError::Map { what: "MCH", .. })
    ));
    assert_eq!(sim.live_mappings(), 0);
}

#[test]
fn lpc_failure_unmaps_mch() {
    let sim = SimDevice::default();
    sim.remove_pci_device(cr::VENDOR_INTEL, cr::DEVICE_LPC);
    assert!(matches!(
        discover(&sim),
        Err(DriverError::DeviceNotFound("Carillo Ranch LPC device"))
    ));
    assert_eq!(sim.live_mappings(), 0);

    let sim = SimDevice::default();
    sim.set_config8(LPC_ADDRESS, cr::REG_GPIOEN, 0);
    assert!(matches!(
        discover(&sim),
        Err(DriverError::DeviceDisabled("Carillo Ranch GPIO"))
    ));
    assert_eq!(sim.live_mappings(), 0);
    assert!(sim
        .events()
        .iter()
        .any(|event| *event == Event::Unmap { window: WindowKind::Mch }));
}

#[test]
fn clock_table_and_nearest_lookup() {
    let sim = SimDevice::default();
    let board = discover(&sim).unwrap();
    assert_eq!(board.clocks().as_slice(), &CLOCKS);
    assert_eq!(board.clock_range(), (6500, 120_000));
    assert!(!board.supports_programmable_clock());
    assert_eq!(board.fixed_panel_index(), 0);

    assert_eq!(nearest_clock_index(&CLOCKS, 65_000), Some(6));
    assert_eq!(nearest_clock_index(&CLOCKS, 1), Some(0));
    assert_eq!(nearest_clock_index(&CLOCKS, 500_000), Some(8));
    // 28350 is equidistant from 27000 and 29700; the lower index wins.
    assert_eq!(nearest_clock_index(&CLOCKS, 28_350), Some(2));
    assert_eq!(nearest_clock_index(&[], 28_350), None);
}

#[test]
fn every_clock_selects_its_control_bits() {
    let bits = [0x0a, 0x09, 0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x0b];
    let sim = SimDevice::default();
    let mut board = discover(&sim).unwrap();
    for (clock, bits) in CLOCKS.into_iter().zip(bits) {
        board.set_clock(clock).unwrap();
        assert_eq!(
            sim.register(WindowKind::Mch, cr::REG_CLOCK),
            bits << 8,
            "clock {clock}"
        );
    }
}

#[test]
fn unsupported_clock_leaves_register_untouched() {
    let sim = SimDevice::default();
    let mut board = discover(&sim).unwrap();
    let before = sim.register(WindowKind::Mch, cr::REG_CLOCK);
    sim.clear_events();

    let err = board.set_clock(65_000).unwrap_err();
    assert!(matches!(err, DriverError::UnsupportedClock { clock: 65_000 }));
    assert!(sim.register_writes(WindowKind::Mch).is_empty());
    assert_eq!(sim.register(WindowKind::Mch, cr::REG_CLOCK), before);
}

#[test]
fn clock_write_replaces_or_preserves_other_bits() {
    let sim = SimDevice::default();
    sim.set_register(WindowKind::Mch, cr::REG_CLOCK, 0x1234_0400);
    let mut board = discover(&sim).unwrap();
    board.set_clock(27_000).unwrap();
    assert_eq!(sim.register(WindowKind::Mch, cr::REG_CLOCK), 0x0000_0800);

    let sim = SimDevice::default();
    sim.set_register(WindowKind::Mch, cr::REG_CLOCK, 0x1234_0400);
    let mut board = discover_with(
        &sim,
        &DriverConfig {
            preserve_clock_bits: true,
            ..DriverConfig::default()
        },
    )
    .unwrap();
    board.set_clock(27_000).unwrap();
    assert_eq!(sim.register(WindowKind::Mch, cr::REG_CLOCK), 0x1234_0800);
}

#[test]
fn panel_power_on_sequencing() {
    let sim = SimDevice::default();
    let port = sim.config().panel_port();
    // Firmware left the LVDS transmitter running with the panel off.
    sim.set_port_value(port, cr::LVDS_ON);
    let mut board = discover(&sim).unwrap();
    sim.clear_events();

    board.panel_power_on(&mut sim.port(), &mut sim.delay());
    assert_eq!(
        panel_sequence(&sim),
        vec![
            Event::PortOut { port, value: 0 },
            Event::Delay { ns: SETTLE_NS },
            Event::PortOut {
                port,
                value: cr::PANEL_ON
            },
            Event::Delay { ns: SETTLE_NS },
            Event::PortOut {
                port,
                value: cr::PANEL_ON | cr::LVDS_ON
            },
        ]
    );
    assert_eq!(sim.panel_latch(), cr::PANEL_ON | cr::LVDS_ON);

    // Already on: nothing to do.
    sim.clear_events();
    board.panel_power_on(&mut sim.port(), &mut sim.delay());
    assert!(panel_sequence(&sim).is_empty());
}

#[test]
fn panel_power_off_sequencing() {
    let sim = SimDevice::default();
    let port = sim.config().panel_port();
    sim.set_port_value(port, cr::LVDS_ON | cr::PANEL_ON | cr::BACKLIGHT_OFF);
    let mut board = discover(&sim).unwrap();
    sim.clear_events();

    board.panel_power_off(&mut sim.port(), &mut sim.delay());
    assert_eq!(
        panel_sequence(&sim),
        vec![
            Event::PortOut {
                port,
                value: cr::PANEL_ON | cr::BACKLIGHT_OFF
            },
            Event::Delay { ns: SETTLE_NS },
            Event::PortOut {
                port,
                value: cr::BACKLIGHT_OFF
            },
        ]
    );
}

#[test]
fn backlight_touches_only_its_bit() {
    let sim = SimDevice::default();
    let mut board = discover(&sim).unwrap();
    let mut port = sim.port();

    board.backlight_off(&mut port);
    assert_eq!(
        sim.panel_latch(),
        cr::LVDS_ON | cr::PANEL_ON | cr::BACKLIGHT_OFF
    );
    board.backlight_on(&mut port);
    assert_eq!(sim.panel_latch(), cr::LVDS_ON | cr::PANEL_ON);

    // No write when the bit already has the requested value.
    sim.clear_events();
    board.backlight_on(&mut port);
    assert!(panel_sequence(&sim).is_empty());
}

#[test]
fn save_restore_round_trip_is_bit_identical() {
    let sim = SimDevice::default();
    sim.set_register(WindowKind::Mch, cr::REG_CLOCK, 0x1234_0400);
    let mut board = discover(&sim).unwrap();
    let mut port = sim.port();
    let mut delay = sim.delay();

    board.save_state(&mut port);
    board.set_clock(120_000).unwrap();
    board.backlight_off(&mut port);
    board.panel_power_off(&mut port, &mut delay);
    assert_eq!(sim.panel_latch(), cr::BACKLIGHT_OFF);

    board.restore_state(&mut port, &mut delay).unwrap();
    assert_eq!(sim.panel_latch(), cr::LVDS_ON | cr::PANEL_ON);
    assert_eq!(sim.register(WindowKind::Mch, cr::REG_CLOCK), 0x1234_0400);
}

#[test]
fn restore_of_powered_off_snapshot_keeps_lvds_down() {
    let sim = SimDevice::default();
    let port_addr = sim.config().panel_port();
    sim.set_port_value(port_addr, cr::BACKLIGHT_OFF);
    let mut board = discover(&sim).unwrap();
    let mut port = sim.port();
    let mut delay = sim.delay();

    board.save_state(&mut port);
    board.backlight_on(&mut port);
    board.panel_power_on(&mut port, &mut delay);

    board.restore_state(&mut port, &mut delay).unwrap();
    assert_eq!(sim.panel_latch(), cr::BACKLIGHT_OFF);
}

#[test]
fn restore_without_snapshot_fails() {
    let sim = SimDevice::default();
    let mut board = discover(&sim).unwrap();
    sim.clear_events();
    let err = board
        .restore_state(&mut sim.port(), &mut sim.delay())
        .unwrap_err();
    assert!(matches!(err, DriverError::NothingSaved));
    assert!(panel_sequence(&sim).is_empty());
    assert!(sim.register_writes(WindowKind::Mch).is_empty());
}

#[test]
fn restore_keeps_lvds_down_for_a_panel_only_snapshot() {
    let sim = SimDevice::default();
    let port_addr = sim.config().panel_port();
    sim.set_port_value(port_addr, cr::PANEL_ON);
    let mut board = discover(&sim).unwrap();
    let mut port = sim.port();
    let mut delay = sim.delay();

    board.save_state(&mut port);
    board.panel_power_on(&mut port, &mut delay);
    assert_eq!(sim.panel_latch(), cr::PANEL_ON | cr::LVDS_ON);
    board.restore_state(&mut port, &mut delay).unwrap();
    assert_eq!(sim.panel_latch(), cr::PANEL_ON);

    // From a dark panel the power-up sequencing still runs.
    board.panel_power_off(&mut port, &mut delay);
    sim.clear_events();
    board.restore_state(&mut port, &mut delay).unwrap();
    assert_eq!(
        panel_sequence(&sim),
        vec![
            Event::Delay { ns: SETTLE_NS },
            Event::PortOut {
                port: port_addr,
                value: cr::PANEL_ON
            },
        ]
    );
    assert_eq!(sim.panel_latch(), cr::PANEL_ON);
}

#[test]
fn restore_never_leaves_lvds_up_on_a_dark_panel() {
    let sim = SimDevice::default();
    let port_addr = sim.config().panel_port();
    sim.set_port_value(port_addr, cr::LVDS_ON);
    let mut board = discover(&sim).unwrap();
    let mut port = sim.port();
    let mut delay = sim.delay();

    board.save_state(&mut port);
    board.panel_power_on(&mut port, &mut delay);
    board.restore_state(&mut port, &mut delay).unwrap();
    assert_eq!(sim.panel_latch(), 0);
}
