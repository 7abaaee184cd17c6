//! Mode setting against the simulated display controller: register
//! packing, the shutdown/startup ordering and the failure paths that must
//! leave the pipe off.

mod common;

use vermilion_core::board::Board;
use vermilion_core::mode::{ModeController, ModeRequest, PipeState, Surface};
use vermilion_core::timing::XGA_60;
use vermilion_core::{
    ColorDepth, DriverConfig, DriverError, ModeStatus, PanelSelection, PollPolicy,
};
use vermilion_registers::cr;
use vermilion_registers::Register;
use vermilion_registers::vdc::{self, PipeConfReg, PlaneControlReg, RcompStatReg};
use vermilion_sim::{Event, PadModel, SimDevice, WindowKind};

fn position(events: &[Event], wanted: &Event) -> usize {
    events
        .iter()
        .position(|event| event == wanted)
        .unwrap_or_else(|| panic!("{wanted:?} not in trace"))
}

fn vdc_write(offset: usize, value: u32) -> Event {
    Event::Write {
        window: WindowKind::Vdc,
        offset,
        value,
    }
}

#[test]
fn set_mode_programs_pipe_timing() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);

    dev.set_mode(&XGA_60).unwrap();

    let last = |offset| sim.last_write_to(WindowKind::Vdc, offset).unwrap();
    assert_eq!(last(vdc::HTOTAL_A), 1023 | (1343 << 16));
    assert_eq!(last(vdc::HBLANK_A), 1023 | (1343 << 16));
    assert_eq!(last(vdc::HSYNC_A), 1047 | (1183 << 16));
    assert_eq!(last(vdc::VTOTAL_A), 767 | (805 << 16));
    assert_eq!(last(vdc::VSYNC_A), 770 | (776 << 16));
    assert_eq!(last(vdc::PIPEASRC), (1023 << 16) | 767);
    assert_eq!(last(vdc::DSPCSIZE), (767 << 16) | 1023);
    assert_eq!(last(vdc::DSPCSTRIDE), 4096);
    assert_eq!(last(vdc::DSPCPOS), 0);
    assert_eq!(last(vdc::DSPARB), vdc::DSPARB_DEFAULT);
    assert_eq!(last(vdc::BCLRPAT_A), 0);
    assert_eq!(last(vdc::CANVSCLR_A), 0);
    assert_eq!(last(vdc::DSPCADDR), sim.config().fb_base);
    assert_eq!(last(vdc::PIPEACONF), PipeConfReg::ENABLE);
    assert_eq!(last(vdc::RCOMPSTAT), RcompStatReg::PAD_ENABLE);

    let plane = PlaneControlReg::from_raw(last(vdc::DSPCCNTR));
    assert!(plane.enable());
    assert!(plane.gamma_bypass());
    assert_eq!(plane.format(), Ok(vdc::PlaneFormatE::Rgb0888));

    // 65 MHz is not wired; the nearest board clock is 59.4 MHz (select 0x04).
    assert_eq!(
        sim.last_write_to(WindowKind::Mch, cr::REG_CLOCK),
        Some(cr::clock_field(0x04))
    );
    assert_eq!(dev.pipe_state(), PipeState::Enabled);
    assert_eq!(dev.current_mode(), Some(&XGA_60));
    assert!(dev.state().active);
}

#[test]
fn wide_horizontal_total_packs_into_high_half() {
    let sim = SimDevice::default();
    let mut dev = common::open_with(
        &sim,
        DriverConfig {
            panel: PanelSelection::Disabled,
            poll: common::short_polls(),
            ..DriverConfig::default()
        },
    )
    .unwrap();

    let mut timing = XGA_60;
    timing.h_total = 1720;
    dev.set_mode(&timing).unwrap();
    assert_eq!(
        sim.last_write_to(WindowKind::Vdc, vdc::HTOTAL_A),
        Some(0x06B7_03FF)
    );
}

#[test]
fn shutdown_then_startup_ordering() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    sim.clear_events();

    dev.set_mode(&XGA_60).unwrap();
    let events = sim.events();

    let pad_off = position(&events, &vdc_write(vdc::RCOMPSTAT, 0));
    let plane_off = position(&events, &vdc_write(vdc::DSPCCNTR, 0));
    let vblank = position(&events, &Event::Delay { ns: 20_000_000 });
    let pipe_off = position(&events, &vdc_write(vdc::PIPEACONF, 0));
    let clock = position(
        &events,
        &Event::Write {
            window: WindowKind::Mch,
            offset: cr::REG_CLOCK,
            value: cr::clock_field(0x04),
        },
    );
    let htotal = position(&events, &vdc_write(vdc::HTOTAL_A, 1023 | (1343 << 16)));
    let pipe_on = position(&events, &vdc_write(vdc::PIPEACONF, PipeConfReg::ENABLE));
    let pad_on = position(
        &events,
        &vdc_write(vdc::RCOMPSTAT, RcompStatReg::PAD_ENABLE),
    );

    assert!(pad_off < plane_off);
    assert!(plane_off < vblank);
    assert!(vblank < pipe_off);
    assert!(pipe_off < clock);
    assert!(clock < htotal);
    assert!(htotal < pipe_on);
    assert!(pipe_on < pad_on);

    let plane_on = events
        .iter()
        .rposition(|event| {
            matches!(event, Event::Write { window: WindowKind::Vdc, offset, value }
                if *offset == vdc::DSPCCNTR && value & PlaneControlReg::ENABLE != 0)
        })
        .unwrap();
    assert!(pipe_on < plane_on);
    assert!(plane_on < pad_on);
}

#[test]
fn rejected_mode_writes_nothing() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    sim.clear_events();

    let mut timing = XGA_60;
    timing.interlace = true;
    let err = dev.set_mode(&timing).unwrap_err();
    assert!(matches!(
        err,
        DriverError::InvalidMode(ModeStatus::InterlaceUnsupported)
    ));

    let mut timing = XGA_60;
    timing.v_total = 1200;
    let err = dev.set_mode(&timing).unwrap_err();
    assert!(matches!(err, DriverError::InvalidMode(ModeStatus::BadVertical)));

    assert!(sim.register_writes(WindowKind::Vdc).is_empty());
    assert!(sim.register_writes(WindowKind::Mch).is_empty());
    assert!(!dev.state().active);
}

#[test]
fn clock_failure_leaves_pipe_disabled() {
    let sim = SimDevice::default();
    let mut mapper = sim.mapper();
    let mut pci = sim.pci();
    let mut delay = sim.delay();
    let config = sim.config();
    let mut board = Board::discover(&mut mapper, &mut pci, &DriverConfig::default()).unwrap();
    let mut vdc_window = {
        use vermilion_hal::{Region, WindowMapper};
        mapper
            .map(
                "video controller",
                Region::new(config.vdc_bar.into(), config.vdc_size),
            )
            .unwrap()
    };

    let surface = Surface {
        fb_base: config.fb_base,
        fb_size: config.fb_size as u32,
        stride: 4096,
        depth: ColorDepth::Depth24,
    };
    let mut controller = ModeController::new(PollPolicy::new(20, 10), false);
    let clock_before = sim.register(WindowKind::Mch, cr::REG_CLOCK);

    // 65 MHz offered as a clock the board cannot generate.
    let err = controller
        .set_mode(
            &mut vdc_window,
            &mut board,
            &mut delay,
            ModeRequest {
                timing: &XGA_60,
                clocks: &[65_000],
                panel: None,
                surface: &surface,
                viewport: (0, 0),
            },
        )
        .unwrap_err();

    assert!(matches!(err, DriverError::UnsupportedClock { clock: 65_000 }));
    assert_eq!(controller.state(), PipeState::PipeDisabled);
    assert_eq!(controller.current(), None);
    assert_eq!(sim.register(WindowKind::Mch, cr::REG_CLOCK), clock_before);
    assert_eq!(sim.last_write_to(WindowKind::Vdc, vdc::PIPEACONF), Some(0));
    assert!(sim.writes_to(WindowKind::Vdc, vdc::HTOTAL_A).is_empty());
}

#[test]
fn stuck_pad_on_enable_forces_everything_off() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    sim.set_pad_model(PadModel::EnableNeverReady);

    let err = dev.set_mode(&XGA_60).unwrap_err();
    assert!(matches!(
        err,
        DriverError::Timeout {
            what: "MDVO pad enable",
            polls: 20
        }
    ));
    assert_eq!(dev.pipe_state(), PipeState::PipeDisabled);
    assert!(!dev.state().active);
    assert_eq!(sim.last_write_to(WindowKind::Vdc, vdc::RCOMPSTAT), Some(0));
    assert_eq!(sim.last_write_to(WindowKind::Vdc, vdc::PIPEACONF), Some(0));
    let plane = sim.last_write_to(WindowKind::Vdc, vdc::DSPCCNTR).unwrap();
    assert_eq!(plane & PlaneControlReg::ENABLE, 0);
}

#[test]
fn stuck_pad_on_disable_forces_off_without_reprogramming() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    sim.set_pad_model(PadModel::NeverReady);

    let err = dev.set_mode(&XGA_60).unwrap_err();
    assert!(matches!(
        err,
        DriverError::Timeout {
            what: "MDVO pad disable",
            ..
        }
    ));
    assert_eq!(dev.pipe_state(), PipeState::PipeDisabled);
    assert!(sim.writes_to(WindowKind::Vdc, vdc::HTOTAL_A).is_empty());
    assert!(sim.register_writes(WindowKind::Mch).is_empty());
    assert_eq!(sim.last_write_to(WindowKind::Vdc, vdc::PIPEACONF), Some(0));
}

#[test]
fn pad_poll_is_bounded_by_policy() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    sim.set_pad_model(PadModel::NeverReady);
    sim.clear_events();

    let _ = dev.set_mode(&XGA_60);
    let polls = sim
        .events()
        .iter()
        .filter(|event| {
            matches!(event, Event::Read { window: WindowKind::Vdc, offset, .. }
                if *offset == vdc::RCOMPSTAT)
        })
        .count();
    assert_eq!(polls, 20);
    // 19 sleeps of 10 us between the 20 checks.
    assert_eq!(
        sim.delays().iter().filter(|&&ns| ns == 10_000).count(),
        19
    );
}

#[test]
fn blank_toggles_only_force_border() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    dev.set_mode(&XGA_60).unwrap();

    let extra = 1 << PipeConfReg::ARGB_OUTPUT_OFFSET;
    sim.set_register(WindowKind::Vdc, vdc::PIPEACONF, PipeConfReg::ENABLE | extra);

    dev.save_screen(false);
    assert_eq!(
        sim.last_write_to(WindowKind::Vdc, vdc::PIPEACONF),
        Some(PipeConfReg::ENABLE | extra | PipeConfReg::FORCE_BORDER)
    );
    dev.save_screen(true);
    assert_eq!(
        sim.last_write_to(WindowKind::Vdc, vdc::PIPEACONF),
        Some(PipeConfReg::ENABLE | extra)
    );
}

#[test]
fn viewport_moves_scanout_address_when_active() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    let base = sim.config().fb_base;

    dev.set_viewport(8, 2);
    assert!(sim.writes_to(WindowKind::Vdc, vdc::DSPCADDR).is_empty());

    dev.set_mode(&XGA_60).unwrap();
    assert_eq!(
        sim.last_write_to(WindowKind::Vdc, vdc::DSPCADDR),
        Some(base + 2 * 4096 + 8 * 4)
    );

    dev.set_viewport(0, 1);
    assert_eq!(
        sim.last_write_to(WindowKind::Vdc, vdc::DSPCADDR),
        Some(base + 4096)
    );
    assert_eq!(dev.state().viewport, (0, 1));
}

#[test]
fn register_dump_reads_every_modesetting_register() {
    let sim = SimDevice::default();
    let mut dev = common::open(&sim);
    sim.clear_events();

    dev.dump_registers();
    let offsets: Vec<usize> = sim
        .events()
        .iter()
        .filter_map(|event| match event {
            Event::Read {
                window: WindowKind::Vdc,
                offset,
                ..
            } => Some(*offset),
            _ => None,
        })
        .collect();
    let expected: Vec<usize> = vermilion_core::mode::DUMPED_REGISTERS
        .iter()
        .map(|&(_, offset)| offset)
        .collect();
    assert_eq!(offsets, expected);
}
