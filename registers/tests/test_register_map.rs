use vermilion_registers::{cr, mbx, vdc};

/// Offsets of the pipe A / plane C block against the hardware manual layout.
#[test]
fn test_vdc_offsets() {
    let pipe_timing = [
        vdc::HTOTAL_A,
        vdc::HBLANK_A,
        vdc::HSYNC_A,
        vdc::VTOTAL_A,
        vdc::VBLANK_A,
        vdc::VSYNC_A,
    ];
    for (i, offset) in pipe_timing.iter().enumerate() {
        assert_eq!(*offset, 0x6_0000 + 4 * i);
    }
    assert_eq!(vdc::PIPEASRC, 0x6_001C);
    assert_eq!(vdc::BCLRPAT_A, 0x6_0020);
    assert_eq!(vdc::CANVSCLR_A, 0x6_0024);

    assert_eq!(vdc::DSPCCNTR, 0x7_2180);
    assert_eq!(vdc::DSPCADDR, vdc::DSPCCNTR + 0x4);
    assert_eq!(vdc::DSPCSTRIDE, vdc::DSPCCNTR + 0x8);
    assert_eq!(vdc::DSPCPOS, vdc::DSPCCNTR + 0xC);
    assert_eq!(vdc::DSPCSIZE, vdc::DSPCCNTR + 0x10);

    assert_eq!(vdc::PIPEACONF, 0x7_0008);
    assert_eq!(vdc::DSPARB, 0x7_0030);
    assert_eq!(vdc::RCOMPSTAT, 0x7_0048);
}

#[test]
fn test_pipe_conf_bits() {
    assert_eq!(vdc::PipeConfReg::ENABLE, 0x8000_0000);
    assert_eq!(vdc::PipeConfReg::FORCE_BORDER, 0x0200_0000);
}

#[test]
fn test_timing_pair_layouts() {
    // PIPEASRC is width-major, DSPCSIZE height-major.
    let pipesrc = vdc::TimingPairReg::from_counts(768, 1024);
    let dspsize = vdc::TimingPairReg::from_counts(1024, 768);
    assert_eq!(pipesrc.bits(), (1023 << 16) | 767);
    assert_eq!(dspsize.bits(), (767 << 16) | 1023);
}

#[test]
fn test_slave_port_and_fifo() {
    assert_eq!(mbx::SLAVE_PORT, 0xA0_0000);
    assert_eq!(mbx::INT_STATUS, 0x12C);
    assert_eq!(mbx::SP_FIFO_DWSIZE, 123);
    assert_eq!(mbx::src_offset_word(1, 2), 0x3000_4002);
}

#[test]
fn test_clock_field() {
    assert_eq!(cr::clock_field(0x0b), 0x0000_0B00);
    // Control values wider than the field are truncated.
    assert_eq!(cr::clock_field(0x1f), 0x0000_0F00);
}
