use core::fmt;

use crate::board::nearest_clock_index;
use crate::timing::{PanelSpec, TimingDescriptor};

/// Outcome of checking a timing against the attached panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeStatus {
    Ok,
    ClockLow,
    ClockHigh,
    BadHorizontal,
    BadVertical,
    HSyncPeriodIllegal,
    InterlaceUnsupported,
}

impl ModeStatus {
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl fmt::Display for ModeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Ok => "mode OK",
            Self::ClockLow => "pixel clock below panel minimum",
            Self::ClockHigh => "pixel clock above panel maximum",
            Self::BadHorizontal => "horizontal active or total out of panel range",
            Self::BadVertical => "vertical active or total out of panel range",
            Self::HSyncPeriodIllegal => "horizontal period out of panel range",
            Self::InterlaceUnsupported => "interlaced modes are not supported",
        };
        f.write_str(reason)
    }
}

/// Horizontal line period in nanoseconds at `clock` kHz, in the integer
/// arithmetic the panel limits are specified with. `None` when the clock is
/// below 100 kHz.
#[must_use]
pub fn h_period_ns(h_total: u32, clock: u32) -> Option<u32> {
    let divisor = clock / 100;
    if divisor == 0 {
        return None;
    }
    Some((u64::from(h_total) * 10_000 / u64::from(divisor)) as u32)
}

/// Check `timing` against `panel`. The pixel clock is first resolved to the
/// nearest entry of `clocks`, since that is what the hardware will run.
///
/// Without a panel only the interlace check applies.
#[must_use]
pub fn validate(timing: &TimingDescriptor, clocks: &[u32], panel: Option<&PanelSpec>) -> ModeStatus {
    if timing.interlace {
        return ModeStatus::InterlaceUnsupported;
    }

    let Some(panel) = panel else {
        return ModeStatus::Ok;
    };

    let Some(real_clock) = nearest_clock_index(clocks, timing.clock).map(|i| clocks[i]) else {
        return ModeStatus::ClockLow;
    };

    if real_clock < panel.clock_min {
        return ModeStatus::ClockLow;
    }
    if real_clock > panel.clock_max {
        return ModeStatus::ClockHigh;
    }
    if !(panel.h_tot_min..=panel.h_tot_max).contains(&timing.h_total)
        || !(panel.h_act_min..=panel.h_act_max).contains(&timing.h_active)
    {
        return ModeStatus::BadHorizontal;
    }
    if !(panel.v_tot_min..=panel.v_tot_max).contains(&timing.v_total)
        || !(panel.v_act_min..=panel.v_act_max).contains(&timing.v_active)
    {
        return ModeStatus::BadVertical;
    }

    match h_period_ns(timing.h_total, real_clock) {
        Some(period) if (panel.h_per_min..=panel.h_per_max).contains(&period) => ModeStatus::Ok,
        _ => ModeStatus::HSyncPeriodIllegal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{PANELS, XGA_60};

    const CLOCKS: [u32; 9] = [6750, 13500, 27000, 29700, 37125, 54000, 59400, 74250, 120_000];

    #[test]
    fn native_panel_mode_is_accepted() {
        assert_eq!(validate(&XGA_60, &CLOCKS, Some(&PANELS[0])), ModeStatus::Ok);
    }

    #[test]
    fn h_period_integer_arithmetic() {
        // 1344 * 10000 / 594
        assert_eq!(h_period_ns(1344, 59_400), Some(22_626));
        assert_eq!(h_period_ns(1344, 99), None);
    }

    #[test]
    fn horizontal_total_checked_before_vertical() {
        let mut timing = XGA_60;
        timing.h_total = 2000;
        timing.v_total = 2000;
        assert_eq!(validate(&timing, &CLOCKS, Some(&PANELS[0])), ModeStatus::BadHorizontal);
    }

    #[test]
    fn active_out_of_range() {
        let mut timing = XGA_60;
        timing.v_active = 600;
        assert_eq!(validate(&timing, &CLOCKS, Some(&PANELS[0])), ModeStatus::BadVertical);
        timing = XGA_60;
        timing.h_active = 800;
        assert_eq!(validate(&timing, &CLOCKS, Some(&PANELS[0])), ModeStatus::BadHorizontal);
    }

    #[test]
    fn low_clock() {
        let mut timing = XGA_60;
        timing.clock = 30_000;
        assert_eq!(validate(&timing, &CLOCKS, Some(&PANELS[0])), ModeStatus::ClockLow);
    }

    #[test]
    fn period_outside_panel_limits() {
        // 54 MHz with a 1344 total gives a 24888 ns line, above the 23400 limit.
        let mut timing = XGA_60;
        timing.clock = 54_000;
        assert_eq!(
            validate(&timing, &CLOCKS, Some(&PANELS[0])),
            ModeStatus::HSyncPeriodIllegal
        );
    }

    #[test]
    fn interlace_rejected_even_without_panel() {
        let mut timing = XGA_60;
        timing.interlace = true;
        assert_eq!(
            validate(&timing, &CLOCKS, Some(&PANELS[0])),
            ModeStatus::InterlaceUnsupported
        );
        assert_eq!(validate(&timing, &CLOCKS, None), ModeStatus::InterlaceUnsupported);
    }

    #[test]
    fn no_panel_skips_electrical_checks() {
        let mut timing = XGA_60;
        timing.clock = 120_000;
        timing.h_total = 4000;
        assert_eq!(validate(&timing, &CLOCKS, None), ModeStatus::Ok);
    }

    #[test]
    fn high_clock() {
        let mut timing = XGA_60;
        timing.clock = 110_000;
        assert_eq!(validate(&timing, &CLOCKS, Some(&PANELS[0])), ModeStatus::ClockHigh);
    }

    #[test]
    fn status_messages() {
        assert_eq!(ModeStatus::Ok.to_string(), "mode OK");
        assert!(ModeStatus::Ok.is_ok());
        assert!(!ModeStatus::ClockHigh.is_ok());
    }

    #[test]
    fn empty_clock_table_is_too_low() {
        assert_eq!(validate(&XGA_60, &[], Some(&PANELS[0])), ModeStatus::ClockLow);
    }
}
