//! Driver options.
//!
//! Plain data with defaults matching the stock driver; the host builds one
//! from its own option source (the debug CLI uses clap).

use crate::poll::PollPolicy;

/// Which panel the screen drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelSelection {
    /// The board's fixed panel.
    #[default]
    BoardDefault,
    /// An explicit entry of the panel table.
    Fixed(usize),
    /// Treat the output as a plain CRT; no electrical checks, no panel power.
    Disabled,
}

/// Retry budgets for each hardware poll site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Waiting for free slave-port FIFO slots.
    pub fifo: PollPolicy,
    /// Waiting for the output pad compensation to settle.
    pub pad: PollPolicy,
    /// Waiting for a fence value to land in the mirror word.
    pub fence: PollPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            fifo: PollPolicy::new(100_000, 1),
            pad: PollPolicy::new(10_000, 10),
            fence: PollPolicy::new(100_000, 10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Color depth in bits, 15 or 24.
    pub depth: u8,
    /// Use the MBX 2D core for fills and copies.
    pub accel: bool,
    pub panel: PanelSelection,
    /// Restrict the clock table to the entry at this index.
    pub fused_clock: Option<usize>,
    /// Modesetting debug output.
    pub debug: bool,
    /// Write the clock-select field with read-modify-write instead of
    /// replacing the whole clock register.
    pub preserve_clock_bits: bool,
    pub poll: PollConfig,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            depth: 24,
            accel: true,
            panel: PanelSelection::BoardDefault,
            fused_clock: None,
            debug: false,
            preserve_clock_bits: false,
            poll: PollConfig::default(),
        }
    }
}
