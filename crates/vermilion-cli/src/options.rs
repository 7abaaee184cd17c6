use clap::{Args, Parser, Subcommand};
use vermilion_core::{DriverConfig, PanelSelection};

#[derive(Parser, Debug)]
#[command(name = "vermilion")]
#[command(about = "Exercise the Vermilion display core on a simulated Carillo Ranch board", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub driver: DriverArgs,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Check the built-in modelines against the panel and board clocks
    Modes,
    /// Bring the screen up, draw with the 2D engine and tear down
    Demo {
        /// Print the register and port trace
        #[arg(long)]
        trace: bool,
    },
    /// Set the native mode and dump the modesetting registers
    Dump,
}

/// Driver options, named as in the X driver configuration.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct DriverArgs {
    /// Color depth, 15 or 24
    #[arg(long, global = true, default_value_t = 24)]
    pub depth: u8,

    /// Draw with the CPU only
    #[arg(long, global = true)]
    pub no_accel: bool,

    /// Panel table index, or "none" to drive a CRT
    #[arg(long, global = true, value_parser = parse_panel)]
    pub panel: Option<PanelSelection>,

    /// Restrict pixel clocks to this index of the board clock table
    #[arg(long, global = true)]
    pub fused_clock: Option<usize>,

    /// Modesetting debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only rewrite the clock-select field of the clock register
    #[arg(long, global = true)]
    pub preserve_clock_bits: bool,
}

fn parse_panel(value: &str) -> Result<PanelSelection, String> {
    if value.eq_ignore_ascii_case("none") {
        return Ok(PanelSelection::Disabled);
    }
    value
        .parse()
        .map(PanelSelection::Fixed)
        .map_err(|_| format!("expected a panel index or \"none\", got {value:?}"))
}

impl DriverArgs {
    pub fn config(&self) -> DriverConfig {
        DriverConfig {
            depth: self.depth,
            accel: !self.no_accel,
            panel: self.panel.unwrap_or_default(),
            fused_clock: self.fused_clock,
            debug: self.debug,
            preserve_clock_bits: self.preserve_clock_bits,
            ..DriverConfig::default()
        }
    }
}
