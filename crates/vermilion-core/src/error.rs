use crate::validate::ModeStatus;

/// Errors surfaced by the display core. Nothing is retried internally; every
/// failure reaches the immediate caller.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Requested pixel clock is not one of the board's achievable clocks.
    #[error("unsupported pixel clock {clock} kHz")]
    UnsupportedClock { clock: u32 },

    /// Panel index outside the panel table.
    #[error("unknown panel type {0}")]
    UnknownPanel(usize),

    /// Only depths 15 and 24 are supported.
    #[error("unsupported color depth {0}, only 15 and 24 supported")]
    UnsupportedDepth(u8),

    /// Fused clock index outside the board clock table.
    #[error("unknown fused clock index {0}")]
    InvalidFusedClock(usize),

    /// Timing rejected by the panel timing validator.
    #[error("mode rejected: {0}")]
    InvalidMode(ModeStatus),

    /// A required PCI function is absent.
    #[error("could not find {0}")]
    DeviceNotFound(&'static str),

    /// A required PCI function is present but disabled.
    #[error("{0} was not enabled")]
    DeviceDisabled(&'static str),

    /// Identification supplied by the caller names the wrong function.
    #[error("{what} has id {vendor:04x}:{device:04x}")]
    WrongDevice {
        what: &'static str,
        vendor: u16,
        device: u16,
    },

    /// Framebuffer aperture or virtual screen the hardware cannot address.
    #[error("invalid {what}: {message}")]
    InvalidGeometry {
        what: &'static str,
        message: String,
    },

    /// A memory window could not be mapped.
    #[error("could not map {what} memory: {message}")]
    Map {
        what: &'static str,
        message: String,
    },

    /// A hardware status poll did not complete within its retry budget.
    #[error("timed out waiting for {what} after {polls} polls")]
    Timeout { what: &'static str, polls: u32 },

    /// A command batch larger than the whole FIFO was requested.
    #[error("batch of {0} words exceeds the command FIFO")]
    BatchTooLarge(u32),

    /// Drawing was requested without the matching setup call.
    #[error("no {0} setup issued")]
    NoBlitSetup(&'static str),

    /// Board restore requested before any save.
    #[error("board state restore without a saved snapshot")]
    NothingSaved,

    /// Operation needs the device to own the display (VT active).
    #[error("device is not active")]
    NotActive,
}

pub type Result<T> = core::result::Result<T, DriverError>;
