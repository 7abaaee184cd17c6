//! Display core for the Vermilion Range display controller and its MBX 2D
//! core.
//!
//! Layers, leaves first:
//! - [`board`]: pixel clock routing and panel power per board
//! - [`validate`]: panel timing checks
//! - [`mode`]: pipe timing, plane setup and the pipe shutdown sequence
//! - [`accel`]: slave-port command FIFO, fills, copies and fences
//! - [`device`]: the caller-owned device tying the layers together
//!
//! All hardware access goes through the `vermilion-hal` traits.

pub mod accel;
pub mod board;
pub mod config;
pub mod device;
pub mod error;
pub mod mode;
pub mod poll;
pub mod timing;
pub mod validate;

pub use config::{DriverConfig, PanelSelection, PollConfig};
pub use device::{Accel, Device, DeviceInfo, DeviceState, Dpms, PciFunction};
pub use error::{DriverError, Result};
pub use poll::PollPolicy;
pub use timing::{ColorDepth, TimingDescriptor};
pub use validate::ModeStatus;
