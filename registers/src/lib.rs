//! Register map for the Vermilion Range display subsystem.
//!
//! Three blocks are described here:
//! - [`vdc`]: the display controller (pipe A timing, graphics plane, output pads)
//! - [`mbx`]: the MBX 2D core command grammar and FIFO status register
//! - [`cr`]: Carillo Ranch chipset registers (clock select, panel GPIO latch)
#![no_std]
#![allow(clippy::identity_op)]
#![allow(clippy::unnecessary_cast)]

pub mod cr;
pub mod encode;
pub mod mbx;
pub mod reg;
pub mod vdc;

pub use crate::reg::Register;
