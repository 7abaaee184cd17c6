use vermilion_hal::{DelayNs, RegisterWindow};
use vermilion_registers::mbx;

use crate::error::{DriverError, Result};
use crate::poll::{poll_until, PollPolicy};

/// Cached count of free slave-port FIFO slots.
///
/// The cache is a lower bound on what the hardware would report: it only
/// shrinks as words are queued and only grows through a hardware re-read, so
/// a batch that fits the cache always fits the FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FifoSlots {
    cached: u32,
}

impl FifoSlots {
    pub const CAPACITY: u32 = mbx::SP_FIFO_DWSIZE;

    /// Starts empty so the first acquire reads the hardware.
    #[must_use]
    pub const fn new() -> Self {
        Self { cached: 0 }
    }

    #[must_use]
    pub const fn cached(&self) -> u32 {
        self.cached
    }

    /// Replace the cache with the free count implied by an INT_STATUS value.
    pub fn refresh(&mut self, status: u32) -> u32 {
        self.cached = Self::CAPACITY.saturating_sub(mbx::fifo_occupancy(status));
        self.cached
    }

    /// Reserve `n` slots, re-reading INT_STATUS while the cache is short.
    ///
    /// # Errors
    /// `BatchTooLarge` if `n` exceeds the FIFO, `Timeout` if the slots never
    /// free up within `policy`.
    pub fn acquire<W: RegisterWindow, D: DelayNs>(
        &mut self,
        mbx_regs: &mut W,
        delay: &mut D,
        policy: PollPolicy,
        n: u32,
    ) -> Result<()> {
        if n > Self::CAPACITY {
            return Err(DriverError::BatchTooLarge(n));
        }
        if self.cached < n {
            poll_until(policy, delay, "slave port FIFO", || {
                self.refresh(mbx_regs.read32(mbx::INT_STATUS)) >= n
            })?;
        }
        self.cached -= n;
        Ok(())
    }
}

/// Last fence value issued. Values are 16 bits and wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceCounter {
    last: u16,
}

impl FenceCounter {
    /// Continue from whatever the mirror word holds now, so the first fence
    /// differs from the stale value.
    #[must_use]
    pub const fn seeded(mirror: u32) -> Self {
        Self {
            last: (mirror & 0xFFFF) as u16,
        }
    }

    #[must_use]
    pub const fn last(&self) -> u16 {
        self.last
    }

    /// Value the next fence will carry, without issuing it.
    #[must_use]
    pub const fn peek(&self) -> u16 {
        self.last.wrapping_add(1)
    }

    /// Issue the next value.
    pub fn advance(&mut self) -> u16 {
        self.last = self.peek();
        self.last
    }
}
