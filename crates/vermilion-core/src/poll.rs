use vermilion_hal::DelayNs;

use crate::error::{DriverError, Result};

/// Bound on a hardware status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Condition checks before giving up. At least one check always happens.
    pub max_polls: u32,
    /// Sleep between checks, microseconds. Zero spins.
    pub interval_us: u32,
}

impl PollPolicy {
    pub const fn new(max_polls: u32, interval_us: u32) -> Self {
        Self {
            max_polls,
            interval_us,
        }
    }
}

/// Check `done` until it returns true or the policy runs out.
///
/// Returns the number of checks it took.
pub(crate) fn poll_until<D: DelayNs>(
    policy: PollPolicy,
    delay: &mut D,
    what: &'static str,
    mut done: impl FnMut() -> bool,
) -> Result<u32> {
    let max_polls = policy.max_polls.max(1);
    for attempt in 1..=max_polls {
        if done() {
            return Ok(attempt);
        }
        if attempt < max_polls && policy.interval_us > 0 {
            delay.delay_us(policy.interval_us);
        }
    }
    log::error!("{what}: no completion after {max_polls} polls");
    Err(DriverError::Timeout {
        what,
        polls: max_polls,
    })
}
