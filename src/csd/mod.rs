// SPDX-License-Identifier: GPL-3.0-or-later
use crate::channel::Channel;
use crate::codec::Output;
use crate::config::Config;

#[cfg(test)]
pub(crate) mod mock;

/// Result of a single attempt to take ownership of the CSD block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Acquire {
    Granted,
    /// The block is driving current in a mode that conflicts with the request.
    Busy,
    /// Another owner holds the block.
    Locked,
    Failure,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClockHealth {
    Ok,
    NoClock,
    /// Below the 100 kHz the block needs.
    TooSlow,
}

/// Register level fault reported by the block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Fault;

/// The CSD hardware block driving both IDAC channels.
///
/// Implementations assert the register bits; the controller only sequences calls and branches on
/// their results. `acquire`/`release` bracket every sequence of channel operations.
pub trait CsdBlock {
    fn acquire(&mut self) -> Acquire;

    fn release(&mut self);

    fn clock_health(&self) -> ClockHealth;

    /// Programs the block for the given routing. Called at init, reconfiguration and restore.
    fn initialize(&mut self, config: &Config) -> Result<(), Fault>;

    fn apply_output(&mut self, channel: Channel, output: Output) -> Result<(), Fault>;

    fn release_output(&mut self, channel: Channel);

    /// Busy waits for the given number of CPU cycles.
    fn delay_cycles(&mut self, _cycles: u32) {}
}

impl<T: CsdBlock + ?Sized> CsdBlock for &mut T {
    fn acquire(&mut self) -> Acquire {
        (**self).acquire()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn clock_health(&self) -> ClockHealth {
        (**self).clock_health()
    }

    fn initialize(&mut self, config: &Config) -> Result<(), Fault> {
        (**self).initialize(config)
    }

    fn apply_output(&mut self, channel: Channel, output: Output) -> Result<(), Fault> {
        (**self).apply_output(channel, output)
    }

    fn release_output(&mut self, channel: Channel) {
        (**self).release_output(channel)
    }

    fn delay_cycles(&mut self, cycles: u32) {
        (**self).delay_cycles(cycles)
    }
}
