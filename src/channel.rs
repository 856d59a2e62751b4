// SPDX-License-Identifier: GPL-3.0-or-later
use log::{debug, warn};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::codec::Output;
use crate::config::{Config, Routing};
use crate::csd::CsdBlock;
use crate::error::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Channel {
    A = 0,
    B = 1,
}

impl Channel {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn partner(self) -> Channel {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }
}

/// Channel selector for controller operations.
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Choice {
    A = 0,
    B = 1,
    /// Both channels, set together with identical outputs.
    AB = 2,
}

impl Choice {
    pub fn channels(self) -> &'static [Channel] {
        match self {
            Choice::A => &[Channel::A],
            Choice::B => &[Channel::B],
            Choice::AB => &[Channel::A, Channel::B],
        }
    }

    /// `AB` is only meaningful when both channels are routed somewhere.
    pub fn check(self, config: &Config) -> Result<(), Error> {
        match self {
            Choice::A | Choice::B => Ok(()),
            Choice::AB => {
                if config.routing_a.is_disabled() || config.routing_b.is_disabled() {
                    Err(Error::BadParam)
                } else {
                    Ok(())
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChannelState {
    pub enabled: bool,
    /// The last applied output, kept while disabled.
    pub output: Output,
}

impl ChannelState {
    pub const DISABLED: Self = Self {
        enabled: false,
        output: Output::ZERO,
    };

    /// The current in nanoamps this state stands for. Between `Controller::save` and
    /// `Controller::restore` the block drives nothing, whatever the state says.
    pub fn current(&self) -> i32 {
        if self.enabled {
            self.output.current()
        } else {
            0
        }
    }
}

pub struct ChannelStateMachine {
    channel: Channel,
    state: ChannelState,
}

impl ChannelStateMachine {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: ChannelState::DISABLED,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Checks that the routing allows this channel to drive current.
    pub fn check_enable(&self, config: &Config) -> Result<(), Error> {
        match config.routing(self.channel) {
            Routing::Disabled => Err(Error::BadConfiguration),
            // A joined channel drives through its partner's node
            Routing::Join if config.routing(self.channel.partner()).is_disabled() => {
                Err(Error::BadConfiguration)
            }
            _ => Ok(()),
        }
    }

    /// Applies `output`, releasing any previous output first. The block must be held.
    ///
    /// If the hardware rejects the output the channel ends up disabled, keeping the output it
    /// retained before.
    pub fn enable<H: CsdBlock>(&mut self, hw: &mut H, output: Output) -> Result<(), Error> {
        if self.state.enabled {
            hw.release_output(self.channel);
            self.state.enabled = false;
        }

        match hw.apply_output(self.channel, output) {
            Ok(()) => {
                debug!("IDAC {:?}: enabled {:?}", self.channel, output);
                self.state = ChannelState {
                    enabled: true,
                    output,
                };
                Ok(())
            }
            Err(fault) => {
                warn!("IDAC {:?}: failed to apply {:?}", self.channel, output);
                hw.release_output(self.channel);
                Err(fault.into())
            }
        }
    }

    /// Stops driving current. The block must be held.
    pub fn disable<H: CsdBlock>(&mut self, hw: &mut H) {
        if self.state.enabled {
            hw.release_output(self.channel);
            self.state.enabled = false;
            debug!("IDAC {:?}: disabled", self.channel);
        }
    }

    /// Releases the physical output without changing the recorded state, so it can be replayed
    /// later with `restore`.
    pub fn park<H: CsdBlock>(&self, hw: &mut H) {
        if self.state.enabled {
            hw.release_output(self.channel);
        }
    }

    /// Marks the channel disabled after the block dropped its output on its own, without
    /// touching the hardware.
    pub fn forget(&mut self) {
        if self.state.enabled {
            self.state.enabled = false;
            debug!("IDAC {:?}: output lost", self.channel);
        }
    }

    /// Brings the channel to `state` through the same path as `enable`/`disable`.
    pub fn restore<H: CsdBlock>(&mut self, hw: &mut H, state: ChannelState) -> Result<(), Error> {
        if state.enabled {
            self.enable(hw, state.output)
        } else {
            self.disable(hw);
            self.state.output = state.output;
            Ok(())
        }
    }
}
