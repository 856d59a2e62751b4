// SPDX-License-Identifier: GPL-3.0-or-later
use log::{debug, warn};

use crate::channel::{Channel, ChannelState, ChannelStateMachine, Choice};
use crate::codec::{self, Output};
use crate::config::{self, Config};
use crate::csd::{Acquire, ClockHealth, CsdBlock};
use crate::error::Error;

/// How many times a locked block is polled before giving up with `HwLocked`.
pub const LOCK_POLL_ATTEMPTS: u8 = 3;

/// Both channel states, captured around a low power transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub channels: [ChannelState; 2],
}

impl Snapshot {
    pub fn state(&self, channel: Channel) -> ChannelState {
        self.channels[channel.index()]
    }
}

pub struct Controller<H: CsdBlock> {
    hw: H,
    config: Config,
    channels: [ChannelStateMachine; 2],
    saved: Option<Snapshot>,
}

impl<H: CsdBlock> Controller<H> {
    /// Validates `config` and brings up the CSD block. Both channels start disabled.
    pub fn new(config: Config, mut hw: H) -> Result<Self, Error> {
        if !config::validate(&config) {
            warn!("IDAC: invalid configuration {:?}", config);
            return Err(Error::BadConfiguration);
        }

        check_clock(&hw)?;
        acquire(&mut hw)?;
        let result = bring_up(&mut hw, &config);
        hw.release();
        result?;

        debug!("IDAC: initialized with {:?}", config);

        Ok(Self {
            hw,
            config,
            channels: [
                ChannelStateMachine::new(Channel::A),
                ChannelStateMachine::new(Channel::B),
            ],
            saved: None,
        })
    }

    /// Disables both channels. The block is left released.
    pub fn deinit(&mut self) -> Result<(), Error> {
        self.saved = None;
        self.with_block(|hw, channels, _| {
            for channel in channels.iter_mut() {
                channel.disable(hw);
            }
            Ok(())
        })
    }

    /// Gives the hardware back.
    pub fn free(self) -> H {
        self.hw
    }

    /// Replaces the routing configuration. Both channels are disabled first.
    pub fn write_config(&mut self, config: Config) -> Result<(), Error> {
        if !config::validate(&config) {
            warn!("IDAC: invalid configuration {:?}", config);
            return Err(Error::BadConfiguration);
        }
        check_clock(&self.hw)?;

        self.saved = None;
        self.with_block(|hw, channels, _| {
            for channel in channels.iter_mut() {
                channel.disable(hw);
            }
            bring_up(hw, &config)
        })?;
        self.config = config;

        debug!("IDAC: reconfigured with {:?}", config);
        Ok(())
    }

    /// Sources (positive) or sinks (negative) `current_na` nanoamps on the selected channels.
    pub fn output_enable(&mut self, choice: Choice, current_na: i32) -> Result<(), Error> {
        let output = codec::encode(current_na)?;
        self.enable(choice, output)
    }

    /// Like `output_enable`, with the polarity, LSB index and code given explicitly.
    pub fn output_enable_ext(
        &mut self,
        choice: Choice,
        polarity: u8,
        lsb: u8,
        code: u32,
    ) -> Result<(), Error> {
        let output = Output::from_raw(polarity, lsb, code)?;
        self.enable(choice, output)
    }

    pub fn output_disable(&mut self, choice: Choice) -> Result<(), Error> {
        choice.check(&self.config)?;

        self.with_block(|hw, channels, _| {
            for &channel in choice.channels() {
                channels[channel.index()].disable(hw);
            }
            Ok(())
        })
    }

    /// Records both channel states and releases their outputs.
    ///
    /// Until `restore` runs, `state` keeps reporting the recorded logical state while the block
    /// drives nothing. If the block can't be taken, nothing is released or recorded.
    pub fn save(&mut self) -> Result<Snapshot, Error> {
        let snapshot = self.snapshot();

        self.with_block(|hw, channels, _| {
            for channel in channels.iter() {
                channel.park(hw);
            }
            Ok(())
        })?;
        self.saved = Some(snapshot);

        debug!("IDAC: saved {:?}", snapshot);
        Ok(snapshot)
    }

    /// Reprograms the block and replays the state recorded by `save`, or the current state when
    /// nothing was saved.
    ///
    /// On failure every channel the block no longer drives is reported disabled. The recorded
    /// state is kept, so a later `restore` can retry it.
    pub fn restore(&mut self) -> Result<(), Error> {
        let parked = self.saved.is_some();
        let snapshot = self.saved.unwrap_or_else(|| self.snapshot());

        let result = check_clock(&self.hw).and_then(|()| {
            self.with_block(|hw, channels, config| {
                if let Err(e) = bring_up(hw, config) {
                    // Initialization dropped every output
                    for channel in channels.iter_mut() {
                        channel.forget();
                    }
                    return Err(e);
                }

                for channel in [Channel::A, Channel::B] {
                    let result = channels[channel.index()].restore(hw, snapshot.state(channel));
                    if let Err(e) = result {
                        for channel in channels.iter_mut() {
                            channel.disable(hw);
                        }
                        return Err(e);
                    }
                }
                Ok(())
            })
        });

        if let Err(e) = result {
            if parked {
                for channel in self.channels.iter_mut() {
                    channel.forget();
                }
            }
            warn!("IDAC: restore failed: {}", e);
            return Err(e);
        }
        self.saved = None;

        debug!("IDAC: restored {:?}", snapshot);
        Ok(())
    }

    /// Resynchronizes after a low power transition that kept the block programmed.
    pub fn wakeup(&mut self) -> Result<(), Error> {
        check_clock(&self.hw)?;
        self.hw.delay_cycles(self.config.init_cycles());
        Ok(())
    }

    pub fn state(&self, channel: Channel) -> ChannelState {
        self.channels[channel.index()].state()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            channels: [self.state(Channel::A), self.state(Channel::B)],
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Checks that the block can be taken without touching it.
    pub(crate) fn check_ready(&mut self) -> Result<(), Error> {
        self.with_block(|_, _, _| Ok(()))
    }

    fn enable(&mut self, choice: Choice, output: Output) -> Result<(), Error> {
        choice.check(&self.config)?;
        for &channel in choice.channels() {
            self.channels[channel.index()].check_enable(&self.config)?;
        }

        self.with_block(|hw, channels, _| {
            for &channel in choice.channels() {
                if let Err(e) = channels[channel.index()].enable(hw, output) {
                    // All or nothing
                    for &channel in choice.channels() {
                        channels[channel.index()].disable(hw);
                    }
                    return Err(e);
                }
            }
            Ok(())
        })
    }

    /// Runs `f` with the block held, releasing it afterwards whatever the outcome.
    fn with_block<R>(
        &mut self,
        f: impl FnOnce(&mut H, &mut [ChannelStateMachine; 2], &Config) -> Result<R, Error>,
    ) -> Result<R, Error> {
        acquire(&mut self.hw)?;
        let result = f(&mut self.hw, &mut self.channels, &self.config);
        self.hw.release();
        result
    }
}

fn check_clock<H: CsdBlock>(hw: &H) -> Result<(), Error> {
    match hw.clock_health() {
        ClockHealth::Ok => Ok(()),
        health => {
            warn!("IDAC: CSD clock {:?}", health);
            Err(Error::HwFailure)
        }
    }
}

/// Takes the block, polling a bounded number of times while another owner holds it.
fn acquire<H: CsdBlock>(hw: &mut H) -> Result<(), Error> {
    for _ in 0..LOCK_POLL_ATTEMPTS {
        match hw.acquire() {
            Acquire::Granted => return Ok(()),
            Acquire::Locked => continue,
            Acquire::Busy => return Err(Error::HwBusy),
            Acquire::Failure => return Err(Error::HwFailure),
        }
    }
    Err(Error::HwLocked)
}

/// Programs the block and waits for it to settle. The block must be held.
fn bring_up<H: CsdBlock>(hw: &mut H, config: &Config) -> Result<(), Error> {
    hw.initialize(config)?;
    hw.delay_cycles(config.init_cycles());
    Ok(())
}
