// SPDX-License-Identifier: GPL-3.0-or-later
extern crate std;

use std::collections::VecDeque;
use std::vec::Vec;

use super::{Acquire, ClockHealth, CsdBlock, Fault};
use crate::channel::Channel;
use crate::codec::Output;
use crate::config::Config;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Event {
    Acquire(Acquire),
    Release,
    Initialize,
    Apply(Channel, Output),
    ReleaseOutput(Channel),
    Delay(u32),
}

/// Records every call and keeps track of what each channel physically drives.
pub struct MockBlock {
    pub events: Vec<Event>,
    /// Answers for upcoming acquire calls, `Granted` once empty.
    pub acquire_script: VecDeque<Acquire>,
    pub clock: ClockHealth,
    pub fail_initialize: bool,
    pub fail_apply: Option<Channel>,
    pub driven: [Option<Output>; 2],
    pub held: bool,
}

impl MockBlock {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            acquire_script: VecDeque::new(),
            clock: ClockHealth::Ok,
            fail_initialize: false,
            fail_apply: None,
            driven: [None, None],
            held: false,
        }
    }

    pub fn driven(&self, channel: Channel) -> Option<Output> {
        self.driven[channel.index()]
    }

    /// Simulates the block losing its programmed state.
    pub fn power_loss(&mut self) {
        self.driven = [None, None];
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }
}

impl CsdBlock for MockBlock {
    fn acquire(&mut self) -> Acquire {
        let result = self.acquire_script.pop_front().unwrap_or(Acquire::Granted);
        assert!(!(self.held && result == Acquire::Granted), "block acquired twice");
        self.held = result == Acquire::Granted;
        self.events.push(Event::Acquire(result));
        result
    }

    fn release(&mut self) {
        assert!(self.held, "block released without being held");
        self.held = false;
        self.events.push(Event::Release);
    }

    fn clock_health(&self) -> ClockHealth {
        self.clock
    }

    fn initialize(&mut self, _config: &Config) -> Result<(), Fault> {
        assert!(self.held);
        self.events.push(Event::Initialize);
        self.driven = [None, None];
        if self.fail_initialize {
            Err(Fault)
        } else {
            Ok(())
        }
    }

    fn apply_output(&mut self, channel: Channel, output: Output) -> Result<(), Fault> {
        assert!(self.held);
        assert!(
            self.driven(channel).is_none(),
            "output applied over a driven channel"
        );
        self.events.push(Event::Apply(channel, output));
        if self.fail_apply == Some(channel) {
            return Err(Fault);
        }
        self.driven[channel.index()] = Some(output);
        Ok(())
    }

    fn release_output(&mut self, channel: Channel) {
        assert!(self.held);
        self.events.push(Event::ReleaseOutput(channel));
        self.driven[channel.index()] = None;
    }

    fn delay_cycles(&mut self, cycles: u32) {
        self.events.push(Event::Delay(cycles));
    }
}
