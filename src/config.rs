// SPDX-License-Identifier: GPL-3.0-or-later
use fugit::{HertzU32, MicrosDurationU32};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use num_traits::cast;

use crate::channel::Channel;
use crate::error::Error;

/// Handle to the CSD hardware block shared by both channels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BlockRef(pub u32);

/// Handle to the CSD driver context owning the block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContextRef(pub u32);

/// A GPIO pin a channel can be routed to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PinRef {
    pub port: u8,
    pub pin: u8,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum RoutingKind {
    Disabled = 0,
    Gpio = 1,
    Amux = 2,
    Join = 3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Routing {
    /// The channel is not connected anywhere.
    Disabled,
    /// The channel drives a pin.
    Gpio(Option<PinRef>),
    /// The channel drives its analog bus.
    Amux,
    /// The channel is routed into the other channel's output.
    Join,
}

impl Routing {
    pub fn from_raw(kind: u8, pin: Option<PinRef>) -> Result<Self, Error> {
        let kind = RoutingKind::try_from(kind).map_err(|_| Error::BadConfiguration)?;
        Ok(match kind {
            RoutingKind::Disabled => Routing::Disabled,
            RoutingKind::Gpio => Routing::Gpio(pin),
            RoutingKind::Amux => Routing::Amux,
            RoutingKind::Join => Routing::Join,
        })
    }

    pub fn kind(&self) -> RoutingKind {
        match self {
            Routing::Disabled => RoutingKind::Disabled,
            Routing::Gpio(_) => RoutingKind::Gpio,
            Routing::Amux => RoutingKind::Amux,
            Routing::Join => RoutingKind::Join,
        }
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, Routing::Disabled)
    }
}

/// What happens to the CSD block registers in deep sleep, as wired on the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Retention {
    /// The block keeps its programmed outputs.
    Preserved,
    /// The block loses its programmed outputs and must be restored.
    Lost,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    pub block: Option<BlockRef>,
    pub driver_context: Option<ContextRef>,
    pub routing_a: Routing,
    pub routing_b: Routing,
    pub cpu_clock: HertzU32,
    /// Time the block needs to settle after being (re)initialized.
    pub init_time: MicrosDurationU32,
    pub retention: Retention,
}

impl Config {
    pub fn routing(&self, channel: Channel) -> &Routing {
        match channel {
            Channel::A => &self.routing_a,
            Channel::B => &self.routing_b,
        }
    }

    /// Number of CPU cycles spanning `init_time`, rounded up and saturated to `u32::MAX`.
    pub fn init_cycles(&self) -> u32 {
        let hz_us = self.cpu_clock.to_Hz() as u64 * self.init_time.ticks() as u64;
        cast(div_ceil(hz_us, 1_000_000)).unwrap_or(u32::MAX)
    }
}

fn div_ceil(n: u64, d: u64) -> u64 {
    (n + d - 1) / d
}

/// `Config` with the routing kinds as raw values, as produced by board configuration tables.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawConfig {
    pub block: Option<BlockRef>,
    pub driver_context: Option<ContextRef>,
    pub config_a: u8,
    pub config_b: u8,
    pub pin_a: Option<PinRef>,
    pub pin_b: Option<PinRef>,
    pub cpu_clock: HertzU32,
    pub init_time: MicrosDurationU32,
    pub retention: Retention,
}

impl TryFrom<RawConfig> for Config {
    type Error = Error;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            block: raw.block,
            driver_context: raw.driver_context,
            routing_a: Routing::from_raw(raw.config_a, raw.pin_a)?,
            routing_b: Routing::from_raw(raw.config_b, raw.pin_b)?,
            cpu_clock: raw.cpu_clock,
            init_time: raw.init_time,
            retention: raw.retention,
        })
    }
}

/// Checks the structural invariants of a configuration. Must hold before any hardware is touched.
pub fn validate(config: &Config) -> bool {
    if config.block.is_none() || config.driver_context.is_none() {
        return false;
    }

    !matches!(
        (&config.routing_a, &config.routing_b),
        (Routing::Gpio(None), _)
            | (_, Routing::Gpio(None))
            | (Routing::Disabled, Routing::Disabled)
            | (Routing::Join, Routing::Join)
            | (Routing::Join, Routing::Disabled)
            | (Routing::Disabled, Routing::Join)
    )
}

pub fn validate_raw(raw: &RawConfig) -> bool {
    Config::try_from(*raw).map_or(false, |config| validate(&config))
}
