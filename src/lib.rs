// SPDX-License-Identifier: GPL-3.0-or-later
//! Driver for the two current output channels (IDAC A and IDAC B) of a CSD analog front end.
//!
//! [`Controller`] validates the routing [`Config`], converts signed nanoamp requests into
//! hardware settings and sequences them onto a [`CsdBlock`] implementation, keeping track of
//! each channel's state across enable, disable and low power transitions.
#![no_std]

pub mod channel;
pub mod codec;
pub mod config;
pub mod controller;
pub mod csd;
pub mod error;
pub mod power;

pub use channel::{Channel, ChannelState, Choice};
pub use codec::{Lsb, Output, Polarity, MAX_CODE, MAX_CURRENT_NA};
pub use config::{BlockRef, Config, ContextRef, PinRef, RawConfig, Retention, Routing};
pub use controller::{Controller, Snapshot};
pub use csd::CsdBlock;
pub use error::Error;
pub use power::{SleepMode, SleepStatus};
