// SPDX-License-Identifier: GPL-3.0-or-later
use log::warn;

use crate::config::Retention;
use crate::controller::Controller;
use crate::csd::CsdBlock;

/// Phase of a deep sleep transition, as signalled by the power management framework.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SleepMode {
    CheckReady,
    CheckFail,
    BeforeTransition,
    AfterTransition,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SleepStatus {
    Pass,
    Fail,
}

impl<H: CsdBlock> Controller<H> {
    pub fn deep_sleep_callback(&mut self, mode: SleepMode) -> SleepStatus {
        let result = match (mode, self.config().retention) {
            (SleepMode::CheckFail, _) => Ok(()),
            (SleepMode::CheckReady, Retention::Preserved) => Ok(()),
            (SleepMode::BeforeTransition, Retention::Preserved) => Ok(()),
            (SleepMode::AfterTransition, Retention::Preserved) => self.wakeup(),
            // Saving needs the block, make sure nobody else holds it
            (SleepMode::CheckReady, Retention::Lost) => self.check_ready(),
            (SleepMode::BeforeTransition, Retention::Lost) => self.save().map(|_| ()),
            (SleepMode::AfterTransition, Retention::Lost) => self.restore(),
        };

        match result {
            Ok(()) => SleepStatus::Pass,
            Err(e) => {
                warn!("IDAC: deep sleep {:?} failed: {}", mode, e);
                SleepStatus::Fail
            }
        }
    }
}
