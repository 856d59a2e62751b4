// SPDX-License-Identifier: GPL-3.0-or-later
//! Conversion between signed nanoamp currents and IDAC (polarity, LSB, code) settings.
//!
//! A request is quantized with the smallest LSB step whose full scale (`MAX_CODE` steps) still
//! reaches the requested magnitude. The code is the magnitude divided by the step, rounded to the
//! nearest integer with ties rounded up.
use num_enum::{IntoPrimitive, TryFromPrimitive};
use num_rational::Ratio;
use num_traits::cast;
use paste::paste;

use crate::error::Error;

/// The largest code accepted by either channel.
pub const MAX_CODE: u8 = 127;

/// The largest magnitude that can be requested, `MAX_CODE` times the largest step.
pub const MAX_CURRENT_NA: u32 = 609_600;

#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Polarity {
    /// Current flows out of the pin
    Source = 0,
    /// Current flows into the pin
    Sink = 1,
}

macro_rules! lsb_steps {
    ($(($na:literal, $numer:literal / $denom:literal),)+) => {
        paste! {

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Lsb {
    $([<Lsb $na>],)+
}

impl Lsb {
    /// All steps, smallest first.
    pub const ALL: [Lsb; 6] = [$(Lsb::[<Lsb $na>],)+];

    /// The current represented by one code step, in nanoamps.
    pub fn step(self) -> Ratio<u32> {
        match self {
            $(Lsb::[<Lsb $na>] => Ratio::new_raw($numer, $denom),)+
        }
    }
}

        }
    };
}

lsb_steps! {
    (37, 75 / 2),
    (75, 75 / 1),
    (300, 300 / 1),
    (600, 600 / 1),
    (2400, 2400 / 1),
    (4800, 4800 / 1),
}

impl Lsb {
    /// The largest current reachable with this step, in nanoamps.
    pub fn full_scale(self) -> Ratio<u32> {
        self.step() * Ratio::from_integer(MAX_CODE as u32)
    }
}

/// A hardware-representable channel setting.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Output {
    pub polarity: Polarity,
    pub lsb: Lsb,
    pub code: u8,
}

impl Output {
    pub const ZERO: Self = Self {
        polarity: Polarity::Source,
        lsb: Lsb::Lsb37,
        code: 0,
    };

    /// Builds an output from raw enumerator values, rejecting anything outside its domain.
    pub fn from_raw(polarity: u8, lsb: u8, code: u32) -> Result<Self, Error> {
        if !validate_polarity(polarity) || !validate_lsb(lsb) || code > MAX_CODE as u32 {
            return Err(Error::BadParam);
        }

        Ok(Self {
            polarity: Polarity::try_from(polarity)?,
            lsb: Lsb::try_from(lsb)?,
            code: code as u8,
        })
    }

    /// The produced current in nanoamps, negative when sinking.
    pub fn current(&self) -> i32 {
        decode(self.polarity, self.lsb, self.code)
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::ZERO
    }
}

/// The requested current magnitude exceeds `MAX_CURRENT_NA`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OutOfRange;

pub fn encode(current_na: i32) -> Result<Output, OutOfRange> {
    let polarity = if current_na < 0 {
        Polarity::Sink
    } else {
        Polarity::Source
    };

    let magnitude = current_na.unsigned_abs();
    if magnitude > MAX_CURRENT_NA {
        return Err(OutOfRange);
    }
    let magnitude = Ratio::from_integer(magnitude);

    let lsb = Lsb::ALL
        .iter()
        .copied()
        .find(|lsb| lsb.full_scale() >= magnitude)
        .ok_or(OutOfRange)?;

    // Never exceeds MAX_CODE since magnitude <= full scale of the chosen step
    let code = (magnitude / lsb.step()).round().to_integer();

    Ok(Output {
        polarity,
        lsb,
        code: code as u8,
    })
}

pub fn decode(polarity: Polarity, lsb: Lsb, code: u8) -> i32 {
    let magnitude = (lsb.step() * Ratio::from_integer(code as u32))
        .round()
        .to_integer();
    let magnitude: i32 = cast(magnitude).unwrap_or(MAX_CURRENT_NA as i32);

    match polarity {
        Polarity::Source => magnitude,
        Polarity::Sink => -magnitude,
    }
}

pub fn validate_lsb(lsb: u8) -> bool {
    Lsb::try_from(lsb).is_ok()
}

pub fn validate_polarity(polarity: u8) -> bool {
    Polarity::try_from(polarity).is_ok()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use seq_macro::seq;

    fn output(polarity: Polarity, lsb: Lsb, code: u8) -> Output {
        Output {
            polarity,
            lsb,
            code,
        }
    }

    #[test]
    fn zero_current() {
        assert_eq!(encode(0), Ok(output(Polarity::Source, Lsb::Lsb37, 0)));
        assert_eq!(decode(Polarity::Sink, Lsb::Lsb4800, 0), 0);
    }

    #[test]
    fn step_of_4800_picks_75_na_lsb() {
        // 127 * 37.5 nA = 4762.5 nA is not enough, 75 nA reaches it exactly
        assert_eq!(encode(4800), Ok(output(Polarity::Source, Lsb::Lsb75, 64)));
    }

    #[test]
    fn max_sink_current() {
        assert_eq!(
            encode(-609_600),
            Ok(output(Polarity::Sink, Lsb::Lsb4800, 127))
        );
        assert_eq!(encode(609_600), Ok(output(Polarity::Source, Lsb::Lsb4800, 127)));
    }

    #[test]
    fn out_of_range() {
        assert_eq!(encode(609_601), Err(OutOfRange));
        assert_eq!(encode(-609_601), Err(OutOfRange));
        assert_eq!(encode(i32::MIN), Err(OutOfRange));
        assert_eq!(encode(i32::MAX), Err(OutOfRange));
    }

    #[test]
    fn fractional_step_is_not_truncated() {
        // 3 * 37.5 = 112.5, which would be 111 with a 37 nA step
        assert_eq!(encode(113), Ok(output(Polarity::Source, Lsb::Lsb37, 3)));
        assert_eq!(decode(Polarity::Source, Lsb::Lsb37, 3), 113);
        assert_eq!(decode(Polarity::Sink, Lsb::Lsb37, 3), -113);
        assert_eq!(decode(Polarity::Source, Lsb::Lsb37, 127), 4763);
    }

    #[test]
    fn full_scale_boundaries() {
        assert_eq!(encode(4762), Ok(output(Polarity::Source, Lsb::Lsb37, 127)));
        assert_eq!(encode(4763), Ok(output(Polarity::Source, Lsb::Lsb75, 64)));
        assert_eq!(encode(9525), Ok(output(Polarity::Source, Lsb::Lsb75, 127)));
        assert_eq!(encode(9526), Ok(output(Polarity::Source, Lsb::Lsb300, 32)));
        assert_eq!(encode(38_100), Ok(output(Polarity::Source, Lsb::Lsb300, 127)));
        assert_eq!(encode(38_101), Ok(output(Polarity::Source, Lsb::Lsb600, 64)));
        assert_eq!(encode(76_200), Ok(output(Polarity::Source, Lsb::Lsb600, 127)));
        assert_eq!(encode(76_201), Ok(output(Polarity::Source, Lsb::Lsb2400, 32)));
        assert_eq!(encode(304_800), Ok(output(Polarity::Source, Lsb::Lsb2400, 127)));
        assert_eq!(encode(304_801), Ok(output(Polarity::Source, Lsb::Lsb4800, 64)));
    }

    #[test]
    fn ties_round_up() {
        // 9750 / 300 = 32.5
        assert_eq!(encode(9750), Ok(output(Polarity::Source, Lsb::Lsb300, 33)));
        assert_eq!(encode(-9750), Ok(output(Polarity::Sink, Lsb::Lsb300, 33)));
        // 9749 / 300 = 32.497
        assert_eq!(encode(9749), Ok(output(Polarity::Source, Lsb::Lsb300, 32)));
    }

    #[test]
    fn quantization_error_within_one_step() {
        let magnitudes = (0..=MAX_CURRENT_NA as i32)
            .step_by(7)
            .chain([4762, 4763, 9525, 9526, 38_100, 38_101, 609_600]);

        for magnitude in magnitudes {
            for current in [magnitude, -magnitude] {
                let output = encode(current).unwrap();

                let expected_lsb = Lsb::ALL
                    .iter()
                    .copied()
                    .find(|lsb| lsb.full_scale() >= Ratio::from_integer(magnitude as u32))
                    .unwrap();
                assert_eq!(output.lsb, expected_lsb, "current {}", current);
                assert!(output.code <= MAX_CODE);

                let step = output.lsb.step().ceil().to_integer() as i32;
                let error = (output.current() - current).abs();
                assert!(error <= step, "current {} decoded as {}", current, output.current());
            }
        }
    }

    #[test]
    fn raw_membership_checks() {
        for lsb in 0..6 {
            assert!(validate_lsb(lsb));
        }
        assert!(!validate_lsb(6));
        assert!(!validate_lsb(0xff));

        assert!(validate_polarity(0));
        assert!(validate_polarity(1));
        assert!(!validate_polarity(2));
    }

    #[test]
    fn output_from_raw() {
        assert_eq!(
            Output::from_raw(1, 5, 127),
            Ok(output(Polarity::Sink, Lsb::Lsb4800, 127))
        );
        assert_eq!(Output::from_raw(2, 5, 1), Err(Error::BadParam));
        assert_eq!(Output::from_raw(0, 6, 1), Err(Error::BadParam));
        assert_eq!(Output::from_raw(0, 0, 128), Err(Error::BadParam));
    }

    seq!(N in 0..6 {
        #[test]
        fn full_scale_decodes_~N() {
            let lsb = Lsb::try_from(N as u8).unwrap();
            let expected = lsb.full_scale().round().to_integer() as i32;
            assert_eq!(decode(Polarity::Source, lsb, MAX_CODE), expected);
            assert_eq!(decode(Polarity::Sink, lsb, MAX_CODE), -expected);

            let reachable = lsb.full_scale().to_integer() as i32;
            assert_eq!(encode(reachable).unwrap().lsb, lsb);
            assert_eq!(encode(-reachable).unwrap().lsb, lsb);
        }
    });
}
