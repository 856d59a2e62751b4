// SPDX-License-Identifier: GPL-3.0-or-later
use err_derive::Error;
use num_enum::{TryFromPrimitive, TryFromPrimitiveError};

use crate::codec::OutOfRange;
use crate::csd::Fault;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// An enumerator or numeric argument is outside its domain.
    #[error(display = "invalid parameter")]
    BadParam,
    /// The CSD block is driving current in a way that conflicts with the request.
    #[error(display = "CSD block busy")]
    HwBusy,
    /// The CSD block is held by another owner.
    #[error(display = "CSD block locked by another owner")]
    HwLocked,
    /// Missing or too slow clock, corrupted registers or a damaged block.
    #[error(display = "CSD block failure")]
    HwFailure,
    /// The routing configuration violates one of its invariants.
    #[error(display = "invalid IDAC configuration")]
    BadConfiguration,
}

impl Error {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::HwBusy | Error::HwLocked)
    }
}

impl From<OutOfRange> for Error {
    fn from(_: OutOfRange) -> Self {
        Error::BadParam
    }
}

impl From<Fault> for Error {
    fn from(_: Fault) -> Self {
        Error::HwFailure
    }
}

impl<E: TryFromPrimitive> From<TryFromPrimitiveError<E>> for Error {
    fn from(_: TryFromPrimitiveError<E>) -> Self {
        Error::BadParam
    }
}
