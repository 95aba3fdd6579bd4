//! Error type shared by every acquisition-engine operation.

use platform::{DmaError, InterruptError, PmError};
use thiserror_no_std::Error;

/// Errors returned by the acquisition engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcError {
    /// Out-of-range unit or channel, malformed configuration, or a callback
    /// whose placement is not interrupt-safe.
    #[error("invalid argument")]
    InvalidArgument,
    /// The context or slot is in the wrong state for this operation.
    #[error("invalid state")]
    InvalidState,
    /// Slot pool exhausted, handle not owned, or hardware resource taken.
    #[error("not found")]
    NotFound,
    /// Caller-supplied DMA memory is too small.
    #[error("out of memory")]
    NoMemory,
    /// Feature not available on this chip.
    #[error("not supported")]
    NotSupported,
    /// No data arrived before the deadline.
    #[error("timed out")]
    Timeout,
}

/// Result alias used across the crate.
pub type Result<T> = core::result::Result<T, AdcError>;

impl From<InterruptError> for AdcError {
    fn from(e: InterruptError) -> Self {
        match e {
            InterruptError::NoFreeLine | InterruptError::NotAllocated => Self::NotFound,
            InterruptError::InvalidArgument => Self::InvalidArgument,
        }
    }
}

impl From<DmaError> for AdcError {
    fn from(e: DmaError) -> Self {
        match e {
            DmaError::Busy | DmaError::NoChannel => Self::NotFound,
        }
    }
}

impl From<PmError> for AdcError {
    fn from(e: PmError) -> Self {
        match e {
            PmError::NotHeld => Self::InvalidState,
            PmError::NotSupported => Self::NotSupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peripheral_conflicts_map_to_not_found() {
        assert_eq!(AdcError::from(DmaError::Busy), AdcError::NotFound);
        assert_eq!(AdcError::from(InterruptError::NoFreeLine), AdcError::NotFound);
    }

    #[test]
    fn error_display_is_not_empty() {
        let s = format!("{}", AdcError::InvalidState);
        assert_eq!(s, "invalid state");
    }
}
