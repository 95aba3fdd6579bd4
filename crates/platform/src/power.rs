//! Power management abstraction
//!
//! Dynamic frequency scaling changes the APB clock that paces the ADC
//! sample timer and the DMA engine. While a continuous conversion is
//! running the engine holds a [`PmLock`] that pins the clock.

use thiserror_no_std::Error;

/// Power-management lock errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PmError {
    /// Released more often than acquired.
    #[error("power-management lock not held")]
    NotHeld,
    /// Power management is disabled in this build.
    #[error("power management not supported")]
    NotSupported,
}

/// Recursive power-management lock.
///
/// `acquire` and `release` are bounded and may be called from task context
/// with interrupts enabled.
pub trait PmLock {
    /// Take one reference on the lock.
    fn acquire(&self) -> Result<(), PmError>;

    /// Drop one reference on the lock.
    fn release(&self) -> Result<(), PmError>;
}

impl<T: PmLock + ?Sized> PmLock for &T {
    fn acquire(&self) -> Result<(), PmError> {
        (**self).acquire()
    }

    fn release(&self) -> Result<(), PmError> {
        (**self).release()
    }
}

/// Lock for builds without dynamic frequency scaling.
///
/// Always succeeds; holds no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPm;

impl PmLock for NoPm {
    fn acquire(&self) -> Result<(), PmError> {
        Ok(())
    }

    fn release(&self) -> Result<(), PmError> {
        Ok(())
    }
}
