//! Interrupt-controller allocation abstraction
//!
//! The interrupt matrix routes peripheral sources onto a small number of CPU
//! interrupt lines. [`InterruptController`] hands out lines either
//! exclusively or shared with other sources; a shared registration carries a
//! [`StatusMask`] so the dispatcher only runs when one of *our* status bits
//! is pending.
//!
//! Binding a line to Rust code is the board-support layer's job: its vector
//! calls the engine's `on_*_interrupt` entry point for the source that was
//! allocated.

use thiserror_no_std::Error;

/// Peripheral interrupt source number in the interrupt matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptSource(pub u16);

/// Options applied when allocating an interrupt line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptFlags {
    /// Priority level (1 = lowest).
    pub level: u8,
    /// The handler and everything it touches lives in internal RAM, so the
    /// line may stay enabled while flash cache is disabled.
    pub iram_safe: bool,
}

impl InterruptFlags {
    /// Level-1, flash-resident handler.
    pub const LEVEL1: Self = Self {
        level: 1,
        iram_safe: false,
    };

    /// Return a copy with `iram_safe` set as given.
    #[must_use]
    pub const fn with_iram(self, iram_safe: bool) -> Self {
        Self {
            level: self.level,
            iram_safe,
        }
    }
}

impl Default for InterruptFlags {
    fn default() -> Self {
        Self::LEVEL1
    }
}

/// Register address and bit mask used to filter a shared interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusMask {
    /// Address of the interrupt status register.
    pub register: usize,
    /// Bits in that register that belong to this registration.
    pub mask: u32,
}

/// Opaque handle to an allocated interrupt line.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptHandle(u32);

impl InterruptHandle {
    /// Wrap a controller-specific identifier. Only controller
    /// implementations create handles.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Controller-specific identifier.
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// Interrupt allocation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InterruptError {
    /// Every CPU line compatible with the requested flags is taken.
    #[error("no free interrupt line")]
    NoFreeLine,
    /// Flags or source are not valid for this controller.
    #[error("invalid interrupt allocation request")]
    InvalidArgument,
    /// The handle does not refer to a live allocation.
    #[error("interrupt not allocated")]
    NotAllocated,
}

/// Interrupt-controller allocator.
///
/// All methods are bounded and non-blocking and may be called inside a
/// critical section.
pub trait InterruptController {
    /// Allocate a line used exclusively by `source`.
    fn allocate(
        &self,
        source: InterruptSource,
        flags: InterruptFlags,
    ) -> Result<InterruptHandle, InterruptError>;

    /// Allocate (or join) a line shared with other sources; the dispatcher
    /// only runs when `status` has a pending bit.
    fn allocate_shared(
        &self,
        source: InterruptSource,
        flags: InterruptFlags,
        status: StatusMask,
    ) -> Result<InterruptHandle, InterruptError>;

    /// Release a line obtained from either allocation method.
    ///
    /// On error the line stays allocated and `handle` remains valid.
    fn free(&self, handle: &InterruptHandle) -> Result<(), InterruptError>;

    /// Ask the scheduler to switch context when the current ISR returns.
    fn yield_from_isr(&self);
}

impl<T: InterruptController + ?Sized> InterruptController for &T {
    fn allocate(
        &self,
        source: InterruptSource,
        flags: InterruptFlags,
    ) -> Result<InterruptHandle, InterruptError> {
        (**self).allocate(source, flags)
    }

    fn allocate_shared(
        &self,
        source: InterruptSource,
        flags: InterruptFlags,
        status: StatusMask,
    ) -> Result<InterruptHandle, InterruptError> {
        (**self).allocate_shared(source, flags, status)
    }

    fn free(&self, handle: &InterruptHandle) -> Result<(), InterruptError> {
        (**self).free(handle)
    }

    fn yield_from_isr(&self) {
        (**self).yield_from_isr();
    }
}
