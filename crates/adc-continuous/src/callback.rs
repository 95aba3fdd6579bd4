//! ISR callback types.
//!
//! Callbacks are borrowed trait objects. Whatever the caller wants the
//! callback to see (the "user data") is captured by the closure, and the
//! boolean it returns asks for a scheduler yield when the ISR exits.
//!
//! Every callback carries a [`Placement`] tag. On chips whose ISRs stay
//! enabled while flash cache is off, registration rejects callbacks not
//! tagged [`Placement::InternalRam`]; the dispatchers never look at the tag.

use platform::{AdcCapabilities, Placement};

use crate::error::{AdcError, Result};

/// A callback plus the memory it has been placed in.
pub struct IsrCallback<'a, F: ?Sized> {
    func: &'a F,
    placement: Placement,
}

impl<'a, F: ?Sized> IsrCallback<'a, F> {
    /// Wrap `func`, declaring where it (and its captures) live.
    pub const fn new(func: &'a F, placement: Placement) -> Self {
        Self { func, placement }
    }

    /// Wrap a callback linked into internal RAM.
    pub const fn in_iram(func: &'a F) -> Self {
        Self::new(func, Placement::InternalRam)
    }

    /// Wrap a callback left in flash.
    pub const fn in_flash(func: &'a F) -> Self {
        Self::new(func, Placement::Flash)
    }

    /// Declared placement.
    pub const fn placement(&self) -> Placement {
        self.placement
    }

    /// The wrapped callback.
    pub const fn func(&self) -> &'a F {
        self.func
    }
}

impl<F: ?Sized> Clone for IsrCallback<'_, F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: ?Sized> Copy for IsrCallback<'_, F> {}

/// Reject callbacks that cannot run with flash cache disabled on chips that
/// require it.
pub(crate) fn check_placement<F: ?Sized>(
    caps: &AdcCapabilities,
    cb: Option<&IsrCallback<'_, F>>,
) -> Result<()> {
    match cb {
        Some(cb) if caps.isr_callbacks_in_iram && !cb.placement().is_isr_safe() => {
            Err(AdcError::InvalidArgument)
        }
        _ => Ok(()),
    }
}

// ── Monitor callbacks ───────────────────────────────────────────────────────

/// Which threshold a monitor crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorEventKind {
    /// A sample exceeded the high threshold.
    OverHigh,
    /// A sample fell below the low threshold.
    BelowLow,
}

/// Event passed to a monitor callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorEvent {
    /// Slot index of the monitor that fired.
    pub monitor_id: usize,
    /// Threshold that was crossed.
    pub kind: MonitorEventKind,
}

/// Monitor callback: returns `true` to request a yield.
pub type MonitorFn<'a> = dyn Fn(&MonitorEvent) -> bool + Sync + 'a;

/// Callback pair registered on one monitor.
#[derive(Clone, Copy, Default)]
pub struct MonitorCallbacks<'a> {
    /// Runs when the high threshold is exceeded.
    pub on_over_high: Option<IsrCallback<'a, MonitorFn<'a>>>,
    /// Runs when the low threshold is undershot.
    pub on_below_low: Option<IsrCallback<'a, MonitorFn<'a>>>,
}

// ── Stream callbacks ────────────────────────────────────────────────────────

/// Event passed to the stream callbacks: the conversion frame just
/// completed by DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvFrameEvent<'f> {
    /// Raw conversion results, see [`crate::frame`].
    pub data: &'f [u8],
}

/// Stream callback: returns `true` to request a yield.
pub type ConvFrameFn<'a> = dyn for<'f> Fn(&ConvFrameEvent<'f>) -> bool + Sync + 'a;

/// Callbacks run by the streaming interrupt handler.
#[derive(Clone, Copy, Default)]
pub struct EventCallbacks<'a> {
    /// A conversion frame is complete.
    pub on_conv_done: Option<IsrCallback<'a, ConvFrameFn<'a>>>,
    /// A completed frame did not fit in the ring buffer and was dropped.
    pub on_pool_ovf: Option<IsrCallback<'a, ConvFrameFn<'a>>>,
}
