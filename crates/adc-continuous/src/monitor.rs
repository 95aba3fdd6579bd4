//! Threshold monitors and their shared interrupt.
//!
//! A monitor compares every sample of one unit/channel pair against a high
//! and/or low bound and raises a status bit when it is crossed. All monitors
//! share one interrupt line, allocated when the first monitor is claimed and
//! freed when the last one is deleted.
//!
//! [`enable_monitor`](AdcContinuous::enable_monitor),
//! [`disable_monitor`](AdcContinuous::disable_monitor) and
//! [`on_monitor_interrupt`](AdcContinuous::on_monitor_interrupt) may run in
//! interrupt context: they never log and never block.

use platform::{AdcDigi, InterruptController, InterruptFlags, MonitorStatus, PmLock};

use crate::backend::DmaBackend;
use crate::callback::{check_placement, MonitorCallbacks, MonitorEvent, MonitorEventKind};
use crate::claim::SlotId;
use crate::config::MonitorConfig;
use crate::context::{AdcContinuous, AdcState};
use crate::error::{AdcError, Result};

/// Handle to a claimed threshold monitor.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorHandle {
    id: SlotId,
}

impl MonitorHandle {
    /// Hardware monitor index.
    pub fn id(&self) -> usize {
        self.id.index
    }
}

/// Per-monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonitorState {
    /// Claimed, comparator stopped.
    Init,
    /// Comparator running.
    Enabled,
}

pub(crate) struct MonitorSlot<'a> {
    index: usize,
    config: MonitorConfig,
    state: MonitorState,
    callbacks: MonitorCallbacks<'a>,
}

impl<'a, H, B, I, L> AdcContinuous<'a, H, B, I, L>
where
    H: AdcDigi,
    B: DmaBackend,
    I: InterruptController,
    L: PmLock,
{
    /// Claim a threshold monitor and program its bounds. The monitor starts
    /// in [`MonitorState::Init`] with its comparator stopped.
    ///
    /// The first monitor claimed also allocates the shared monitor
    /// interrupt.
    ///
    /// # Errors
    ///
    /// - [`AdcError::InvalidState`]: context not `Init`.
    /// - [`AdcError::NotSupported`]: the chip has no monitors, or both
    ///   thresholds were given on a single-threshold chip.
    /// - [`AdcError::InvalidArgument`]: see [`MonitorConfig::validate`].
    /// - [`AdcError::NotFound`]: no monitor slot or interrupt line free.
    pub fn new_monitor(&self, config: &MonitorConfig) -> Result<MonitorHandle> {
        critical_section::with(|cs| self.require_state(cs, AdcState::Init))?;
        if self.monitors.capacity() == 0 {
            return Err(AdcError::NotSupported);
        }
        if let Err(e) = config.validate(self.caps) {
            #[cfg(feature = "defmt")]
            defmt::warn!("adc: rejected monitor config: {}", e);
            return Err(e);
        }

        let id = self.monitors.claim(config.unit, |index| MonitorSlot {
            index,
            config: *config,
            state: MonitorState::Init,
            callbacks: MonitorCallbacks::default(),
        })?;

        if let Err(e) = self.ensure_monitor_interrupt() {
            let _ = critical_section::with(|cs| self.monitors.release(cs, &id, |_| Ok(())));
            #[cfg(feature = "defmt")]
            defmt::warn!("adc: monitor interrupt unavailable: {}", e);
            return Err(e);
        }

        self.digi.monitor_configure(
            id.index,
            config.unit,
            config.channel,
            config.high_threshold,
            config.low_threshold,
        );

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: monitor {=usize} claimed", id.index);
        Ok(MonitorHandle { id })
    }

    fn ensure_monitor_interrupt(&self) -> Result<()> {
        critical_section::with(|cs| {
            let mut platform = self.monitor_platform.borrow_ref_mut(cs);
            if platform.intr.is_some() {
                return Ok(());
            }
            let source = self.digi.monitor_interrupt_source();
            let flags = InterruptFlags::LEVEL1.with_iram(self.caps.isr_callbacks_in_iram);
            let handle = if self.caps.monitor_intr_shared {
                self.intc
                    .allocate_shared(source, flags, self.digi.monitor_status_mask())?
            } else {
                self.intc.allocate(source, flags)?
            };
            platform.intr = Some(handle);
            Ok(())
        })
    }

    /// Install the threshold callbacks of a monitor and unmask the matching
    /// interrupt bits.
    ///
    /// # Errors
    ///
    /// - [`AdcError::NotSupported`]: both callbacks on a single-threshold
    ///   chip.
    /// - [`AdcError::InvalidArgument`]: a callback is not in internal RAM on
    ///   a chip that requires it.
    /// - [`AdcError::InvalidState`]: the monitor is enabled.
    /// - [`AdcError::NotFound`]: deleted handle.
    pub fn register_monitor_callbacks(
        &self,
        handle: &MonitorHandle,
        callbacks: MonitorCallbacks<'a>,
    ) -> Result<()> {
        if self.caps.monitor_single_threshold
            && callbacks.on_over_high.is_some()
            && callbacks.on_below_low.is_some()
        {
            return Err(AdcError::NotSupported);
        }
        check_placement(self.caps, callbacks.on_over_high.as_ref())?;
        check_placement(self.caps, callbacks.on_below_low.as_ref())?;

        critical_section::with(|cs| {
            self.monitors.with_slot(cs, &handle.id, |slot| {
                if slot.state != MonitorState::Init {
                    return Err(AdcError::InvalidState);
                }
                self.digi.monitor_set_intr_enabled(
                    slot.index,
                    callbacks.on_over_high.is_some(),
                    callbacks.on_below_low.is_some(),
                );
                slot.callbacks = callbacks;
                Ok(())
            })
        })
    }

    /// Start the comparator. Callable from interrupt context.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`] unless the monitor is in
    /// [`MonitorState::Init`]; [`AdcError::NotFound`] for a deleted handle.
    pub fn enable_monitor(&self, handle: &MonitorHandle) -> Result<()> {
        self.switch_monitor(handle, MonitorState::Init, MonitorState::Enabled)
    }

    /// Stop the comparator. Callable from interrupt context.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`] unless the monitor is
    /// [`MonitorState::Enabled`]; [`AdcError::NotFound`] for a deleted
    /// handle.
    pub fn disable_monitor(&self, handle: &MonitorHandle) -> Result<()> {
        self.switch_monitor(handle, MonitorState::Enabled, MonitorState::Init)
    }

    fn switch_monitor(&self, handle: &MonitorHandle, from: MonitorState, to: MonitorState) -> Result<()> {
        critical_section::with(|cs| {
            self.monitors.with_slot(cs, &handle.id, |slot| {
                if slot.state != from {
                    return Err(AdcError::InvalidState);
                }
                self.digi
                    .monitor_set_enabled(slot.index, to == MonitorState::Enabled);
                slot.state = to;
                Ok(())
            })
        })
    }

    /// Release a stopped monitor. Deleting the last monitor frees the
    /// shared interrupt.
    ///
    /// # Errors
    ///
    /// - [`AdcError::InvalidState`]: context not `Init`, or the monitor is
    ///   still enabled.
    /// - [`AdcError::NotFound`]: the handle was already deleted.
    /// - Interrupt release errors when freeing the line fails. The monitor
    ///   is released regardless and the line stays allocated for the next
    ///   monitor.
    pub fn delete_monitor(&self, handle: &MonitorHandle) -> Result<()> {
        let intr = critical_section::with(|cs| {
            self.require_state(cs, AdcState::Init)?;
            let slot = self.monitors.release(cs, &handle.id, |slot| {
                if slot.state == MonitorState::Init {
                    Ok(())
                } else {
                    Err(AdcError::InvalidState)
                }
            })?;
            self.digi.monitor_set_intr_enabled(slot.index, false, false);

            let mut platform = self.monitor_platform.borrow_ref_mut(cs);
            Ok::<_, AdcError>(if self.monitors.claimed_count() == 0 {
                platform.intr.take()
            } else {
                None
            })
        })?;

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: monitor {=usize} released", handle.id.index);

        if let Some(intr) = intr {
            if let Err(e) = self.intc.free(&intr) {
                critical_section::with(|cs| {
                    self.monitor_platform.borrow_ref_mut(cs).intr.get_or_insert(intr);
                });
                return Err(e.into());
            }
            #[cfg(feature = "defmt")]
            defmt::debug!("adc: monitor interrupt freed");
        }
        Ok(())
    }

    /// Current state of a monitor.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`] for a deleted handle.
    pub fn monitor_state(&self, handle: &MonitorHandle) -> Result<MonitorState> {
        critical_section::with(|cs| self.monitors.with_slot(cs, &handle.id, |slot| Ok(slot.state)))
    }

    /// Configuration of a live monitor.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`] for a deleted handle.
    pub fn monitor_config(&self, handle: &MonitorHandle) -> Result<MonitorConfig> {
        critical_section::with(|cs| self.monitors.with_slot(cs, &handle.id, |slot| Ok(slot.config)))
    }

    /// Number of monitors currently claimed.
    pub fn claimed_monitors(&self) -> usize {
        self.monitors.claimed_count()
    }

    /// `true` while the shared monitor interrupt is allocated.
    pub fn monitor_interrupt_allocated(&self) -> bool {
        critical_section::with(|cs| self.monitor_platform.borrow_ref(cs).intr.is_some())
    }

    /// Monitor interrupt handler; route the shared monitor line here.
    ///
    /// Reads and clears the status register once, then runs the callback
    /// of every crossed threshold that has one. Callbacks run outside the
    /// slot table, so they may enable or disable monitors. Returns `true`
    /// (after asking the interrupt controller for a yield) if any callback
    /// requested one.
    pub fn on_monitor_interrupt(&self) -> bool {
        let status = self.digi.monitor_status();
        self.digi.monitor_clear_status(status);
        if status.is_empty() {
            return false;
        }

        let mut need_yield = false;
        for index in 0..self.monitors.capacity() {
            let callbacks = critical_section::with(|cs| {
                self.monitors
                    .peek(cs, index, |slot| (slot.index == index).then_some(slot.callbacks))
                    .flatten()
            });
            let Some(callbacks) = callbacks else {
                continue;
            };
            need_yield |= dispatch(status, index, &callbacks);
        }

        if need_yield {
            self.intc.yield_from_isr();
        }
        need_yield
    }
}

fn dispatch(status: MonitorStatus, index: usize, callbacks: &MonitorCallbacks<'_>) -> bool {
    let mut need_yield = false;
    if let (true, Some(cb)) = (status.over_high(index), callbacks.on_over_high) {
        need_yield |= (cb.func())(&MonitorEvent {
            monitor_id: index,
            kind: MonitorEventKind::OverHigh,
        });
    }
    if let (true, Some(cb)) = (status.below_low(index), callbacks.on_below_low) {
        need_yield |= (cb.func())(&MonitorEvent {
            monitor_id: index,
            kind: MonitorEventKind::BelowLow,
        });
    }
    need_yield
}
