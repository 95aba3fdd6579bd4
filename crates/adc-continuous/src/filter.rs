//! Hardware IIR filter management.
//!
//! A filter smooths one unit/channel pair before its samples reach DMA.
//! Filters are claimed from the chip's fixed pool (see [`crate::claim`]);
//! every operation here requires the context in `Init`.

use platform::{AdcDigi, InterruptController, PmLock};

use crate::backend::DmaBackend;
use crate::claim::SlotId;
use crate::config::FilterConfig;
use crate::context::{AdcContinuous, AdcState};
use crate::error::{AdcError, Result};

/// Handle to a claimed IIR filter.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterHandle {
    id: SlotId,
}

impl FilterHandle {
    /// Hardware filter index.
    pub fn id(&self) -> usize {
        self.id.index
    }
}

pub(crate) struct FilterSlot {
    config: FilterConfig,
    enabled: bool,
}

impl<'a, H, B, I, L> AdcContinuous<'a, H, B, I, L>
where
    H: AdcDigi,
    B: DmaBackend,
    I: InterruptController,
    L: PmLock,
{
    /// Claim a hardware IIR filter for `config.unit`/`config.channel`. The
    /// filter stays disabled until [`enable_iir_filter`](Self::enable_iir_filter).
    ///
    /// # Errors
    ///
    /// - [`AdcError::InvalidState`]: context not `Init`.
    /// - [`AdcError::NotSupported`]: the chip has no IIR filters.
    /// - [`AdcError::InvalidArgument`]: unit or channel out of range.
    /// - [`AdcError::NotFound`]: no filter slot available.
    pub fn new_iir_filter(&self, config: &FilterConfig) -> Result<FilterHandle> {
        critical_section::with(|cs| self.require_state(cs, AdcState::Init))?;
        if self.filters.capacity() == 0 {
            return Err(AdcError::NotSupported);
        }
        config.validate(self.caps)?;
        let id = self
            .filters
            .claim(config.unit, |_| FilterSlot {
                config: *config,
                enabled: false,
            })
            .map_err(|e| {
                #[cfg(feature = "defmt")]
                defmt::warn!("adc: no free IIR filter for {}", config.unit);
                e
            })?;

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: IIR filter {=usize} claimed", id.index);
        Ok(FilterHandle { id })
    }

    /// Reset the filter, program its coefficient and set its enable bit.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`] unless `Init`; [`AdcError::NotFound`] for a
    /// deleted handle.
    pub fn enable_iir_filter(&self, handle: &FilterHandle) -> Result<()> {
        self.program_filter(handle, true)
    }

    /// Reset the filter, program its coefficient and clear its enable bit.
    ///
    /// # Errors
    ///
    /// As [`enable_iir_filter`](Self::enable_iir_filter).
    pub fn disable_iir_filter(&self, handle: &FilterHandle) -> Result<()> {
        self.program_filter(handle, false)
    }

    fn program_filter(&self, handle: &FilterHandle, enabled: bool) -> Result<()> {
        critical_section::with(|cs| {
            self.require_state(cs, AdcState::Init)?;
            self.filters.with_slot(cs, &handle.id, |slot| {
                let index = handle.id.index;
                let FilterConfig { unit, channel, coeff } = slot.config;
                self.digi.filter_reset(index);
                self.digi.filter_configure(index, unit, channel, coeff);
                self.digi.filter_set_enabled(index, enabled);
                slot.enabled = enabled;
                Ok(())
            })
        })
    }

    /// Release the filter, disabling it first if needed.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`] unless `Init`; [`AdcError::NotFound`] if
    /// the handle was already deleted.
    pub fn delete_iir_filter(&self, handle: &FilterHandle) -> Result<()> {
        critical_section::with(|cs| {
            self.require_state(cs, AdcState::Init)?;
            let slot = self.filters.release(cs, &handle.id, |_| Ok(()))?;
            if slot.enabled {
                self.digi.filter_set_enabled(handle.id.index, false);
            }
            Ok::<(), AdcError>(())
        })?;

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: IIR filter {=usize} released", handle.id.index);
        Ok(())
    }

    /// Number of filters currently claimed.
    pub fn claimed_filters(&self) -> usize {
        self.filters.claimed_count()
    }

    /// Configuration of a live filter.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`] for a deleted handle.
    pub fn filter_config(&self, handle: &FilterHandle) -> Result<FilterConfig> {
        critical_section::with(|cs| self.filters.with_slot(cs, &handle.id, |slot| Ok(slot.config)))
    }

    /// `true` if the filter's enable bit is set.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`] for a deleted handle.
    pub fn is_filter_enabled(&self, handle: &FilterHandle) -> Result<bool> {
        critical_section::with(|cs| self.filters.with_slot(cs, &handle.id, |slot| Ok(slot.enabled)))
    }
}
