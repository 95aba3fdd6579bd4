//! Typed configuration, validated at the API boundary.
//!
//! Each config struct has a `validate` method that checks it against the
//! chip's [`AdcCapabilities`] before the engine touches any state or
//! hardware.

use platform::soc::MAX_PATTERNS;
use platform::{
    AdcCapabilities, AdcChannel, AdcPattern, AdcUnit, Attenuation, ConvMode, IirCoefficient,
    OutputFormat, DMA_DESCRIPTOR_MAX_LEN,
};

use crate::error::{AdcError, Result};

/// Number of conversion frames (and descriptors) in the DMA ring.
pub const INTERNAL_BUF_NUM: usize = 5;

/// Driver-wide options fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HandleConfig {
    /// Bytes per conversion frame; one DMA EOF per frame.
    pub conv_frame_size: usize,
    /// On ring-buffer overflow, evict the oldest bytes instead of dropping
    /// the new frame.
    pub flush_pool: bool,
}

impl HandleConfig {
    /// Check the frame size against the chip.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidArgument`] if `conv_frame_size` is zero, not a
    /// multiple of the conversion width, or larger than one DMA descriptor.
    pub fn validate(&self, caps: &AdcCapabilities) -> Result<()> {
        let size = self.conv_frame_size;
        let aligned = size.checked_rem(caps.bytes_per_conv) == Some(0);
        if size == 0 || !aligned || size > DMA_DESCRIPTOR_MAX_LEN {
            return Err(AdcError::InvalidArgument);
        }
        Ok(())
    }
}

/// Digital controller configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdcContinuousConfig {
    /// Conversion pattern table, converted in order.
    pub patterns: heapless::Vec<AdcPattern, MAX_PATTERNS>,
    /// Conversions per second.
    pub sample_freq_hz: u32,
    /// Which units convert.
    pub conv_mode: ConvMode,
    /// Result layout in the DMA stream.
    pub format: OutputFormat,
}

/// Per-unit view of a validated [`AdcContinuousConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DigiConfig {
    pub config: AdcContinuousConfig,
    pub unit_active: [bool; 2],
    pub unit_atten: [Attenuation; 2],
}

impl AdcContinuousConfig {
    /// Check every pattern, the frequency and the format against the chip.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidArgument`] on an empty or oversized pattern table,
    /// an out-of-range frequency, unit or channel, a unit the conversion
    /// mode does not drive, or an output format the chip lacks.
    pub fn validate(&self, caps: &AdcCapabilities) -> Result<()> {
        if self.patterns.is_empty() || self.patterns.len() > caps.max_patterns {
            return Err(AdcError::InvalidArgument);
        }
        if !(caps.sample_freq_min_hz..=caps.sample_freq_max_hz).contains(&self.sample_freq_hz) {
            return Err(AdcError::InvalidArgument);
        }
        let format_ok = match self.format {
            OutputFormat::Type1 => {
                caps.supports_type1
                    && matches!(self.conv_mode, ConvMode::SingleUnit1 | ConvMode::SingleUnit2)
            }
            OutputFormat::Type2 => caps.supports_type2,
        };
        if !format_ok {
            return Err(AdcError::InvalidArgument);
        }
        for p in &self.patterns {
            if !caps.has_unit(p.unit) || !caps.has_channel(p.channel) || !self.conv_mode.allows(p.unit) {
                return Err(AdcError::InvalidArgument);
            }
        }
        Ok(())
    }

    pub(crate) fn resolve(&self, caps: &AdcCapabilities) -> Result<DigiConfig> {
        self.validate(caps)?;
        let mut unit_active = [false; 2];
        let mut unit_atten = [Attenuation::default(); 2];
        for p in &self.patterns {
            let i = p.unit.index();
            if let (Some(active), Some(atten)) = (unit_active.get_mut(i), unit_atten.get_mut(i)) {
                *active = true;
                *atten = p.atten;
            }
        }
        Ok(DigiConfig {
            config: self.clone(),
            unit_active,
            unit_atten,
        })
    }
}

/// IIR filter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterConfig {
    /// Unit whose samples are filtered.
    pub unit: AdcUnit,
    /// Channel whose samples are filtered.
    pub channel: AdcChannel,
    /// Smoothing coefficient.
    pub coeff: IirCoefficient,
}

impl FilterConfig {
    /// # Errors
    ///
    /// [`AdcError::InvalidArgument`] for a unit or channel the chip lacks.
    pub fn validate(&self, caps: &AdcCapabilities) -> Result<()> {
        if !caps.has_unit(self.unit) || !caps.has_channel(self.channel) {
            return Err(AdcError::InvalidArgument);
        }
        Ok(())
    }
}

/// Threshold monitor configuration.
///
/// `None` leaves a threshold unset; `Some(0)` is a real threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorConfig {
    /// Unit to watch.
    pub unit: AdcUnit,
    /// Channel to watch.
    pub channel: AdcChannel,
    /// Raise an event when a sample exceeds this value.
    pub high_threshold: Option<i32>,
    /// Raise an event when a sample falls below this value.
    pub low_threshold: Option<i32>,
}

impl MonitorConfig {
    /// # Errors
    ///
    /// - [`AdcError::InvalidArgument`] for a unit or channel the chip lacks,
    ///   no threshold at all, a negative threshold, or `low >= high`.
    /// - [`AdcError::NotSupported`] for both thresholds on a chip whose
    ///   monitors take only one.
    pub fn validate(&self, caps: &AdcCapabilities) -> Result<()> {
        if !caps.has_unit(self.unit) || !caps.has_channel(self.channel) {
            return Err(AdcError::InvalidArgument);
        }
        match (self.high_threshold, self.low_threshold) {
            (None, None) => Err(AdcError::InvalidArgument),
            (Some(h), Some(l)) if h < 0 || l < 0 || l >= h => Err(AdcError::InvalidArgument),
            (Some(_), Some(_)) if caps.monitor_single_threshold => Err(AdcError::NotSupported),
            (Some(t), None) | (None, Some(t)) if t < 0 => Err(AdcError::InvalidArgument),
            _ => Ok(()),
        }
    }
}
