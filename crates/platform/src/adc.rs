//! ADC digital controller abstraction
//!
//! [`AdcDigi`] is the register facade for the part of the SAR ADC that runs
//! without CPU involvement: the conversion pattern table, the hardware IIR
//! filters and the threshold monitors. Every method is a bounded register
//! access, callable from task or interrupt context, so the trait takes
//! `&self` and implementations use volatile register writes (hardware) or
//! interior mutability (mocks).

use crate::interrupt::{InterruptSource, StatusMask};
use crate::soc::AdcCapabilities;

// ── Unit / channel newtypes ─────────────────────────────────────────────────

/// One of the SAR ADC units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcUnit {
    /// SAR ADC 1
    Unit1,
    /// SAR ADC 2
    Unit2,
}

impl AdcUnit {
    /// Zero-based unit number, as used for unit-bound slot indices.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Unit1 => 0,
            Self::Unit2 => 1,
        }
    }

    /// Inverse of [`index`](Self::index).
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Unit1),
            1 => Some(Self::Unit2),
            _ => None,
        }
    }
}

/// ADC channel number within a unit.
///
/// The range check against the chip's channel count happens at the API
/// boundary (see [`AdcCapabilities::has_channel`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct AdcChannel(u8);

impl AdcChannel {
    /// Wrap a raw channel number.
    #[must_use]
    pub const fn new(channel: u8) -> Self {
        Self(channel)
    }

    /// Return the raw channel number.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Input attenuation applied before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attenuation {
    /// 0 dB, ~0–950 mV full scale
    #[default]
    Db0,
    /// 2.5 dB, ~0–1250 mV full scale
    Db2_5,
    /// 6 dB, ~0–1750 mV full scale
    Db6,
    /// 12 dB, ~0–3100 mV full scale
    Db12,
}

/// Hardware IIR filter smoothing coefficient.
///
/// The filter computes `out = ((k - 1) * prev + in) / k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IirCoefficient {
    /// k = 2
    Coeff2,
    /// k = 4
    Coeff4,
    /// k = 8
    Coeff8,
    /// k = 16
    Coeff16,
    /// k = 64
    Coeff64,
}

impl IirCoefficient {
    /// The divisor `k`.
    #[must_use]
    pub const fn factor(self) -> u8 {
        match self {
            Self::Coeff2 => 2,
            Self::Coeff4 => 4,
            Self::Coeff8 => 8,
            Self::Coeff16 => 16,
            Self::Coeff64 => 64,
        }
    }
}

/// Which units the digital controller converts, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConvMode {
    /// Only ADC1.
    SingleUnit1,
    /// Only ADC2.
    SingleUnit2,
    /// ADC1 and ADC2 simultaneously.
    BothUnit,
    /// ADC1 and ADC2 alternately.
    AlterUnit,
}

impl ConvMode {
    /// `true` if patterns for `unit` are legal in this mode.
    #[must_use]
    pub const fn allows(self, unit: AdcUnit) -> bool {
        match self {
            Self::SingleUnit1 => matches!(unit, AdcUnit::Unit1),
            Self::SingleUnit2 => matches!(unit, AdcUnit::Unit2),
            Self::BothUnit | Self::AlterUnit => true,
        }
    }
}

/// Layout of one conversion result in the DMA stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputFormat {
    /// 16-bit entries: 12-bit data, 4-bit channel. Single-unit modes only.
    Type1,
    /// 32-bit entries: data, channel and unit.
    Type2,
}

impl OutputFormat {
    /// Size of one entry in bytes.
    #[must_use]
    pub const fn entry_bytes(self) -> usize {
        match self {
            Self::Type1 => 2,
            Self::Type2 => 4,
        }
    }
}

/// One entry of the conversion pattern table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcPattern {
    /// Unit to convert on.
    pub unit: AdcUnit,
    /// Channel to convert.
    pub channel: AdcChannel,
    /// Attenuation for this channel.
    pub atten: Attenuation,
    /// Conversion resolution in bits (9–13 depending on chip).
    pub bit_width: u8,
}

// ── Monitor status ──────────────────────────────────────────────────────────

/// Snapshot of the threshold monitor interrupt status register.
///
/// Bit `2 * n` reports a high-threshold crossing on monitor `n`, bit
/// `2 * n + 1` a low-threshold crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct MonitorStatus(u32);

impl MonitorStatus {
    /// No pending events.
    pub const NONE: Self = Self(0);

    /// Wrap a raw status word.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Return the raw status word.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Status bit for a high-threshold crossing on `monitor`.
    #[must_use]
    pub fn high_bit(monitor: usize) -> u32 {
        Self::bit(monitor, 0)
    }

    /// Status bit for a low-threshold crossing on `monitor`.
    #[must_use]
    pub fn low_bit(monitor: usize) -> u32 {
        Self::bit(monitor, 1)
    }

    /// `true` if `monitor` saw a value above its high threshold.
    #[must_use]
    pub fn over_high(self, monitor: usize) -> bool {
        self.0 & Self::high_bit(monitor) != 0
    }

    /// `true` if `monitor` saw a value below its low threshold.
    #[must_use]
    pub fn below_low(self, monitor: usize) -> bool {
        self.0 & Self::low_bit(monitor) != 0
    }

    /// `true` when no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    fn bit(monitor: usize, offset: u32) -> u32 {
        u32::try_from(monitor)
            .ok()
            .and_then(|m| m.checked_mul(2))
            .and_then(|m| m.checked_add(offset))
            .and_then(|shift| 1u32.checked_shl(shift))
            .unwrap_or(0)
    }
}

// ── Controller facade ───────────────────────────────────────────────────────

/// ADC digital controller register facade.
///
/// Indices passed to filter and monitor methods are always below the
/// corresponding count in [`capabilities`](AdcDigi::capabilities); callers
/// guarantee this, implementations may ignore out-of-range indices.
pub trait AdcDigi {
    /// Capability record for this chip.
    fn capabilities(&self) -> &'static AdcCapabilities;

    /// Take exclusive ownership of the continuous-mode controller.
    ///
    /// Returns `false` if it is already owned. Board implementations back
    /// the flag with a static, since the controller exists once per chip.
    fn claim_controller(&self) -> bool;

    /// Give the controller back after [`claim_controller`](AdcDigi::claim_controller).
    fn release_controller(&self);

    /// Program the pattern table, sample clock, conversion mode, output
    /// format and the number of bytes after which an EOF is raised.
    fn configure(
        &self,
        patterns: &[AdcPattern],
        sample_freq_hz: u32,
        conv_mode: ConvMode,
        format: OutputFormat,
        eof_bytes: usize,
    );

    /// Connect the controller to DMA and start (or stop) conversions.
    fn set_conversion_enabled(&self, enabled: bool);

    /// Reset filter `index` to its power-on state.
    fn filter_reset(&self, index: usize);

    /// Bind filter `index` to `unit`/`channel` and program its coefficient.
    fn filter_configure(&self, index: usize, unit: AdcUnit, channel: AdcChannel, coeff: IirCoefficient);

    /// Set the enable bit of filter `index`.
    fn filter_set_enabled(&self, index: usize, enabled: bool);

    /// Bind monitor `index` to `unit`/`channel` with optional thresholds.
    fn monitor_configure(
        &self,
        index: usize,
        unit: AdcUnit,
        channel: AdcChannel,
        high: Option<i32>,
        low: Option<i32>,
    );

    /// Set the monitor-start bit of monitor `index`.
    fn monitor_set_enabled(&self, index: usize, enabled: bool);

    /// Unmask (or mask) the high/low interrupt bits of monitor `index`.
    fn monitor_set_intr_enabled(&self, index: usize, high: bool, low: bool);

    /// Read the monitor interrupt status register.
    fn monitor_status(&self) -> MonitorStatus;

    /// Clear the given status bits.
    fn monitor_clear_status(&self, status: MonitorStatus);

    /// Interrupt source raised by the monitors.
    fn monitor_interrupt_source(&self) -> InterruptSource;

    /// Status register + mask identifying monitor events on a shared line.
    fn monitor_status_mask(&self) -> StatusMask;
}

impl<T: AdcDigi + ?Sized> AdcDigi for &T {
    fn capabilities(&self) -> &'static AdcCapabilities {
        (**self).capabilities()
    }

    fn claim_controller(&self) -> bool {
        (**self).claim_controller()
    }

    fn release_controller(&self) {
        (**self).release_controller()
    }

    fn configure(
        &self,
        patterns: &[AdcPattern],
        sample_freq_hz: u32,
        conv_mode: ConvMode,
        format: OutputFormat,
        eof_bytes: usize,
    ) {
        (**self).configure(patterns, sample_freq_hz, conv_mode, format, eof_bytes);
    }

    fn set_conversion_enabled(&self, enabled: bool) {
        (**self).set_conversion_enabled(enabled);
    }

    fn filter_reset(&self, index: usize) {
        (**self).filter_reset(index);
    }

    fn filter_configure(&self, index: usize, unit: AdcUnit, channel: AdcChannel, coeff: IirCoefficient) {
        (**self).filter_configure(index, unit, channel, coeff);
    }

    fn filter_set_enabled(&self, index: usize, enabled: bool) {
        (**self).filter_set_enabled(index, enabled);
    }

    fn monitor_configure(
        &self,
        index: usize,
        unit: AdcUnit,
        channel: AdcChannel,
        high: Option<i32>,
        low: Option<i32>,
    ) {
        (**self).monitor_configure(index, unit, channel, high, low);
    }

    fn monitor_set_enabled(&self, index: usize, enabled: bool) {
        (**self).monitor_set_enabled(index, enabled);
    }

    fn monitor_set_intr_enabled(&self, index: usize, high: bool, low: bool) {
        (**self).monitor_set_intr_enabled(index, high, low);
    }

    fn monitor_status(&self) -> MonitorStatus {
        (**self).monitor_status()
    }

    fn monitor_clear_status(&self, status: MonitorStatus) {
        (**self).monitor_clear_status(status);
    }

    fn monitor_interrupt_source(&self) -> InterruptSource {
        (**self).monitor_interrupt_source()
    }

    fn monitor_status_mask(&self) -> StatusMask {
        (**self).monitor_status_mask()
    }
}
