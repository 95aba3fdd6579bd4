//! Per-chip capability descriptors for the ADC digital controller.
//!
//! Every behaviour of the acquisition engine that differs between chips is
//! resolved from one [`AdcCapabilities`] record at context construction:
//! which DMA transport carries samples, how many IIR filter and threshold
//! monitor slots exist, whether those slots are bound to an ADC unit, and
//! whether ISR callbacks must live in internal RAM.
//!
//! The board-support layer picks one of the presets below (or defines its
//! own) and returns it from [`AdcDigi::capabilities`].
//!
//! [`AdcDigi::capabilities`]: crate::AdcDigi::capabilities

/// Upper bound on IIR filter slots across every supported chip.
///
/// Slot tables are sized by this constant; the per-chip
/// [`AdcCapabilities::filter_count`] may be smaller.
pub const MAX_FILTER_SLOTS: usize = 2;

/// Upper bound on threshold monitor slots across every supported chip.
pub const MAX_MONITOR_SLOTS: usize = 2;

/// Upper bound on pattern-table entries across every supported chip.
pub const MAX_PATTERNS: usize = 32;

/// Which DMA engine moves completed sample frames into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaTransport {
    /// General-purpose DMA channel connected to the ADC trigger.
    Gdma,
    /// Secondary SPI host's DMA inlink borrowed by the ADC.
    Spi,
    /// I2S peripheral's DMA inlink in ADC mode.
    I2s,
}

/// How a filter or monitor slot index is chosen at claim time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotBinding {
    /// The slot index equals the ADC unit number.
    Unit,
    /// Any free slot may serve any unit.
    FreePool,
}

/// Static description of one chip's ADC digital controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcCapabilities {
    /// Short chip identifier, e.g. `"esp32s3"`.
    pub chip: &'static str,
    /// Number of ADC units the digital controller can drive.
    pub unit_count: u8,
    /// Channels per unit (the larger unit's count).
    pub channels_per_unit: u8,
    /// Maximum pattern-table entries.
    pub max_patterns: usize,
    /// Bytes produced by one conversion in the DMA stream.
    pub bytes_per_conv: usize,
    /// Lowest supported sample frequency (Hz).
    pub sample_freq_min_hz: u32,
    /// Highest supported sample frequency (Hz).
    pub sample_freq_max_hz: u32,
    /// `true` when the 16-bit Type1 output format is available.
    pub supports_type1: bool,
    /// `true` when the 32-bit Type2 output format is available.
    pub supports_type2: bool,
    /// DMA transport linked on this chip.
    pub dma_transport: DmaTransport,
    /// Number of hardware IIR filters.
    pub filter_count: usize,
    /// Filter claim policy.
    pub filter_binding: SlotBinding,
    /// Number of hardware threshold monitors.
    pub monitor_count: usize,
    /// Monitor claim policy.
    pub monitor_binding: SlotBinding,
    /// Monitors accept only one of high/low threshold at a time.
    pub monitor_single_threshold: bool,
    /// The monitor interrupt line is shared with another peripheral and must
    /// be registered with a status mask.
    pub monitor_intr_shared: bool,
    /// ISR callbacks (and the state they capture) must reside in internal RAM.
    pub isr_callbacks_in_iram: bool,
}

/// ESP32: I2S-based transport, no filters or monitors in continuous mode.
pub const ESP32: AdcCapabilities = AdcCapabilities {
    chip: "esp32",
    unit_count: 2,
    channels_per_unit: 10,
    max_patterns: 16,
    bytes_per_conv: 2,
    sample_freq_min_hz: 611,
    sample_freq_max_hz: 2_000_000,
    supports_type1: true,
    supports_type2: false,
    dma_transport: DmaTransport::I2s,
    filter_count: 0,
    filter_binding: SlotBinding::FreePool,
    monitor_count: 0,
    monitor_binding: SlotBinding::FreePool,
    monitor_single_threshold: false,
    monitor_intr_shared: false,
    isr_callbacks_in_iram: false,
};

/// ESP32-S2: SPI3-based transport, filters and monitors bound to ADC units,
/// single-threshold monitors.
pub const ESP32S2: AdcCapabilities = AdcCapabilities {
    chip: "esp32s2",
    unit_count: 2,
    channels_per_unit: 10,
    max_patterns: 32,
    bytes_per_conv: 2,
    sample_freq_min_hz: 611,
    sample_freq_max_hz: 83_333,
    supports_type1: true,
    supports_type2: false,
    dma_transport: DmaTransport::Spi,
    filter_count: 2,
    filter_binding: SlotBinding::Unit,
    monitor_count: 2,
    monitor_binding: SlotBinding::Unit,
    monitor_single_threshold: true,
    monitor_intr_shared: false,
    isr_callbacks_in_iram: true,
};

/// ESP32-C3: GDMA transport, free-pool filters and monitors, monitor
/// interrupt shared with the SAR ADC status line.
pub const ESP32C3: AdcCapabilities = AdcCapabilities {
    chip: "esp32c3",
    unit_count: 2,
    channels_per_unit: 5,
    max_patterns: 8,
    bytes_per_conv: 4,
    sample_freq_min_hz: 611,
    sample_freq_max_hz: 83_333,
    supports_type1: false,
    supports_type2: true,
    dma_transport: DmaTransport::Gdma,
    filter_count: 2,
    filter_binding: SlotBinding::FreePool,
    monitor_count: 2,
    monitor_binding: SlotBinding::FreePool,
    monitor_single_threshold: false,
    monitor_intr_shared: true,
    isr_callbacks_in_iram: false,
};

/// ESP32-S3: GDMA transport, free-pool filters and monitors.
pub const ESP32S3: AdcCapabilities = AdcCapabilities {
    chip: "esp32s3",
    unit_count: 2,
    channels_per_unit: 10,
    max_patterns: 24,
    bytes_per_conv: 4,
    sample_freq_min_hz: 611,
    sample_freq_max_hz: 83_333,
    supports_type1: false,
    supports_type2: true,
    dma_transport: DmaTransport::Gdma,
    filter_count: 2,
    filter_binding: SlotBinding::FreePool,
    monitor_count: 2,
    monitor_binding: SlotBinding::FreePool,
    monitor_single_threshold: false,
    monitor_intr_shared: false,
    isr_callbacks_in_iram: false,
};

impl AdcCapabilities {
    /// `true` if `unit` is driven by this controller.
    pub fn has_unit(&self, unit: crate::AdcUnit) -> bool {
        unit.index() < usize::from(self.unit_count)
    }

    /// `true` if `channel` exists on every unit of this controller.
    pub fn has_channel(&self, channel: crate::AdcChannel) -> bool {
        channel.get() < self.channels_per_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_fit_slot_tables() {
        for caps in [ESP32, ESP32S2, ESP32C3, ESP32S3] {
            assert!(caps.filter_count <= MAX_FILTER_SLOTS, "{}", caps.chip);
            assert!(caps.monitor_count <= MAX_MONITOR_SLOTS, "{}", caps.chip);
            assert!(caps.max_patterns <= MAX_PATTERNS, "{}", caps.chip);
        }
    }

    #[test]
    fn unit_bound_presets_have_a_slot_per_unit() {
        for caps in [ESP32, ESP32S2, ESP32C3, ESP32S3] {
            if caps.filter_binding == SlotBinding::Unit {
                assert!(caps.filter_count >= usize::from(caps.unit_count));
            }
            if caps.monitor_binding == SlotBinding::Unit {
                assert!(caps.monitor_count >= usize::from(caps.unit_count));
            }
        }
    }

    #[test]
    fn every_preset_supports_some_output_format() {
        for caps in [ESP32, ESP32S2, ESP32C3, ESP32S3] {
            assert!(caps.supports_type1 || caps.supports_type2);
        }
    }

    #[test]
    fn output_format_width_matches_conversion_width() {
        for caps in [ESP32, ESP32S2, ESP32C3, ESP32S3] {
            if caps.supports_type1 {
                assert_eq!(crate::OutputFormat::Type1.entry_bytes(), caps.bytes_per_conv, "{}", caps.chip);
            }
            if caps.supports_type2 {
                assert_eq!(crate::OutputFormat::Type2.entry_bytes(), caps.bytes_per_conv, "{}", caps.chip);
            }
        }
    }
}
