//! Decoding of conversion frames.
//!
//! Bit layout of one DMA entry (little-endian):
//!
//! | Format | Width  | data     | channel    | unit   |
//! |--------|--------|----------|------------|--------|
//! | Type1  | 16 bit | `0..12`  | `12..16`   | n/a    |
//! | Type2  | 32 bit | `0..13`  | `13..17`   | `17`   |
//!
//! Type1 entries carry no unit; it is the single unit the conversion mode
//! drives, passed in by the caller.

use platform::{AdcCapabilities, AdcChannel, AdcUnit, OutputFormat};

const TYPE1_DATA_MASK: u32 = 0x0FFF;
const TYPE1_CHANNEL_SHIFT: u32 = 12;
const TYPE1_CHANNEL_MASK: u32 = 0xF;

const TYPE2_DATA_MASK: u32 = 0x1FFF;
const TYPE2_CHANNEL_SHIFT: u32 = 13;
const TYPE2_CHANNEL_MASK: u32 = 0xF;
const TYPE2_UNIT_SHIFT: u32 = 17;

/// One decoded conversion result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcSample {
    /// Unit that produced the sample.
    pub unit: AdcUnit,
    /// Channel that was converted.
    pub channel: AdcChannel,
    /// Raw conversion result.
    pub raw: u16,
    /// `false` when the channel or unit field is outside the chip's range
    /// (garbage entry, typically the first one after start).
    pub valid: bool,
}

/// Iterator over the entries of a frame; see [`parse`].
pub struct Samples<'f> {
    entries: core::slice::ChunksExact<'f, u8>,
    format: OutputFormat,
    type1_unit: AdcUnit,
    caps: &'f AdcCapabilities,
}

impl Iterator for Samples<'_> {
    type Item = AdcSample;

    #[allow(clippy::arithmetic_side_effects)] // Safety: constant shifts < 32 on a u32
    fn next(&mut self) -> Option<AdcSample> {
        let entry = self.entries.next()?;
        let word = entry
            .iter()
            .rev()
            .fold(0u32, |acc, &b| acc.wrapping_shl(8) | u32::from(b));
        let (unit, channel, raw) = match self.format {
            OutputFormat::Type1 => (
                Some(self.type1_unit),
                (word >> TYPE1_CHANNEL_SHIFT) & TYPE1_CHANNEL_MASK,
                word & TYPE1_DATA_MASK,
            ),
            OutputFormat::Type2 => (
                AdcUnit::from_index(((word >> TYPE2_UNIT_SHIFT) & 1) as usize),
                (word >> TYPE2_CHANNEL_SHIFT) & TYPE2_CHANNEL_MASK,
                word & TYPE2_DATA_MASK,
            ),
        };
        let unit = unit.unwrap_or(AdcUnit::Unit1);
        let channel = AdcChannel::new(u8::try_from(channel).unwrap_or(u8::MAX));
        Some(AdcSample {
            unit,
            channel,
            raw: u16::try_from(raw).unwrap_or(u16::MAX),
            valid: self.caps.has_unit(unit) && self.caps.has_channel(channel),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

/// Decode `frame` as a sequence of `format` entries.
///
/// `type1_unit` is the unit reported for Type1 entries. Trailing bytes that
/// do not form a whole entry are ignored.
pub fn parse<'f>(
    frame: &'f [u8],
    format: OutputFormat,
    type1_unit: AdcUnit,
    caps: &'f AdcCapabilities,
) -> Samples<'f> {
    Samples {
        entries: frame.chunks_exact(format.entry_bytes()),
        format,
        type1_unit,
        caps,
    }
}
