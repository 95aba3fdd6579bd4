//! Shared test rig: mock peripherals plus DMA and ring memory.
#![allow(dead_code)]
#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use adc_continuous::{
    AdcContinuous, AdcContinuousConfig, AdcDmaMemory, AdcPeripherals, DmaBackend, GdmaBackend,
    HandleConfig, Result, INTERNAL_BUF_NUM,
};
use platform::mocks::{MockAdcDigi, MockDmaEngine, MockInterruptController, MockPmLock};
use platform::{
    AdcCapabilities, AdcChannel, AdcPattern, AdcUnit, Attenuation, ConvMode, DmaAligned,
    DmaDescriptor, OutputFormat,
};

/// Frame size used by most tests: four Type2 conversions.
pub const FRAME: usize = 16;

/// Ring capacity used by most tests: two frames.
pub const RING: usize = 2 * FRAME;

/// Every hardware collaborator of one context.
pub struct Rig {
    pub digi: MockAdcDigi,
    pub dma: MockDmaEngine,
    pub intc: MockInterruptController,
    pub pm: MockPmLock,
}

impl Rig {
    pub fn new(caps: &'static AdcCapabilities) -> Self {
        Self {
            digi: MockAdcDigi::new(caps),
            dma: MockDmaEngine::new(),
            intc: MockInterruptController::new(),
            pm: MockPmLock::new(),
        }
    }

    /// Peripherals with `backend` over this rig's DMA engine.
    pub fn peripherals<B>(
        &self,
        backend: B,
    ) -> AdcPeripherals<&MockAdcDigi, B, &MockInterruptController, &MockPmLock> {
        AdcPeripherals {
            digi: &self.digi,
            backend,
            intc: &self.intc,
            pm: &self.pm,
        }
    }
}

/// Descriptor ring, frame memory and ring-buffer storage.
///
/// The descriptors are leaked so a test can keep completing them through
/// the mock engine while the context borrows the rest of the memory.
pub struct Memory {
    pub descriptors: &'static [DmaDescriptor; INTERNAL_BUF_NUM],
    pub frames: DmaAligned<[u8; INTERNAL_BUF_NUM * FRAME]>,
    pub ring: [u8; RING],
}

impl Memory {
    /// Frame `i` is filled with the byte `i + 1`, so tests can tell frames
    /// apart in what they read back.
    pub fn new() -> Self {
        let mut frames = [0u8; INTERNAL_BUF_NUM * FRAME];
        for (i, frame) in frames.chunks_exact_mut(FRAME).enumerate() {
            frame.fill(u8::try_from(i + 1).unwrap());
        }
        Self {
            descriptors: Box::leak(Box::new([DmaDescriptor::EMPTY; INTERNAL_BUF_NUM])),
            frames: DmaAligned(frames),
            ring: [0u8; RING],
        }
    }

    /// Address of descriptor `i`, as the DMA engine reports it on EOF.
    pub fn descriptor_addr(&self, i: usize) -> usize {
        self.descriptors[i].addr()
    }

    pub fn dma(&mut self) -> (AdcDmaMemory<'_>, &mut [u8]) {
        (
            AdcDmaMemory {
                descriptors: self.descriptors,
                frames: &mut self.frames,
            },
            &mut self.ring,
        )
    }
}

pub type GdmaContext<'a> = AdcContinuous<
    'a,
    &'a MockAdcDigi,
    GdmaBackend<&'a MockDmaEngine>,
    &'a MockInterruptController,
    &'a MockPmLock,
>;

pub fn handle_config(flush_pool: bool) -> HandleConfig {
    HandleConfig {
        conv_frame_size: FRAME,
        flush_pool,
    }
}

/// Context over `backend` with the default frame layout.
pub fn build<'a, B: DmaBackend>(
    rig: &'a Rig,
    mem: &'a mut Memory,
    backend: B,
    flush_pool: bool,
) -> Result<AdcContinuous<'a, &'a MockAdcDigi, B, &'a MockInterruptController, &'a MockPmLock>> {
    let (dma, ring) = mem.dma();
    AdcContinuous::new(rig.peripherals(backend), &handle_config(flush_pool), dma, ring)
}

/// GDMA context (C3/S3 presets).
pub fn gdma<'a>(rig: &'a Rig, mem: &'a mut Memory, flush_pool: bool) -> Result<GdmaContext<'a>> {
    build(rig, mem, GdmaBackend::new(&rig.dma), flush_pool)
}

/// One unit-1 channel-0 pattern in the chip's native output format.
pub fn single_channel_config(caps: &AdcCapabilities) -> AdcContinuousConfig {
    let mut patterns = heapless::Vec::new();
    patterns
        .push(AdcPattern {
            unit: AdcUnit::Unit1,
            channel: AdcChannel::new(0),
            atten: Attenuation::Db12,
            bit_width: 12,
        })
        .unwrap();
    AdcContinuousConfig {
        patterns,
        sample_freq_hz: 20_000,
        conv_mode: ConvMode::SingleUnit1,
        format: if caps.supports_type2 {
            OutputFormat::Type2
        } else {
            OutputFormat::Type1
        },
    }
}
