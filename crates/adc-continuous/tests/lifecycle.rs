//! Context construction, Init/Started transitions and teardown.
//!
//! Run with: cargo test -p adc-continuous --test lifecycle
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

mod common;

use adc_continuous::{
    AdcContinuous, AdcDmaMemory, AdcError, AdcPeripherals, AdcState, FilterConfig, GdmaBackend,
    HandleConfig, I2sDmaBackend, SpiDmaBackend,
};
use common::{Memory, Rig, FRAME};
use platform::mocks::MockDmaEngine;
use platform::power::NoPm;
use platform::soc::{ESP32, ESP32C3, ESP32S2};
use platform::{
    AdcChannel, AdcUnit, Attenuation, ConvMode, DmaAligned, IirCoefficient, OutputFormat,
};

// ─── Construction ────────────────────────────────────────────────────────────

/// A fresh context is in Init, owns its transport and has registered the
/// completion interrupt.
#[test]
fn new_claims_transport_and_interrupt() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let adc = common::gdma(&rig, &mut mem, false).unwrap();
    assert_eq!(adc.state(), AdcState::Init);
    assert!(rig.dma.is_claimed());
    assert_eq!(rig.intc.live(), 1);
    assert_eq!(adc.capabilities().chip, "esp32c3");
}

/// A backend for the wrong transport is refused before anything is claimed.
#[test]
fn transport_mismatch_is_not_supported() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let err = common::build(&rig, &mut mem, SpiDmaBackend::new(&rig.dma), false).err();
    assert_eq!(err, Some(AdcError::NotSupported));
    assert!(!rig.dma.is_claimed());
    assert_eq!(rig.intc.live(), 0);
}

/// Too few descriptors or too little frame memory.
#[test]
fn short_dma_memory_is_no_memory() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let cfg = common::handle_config(false);

    let dma = AdcDmaMemory {
        descriptors: &mem.descriptors[..4],
        frames: &mut mem.frames,
    };
    let err = AdcContinuous::new(
        rig.peripherals(GdmaBackend::new(&rig.dma)),
        &cfg,
        dma,
        &mut mem.ring,
    )
    .err();
    assert_eq!(err, Some(AdcError::NoMemory));

    let mut short_frames = DmaAligned([0u8; 4 * FRAME]);
    let dma = AdcDmaMemory {
        descriptors: mem.descriptors,
        frames: &mut short_frames,
    };
    let err = AdcContinuous::new(
        rig.peripherals(GdmaBackend::new(&rig.dma)),
        &cfg,
        dma,
        &mut mem.ring,
    )
    .err();
    assert_eq!(err, Some(AdcError::NoMemory));
    assert!(!rig.dma.is_claimed());
}

/// Frame sizes the DMA cannot produce, or a ring smaller than one frame.
#[test]
fn bad_frame_geometry_is_invalid_argument() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();

    for conv_frame_size in [0, 18, 4096] {
        let (dma, ring) = mem.dma();
        let cfg = HandleConfig {
            conv_frame_size,
            flush_pool: false,
        };
        let err =
            AdcContinuous::new(rig.peripherals(GdmaBackend::new(&rig.dma)), &cfg, dma, ring).err();
        assert_eq!(err, Some(AdcError::InvalidArgument), "{conv_frame_size}");
    }

    let dma = AdcDmaMemory {
        descriptors: mem.descriptors,
        frames: &mut mem.frames,
    };
    let err = AdcContinuous::new(
        rig.peripherals(GdmaBackend::new(&rig.dma)),
        &common::handle_config(false),
        dma,
        &mut mem.ring[..FRAME - 4],
    )
    .err();
    assert_eq!(err, Some(AdcError::InvalidArgument));
}

/// Transport owned elsewhere, or no interrupt line: nothing stays claimed.
#[test]
fn failed_construction_leaks_nothing() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();

    rig.dma.set_no_channel(true);
    assert_eq!(
        common::gdma(&rig, &mut mem, false).err(),
        Some(AdcError::NotFound)
    );
    rig.dma.set_no_channel(false);

    rig.intc.set_fail(true);
    assert_eq!(
        common::gdma(&rig, &mut mem, false).err(),
        Some(AdcError::NotFound)
    );
    assert!(!rig.dma.is_claimed());
    assert_eq!(rig.intc.live(), 0);
    assert!(!rig.digi.is_owned());
}

/// One controller, one context: a second context is refused until the
/// first one is torn down, even over a different DMA engine.
#[test]
fn second_context_on_one_controller_is_refused() {
    let rig = Rig::new(&ESP32C3);
    let other_dma = MockDmaEngine::new();
    let mut mem = Memory::new();
    let mut other_mem = Memory::new();
    let first = common::gdma(&rig, &mut mem, false).unwrap();
    assert!(rig.digi.is_owned());

    let second = |mem: &mut Memory| {
        let (dma, ring) = mem.dma();
        let periph = AdcPeripherals {
            digi: &rig.digi,
            backend: GdmaBackend::new(&other_dma),
            intc: &rig.intc,
            pm: &rig.pm,
        };
        AdcContinuous::new(periph, &common::handle_config(false), dma, ring).err()
    };
    assert_eq!(second(&mut other_mem), Some(AdcError::InvalidState));
    assert!(!other_dma.is_claimed());
    assert_eq!(rig.intc.live(), 1);

    assert!(first.deinit().is_ok());
    assert!(!rig.digi.is_owned());
    assert_eq!(second(&mut other_mem), None);
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// A valid config records per-unit state; an invalid one is refused.
#[test]
fn config_records_active_units() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let adc = common::gdma(&rig, &mut mem, false).unwrap();

    assert!(!adc.is_unit_active(AdcUnit::Unit1));
    adc.config(&common::single_channel_config(&ESP32C3)).unwrap();
    assert!(adc.is_unit_active(AdcUnit::Unit1));
    assert!(!adc.is_unit_active(AdcUnit::Unit2));
    assert_eq!(adc.unit_attenuation(AdcUnit::Unit1), Some(Attenuation::Db12));
    assert_eq!(adc.unit_attenuation(AdcUnit::Unit2), None);

    let mut too_fast = common::single_channel_config(&ESP32C3);
    too_fast.sample_freq_hz = 1_000_000;
    assert_eq!(adc.config(&too_fast), Err(AdcError::InvalidArgument));

    let mut type1 = common::single_channel_config(&ESP32C3);
    type1.format = OutputFormat::Type1;
    assert_eq!(adc.config(&type1), Err(AdcError::InvalidArgument));
}

// ─── Start / stop ────────────────────────────────────────────────────────────

/// Streaming needs a configuration first.
#[test]
fn start_without_config_is_invalid_state() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let adc = common::gdma(&rig, &mut mem, false).unwrap();
    assert_eq!(adc.start(), Err(AdcError::InvalidState));
    assert_eq!(rig.pm.acquires(), 0);
}

/// Start programs the controller, runs DMA from the ring head and holds the
/// PM lock until stop.
#[test]
fn start_stop_cycle() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let head = mem.descriptor_addr(0);
    let adc = common::gdma(&rig, &mut mem, false).unwrap();
    adc.config(&common::single_channel_config(&ESP32C3)).unwrap();

    adc.start().unwrap();
    assert_eq!(adc.state(), AdcState::Started);
    assert!(rig.pm.is_held());
    assert!(rig.digi.is_converting());
    assert_eq!(rig.digi.eof_bytes(), FRAME);
    assert_eq!(rig.digi.pattern_len(), 1);
    assert_eq!(
        rig.digi.digi_config(),
        (20_000, Some(ConvMode::SingleUnit1), Some(OutputFormat::Type2))
    );
    assert!(rig.dma.is_running());
    assert_eq!(rig.dma.head(), head);

    assert_eq!(adc.start(), Err(AdcError::InvalidState));
    let mut reconfig = common::single_channel_config(&ESP32C3);
    reconfig.sample_freq_hz = 40_000;
    assert_eq!(adc.config(&reconfig), Err(AdcError::InvalidState));

    adc.stop().unwrap();
    assert_eq!(adc.state(), AdcState::Init);
    assert!(!rig.pm.is_held());
    assert!(!rig.digi.is_converting());
    assert!(!rig.dma.is_running());
    assert_eq!(adc.stop(), Err(AdcError::InvalidState));

    // Restart resets DMA again.
    adc.start().unwrap();
    assert_eq!(rig.dma.starts(), 2);
    assert_eq!(rig.pm.acquires(), 2);
    adc.stop().unwrap();
    assert_eq!(rig.pm.releases(), 2);
}

/// A PM lock failure leaves the context in Init with DMA untouched.
#[test]
fn pm_failure_aborts_start() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let adc = common::gdma(&rig, &mut mem, false).unwrap();
    adc.config(&common::single_channel_config(&ESP32C3)).unwrap();

    rig.pm.set_fail(true);
    assert_eq!(adc.start(), Err(AdcError::NotSupported));
    assert_eq!(adc.state(), AdcState::Init);
    assert!(!rig.dma.is_running());
}

/// A PM release failure is reported, but the context is stopped anyway.
#[test]
fn pm_release_failure_still_stops() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let adc = common::gdma(&rig, &mut mem, false).unwrap();
    adc.config(&common::single_channel_config(&ESP32C3)).unwrap();
    adc.start().unwrap();

    rig.pm.set_fail_release(true);
    assert_eq!(adc.stop(), Err(AdcError::NotSupported));
    assert_eq!(adc.state(), AdcState::Init);
    assert!(!rig.digi.is_converting());
    assert!(!rig.dma.is_running());
    assert_eq!(adc.stop(), Err(AdcError::InvalidState));

    rig.pm.set_fail_release(false);
    adc.start().unwrap();
    adc.stop().unwrap();
    assert_eq!(rig.pm.acquires(), 2);
    assert_eq!(rig.pm.releases(), 1);
}

/// Boards without power management use `NoPm`.
#[test]
fn runs_without_power_management() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let (dma, ring) = mem.dma();
    let periph = AdcPeripherals {
        digi: &rig.digi,
        backend: GdmaBackend::new(&rig.dma),
        intc: &rig.intc,
        pm: NoPm,
    };
    let adc = AdcContinuous::new(periph, &common::handle_config(false), dma, ring).unwrap();
    adc.config(&common::single_channel_config(&ESP32C3)).unwrap();
    adc.start().unwrap();
    adc.stop().unwrap();
}

// ─── Teardown ────────────────────────────────────────────────────────────────

/// Deinit is refused while streaming or while slots are claimed, and hands
/// the peripherals back once everything is released.
#[test]
fn deinit_requires_idle_context() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let adc = common::gdma(&rig, &mut mem, false).unwrap();

    let filter = adc
        .new_iir_filter(&FilterConfig {
            unit: AdcUnit::Unit1,
            channel: AdcChannel::new(0),
            coeff: IirCoefficient::Coeff4,
        })
        .unwrap();
    let (adc, err) = adc.deinit().err().unwrap();
    assert_eq!(err, AdcError::InvalidState);
    adc.delete_iir_filter(&filter).unwrap();

    adc.config(&common::single_channel_config(&ESP32C3)).unwrap();
    adc.start().unwrap();
    let (adc, err) = adc.deinit().err().unwrap();
    assert_eq!(err, AdcError::InvalidState);
    adc.stop().unwrap();

    let periph = adc.deinit().ok().unwrap();
    assert!(!rig.dma.is_claimed());
    assert_eq!(rig.intc.live(), 0);

    assert!(!rig.digi.is_owned());

    // The returned backend can build a new context.
    let mut mem2 = Memory::new();
    let (dma, ring) = mem2.dma();
    let again = AdcContinuous::new(periph, &common::handle_config(false), dma, ring).unwrap();
    assert_eq!(again.state(), AdcState::Init);
}

/// A failed interrupt release hands back a context that still owns its
/// transport and interrupt and keeps working.
#[test]
fn failed_interrupt_release_returns_a_working_context() {
    let rig = Rig::new(&ESP32C3);
    let mut mem = Memory::new();
    let adc = common::gdma(&rig, &mut mem, false).unwrap();

    rig.intc.set_fail_free(true);
    let (adc, err) = adc.deinit().err().unwrap();
    assert_eq!(err, AdcError::InvalidArgument);
    assert!(rig.dma.is_claimed());
    assert_eq!(rig.intc.live(), 1);
    assert!(rig.digi.is_owned());

    adc.config(&common::single_channel_config(&ESP32C3)).unwrap();
    adc.start().unwrap();
    assert!(rig.dma.is_running());
    adc.stop().unwrap();

    rig.intc.set_fail_free(false);
    assert!(adc.deinit().is_ok());
    assert!(!rig.dma.is_claimed());
    assert_eq!(rig.intc.live(), 0);
    assert!(!rig.digi.is_owned());
}

// ─── Per-transport lifecycles ────────────────────────────────────────────────

/// ESP32: the I2S port is routed to DMA while the context lives.
#[test]
fn i2s_transport_lifecycle() {
    let rig = Rig::new(&ESP32);
    let mut mem = Memory::new();
    let adc = common::build(&rig, &mut mem, I2sDmaBackend::new(&rig.dma), false).unwrap();
    assert!(rig.dma.is_dma_routed());

    adc.config(&common::single_channel_config(&ESP32)).unwrap();
    adc.start().unwrap();
    assert!(rig.dma.is_running());
    adc.stop().unwrap();

    assert!(adc.deinit().is_ok());
    assert!(!rig.dma.is_dma_routed());
    assert!(!rig.dma.is_claimed());
}

/// ESP32-S2: the SPI host is claimed for the context's lifetime.
#[test]
fn spi_transport_lifecycle() {
    let rig = Rig::new(&ESP32S2);
    let mut mem = Memory::new();
    let adc = common::build(&rig, &mut mem, SpiDmaBackend::new(&rig.dma), false).unwrap();
    assert!(rig.dma.is_claimed());

    adc.config(&common::single_channel_config(&ESP32S2)).unwrap();
    adc.start().unwrap();
    assert_eq!(rig.dma.resets(), 1);
    adc.stop().unwrap();

    assert!(adc.deinit().is_ok());
    assert!(!rig.dma.is_claimed());
}
