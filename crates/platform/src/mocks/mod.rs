//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests.
//!
//! Every mock keeps its state behind a `critical_section::Mutex`, and the
//! facade traits are implemented for `&Mock`, so a test hands a reference to
//! the engine and keeps inspecting (or poking) the same mock afterwards.

#![cfg(any(test, feature = "std"))]

use core::cell::RefCell;

use critical_section::Mutex;

use crate::adc::{
    AdcChannel, AdcDigi, AdcPattern, AdcUnit, ConvMode, IirCoefficient, MonitorStatus,
    OutputFormat,
};
use crate::dma::{DmaDescriptor, DmaError, DmaEvents, DmaTrigger, GdmaChannel, I2sDmaPort, SpiDmaHost};
use crate::interrupt::{
    InterruptController, InterruptError, InterruptFlags, InterruptHandle, InterruptSource,
    StatusMask,
};
use crate::power::{PmError, PmLock};
use crate::soc::{AdcCapabilities, MAX_FILTER_SLOTS, MAX_MONITOR_SLOTS};

/// Interrupt source reported by [`MockAdcDigi`] for the monitors.
pub const MOCK_MONITOR_SOURCE: InterruptSource = InterruptSource(43);

/// Interrupt source reported by [`MockDmaEngine`] for every transport.
pub const MOCK_DMA_SOURCE: InterruptSource = InterruptSource(66);

/// Status register address reported by [`MockAdcDigi::monitor_status_mask`].
pub const MOCK_MONITOR_STATUS_REG: usize = 0x6004_0040;

// ── ADC digital controller ──────────────────────────────────────────────────

/// Register state of one mock IIR filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterRegs {
    /// Number of `filter_reset` calls.
    pub resets: u32,
    /// Last programmed unit, channel and coefficient.
    pub binding: Option<(AdcUnit, AdcChannel, IirCoefficient)>,
    /// Enable bit.
    pub enabled: bool,
}

/// Register state of one mock threshold monitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorRegs {
    /// Last programmed unit and channel.
    pub binding: Option<(AdcUnit, AdcChannel)>,
    /// High threshold.
    pub high: Option<i32>,
    /// Low threshold.
    pub low: Option<i32>,
    /// Monitor-start bit.
    pub enabled: bool,
    /// High-threshold interrupt enable.
    pub intr_high: bool,
    /// Low-threshold interrupt enable.
    pub intr_low: bool,
}

#[derive(Default)]
struct DigiRegs {
    filters: [FilterRegs; MAX_FILTER_SLOTS],
    monitors: [MonitorRegs; MAX_MONITOR_SLOTS],
    status: u32,
    status_reads: u32,
    pattern_len: usize,
    sample_freq_hz: u32,
    conv_mode: Option<ConvMode>,
    format: Option<OutputFormat>,
    eof_bytes: usize,
    converting: bool,
    owned: bool,
}

/// Mock ADC digital controller
pub struct MockAdcDigi {
    caps: &'static AdcCapabilities,
    regs: Mutex<RefCell<DigiRegs>>,
}

impl MockAdcDigi {
    /// Create a controller reporting `caps`.
    pub fn new(caps: &'static AdcCapabilities) -> Self {
        Self {
            caps,
            regs: Mutex::new(RefCell::new(DigiRegs::default())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut DigiRegs) -> R) -> R {
        critical_section::with(|cs| f(&mut self.regs.borrow_ref_mut(cs)))
    }

    /// Latch monitor status bits, as the comparator would.
    pub fn raise_monitor_status(&self, bits: u32) {
        self.with(|r| r.status |= bits);
    }

    /// Pending monitor status bits.
    pub fn pending_status(&self) -> u32 {
        self.with(|r| r.status)
    }

    /// Number of `monitor_status` reads.
    pub fn status_reads(&self) -> u32 {
        self.with(|r| r.status_reads)
    }

    /// Snapshot of filter `index`.
    pub fn filter(&self, index: usize) -> FilterRegs {
        self.with(|r| r.filters.get(index).copied().unwrap_or_default())
    }

    /// Snapshot of monitor `index`.
    pub fn monitor(&self, index: usize) -> MonitorRegs {
        self.with(|r| r.monitors.get(index).copied().unwrap_or_default())
    }

    /// `true` while conversions are enabled.
    pub fn is_converting(&self) -> bool {
        self.with(|r| r.converting)
    }

    /// EOF size programmed by the last `configure`.
    pub fn eof_bytes(&self) -> usize {
        self.with(|r| r.eof_bytes)
    }

    /// Pattern count programmed by the last `configure`.
    pub fn pattern_len(&self) -> usize {
        self.with(|r| r.pattern_len)
    }

    /// `true` while a context owns the controller.
    pub fn is_owned(&self) -> bool {
        self.with(|r| r.owned)
    }

    /// Sample frequency, conversion mode and format of the last `configure`.
    pub fn digi_config(&self) -> (u32, Option<ConvMode>, Option<OutputFormat>) {
        self.with(|r| (r.sample_freq_hz, r.conv_mode, r.format))
    }
}

impl AdcDigi for MockAdcDigi {
    fn capabilities(&self) -> &'static AdcCapabilities {
        self.caps
    }

    fn claim_controller(&self) -> bool {
        self.with(|r| !core::mem::replace(&mut r.owned, true))
    }

    fn release_controller(&self) {
        self.with(|r| r.owned = false);
    }

    fn configure(
        &self,
        patterns: &[AdcPattern],
        sample_freq_hz: u32,
        conv_mode: ConvMode,
        format: OutputFormat,
        eof_bytes: usize,
    ) {
        self.with(|r| {
            r.pattern_len = patterns.len();
            r.sample_freq_hz = sample_freq_hz;
            r.conv_mode = Some(conv_mode);
            r.format = Some(format);
            r.eof_bytes = eof_bytes;
        });
    }

    fn set_conversion_enabled(&self, enabled: bool) {
        self.with(|r| r.converting = enabled);
    }

    fn filter_reset(&self, index: usize) {
        self.with(|r| {
            if let Some(f) = r.filters.get_mut(index) {
                *f = FilterRegs {
                    resets: f.resets.saturating_add(1),
                    ..FilterRegs::default()
                };
            }
        });
    }

    fn filter_configure(&self, index: usize, unit: AdcUnit, channel: AdcChannel, coeff: IirCoefficient) {
        self.with(|r| {
            if let Some(f) = r.filters.get_mut(index) {
                f.binding = Some((unit, channel, coeff));
            }
        });
    }

    fn filter_set_enabled(&self, index: usize, enabled: bool) {
        self.with(|r| {
            if let Some(f) = r.filters.get_mut(index) {
                f.enabled = enabled;
            }
        });
    }

    fn monitor_configure(
        &self,
        index: usize,
        unit: AdcUnit,
        channel: AdcChannel,
        high: Option<i32>,
        low: Option<i32>,
    ) {
        self.with(|r| {
            if let Some(m) = r.monitors.get_mut(index) {
                m.binding = Some((unit, channel));
                m.high = high;
                m.low = low;
            }
        });
    }

    fn monitor_set_enabled(&self, index: usize, enabled: bool) {
        self.with(|r| {
            if let Some(m) = r.monitors.get_mut(index) {
                m.enabled = enabled;
            }
        });
    }

    fn monitor_set_intr_enabled(&self, index: usize, high: bool, low: bool) {
        self.with(|r| {
            if let Some(m) = r.monitors.get_mut(index) {
                m.intr_high = high;
                m.intr_low = low;
            }
        });
    }

    fn monitor_status(&self) -> MonitorStatus {
        self.with(|r| {
            r.status_reads = r.status_reads.saturating_add(1);
            MonitorStatus::from_bits(r.status)
        })
    }

    fn monitor_clear_status(&self, status: MonitorStatus) {
        self.with(|r| r.status &= !status.bits());
    }

    fn monitor_interrupt_source(&self) -> InterruptSource {
        MOCK_MONITOR_SOURCE
    }

    fn monitor_status_mask(&self) -> StatusMask {
        let mask = (0..self.caps.monitor_count)
            .map(|i| MonitorStatus::high_bit(i) | MonitorStatus::low_bit(i))
            .fold(0, |acc, bits| acc | bits);
        StatusMask {
            register: MOCK_MONITOR_STATUS_REG,
            mask,
        }
    }
}

// ── DMA transports ──────────────────────────────────────────────────────────

#[derive(Default)]
struct DmaRegs {
    busy: bool,
    no_channel: bool,
    claimed: bool,
    channel: bool,
    owner: Option<&'static str>,
    dma_routed: bool,
    running: bool,
    head: usize,
    resets: u32,
    starts: u32,
    enabled: DmaEvents,
    pending: DmaEvents,
    eof_addr: usize,
}

impl DmaRegs {
    fn clear(&mut self, events: DmaEvents) {
        self.pending = DmaEvents::from_bits(self.pending.bits() & !events.bits());
    }

    fn set_enabled(&mut self, events: DmaEvents, enabled: bool) {
        let bits = if enabled {
            self.enabled.bits() | events.bits()
        } else {
            self.enabled.bits() & !events.bits()
        };
        self.enabled = DmaEvents::from_bits(bits);
    }

    fn start(&mut self, head: usize) {
        self.head = head;
        self.running = true;
        self.starts = self.starts.saturating_add(1);
    }
}

/// Mock DMA engine usable as any of the three ADC transports.
pub struct MockDmaEngine {
    regs: Mutex<RefCell<DmaRegs>>,
}

impl Default for MockDmaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDmaEngine {
    /// Create an idle, unowned engine.
    pub fn new() -> Self {
        Self {
            regs: Mutex::new(RefCell::new(DmaRegs::default())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut DmaRegs) -> R) -> R {
        critical_section::with(|cs| f(&mut self.regs.borrow_ref_mut(cs)))
    }

    /// Pretend another driver owns the peripheral.
    pub fn set_busy(&self, busy: bool) {
        self.with(|r| r.busy = busy);
    }

    /// Pretend every DMA channel is taken.
    pub fn set_no_channel(&self, no_channel: bool) {
        self.with(|r| r.no_channel = no_channel);
    }

    /// Simulate the engine filling `desc` completely and raising EOF.
    pub fn complete_frame(&self, desc: &DmaDescriptor) {
        self.complete_partial_frame(desc, desc.size());
    }

    /// Simulate the engine writing `len` bytes into `desc` before EOF.
    pub fn complete_partial_frame(&self, desc: &DmaDescriptor, len: usize) {
        desc.complete(len);
        self.raise_eof(desc.addr());
    }

    /// Latch an EOF event naming `addr` without touching any descriptor.
    pub fn raise_eof(&self, addr: usize) {
        self.with(|r| {
            r.pending = r.pending.union(DmaEvents::SUC_EOF);
            r.eof_addr = addr;
        });
    }

    /// `true` while the transport (host, occupation or channel) is claimed.
    pub fn is_claimed(&self) -> bool {
        self.with(|r| r.claimed || r.channel || r.owner.is_some())
    }

    /// `true` while RX is running.
    pub fn is_running(&self) -> bool {
        self.with(|r| r.running)
    }

    /// Descriptor address passed to the last start.
    pub fn head(&self) -> usize {
        self.with(|r| r.head)
    }

    /// Number of RX resets.
    pub fn resets(&self) -> u32 {
        self.with(|r| r.resets)
    }

    /// Number of RX starts.
    pub fn starts(&self) -> u32 {
        self.with(|r| r.starts)
    }

    /// Unmasked events.
    pub fn enabled_events(&self) -> DmaEvents {
        self.with(|r| r.enabled)
    }

    /// Pending, uncleared events.
    pub fn pending_events(&self) -> DmaEvents {
        self.with(|r| r.pending)
    }

    /// `true` while I2S RX is routed through DMA.
    pub fn is_dma_routed(&self) -> bool {
        self.with(|r| r.dma_routed)
    }
}

impl GdmaChannel for &MockDmaEngine {
    fn acquire(&mut self, _trigger: DmaTrigger) -> Result<(), DmaError> {
        self.with(|r| {
            if r.busy || r.no_channel || r.channel {
                return Err(DmaError::NoChannel);
            }
            r.channel = true;
            Ok(())
        })
    }

    fn release(&mut self) {
        self.with(|r| r.channel = false);
    }

    fn interrupt_source(&self) -> InterruptSource {
        MOCK_DMA_SOURCE
    }

    fn set_rx_events_enabled(&mut self, events: DmaEvents, enabled: bool) {
        self.with(|r| r.set_enabled(events, enabled));
    }

    fn rx_events(&self) -> DmaEvents {
        self.with(|r| r.pending)
    }

    fn clear_rx_events(&mut self, events: DmaEvents) {
        self.with(|r| r.clear(events));
    }

    fn rx_eof_descriptor(&self) -> usize {
        self.with(|r| r.eof_addr)
    }

    fn rx_reset(&mut self) {
        self.with(|r| r.resets = r.resets.saturating_add(1));
    }

    fn rx_start(&mut self, head: usize) {
        self.with(|r| r.start(head));
    }

    fn rx_stop(&mut self) {
        self.with(|r| r.running = false);
    }
}

impl SpiDmaHost for &MockDmaEngine {
    fn claim_host(&mut self) -> Result<(), DmaError> {
        self.with(|r| {
            if r.busy || r.claimed {
                return Err(DmaError::Busy);
            }
            r.claimed = true;
            Ok(())
        })
    }

    fn free_host(&mut self) {
        self.with(|r| r.claimed = false);
    }

    fn alloc_dma_channel(&mut self) -> Result<(), DmaError> {
        self.with(|r| {
            if r.no_channel || r.channel {
                return Err(DmaError::NoChannel);
            }
            r.channel = true;
            Ok(())
        })
    }

    fn free_dma_channel(&mut self) {
        self.with(|r| r.channel = false);
    }

    fn interrupt_source(&self) -> InterruptSource {
        MOCK_DMA_SOURCE
    }

    fn set_intr_enabled(&mut self, events: DmaEvents, enabled: bool) {
        self.with(|r| r.set_enabled(events, enabled));
    }

    fn intr_status(&self) -> DmaEvents {
        self.with(|r| r.pending)
    }

    fn clear_intr(&mut self, events: DmaEvents) {
        self.with(|r| r.clear(events));
    }

    fn in_suc_eof_descriptor(&self) -> usize {
        self.with(|r| r.eof_addr)
    }

    fn dma_rx_reset(&mut self) {
        self.with(|r| r.resets = r.resets.saturating_add(1));
    }

    fn rx_fifo_reset(&mut self) {}

    fn dma_rx_start(&mut self, head: usize) {
        self.with(|r| r.start(head));
    }

    fn dma_rx_stop(&mut self) {
        self.with(|r| r.running = false);
    }
}

impl I2sDmaPort for &MockDmaEngine {
    fn acquire_occupation(&mut self, owner: &'static str) -> Result<(), DmaError> {
        self.with(|r| {
            if r.busy || r.owner.is_some() {
                return Err(DmaError::Busy);
            }
            r.owner = Some(owner);
            Ok(())
        })
    }

    fn release_occupation(&mut self) {
        self.with(|r| r.owner = None);
    }

    fn interrupt_source(&self) -> InterruptSource {
        MOCK_DMA_SOURCE
    }

    fn set_intr_enabled(&mut self, events: DmaEvents, enabled: bool) {
        self.with(|r| r.set_enabled(events, enabled));
    }

    fn intr_status(&self) -> DmaEvents {
        self.with(|r| r.pending)
    }

    fn clear_intr(&mut self, events: DmaEvents) {
        self.with(|r| r.clear(events));
    }

    fn rx_eof_descriptor(&self) -> usize {
        self.with(|r| r.eof_addr)
    }

    fn enable_dma(&mut self, enabled: bool) {
        self.with(|r| r.dma_routed = enabled);
    }

    fn rx_reset_dma(&mut self) {
        self.with(|r| r.resets = r.resets.saturating_add(1));
    }

    fn rx_reset_fifo(&mut self) {}

    fn rx_start_link(&mut self, head: usize) {
        self.with(|r| r.start(head));
    }

    fn rx_stop_link(&mut self) {
        self.with(|r| r.running = false);
    }

    fn rx_start(&mut self) {}

    fn rx_stop(&mut self) {}
}

// ── Interrupt controller ────────────────────────────────────────────────────

#[derive(Default)]
struct IntcState {
    next_id: u32,
    live: heapless::Vec<u32, 8>,
    allocations: u32,
    shared_allocations: u32,
    frees: u32,
    yields: u32,
    fail: bool,
    fail_free: bool,
    last_source: Option<InterruptSource>,
    last_flags: Option<InterruptFlags>,
    last_mask: Option<StatusMask>,
}

impl IntcState {
    fn allocate(
        &mut self,
        source: InterruptSource,
        flags: InterruptFlags,
    ) -> Result<InterruptHandle, InterruptError> {
        if self.fail {
            return Err(InterruptError::NoFreeLine);
        }
        let id = self.next_id;
        self.live.push(id).map_err(|_| InterruptError::NoFreeLine)?;
        self.next_id = id.wrapping_add(1);
        self.allocations = self.allocations.saturating_add(1);
        self.last_source = Some(source);
        self.last_flags = Some(flags);
        Ok(InterruptHandle::new(id))
    }
}

/// Mock interrupt controller
///
/// Counts allocations, frees and yield requests.
pub struct MockInterruptController {
    state: Mutex<RefCell<IntcState>>,
}

impl Default for MockInterruptController {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInterruptController {
    /// Create a controller with free lines.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(IntcState::default())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut IntcState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Make every following allocation fail with `NoFreeLine`.
    pub fn set_fail(&self, fail: bool) {
        self.with(|s| s.fail = fail);
    }

    /// Make every following `free` fail with `InvalidArgument`, leaving
    /// the line allocated.
    pub fn set_fail_free(&self, fail: bool) {
        self.with(|s| s.fail_free = fail);
    }

    /// Successful allocations (exclusive and shared).
    pub fn allocations(&self) -> u32 {
        self.with(|s| s.allocations)
    }

    /// Successful shared allocations.
    pub fn shared_allocations(&self) -> u32 {
        self.with(|s| s.shared_allocations)
    }

    /// Successful frees.
    pub fn frees(&self) -> u32 {
        self.with(|s| s.frees)
    }

    /// Lines currently allocated.
    pub fn live(&self) -> usize {
        self.with(|s| s.live.len())
    }

    /// Yield requests from ISR context.
    pub fn yields(&self) -> u32 {
        self.with(|s| s.yields)
    }

    /// Source of the last successful allocation.
    pub fn last_source(&self) -> Option<InterruptSource> {
        self.with(|s| s.last_source)
    }

    /// Flags of the last successful allocation.
    pub fn last_flags(&self) -> Option<InterruptFlags> {
        self.with(|s| s.last_flags)
    }

    /// Status mask of the last successful shared allocation.
    pub fn last_status_mask(&self) -> Option<StatusMask> {
        self.with(|s| s.last_mask)
    }
}

impl InterruptController for MockInterruptController {
    fn allocate(
        &self,
        source: InterruptSource,
        flags: InterruptFlags,
    ) -> Result<InterruptHandle, InterruptError> {
        self.with(|s| s.allocate(source, flags))
    }

    fn allocate_shared(
        &self,
        source: InterruptSource,
        flags: InterruptFlags,
        status: StatusMask,
    ) -> Result<InterruptHandle, InterruptError> {
        self.with(|s| {
            let handle = s.allocate(source, flags)?;
            s.shared_allocations = s.shared_allocations.saturating_add(1);
            s.last_mask = Some(status);
            Ok(handle)
        })
    }

    fn free(&self, handle: &InterruptHandle) -> Result<(), InterruptError> {
        self.with(|s| {
            if s.fail_free {
                return Err(InterruptError::InvalidArgument);
            }
            let pos = s
                .live
                .iter()
                .position(|&id| id == handle.id())
                .ok_or(InterruptError::NotAllocated)?;
            s.live.swap_remove(pos);
            s.frees = s.frees.saturating_add(1);
            Ok(())
        })
    }

    fn yield_from_isr(&self) {
        self.with(|s| s.yields = s.yields.saturating_add(1));
    }
}

// ── Power management ────────────────────────────────────────────────────────

#[derive(Default)]
struct PmState {
    held: u32,
    acquires: u32,
    releases: u32,
    fail: bool,
    fail_release: bool,
}

/// Mock power-management lock
pub struct MockPmLock {
    state: Mutex<RefCell<PmState>>,
}

impl Default for MockPmLock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPmLock {
    /// Create an unheld lock.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(PmState::default())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut PmState) -> R) -> R {
        critical_section::with(|cs| f(&mut self.state.borrow_ref_mut(cs)))
    }

    /// Make every following `acquire` fail with `NotSupported`.
    pub fn set_fail(&self, fail: bool) {
        self.with(|s| s.fail = fail);
    }

    /// Make every following `release` fail with `NotSupported`. The
    /// reference stays held.
    pub fn set_fail_release(&self, fail: bool) {
        self.with(|s| s.fail_release = fail);
    }

    /// `true` while at least one reference is held.
    pub fn is_held(&self) -> bool {
        self.with(|s| s.held > 0)
    }

    /// Successful acquires.
    pub fn acquires(&self) -> u32 {
        self.with(|s| s.acquires)
    }

    /// Successful releases.
    pub fn releases(&self) -> u32 {
        self.with(|s| s.releases)
    }
}

impl PmLock for MockPmLock {
    fn acquire(&self) -> Result<(), PmError> {
        self.with(|s| {
            if s.fail {
                return Err(PmError::NotSupported);
            }
            s.held = s.held.saturating_add(1);
            s.acquires = s.acquires.saturating_add(1);
            Ok(())
        })
    }

    fn release(&self) -> Result<(), PmError> {
        self.with(|s| {
            if s.fail_release {
                return Err(PmError::NotSupported);
            }
            s.held = s.held.checked_sub(1).ok_or(PmError::NotHeld)?;
            s.releases = s.releases.saturating_add(1);
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::soc::ESP32C3;

    #[test]
    fn digi_clear_only_drops_requested_bits() {
        let digi = MockAdcDigi::new(&ESP32C3);
        digi.raise_monitor_status(0b1010);
        digi.monitor_clear_status(MonitorStatus::from_bits(0b0010));
        assert_eq!(digi.pending_status(), 0b1000);
    }

    #[test]
    fn digi_status_mask_covers_every_monitor() {
        let digi = MockAdcDigi::new(&ESP32C3);
        assert_eq!(digi.monitor_status_mask().mask, 0b1111);
    }

    #[test]
    fn intc_free_of_unknown_handle_fails() {
        let intc = MockInterruptController::new();
        let handle = intc.allocate(InterruptSource(1), InterruptFlags::LEVEL1).unwrap();
        assert_eq!(intc.free(&InterruptHandle::new(99)), Err(InterruptError::NotAllocated));
        intc.free(&handle).unwrap();
        assert_eq!(intc.live(), 0);
        assert_eq!(intc.frees(), 1);
    }

    #[test]
    fn digi_controller_has_a_single_owner() {
        let digi = MockAdcDigi::new(&ESP32C3);
        assert!(digi.claim_controller());
        assert!(!digi.claim_controller());
        digi.release_controller();
        assert!(!digi.is_owned());
        assert!(digi.claim_controller());
    }

    #[test]
    fn intc_failed_free_keeps_the_line() {
        let intc = MockInterruptController::new();
        let handle = intc.allocate(InterruptSource(1), InterruptFlags::LEVEL1).unwrap();
        intc.set_fail_free(true);
        assert_eq!(intc.free(&handle), Err(InterruptError::InvalidArgument));
        assert_eq!(intc.live(), 1);
        intc.set_fail_free(false);
        intc.free(&handle).unwrap();
        assert_eq!(intc.live(), 0);
    }

    #[test]
    fn dma_completion_writes_the_descriptor_length() {
        let engine = MockDmaEngine::new();
        let descs = [DmaDescriptor::EMPTY; 2];
        let mut frames = [0u8; 32];
        crate::dma::link_circular(&descs, &mut frames, 16).unwrap();

        engine.complete_partial_frame(&descs[1], 6);
        assert_eq!(descs[1].length(), 6);
        assert_eq!(descs[0].length(), 0);
        let port = &engine;
        assert_eq!(GdmaChannel::rx_eof_descriptor(&port), descs[1].addr());
        assert!(GdmaChannel::rx_events(&port).contains(DmaEvents::SUC_EOF));
    }

    #[test]
    fn pm_release_without_acquire_fails() {
        let pm = MockPmLock::new();
        assert_eq!(pm.release(), Err(PmError::NotHeld));
        pm.acquire().unwrap();
        assert!(pm.is_held());
        pm.release().unwrap();
        assert!(!pm.is_held());
    }

    #[test]
    fn dma_engine_refuses_a_second_owner() {
        let engine = MockDmaEngine::new();
        let mut a = &engine;
        let mut b = &engine;
        SpiDmaHost::claim_host(&mut a).unwrap();
        assert_eq!(SpiDmaHost::claim_host(&mut b), Err(DmaError::Busy));
    }
}
