//! Acquisition context and its Init/Started state machine.
//!
//! [`AdcContinuous`] owns every collaborator of one ADC digital controller:
//! the register facade, the DMA backend, the interrupt allocator and the
//! power-management lock. [`new`](AdcContinuous::new) claims the digital
//! controller through [`AdcDigi::claim_controller`] and
//! [`deinit`](AdcContinuous::deinit) gives it back, so at most one context
//! exists per controller.
//!
//! # State machine
//!
//! ```text
//!            new()                start()
//!   ──────────────────► Init ─────────────────► Started
//!                        ▲ │                        │
//!                        │ └── deinit() (slots     │
//!                        │     all released)        │
//!                        └──────────── stop() ──────┘
//! ```
//!
//! Filter and monitor configuration, [`config`](AdcContinuous::config),
//! [`register_event_callbacks`](AdcContinuous::register_event_callbacks) and
//! [`flush_pool`](AdcContinuous::flush_pool) require `Init`.
//!
//! # Concurrency
//!
//! Every method takes `&self`. Mutable state sits behind
//! `critical_section::Mutex` or atomics, so the context can be shared
//! between tasks and the two interrupt handlers
//! ([`on_dma_interrupt`](AdcContinuous::on_dma_interrupt),
//! [`on_monitor_interrupt`](AdcContinuous::on_monitor_interrupt)).

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, AtomicUsize};

use critical_section::{CriticalSection, Mutex};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use platform::dma::{descriptor_index, link_circular};
use platform::dma_safety::DmaAligned;
use platform::soc::{MAX_FILTER_SLOTS, MAX_MONITOR_SLOTS};
use platform::{
    AdcCapabilities, AdcDigi, AdcUnit, Attenuation, ByteRing, DmaDescriptor, InterruptController,
    InterruptFlags, InterruptHandle, PmLock,
};

use crate::backend::DmaBackend;
use crate::callback::{check_placement, EventCallbacks};
use crate::claim::SlotPool;
use crate::config::{AdcContinuousConfig, DigiConfig, HandleConfig, INTERNAL_BUF_NUM};
use crate::error::{AdcError, Result};
use crate::filter::FilterSlot;
use crate::monitor::MonitorSlot;

/// Lifecycle state of the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcState {
    /// Configurable, not streaming.
    Init,
    /// Streaming; DMA active.
    Started,
}

/// Hardware collaborators handed to [`AdcContinuous::new`] and returned by
/// [`AdcContinuous::deinit`].
pub struct AdcPeripherals<H, B, I, L> {
    /// ADC digital controller facade.
    pub digi: H,
    /// DMA transport backend.
    pub backend: B,
    /// Interrupt allocator.
    pub intc: I,
    /// Lock held while streaming.
    pub pm: L,
}

/// DMA-capable memory for the descriptor ring and its frames.
///
/// Both must live in internal DRAM (see [`platform::dma_safety`]). The
/// descriptors are shared with the DMA engine, which writes back their
/// `length` and `owner` words while the context runs.
pub struct AdcDmaMemory<'a> {
    /// At least [`INTERNAL_BUF_NUM`] descriptors.
    pub descriptors: &'a [DmaDescriptor],
    /// At least `descriptors.len() * conv_frame_size` bytes.
    pub frames: &'a mut DmaAligned<[u8]>,
}

pub(crate) struct DmaChain<'a> {
    descriptors: &'a [DmaDescriptor],
    frames: &'a mut [u8],
    head: usize,
    frame_size: usize,
    /// First descriptor not yet handed to the ring.
    next: usize,
}

impl DmaChain<'_> {
    /// Index of the descriptor at `addr`, `None` for foreign addresses.
    pub(crate) fn index_of(&self, addr: usize) -> Option<usize> {
        descriptor_index(self.head, addr, self.descriptors.len())
    }

    /// Indices of every frame completed up to and including `last`, oldest
    /// first, starting at the first unread descriptor. Marks them read.
    pub(crate) fn take_completed(&mut self, last: usize) -> impl Iterator<Item = usize> {
        let count = self.descriptors.len();
        let first = self.next;
        let pending = last
            .checked_add(count)
            .and_then(|n| n.checked_sub(first))
            .map_or(0, |n| n.checked_rem(count).unwrap_or(0))
            .saturating_add(1);
        self.next = last.checked_add(1).and_then(|n| n.checked_rem(count)).unwrap_or(0);
        (0..pending).filter_map(move |i| first.checked_add(i)?.checked_rem(count))
    }

    /// Bytes the engine wrote into frame `index`, bounded by the frame size.
    pub(crate) fn frame(&self, index: usize) -> Option<&[u8]> {
        let len = self.descriptors.get(index)?.length().min(self.frame_size);
        let start = index.checked_mul(self.frame_size)?;
        let end = start.checked_add(len)?;
        self.frames.get(start..end)
    }

    fn rewind(&mut self) {
        self.next = 0;
    }
}

/// Shared monitor interrupt bookkeeping.
#[derive(Default)]
pub(crate) struct MonitorPlatform {
    pub intr: Option<InterruptHandle>,
}

/// The ADC continuous-mode acquisition context.
pub struct AdcContinuous<'a, H, B, I, L> {
    pub(crate) digi: H,
    pub(crate) caps: &'static AdcCapabilities,
    pub(crate) intc: I,
    pm: L,
    pub(crate) backend: Mutex<RefCell<B>>,
    pub(crate) chain: Mutex<RefCell<DmaChain<'a>>>,
    pub(crate) ring: ByteRing<'a>,
    pub(crate) flush_pool: bool,
    frame_size: usize,
    state: Mutex<Cell<AdcState>>,
    digi_config: Mutex<RefCell<Option<DigiConfig>>>,
    pub(crate) event_cbs: Mutex<Cell<EventCallbacks<'a>>>,
    pub(crate) eof_desc_addr: AtomicUsize,
    pub(crate) overflowed: AtomicBool,
    pub(crate) data_ready: Signal<CriticalSectionRawMutex, ()>,
    pub(crate) filters: SlotPool<FilterSlot, MAX_FILTER_SLOTS>,
    pub(crate) monitors: SlotPool<MonitorSlot<'a>, MAX_MONITOR_SLOTS>,
    pub(crate) monitor_platform: Mutex<RefCell<MonitorPlatform>>,
}

impl<'a, H, B, I, L> AdcContinuous<'a, H, B, I, L>
where
    H: AdcDigi,
    B: DmaBackend,
    I: InterruptController,
    L: PmLock,
{
    /// Create the context in `Init`.
    ///
    /// Links `dma` into a circular descriptor ring, takes the DMA transport
    /// and registers its completion interrupt. `ring_storage` backs the
    /// sample FIFO between the DMA interrupt and [`read`](Self::read).
    ///
    /// # Errors
    ///
    /// - [`AdcError::InvalidArgument`]: bad `config`, or `ring_storage`
    ///   smaller than one frame.
    /// - [`AdcError::InvalidState`]: another context owns the controller.
    /// - [`AdcError::NotSupported`]: `B` is not the chip's DMA transport.
    /// - [`AdcError::NoMemory`]: `dma` too small.
    /// - [`AdcError::NotFound`]: the transport or an interrupt line is
    ///   taken.
    ///
    /// Nothing stays claimed on failure.
    pub fn new(
        periph: AdcPeripherals<H, B, I, L>,
        config: &HandleConfig,
        dma: AdcDmaMemory<'a>,
        ring_storage: &'a mut [u8],
    ) -> Result<Self> {
        let AdcPeripherals {
            digi,
            mut backend,
            intc,
            pm,
        } = periph;
        let caps = digi.capabilities();

        config.validate(caps)?;
        if B::TRANSPORT != caps.dma_transport {
            #[cfg(feature = "defmt")]
            defmt::warn!("adc: backend transport does not match {=str}", caps.chip);
            return Err(AdcError::NotSupported);
        }
        if ring_storage.len() < config.conv_frame_size {
            return Err(AdcError::InvalidArgument);
        }
        if dma.descriptors.len() < INTERNAL_BUF_NUM {
            return Err(AdcError::NoMemory);
        }
        let AdcDmaMemory { descriptors, frames } = dma;
        let frames = &mut frames.0;
        let head =
            link_circular(descriptors, frames, config.conv_frame_size).ok_or(AdcError::NoMemory)?;

        if !digi.claim_controller() {
            #[cfg(feature = "defmt")]
            defmt::warn!("adc: continuous-mode controller already in use");
            return Err(AdcError::InvalidState);
        }
        if let Err(e) = backend.init() {
            digi.release_controller();
            return Err(e);
        }
        let flags = InterruptFlags::LEVEL1.with_iram(caps.isr_callbacks_in_iram);
        if let Err(e) = backend.register_completion_interrupt(&intc, flags) {
            let _ = backend.deinit(&intc);
            digi.release_controller();
            return Err(e);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "adc: context created on {=str}, {=usize} x {=usize} byte frames",
            caps.chip,
            descriptors.len(),
            config.conv_frame_size
        );

        Ok(Self {
            digi,
            caps,
            intc,
            pm,
            backend: Mutex::new(RefCell::new(backend)),
            chain: Mutex::new(RefCell::new(DmaChain {
                descriptors,
                frames,
                head,
                frame_size: config.conv_frame_size,
                next: 0,
            })),
            ring: ByteRing::new(ring_storage),
            flush_pool: config.flush_pool,
            frame_size: config.conv_frame_size,
            state: Mutex::new(Cell::new(AdcState::Init)),
            digi_config: Mutex::new(RefCell::new(None)),
            event_cbs: Mutex::new(Cell::new(EventCallbacks::default())),
            eof_desc_addr: AtomicUsize::new(0),
            overflowed: AtomicBool::new(false),
            data_ready: Signal::new(),
            filters: SlotPool::new(caps.filter_binding, caps.filter_count),
            monitors: SlotPool::new(caps.monitor_binding, caps.monitor_count),
            monitor_platform: Mutex::new(RefCell::new(MonitorPlatform::default())),
        })
    }

    /// Chip capabilities in effect.
    pub fn capabilities(&self) -> &'static AdcCapabilities {
        self.caps
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AdcState {
        critical_section::with(|cs| self.state.borrow(cs).get())
    }

    pub(crate) fn require_state(&self, cs: CriticalSection<'_>, want: AdcState) -> Result<()> {
        if self.state.borrow(cs).get() == want {
            Ok(())
        } else {
            Err(AdcError::InvalidState)
        }
    }

    /// Program the pattern table, sample rate, conversion mode and output
    /// format used by the next [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`] unless `Init`; validation errors from
    /// [`AdcContinuousConfig::validate`].
    pub fn config(&self, config: &AdcContinuousConfig) -> Result<()> {
        let resolved = match config.resolve(self.caps) {
            Ok(resolved) => resolved,
            Err(e) => {
                #[cfg(feature = "defmt")]
                defmt::warn!("adc: rejected digital controller config: {}", e);
                return Err(e);
            }
        };
        critical_section::with(|cs| {
            self.require_state(cs, AdcState::Init)?;
            *self.digi_config.borrow_ref_mut(cs) = Some(resolved);
            Ok::<(), AdcError>(())
        })?;

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "adc: {=usize} patterns at {=u32} Hz",
            config.patterns.len(),
            config.sample_freq_hz
        );
        Ok(())
    }

    /// `true` if the current configuration converts on `unit`.
    pub fn is_unit_active(&self, unit: AdcUnit) -> bool {
        critical_section::with(|cs| {
            self.digi_config
                .borrow_ref(cs)
                .as_ref()
                .and_then(|d| d.unit_active.get(unit.index()).copied())
                .unwrap_or(false)
        })
    }

    /// Attenuation configured for `unit`, if it is active.
    pub fn unit_attenuation(&self, unit: AdcUnit) -> Option<Attenuation> {
        critical_section::with(|cs| {
            let cfg = self.digi_config.borrow_ref(cs);
            let d = cfg.as_ref()?;
            if d.unit_active.get(unit.index()).copied().unwrap_or(false) {
                d.unit_atten.get(unit.index()).copied()
            } else {
                None
            }
        })
    }

    /// Install the stream callbacks run by
    /// [`on_dma_interrupt`](Self::on_dma_interrupt).
    ///
    /// # Errors
    ///
    /// - [`AdcError::InvalidArgument`]: a callback is not in internal RAM on
    ///   a chip that requires it.
    /// - [`AdcError::InvalidState`]: not `Init`.
    pub fn register_event_callbacks(&self, callbacks: EventCallbacks<'a>) -> Result<()> {
        check_placement(self.caps, callbacks.on_conv_done.as_ref())?;
        check_placement(self.caps, callbacks.on_pool_ovf.as_ref())?;
        critical_section::with(|cs| {
            self.require_state(cs, AdcState::Init)?;
            self.event_cbs.borrow(cs).set(callbacks);
            Ok(())
        })
    }

    /// Begin streaming: take the PM lock, reset and start DMA at the head of
    /// the descriptor ring, program and enable the digital controller.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`] unless `Init` with a successful
    /// [`config`](Self::config); PM lock errors.
    pub fn start(&self) -> Result<()> {
        critical_section::with(|cs| {
            self.require_state(cs, AdcState::Init)?;
            if self.digi_config.borrow_ref(cs).is_none() {
                return Err(AdcError::InvalidState);
            }
            Ok::<(), AdcError>(())
        })?;

        self.pm.acquire()?;
        let started = critical_section::with(|cs| {
            self.require_state(cs, AdcState::Init)?;
            let cfg = self.digi_config.borrow_ref(cs);
            let d = cfg.as_ref().ok_or(AdcError::InvalidState)?;
            let mut chain = self.chain.borrow_ref_mut(cs);
            chain.rewind();
            let head = chain.head;

            let mut backend = self.backend.borrow_ref_mut(cs);
            backend.stop();
            backend.reset();
            backend.start(head);
            self.digi.configure(
                &d.config.patterns,
                d.config.sample_freq_hz,
                d.config.conv_mode,
                d.config.format,
                self.frame_size,
            );
            self.digi.set_conversion_enabled(true);
            self.state.borrow(cs).set(AdcState::Started);
            Ok::<(), AdcError>(())
        });
        if let Err(e) = started {
            let _ = self.pm.release();
            return Err(e);
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: started");
        Ok(())
    }

    /// Stop streaming and release the PM lock. Queued samples stay readable.
    ///
    /// # Errors
    ///
    /// - [`AdcError::InvalidState`] unless `Started`.
    /// - PM lock release errors. Conversion and DMA are stopped and the
    ///   state is `Init` before the lock is released, so on this error the
    ///   context is stopped anyway and only the lock reference may leak.
    pub fn stop(&self) -> Result<()> {
        critical_section::with(|cs| {
            self.require_state(cs, AdcState::Started)?;
            self.digi.set_conversion_enabled(false);
            self.backend.borrow_ref_mut(cs).stop();
            self.state.borrow(cs).set(AdcState::Init);
            Ok::<(), AdcError>(())
        })?;
        if let Err(e) = self.pm.release() {
            #[cfg(feature = "defmt")]
            defmt::warn!("adc: stopped, but the PM lock release failed: {}", e);
            return Err(e.into());
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: stopped");
        Ok(())
    }

    /// Discard everything queued in the ring buffer.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`] unless `Init`.
    pub fn flush_pool(&self) -> Result<()> {
        critical_section::with(|cs| self.require_state(cs, AdcState::Init))?;
        self.ring.clear();
        Ok(())
    }

    /// Tear the context down and hand the collaborators back.
    ///
    /// Requires `Init` with every filter and monitor deleted; otherwise the
    /// context is returned unchanged with [`AdcError::InvalidState`]. If
    /// releasing the completion interrupt fails the context is returned
    /// with that error, still owning its transport and interrupt, so it can
    /// be started again or torn down by a later `deinit`.
    #[allow(clippy::result_large_err)]
    pub fn deinit(self) -> core::result::Result<AdcPeripherals<H, B, I, L>, (Self, AdcError)> {
        let ready = critical_section::with(|cs| self.require_state(cs, AdcState::Init)).and_then(|()| {
            if self.filters.claimed_count() > 0 || self.monitors.claimed_count() > 0 {
                Err(AdcError::InvalidState)
            } else {
                Ok(())
            }
        });
        if let Err(e) = ready {
            return Err((self, e));
        }

        self.digi.set_conversion_enabled(false);
        let freed = critical_section::with(|cs| self.backend.borrow_ref_mut(cs).deinit(&self.intc));
        if let Err(e) = freed {
            return Err((self, e));
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("adc: context deinitialised");

        self.digi.release_controller();
        let Self {
            digi,
            intc,
            pm,
            backend,
            ..
        } = self;
        Ok(AdcPeripherals {
            digi,
            backend: backend.into_inner().into_inner(),
            intc,
            pm,
        })
    }
}
