//! DMA completion handling and the consumer side of the ring buffer.
//!
//! The completion interrupt is the only producer: every finished frame is
//! pushed whole into the ring. Readers pull arbitrary byte counts out of it.
//! When the ring is full the frame is either made room for by evicting the
//! oldest bytes (`flush_pool`) or dropped and reported through
//! `on_pool_ovf` and [`take_overflow`](AdcContinuous::take_overflow).

use core::sync::atomic::Ordering;

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use platform::{AdcDigi, InterruptController, PmLock};

use crate::backend::DmaBackend;
use crate::callback::ConvFrameEvent;
use crate::context::AdcContinuous;
use crate::error::{AdcError, Result};

impl<H, B, I, L> AdcContinuous<'_, H, B, I, L>
where
    H: AdcDigi,
    B: DmaBackend,
    I: InterruptController,
    L: PmLock,
{
    /// DMA completion interrupt handler; route the backend's completion
    /// interrupt here.
    ///
    /// The engine may finish several frames before the handler runs and
    /// only reports the last one, so every descriptor from the first unread
    /// one up to the reported one is delivered, oldest first. Each frame is
    /// the `length` bytes the engine wrote back; empty frames are skipped.
    /// An EOF naming a descriptor outside the ring delivers nothing.
    ///
    /// Runs `on_conv_done` on each frame, then queues it. Returns `true`
    /// (after asking the interrupt controller for a yield) if a callback
    /// requested one.
    pub fn on_dma_interrupt(&self) -> bool {
        let Some(addr) = critical_section::with(|cs| self.backend.borrow_ref_mut(cs).take_completion())
        else {
            return false;
        };
        self.eof_desc_addr.store(addr, Ordering::Release);

        let need_yield = critical_section::with(|cs| {
            let mut chain = self.chain.borrow_ref_mut(cs);
            let Some(last) = chain.index_of(addr) else {
                #[cfg(feature = "defmt")]
                defmt::warn!("adc: EOF on foreign descriptor {=usize:#x}", addr);
                return false;
            };
            let callbacks = self.event_cbs.borrow(cs).get();

            let mut need_yield = false;
            for index in chain.take_completed(last) {
                let Some(frame) = chain.frame(index).filter(|f| !f.is_empty()) else {
                    continue;
                };
                let event = ConvFrameEvent { data: frame };
                if let Some(cb) = callbacks.on_conv_done {
                    need_yield |= (cb.func())(&event);
                }

                let queued = if self.flush_pool {
                    self.ring.push_evicting(frame).is_ok()
                } else {
                    self.ring.push(frame).is_ok()
                };
                if queued {
                    self.data_ready.signal(());
                } else if !self.flush_pool {
                    self.overflowed.store(true, Ordering::Release);
                    if let Some(cb) = callbacks.on_pool_ovf {
                        need_yield |= (cb.func())(&event);
                    }
                }
            }
            need_yield
        });

        if need_yield {
            self.intc.yield_from_isr();
        }
        need_yield
    }

    /// Address of the descriptor that completed last, `0` before the first
    /// completion.
    pub fn last_eof_descriptor(&self) -> usize {
        self.eof_desc_addr.load(Ordering::Acquire)
    }

    /// Bytes waiting in the ring buffer.
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Copy queued conversion bytes into `out` without waiting.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidArgument`] for an empty `out`;
    /// [`AdcError::Timeout`] when nothing is queued.
    pub fn try_read(&self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Err(AdcError::InvalidArgument);
        }
        match self.ring.pop_into(out) {
            0 => Err(AdcError::Timeout),
            n => Ok(n),
        }
    }

    /// Copy queued conversion bytes into `out`, waiting up to `timeout` for
    /// the first byte to arrive.
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidArgument`] for an empty `out`;
    /// [`AdcError::Timeout`] if nothing arrived in time.
    pub async fn read(&self, out: &mut [u8], timeout: Duration) -> Result<usize> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .unwrap_or(Instant::MAX);
        loop {
            match self.try_read(out) {
                Err(AdcError::Timeout) => {}
                done => return done,
            }
            if let Either::Second(()) = select(self.data_ready.wait(), Timer::at(deadline)).await {
                return self.try_read(out);
            }
        }
    }

    /// `true` if a frame was dropped since the last call; clears the flag.
    pub fn take_overflow(&self) -> bool {
        self.overflowed.swap(false, Ordering::AcqRel)
    }
}
