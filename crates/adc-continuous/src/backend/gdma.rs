//! General-purpose DMA backend (C3, S3).

use platform::dma::DmaTrigger;
use platform::{
    DmaEvents, DmaTransport, GdmaChannel, InterruptController, InterruptFlags, InterruptHandle,
};

use super::{free_interrupt, DmaBackend};
use crate::error::{AdcError, Result};

/// Backend over an AHB GDMA RX channel connected to the ADC trigger.
pub struct GdmaBackend<C: GdmaChannel> {
    chan: C,
    acquired: bool,
    intr: Option<InterruptHandle>,
}

impl<C: GdmaChannel> GdmaBackend<C> {
    /// Wrap an unallocated channel facade.
    pub fn new(chan: C) -> Self {
        Self {
            chan,
            acquired: false,
            intr: None,
        }
    }

    /// Return the channel facade.
    pub fn into_inner(self) -> C {
        self.chan
    }
}

impl<C: GdmaChannel> DmaBackend for GdmaBackend<C> {
    const TRANSPORT: DmaTransport = DmaTransport::Gdma;

    fn init(&mut self) -> Result<()> {
        if self.acquired {
            return Err(AdcError::InvalidState);
        }
        self.chan.acquire(DmaTrigger::Adc)?;
        self.acquired = true;
        Ok(())
    }

    fn register_completion_interrupt<I: InterruptController>(
        &mut self,
        intc: &I,
        flags: InterruptFlags,
    ) -> Result<()> {
        if self.intr.is_some() || !self.acquired {
            return Err(AdcError::InvalidState);
        }
        self.intr = Some(intc.allocate(self.chan.interrupt_source(), flags)?);
        self.chan.set_rx_events_enabled(DmaEvents::SUC_EOF, true);
        Ok(())
    }

    fn take_completion(&mut self) -> Option<usize> {
        let events = self.chan.rx_events();
        self.chan.clear_rx_events(events);
        events
            .contains(DmaEvents::SUC_EOF)
            .then(|| self.chan.rx_eof_descriptor())
    }

    fn start(&mut self, head: usize) {
        self.chan.rx_start(head);
    }

    fn stop(&mut self) {
        self.chan.rx_stop();
    }

    fn reset(&mut self) {
        self.chan.rx_reset();
    }

    fn deinit<I: InterruptController>(&mut self, intc: &I) -> Result<()> {
        self.chan.rx_stop();
        free_interrupt(intc, &mut self.intr)?;
        self.chan.set_rx_events_enabled(DmaEvents::SUC_EOF, false);
        if self.acquired {
            self.chan.release();
            self.acquired = false;
        }
        Ok(())
    }
}
