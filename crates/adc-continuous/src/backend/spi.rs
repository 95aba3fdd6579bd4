//! SPI-borrowed DMA backend (S2).
//!
//! The ADC on this family has no DMA of its own: it borrows the inlink of
//! the secondary SPI host, so the host itself must be claimed first.

use platform::{
    DmaEvents, DmaTransport, InterruptController, InterruptFlags, InterruptHandle, SpiDmaHost,
};

use super::{free_interrupt, DmaBackend};
use crate::error::{AdcError, Result};

/// Backend over the secondary SPI host's DMA inlink.
pub struct SpiDmaBackend<S: SpiDmaHost> {
    host: S,
    claimed: bool,
    intr: Option<InterruptHandle>,
}

impl<S: SpiDmaHost> SpiDmaBackend<S> {
    /// Wrap an unclaimed host facade.
    pub fn new(host: S) -> Self {
        Self {
            host,
            claimed: false,
            intr: None,
        }
    }

    /// Return the host facade.
    pub fn into_inner(self) -> S {
        self.host
    }
}

impl<S: SpiDmaHost> DmaBackend for SpiDmaBackend<S> {
    const TRANSPORT: DmaTransport = DmaTransport::Spi;

    fn init(&mut self) -> Result<()> {
        if self.claimed {
            return Err(AdcError::InvalidState);
        }
        self.host.claim_host()?;
        if let Err(e) = self.host.alloc_dma_channel() {
            self.host.free_host();
            return Err(e.into());
        }
        self.claimed = true;
        Ok(())
    }

    fn register_completion_interrupt<I: InterruptController>(
        &mut self,
        intc: &I,
        flags: InterruptFlags,
    ) -> Result<()> {
        if self.intr.is_some() || !self.claimed {
            return Err(AdcError::InvalidState);
        }
        self.intr = Some(intc.allocate(self.host.interrupt_source(), flags)?);
        self.host.set_intr_enabled(DmaEvents::SUC_EOF, true);
        Ok(())
    }

    fn take_completion(&mut self) -> Option<usize> {
        let status = self.host.intr_status();
        self.host.clear_intr(status);
        status
            .contains(DmaEvents::SUC_EOF)
            .then(|| self.host.in_suc_eof_descriptor())
    }

    fn start(&mut self, head: usize) {
        self.host.dma_rx_start(head);
    }

    fn stop(&mut self) {
        self.host.dma_rx_stop();
    }

    fn reset(&mut self) {
        self.host.dma_rx_reset();
        self.host.rx_fifo_reset();
    }

    fn deinit<I: InterruptController>(&mut self, intc: &I) -> Result<()> {
        self.host.dma_rx_stop();
        free_interrupt(intc, &mut self.intr)?;
        self.host.set_intr_enabled(DmaEvents::SUC_EOF, false);
        if self.claimed {
            self.host.free_dma_channel();
            self.host.free_host();
            self.claimed = false;
        }
        Ok(())
    }
}
