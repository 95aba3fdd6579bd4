//! DMA transport backends.
//!
//! Each chip family moves ADC conversion frames through a different DMA
//! engine. [`DmaBackend`] is the one lifecycle the context drives, whichever
//! engine sits behind it:
//!
//! ```text
//!   new()  ──► init ──► register_completion_interrupt
//!   start() ─► stop ─► reset ─► start(chain head)
//!   ISR   ──► take_completion ──► EOF descriptor address
//!   stop() ─► stop
//!   deinit ─► deinit
//! ```
//!
//! | Backend            | Facade                         | Chips       |
//! |--------------------|--------------------------------|-------------|
//! | [`GdmaBackend`]    | [`platform::GdmaChannel`]      | C3, S3      |
//! | [`SpiDmaBackend`]  | [`platform::SpiDmaHost`]       | S2          |
//! | [`I2sDmaBackend`]  | [`platform::I2sDmaPort`]       | ESP32       |
//!
//! The board crate picks the backend as the context's `B` type parameter;
//! nothing else in the engine branches on the transport.

mod gdma;
mod i2s;
mod spi;

pub use gdma::GdmaBackend;
pub use i2s::I2sDmaBackend;
pub use spi::SpiDmaBackend;

use platform::{DmaTransport, InterruptController, InterruptFlags};

use crate::error::Result;

/// Uniform lifecycle over the three DMA transports.
///
/// Everything except `init`, `register_completion_interrupt` and `deinit`
/// is bounded, non-blocking and callable from interrupt context. `stop`
/// and `reset` are idempotent.
pub trait DmaBackend {
    /// Transport this backend drives; must match the chip's capabilities.
    const TRANSPORT: DmaTransport;

    /// Take ownership of the underlying peripheral.
    ///
    /// # Errors
    ///
    /// [`AdcError::NotFound`](crate::AdcError::NotFound) if another driver
    /// owns it or no channel is free.
    fn init(&mut self) -> Result<()>;

    /// Allocate the completion interrupt and unmask the EOF event. The board
    /// routes the interrupt to
    /// [`AdcContinuous::on_dma_interrupt`](crate::AdcContinuous::on_dma_interrupt).
    ///
    /// # Errors
    ///
    /// [`AdcError::InvalidState`](crate::AdcError::InvalidState) if already
    /// registered; allocation errors from `intc`.
    fn register_completion_interrupt<I: InterruptController>(
        &mut self,
        intc: &I,
        flags: InterruptFlags,
    ) -> Result<()>;

    /// Read and clear the pending completion status. Returns the address of
    /// the descriptor that raised EOF, or `None` if no frame completed.
    fn take_completion(&mut self) -> Option<usize>;

    /// Start receiving into the descriptor chain at `head`.
    fn start(&mut self, head: usize);

    /// Stop receiving.
    fn stop(&mut self);

    /// Reset the receive engine and FIFO.
    fn reset(&mut self);

    /// Stop, free the completion interrupt and release the peripheral.
    ///
    /// # Errors
    ///
    /// Interrupt release errors from `intc`. The backend then still owns
    /// its peripheral and interrupt, so it can be started again or torn
    /// down by a later call.
    fn deinit<I: InterruptController>(&mut self, intc: &I) -> Result<()>;
}

/// Free `intr` if one is held. On failure `intr` keeps the handle.
pub(crate) fn free_interrupt<I: InterruptController>(
    intc: &I,
    intr: &mut Option<platform::InterruptHandle>,
) -> Result<()> {
    if let Some(handle) = intr.as_ref() {
        intc.free(handle)?;
    }
    *intr = None;
    Ok(())
}
