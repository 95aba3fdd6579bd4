//! I2S-based DMA backend (ESP32).

use platform::{
    DmaEvents, DmaTransport, I2sDmaPort, InterruptController, InterruptFlags, InterruptHandle,
};

use super::{free_interrupt, DmaBackend};
use crate::error::{AdcError, Result};

/// Occupation tag written into the I2S port while the ADC holds it.
const OCCUPATION_TAG: &str = "adc_continuous";

/// Backend over I2S0 operated in ADC DMA mode.
pub struct I2sDmaBackend<P: I2sDmaPort> {
    port: P,
    occupied: bool,
    intr: Option<InterruptHandle>,
}

impl<P: I2sDmaPort> I2sDmaBackend<P> {
    /// Wrap an unoccupied port facade.
    pub fn new(port: P) -> Self {
        Self {
            port,
            occupied: false,
            intr: None,
        }
    }

    /// Return the port facade.
    pub fn into_inner(self) -> P {
        self.port
    }
}

impl<P: I2sDmaPort> DmaBackend for I2sDmaBackend<P> {
    const TRANSPORT: DmaTransport = DmaTransport::I2s;

    fn init(&mut self) -> Result<()> {
        if self.occupied {
            return Err(AdcError::InvalidState);
        }
        self.port.acquire_occupation(OCCUPATION_TAG)?;
        self.port.enable_dma(true);
        self.occupied = true;
        Ok(())
    }

    fn register_completion_interrupt<I: InterruptController>(
        &mut self,
        intc: &I,
        flags: InterruptFlags,
    ) -> Result<()> {
        if self.intr.is_some() || !self.occupied {
            return Err(AdcError::InvalidState);
        }
        self.intr = Some(intc.allocate(self.port.interrupt_source(), flags)?);
        self.port.set_intr_enabled(DmaEvents::SUC_EOF, true);
        Ok(())
    }

    fn take_completion(&mut self) -> Option<usize> {
        let status = self.port.intr_status();
        self.port.clear_intr(status);
        status
            .contains(DmaEvents::SUC_EOF)
            .then(|| self.port.rx_eof_descriptor())
    }

    fn start(&mut self, head: usize) {
        self.port.rx_start_link(head);
        self.port.rx_start();
    }

    fn stop(&mut self) {
        self.port.rx_stop();
        self.port.rx_stop_link();
    }

    fn reset(&mut self) {
        self.port.rx_reset_dma();
        self.port.rx_reset_fifo();
    }

    fn deinit<I: InterruptController>(&mut self, intc: &I) -> Result<()> {
        self.stop();
        free_interrupt(intc, &mut self.intr)?;
        self.port.set_intr_enabled(DmaEvents::SUC_EOF, false);
        if self.occupied {
            self.port.enable_dma(false);
            self.port.release_occupation();
            self.occupied = false;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use platform::mocks::{MockDmaEngine, MockInterruptController};

    #[test]
    fn occupied_port_is_not_found() {
        let engine = MockDmaEngine::new();
        let mut other = &engine;
        other.acquire_occupation("i2s_std").unwrap();
        let mut backend = I2sDmaBackend::new(&engine);
        assert_eq!(backend.init(), Err(AdcError::NotFound));
    }

    #[test]
    fn init_routes_rx_through_dma_until_deinit() {
        let engine = MockDmaEngine::new();
        let intc = MockInterruptController::new();
        let mut backend = I2sDmaBackend::new(&engine);
        backend.init().unwrap();
        assert!(engine.is_dma_routed());
        backend
            .register_completion_interrupt(&intc, InterruptFlags::LEVEL1)
            .unwrap();
        assert_eq!(
            backend.register_completion_interrupt(&intc, InterruptFlags::LEVEL1),
            Err(AdcError::InvalidState)
        );
        backend.deinit(&intc).unwrap();
        assert!(!engine.is_dma_routed());
        assert!(!engine.is_claimed());
        assert_eq!(intc.frees(), 1);
    }
}
