//! Board-support abstraction layer for the ADC continuous-mode engine
//!
//! This crate provides trait-based facades for every hardware collaborator
//! the acquisition engine touches, enabling development and testing without
//! physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application Layer (sampling tasks, monitor callbacks)
//!         ↓
//! Acquisition Engine (adc-continuous crate)
//!         ↓
//! Platform facades (this crate - trait abstractions)
//!         ↓
//! Board-support layer (PAC register access, interrupt matrix)
//! ```
//!
//! # Abstraction Levels
//!
//! ## Controller facades
//! - [`AdcDigi`] - ADC digital controller: pattern table, IIR filters,
//!   threshold monitors
//! - [`dma`] - the three DMA transports (GDMA channel, SPI DMA, I2S DMA)
//!
//! ## System services
//! - [`InterruptController`] - exclusive and shared-status-masked interrupt
//!   allocation
//! - [`PmLock`] - power-management lock held while streaming
//! - [`ByteRing`] - externally-storaged byte FIFO
//! - [`soc`] - per-chip capability descriptors
//!
//! # Features
//!
//! - `std`: Enable mocks outside of `cfg(test)`
//! - `defmt`: Enable defmt logging
//!
//! # Example
//!
//! ```no_run
//! use platform::{AdcDigi, AdcUnit};
//!
//! fn stop_filters<D: AdcDigi>(digi: &D) {
//!     for index in 0..digi.capabilities().filter_count {
//!         digi.filter_set_enabled(index, false);
//!     }
//!     let _ = AdcUnit::Unit1;
//! }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer defmt over println! in lib code
// Pedantic lints suppressed for this hardware facade crate:
#![allow(clippy::doc_markdown)] // register and chip names in doc comments
#![allow(clippy::must_use_candidate)] // register accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod adc;
pub mod dma;
pub mod dma_safety;
pub mod interrupt;
pub mod power;
pub mod ring_buffer;
pub mod soc;

#[cfg(any(test, feature = "std"))]
pub mod mocks;

// Re-export the controller facade
pub use adc::{
    AdcChannel, AdcDigi, AdcPattern, AdcUnit, Attenuation, ConvMode, IirCoefficient,
    MonitorStatus, OutputFormat,
};

// Re-export DMA types
pub use dma::{
    DescriptorOwner, DmaDescriptor, DmaError, DmaEvents, GdmaChannel, I2sDmaPort, SpiDmaHost,
    DMA_DESCRIPTOR_MAX_LEN,
};

// Re-export system services
pub use dma_safety::{DmaAligned, Placement};
pub use interrupt::{
    InterruptController, InterruptError, InterruptFlags, InterruptHandle, InterruptSource,
    StatusMask,
};
pub use power::{PmError, PmLock};
pub use ring_buffer::{ByteRing, RingFull};
pub use soc::{AdcCapabilities, DmaTransport, SlotBinding};
