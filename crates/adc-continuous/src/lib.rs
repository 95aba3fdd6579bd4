//! ADC continuous-mode acquisition engine
//!
//! Streams ADC conversion frames through DMA into a ring buffer, and manages
//! the digital controller's small pools of hardware IIR filters and
//! threshold monitors.
//!
//! # Architecture
//!
//! ```text
//! task: config() / start() ──► AdcContinuous ──► DmaBackend (GDMA | SPI | I2S)
//!                                   │                    │ completion IRQ
//!                                   │                    ▼
//! task: read() ◄── ByteRing ◄── on_dma_interrupt ── on_conv_done / on_pool_ovf
//!
//! threshold IRQ ──► on_monitor_interrupt ──► on_over_high / on_below_low
//! ```
//!
//! - [`AdcContinuous`] - the context and its Init/Started state machine
//! - [`backend`] - one DMA lifecycle over three transports
//! - [`filter`] and [`monitor`] - slot claim/release, enable/disable
//! - [`claim`] - unit-bound vs. free-pool slot assignment
//! - [`frame`] - decoding of raw conversion frames
//!
//! All hardware is reached through the [`platform`] facades, so the whole
//! engine runs on the host against `platform::mocks`.
//!
//! # Interrupt context
//!
//! The board routes two interrupts into the context:
//! [`AdcContinuous::on_dma_interrupt`] and
//! [`AdcContinuous::on_monitor_interrupt`]. Both, plus
//! [`AdcContinuous::enable_monitor`] and [`AdcContinuous::disable_monitor`],
//! are safe to call from an ISR: they only take short critical sections and
//! never log.
//!
//! # Features
//!
//! - `std`: Enable the `platform` mocks outside of `cfg(test)`
//! - `defmt`: Enable defmt logging

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)]
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::print_stdout)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod callback;
pub mod claim;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
pub mod frame;
pub mod monitor;
mod stream;

pub use backend::{DmaBackend, GdmaBackend, I2sDmaBackend, SpiDmaBackend};
pub use callback::{
    ConvFrameEvent, ConvFrameFn, EventCallbacks, IsrCallback, MonitorCallbacks, MonitorEvent,
    MonitorEventKind, MonitorFn,
};
pub use config::{AdcContinuousConfig, FilterConfig, HandleConfig, MonitorConfig, INTERNAL_BUF_NUM};
pub use context::{AdcContinuous, AdcDmaMemory, AdcPeripherals, AdcState};
pub use error::{AdcError, Result};
pub use filter::FilterHandle;
pub use frame::AdcSample;
pub use monitor::{MonitorHandle, MonitorState};
