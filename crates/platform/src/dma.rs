//! DMA abstraction layer
//!
//! Provides the descriptor type shared by every transport plus one register
//! facade per transport the ADC can borrow:
//!
//! | Facade           | Chip family | Ownership claim                       |
//! |------------------|-------------|---------------------------------------|
//! | [`GdmaChannel`]  | C3, S3, ... | allocate an AHB RX channel            |
//! | [`SpiDmaHost`]   | S2          | claim SPI3 host + its DMA channel     |
//! | [`I2sDmaPort`]   | ESP32       | occupy I2S0 in ADC mode               |
//!
//! Descriptor addresses are plain `usize` values: the engine only compares
//! them, it never dereferences an address handed back by hardware.

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use thiserror_no_std::Error;

use crate::interrupt::InterruptSource;

/// Largest number of bytes one descriptor can describe.
pub const DMA_DESCRIPTOR_MAX_LEN: usize = 4092;

/// Who may touch the buffer behind a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DescriptorOwner {
    /// CPU owns the buffer.
    #[default]
    Cpu,
    /// DMA engine owns the buffer.
    Dma,
}

const DW0_SIZE_MASK: u32 = 0xFFF;
const DW0_LENGTH_SHIFT: u32 = 12;
const DW0_SUC_EOF: u32 = 1 << 30;
const DW0_OWNER_DMA: u32 = 1 << 31;

/// Linked-list DMA descriptor.
///
/// The engine writes `length` and `owner` behind the CPU's back, so every
/// word is accessed atomically through `&self`. The first word packs the
/// fields the way the hardware does: `size` in bits `0..12`, `length` in
/// `12..24`, `suc_eof` in bit 30, `owner` in bit 31.
#[derive(Debug)]
#[repr(C)]
pub struct DmaDescriptor {
    dw0: AtomicU32,
    buffer: AtomicUsize,
    next: AtomicUsize,
}

impl DmaDescriptor {
    /// Unlinked, CPU-owned descriptor.
    #[allow(clippy::declare_interior_mutable_const)] // array-repeat initialiser
    pub const EMPTY: Self = Self::new();

    /// Unlinked, CPU-owned descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dw0: AtomicU32::new(0),
            buffer: AtomicUsize::new(0),
            next: AtomicUsize::new(0),
        }
    }

    /// Address of this descriptor as seen by the DMA engine.
    #[must_use]
    pub fn addr(&self) -> usize {
        (self as *const Self) as usize
    }

    fn dw0(&self) -> u32 {
        self.dw0.load(Ordering::Acquire)
    }

    /// Capacity of the buffer in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        (self.dw0() & DW0_SIZE_MASK) as usize
    }

    /// Bytes the engine wrote on its last pass.
    #[must_use]
    pub fn length(&self) -> usize {
        (self.dw0().wrapping_shr(DW0_LENGTH_SHIFT) & DW0_SIZE_MASK) as usize
    }

    /// The engine raises an EOF event after filling this buffer.
    #[must_use]
    pub fn suc_eof(&self) -> bool {
        self.dw0() & DW0_SUC_EOF != 0
    }

    /// Current owner.
    #[must_use]
    pub fn owner(&self) -> DescriptorOwner {
        if self.dw0() & DW0_OWNER_DMA == 0 {
            DescriptorOwner::Cpu
        } else {
            DescriptorOwner::Dma
        }
    }

    /// Address of the data buffer.
    #[must_use]
    pub fn buffer(&self) -> usize {
        self.buffer.load(Ordering::Acquire)
    }

    /// Address of the next descriptor, or 0 at the end of a chain.
    #[must_use]
    pub fn next(&self) -> usize {
        self.next.load(Ordering::Acquire)
    }

    /// Record a completed pass of `length` bytes and hand the buffer to the
    /// CPU. This is the engine's write-back; board code and mocks that
    /// model the engine call it.
    pub fn complete(&self, length: usize) {
        let length = u32::try_from(length.min(self.size())).unwrap_or(0);
        let dw0 = self.dw0() & !(DW0_SIZE_MASK.wrapping_shl(DW0_LENGTH_SHIFT) | DW0_OWNER_DMA);
        self.dw0
            .store(dw0 | length.wrapping_shl(DW0_LENGTH_SHIFT), Ordering::Release);
    }
}

impl Default for DmaDescriptor {
    fn default() -> Self {
        Self::new()
    }
}

/// Link `descriptors` into a circular RX chain over `buffer`, one
/// `frame_size`-byte frame per descriptor, every frame raising EOF.
///
/// Returns the address of the chain head, or `None` if the memory does not
/// hold one frame per descriptor or `frame_size` exceeds
/// [`DMA_DESCRIPTOR_MAX_LEN`].
#[allow(clippy::arithmetic_side_effects)] // Safety: i < descriptors.len() and buffer.len() >= len * frame_size checked above
pub fn link_circular(
    descriptors: &[DmaDescriptor],
    buffer: &mut [u8],
    frame_size: usize,
) -> Option<usize> {
    let count = descriptors.len();
    if count == 0 || frame_size == 0 || frame_size > DMA_DESCRIPTOR_MAX_LEN {
        return None;
    }
    if buffer.len() < count.checked_mul(frame_size)? {
        return None;
    }
    let size = u32::try_from(frame_size).ok()?;
    let base = buffer.as_mut_ptr() as usize;
    let head = descriptors.as_ptr() as usize;
    let stride = core::mem::size_of::<DmaDescriptor>();

    for (i, desc) in descriptors.iter().enumerate() {
        let next = if i + 1 == count { head } else { head + (i + 1) * stride };
        desc.buffer.store(base + i * frame_size, Ordering::Relaxed);
        desc.next.store(next, Ordering::Relaxed);
        desc.dw0
            .store(size | DW0_SUC_EOF | DW0_OWNER_DMA, Ordering::Release);
    }
    Some(head)
}

/// Index of the descriptor at `addr` within a chain starting at `head`.
///
/// Returns `None` for addresses that are not a descriptor boundary inside
/// the first `count` descriptors.
pub fn descriptor_index(head: usize, addr: usize, count: usize) -> Option<usize> {
    let stride = core::mem::size_of::<DmaDescriptor>();
    let offset = addr.checked_sub(head)?;
    if offset.checked_rem(stride)? != 0 {
        return None;
    }
    let index = offset.checked_div(stride)?;
    (index < count).then_some(index)
}

// ── Events ──────────────────────────────────────────────────────────────────

/// Set of RX-side DMA events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct DmaEvents(u32);

impl DmaEvents {
    /// No events.
    pub const NONE: Self = Self(0);
    /// A descriptor flagged `suc_eof` was filled.
    pub const SUC_EOF: Self = Self(1 << 0);
    /// The peripheral reported an error at end of frame.
    pub const ERR_EOF: Self = Self(1 << 1);
    /// The engine ran out of DMA-owned descriptors.
    pub const DSCR_EMPTY: Self = Self(1 << 2);

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Wrap raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// `true` if every bit of `other` is set in `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    /// Bitwise union.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `true` when no bit is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Peripheral that can carry ADC samples into memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaTrigger {
    /// SAR ADC digital controller.
    Adc,
}

/// Errors claiming a DMA transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// The peripheral is owned by another driver.
    #[error("DMA peripheral occupied by another driver")]
    Busy,
    /// No DMA channel is free.
    #[error("no free DMA channel")]
    NoChannel,
}

// ── Transport facades ───────────────────────────────────────────────────────

/// General-purpose DMA RX channel.
pub trait GdmaChannel {
    /// Allocate an RX channel and connect it to `trigger`.
    fn acquire(&mut self, trigger: DmaTrigger) -> Result<(), DmaError>;
    /// Disconnect and free the channel.
    fn release(&mut self);
    /// Interrupt source of the allocated channel.
    fn interrupt_source(&self) -> InterruptSource;
    /// Unmask or mask RX events.
    fn set_rx_events_enabled(&mut self, events: DmaEvents, enabled: bool);
    /// Pending RX events.
    fn rx_events(&self) -> DmaEvents;
    /// Clear RX events.
    fn clear_rx_events(&mut self, events: DmaEvents);
    /// Address of the descriptor that raised the last successful EOF.
    fn rx_eof_descriptor(&self) -> usize;
    /// Reset the RX state machine and FIFO.
    fn rx_reset(&mut self);
    /// Start fetching descriptors at `head`.
    fn rx_start(&mut self, head: usize);
    /// Stop the RX engine.
    fn rx_stop(&mut self);
}

/// SPI host whose DMA inlink is borrowed by the ADC.
pub trait SpiDmaHost {
    /// Claim the SPI host; fails with [`DmaError::Busy`] if a SPI driver
    /// owns it.
    fn claim_host(&mut self) -> Result<(), DmaError>;
    /// Release the SPI host.
    fn free_host(&mut self);
    /// Allocate the DMA channel that serves the host.
    fn alloc_dma_channel(&mut self) -> Result<(), DmaError>;
    /// Free the DMA channel.
    fn free_dma_channel(&mut self);
    /// Interrupt source of the host's DMA.
    fn interrupt_source(&self) -> InterruptSource;
    /// Unmask or mask interrupt bits.
    fn set_intr_enabled(&mut self, events: DmaEvents, enabled: bool);
    /// Pending interrupt bits.
    fn intr_status(&self) -> DmaEvents;
    /// Clear interrupt bits.
    fn clear_intr(&mut self, events: DmaEvents);
    /// Address of the descriptor that raised the last in-suc-EOF.
    fn in_suc_eof_descriptor(&self) -> usize;
    /// Reset the DMA inlink.
    fn dma_rx_reset(&mut self);
    /// Reset the host's RX FIFO.
    fn rx_fifo_reset(&mut self);
    /// Start the inlink at `head`.
    fn dma_rx_start(&mut self, head: usize);
    /// Stop the inlink.
    fn dma_rx_stop(&mut self);
}

/// I2S port operated in ADC DMA mode.
pub trait I2sDmaPort {
    /// Mark the port occupied by `owner`; fails with [`DmaError::Busy`] if
    /// another driver holds it.
    fn acquire_occupation(&mut self, owner: &'static str) -> Result<(), DmaError>;
    /// Release the occupation.
    fn release_occupation(&mut self);
    /// Interrupt source of the port.
    fn interrupt_source(&self) -> InterruptSource;
    /// Unmask or mask interrupt bits.
    fn set_intr_enabled(&mut self, events: DmaEvents, enabled: bool);
    /// Pending interrupt bits.
    fn intr_status(&self) -> DmaEvents;
    /// Clear interrupt bits.
    fn clear_intr(&mut self, events: DmaEvents);
    /// Address of the descriptor that raised the last RX EOF.
    fn rx_eof_descriptor(&self) -> usize;
    /// Route the port's RX through DMA.
    fn enable_dma(&mut self, enabled: bool);
    /// Reset the RX DMA engine.
    fn rx_reset_dma(&mut self);
    /// Reset the RX FIFO.
    fn rx_reset_fifo(&mut self);
    /// Point the RX inlink at `head` and start it.
    fn rx_start_link(&mut self, head: usize);
    /// Stop the RX inlink.
    fn rx_stop_link(&mut self);
    /// Start RX.
    fn rx_start(&mut self);
    /// Stop RX.
    fn rx_stop(&mut self);
}
