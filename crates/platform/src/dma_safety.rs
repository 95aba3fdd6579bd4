//! Memory-placement tags and DMA buffer alignment.
//!
//! ## Which memory can do what
//!
//! | Memory region      | DMA-capable | Reachable with flash cache off | Use case |
//! |--------------------|-------------|--------------------------------|----------|
//! | Internal DRAM      | YES         | YES                            | DMA scratch frames, descriptors, ISR state |
//! | Internal IRAM      | NO          | YES                            | ISR code and callbacks |
//! | Flash (cached)     | NO          | NO                             | Ordinary code and constants |
//! | External PSRAM     | chip-dep.   | NO                             | Ring-buffer storage on big pools |
//!
//! ISR callbacks that run while flash cache is disabled (flash writes,
//! OTA) must live in internal RAM together with every piece of state they
//! capture. The compiler cannot see link sections, so the caller states the
//! placement with a [`Placement`] tag when registering a callback; the
//! engine checks the tag once, at registration, against the chip's
//! capabilities.
//!
//! ## Usage
//! ```rust
//! use platform::dma_safety::{DmaAligned, DMA_ALIGN};
//! use platform::DmaDescriptor;
//!
//! // Five 256-byte frames plus their descriptors, in internal DRAM.
//! static mut FRAMES: DmaAligned<[u8; 5 * 256]> = DmaAligned([0u8; 5 * 256]);
//! static DESCRIPTORS: [DmaDescriptor; 5] = [DmaDescriptor::EMPTY; 5];
//! assert_eq!(core::mem::align_of::<DmaAligned<[u8; 4]>>(), DMA_ALIGN);
//! ```

/// Where a callback (and the state it captures) has been placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Placement {
    /// Internal RAM (`#[link_section = ".iram1"]` code, `.dram1` data):
    /// reachable while flash cache is disabled.
    InternalRam,
    /// Cached flash or external RAM.
    Flash,
}

impl Placement {
    /// `true` if code or data tagged with this placement may run inside an
    /// ISR that stays enabled with flash cache disabled.
    #[must_use]
    pub const fn is_isr_safe(self) -> bool {
        matches!(self, Self::InternalRam)
    }
}

/// Required alignment of DMA frame buffers (one 32-bit word).
pub const DMA_ALIGN: usize = 4;

/// A word-aligned wrapper for DMA frame buffers.
///
/// DMA engines fetch whole words; a frame buffer starting mid-word makes the
/// first conversion land at the wrong offset. The engine takes its frame
/// memory as `&mut DmaAligned<[u8]>`, which a `&mut DmaAligned<[u8; N]>`
/// coerces to.
///
/// # Example
///
/// ```
/// use platform::DmaAligned;
///
/// let mut frames = DmaAligned([0u8; 1280]);
/// let frames: &mut DmaAligned<[u8]> = &mut frames;
/// assert_eq!(frames.0.len(), 1280);
/// ```
#[repr(C, align(4))]
pub struct DmaAligned<T: ?Sized>(
    /// The inner value. Must be public so callers can construct and destructure the wrapper.
    pub T,
);
