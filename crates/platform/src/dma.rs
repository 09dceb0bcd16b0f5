//! DMA abstraction layer
//!
//! The serial transmitter is fed by a linked-list DMA engine. Software lays out
//! a chain of [`DmaDescriptor`] records, each pointing at one sample buffer and
//! at the next record, hands the chain base to the engine and then only
//! observes completions. [`I2sPeripheral`] is the register-level seam.

use crate::audio_types::Dividers;

/// Which side currently owns a descriptor and its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Owner {
    /// Software may touch the buffer.
    Cpu,
    /// The DMA engine may read the buffer.
    Dma,
}

/// One link in a DMA descriptor chain.
///
/// Layout matches the engine's expectation: a packed flags word followed by
/// the buffer address and the address of the next descriptor.
///
/// ```text
///  31    30   29  28..24  23 ....... 12  11 ........ 0
/// owner  eof  sof unused  length (bytes)  size (bytes)
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DmaDescriptor {
    /// Packed size / length / flag bits, see the type-level diagram.
    pub flags: u32,
    /// Start of the sample buffer this descriptor covers.
    pub buffer: *mut u32,
    /// Next descriptor in the chain (null when unlinked).
    pub next: *mut DmaDescriptor,
}

#[allow(clippy::arithmetic_side_effects)] // Safety: shifts are by constants < 32
impl DmaDescriptor {
    /// A zeroed, unlinked descriptor.
    pub const EMPTY: Self = Self {
        flags: 0,
        buffer: core::ptr::null_mut(),
        next: core::ptr::null_mut(),
    };

    /// Largest byte count the 12-bit size and length fields can express.
    pub const MAX_BYTES: usize = 0x0FFF;

    const SIZE_SHIFT: u32 = 0;
    const LENGTH_SHIFT: u32 = 12;
    const FIELD_MASK: u32 = 0x0FFF;
    const SOF_BIT: u32 = 1 << 29;
    const EOF_BIT: u32 = 1 << 30;
    const OWNER_BIT: u32 = 1 << 31;

    /// Buffer capacity in bytes.
    pub fn size(&self) -> usize {
        ((self.flags >> Self::SIZE_SHIFT) & Self::FIELD_MASK) as usize
    }

    /// Set the buffer capacity; values above [`Self::MAX_BYTES`] are truncated to 12 bits.
    #[allow(clippy::cast_possible_truncation)] // Safety: masked to 12 bits below
    pub fn set_size(&mut self, bytes: usize) {
        let field = (bytes as u32) & Self::FIELD_MASK;
        self.flags =
            (self.flags & !(Self::FIELD_MASK << Self::SIZE_SHIFT)) | (field << Self::SIZE_SHIFT);
    }

    /// Number of valid bytes the engine will clock out.
    pub fn length(&self) -> usize {
        ((self.flags >> Self::LENGTH_SHIFT) & Self::FIELD_MASK) as usize
    }

    /// Set the valid byte count; values above [`Self::MAX_BYTES`] are truncated to 12 bits.
    #[allow(clippy::cast_possible_truncation)] // Safety: masked to 12 bits below
    pub fn set_length(&mut self, bytes: usize) {
        let field = (bytes as u32) & Self::FIELD_MASK;
        self.flags =
            (self.flags & !(Self::FIELD_MASK << Self::LENGTH_SHIFT)) | (field << Self::LENGTH_SHIFT);
    }

    /// Whether the engine raises a completion for this descriptor.
    pub fn is_eof(&self) -> bool {
        self.flags & Self::EOF_BIT != 0
    }

    /// Request (or suppress) a completion for this descriptor.
    pub fn set_eof(&mut self, eof: bool) {
        self.set_bit(Self::EOF_BIT, eof);
    }

    /// Start-of-frame marker (unused by the output path, kept clear).
    pub fn is_sof(&self) -> bool {
        self.flags & Self::SOF_BIT != 0
    }

    /// Current owner.
    pub fn owner(&self) -> Owner {
        if self.flags & Self::OWNER_BIT != 0 {
            Owner::Dma
        } else {
            Owner::Cpu
        }
    }

    /// Hand the descriptor to `owner`.
    pub fn set_owner(&mut self, owner: Owner) {
        self.set_bit(Self::OWNER_BIT, owner == Owner::Dma);
    }

    /// Buffer capacity in 32-bit words.
    pub fn words(&self) -> usize {
        self.length() / core::mem::size_of::<u32>()
    }

    fn set_bit(&mut self, bit: u32, value: bool) {
        if value {
            self.flags |= bit;
        } else {
            self.flags &= !bit;
        }
    }
}

impl Default for DmaDescriptor {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// DMA engine plus serial transmitter, as seen by the ring-buffer manager.
///
/// Methods take `&self`: implementations are thin wrappers over memory-mapped
/// registers and are called from both the producer and the completion
/// interrupt. None of them can fail.
pub trait I2sPeripheral {
    /// Point the engine's outbound link register at the first descriptor.
    fn set_descriptor_chain_base(&self, base: *const DmaDescriptor);

    /// Start walking the chain.
    fn enable_transfer(&self);

    /// Stop walking the chain. The engine no longer dereferences any descriptor.
    fn disable_transfer(&self);

    /// Clear any pending completion and unmask the completion interrupt.
    fn arm_completion_signal(&self);

    /// Mask the completion interrupt.
    fn disarm_completion_signal(&self);

    /// Address of the descriptor whose buffer the engine finished last.
    fn read_completed_descriptor(&self) -> *const DmaDescriptor;

    /// Program the two cascaded serial clock dividers.
    fn program_dividers(&self, dividers: Dividers);
}

impl<T: I2sPeripheral + ?Sized> I2sPeripheral for &T {
    fn set_descriptor_chain_base(&self, base: *const DmaDescriptor) {
        (**self).set_descriptor_chain_base(base);
    }

    fn enable_transfer(&self) {
        (**self).enable_transfer();
    }

    fn disable_transfer(&self) {
        (**self).disable_transfer();
    }

    fn arm_completion_signal(&self) {
        (**self).arm_completion_signal();
    }

    fn disarm_completion_signal(&self) {
        (**self).disarm_completion_signal();
    }

    fn read_completed_descriptor(&self) -> *const DmaDescriptor {
        (**self).read_completed_descriptor()
    }

    fn program_dividers(&self, dividers: Dividers) {
        (**self).program_dividers(dividers);
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn fields_do_not_overlap() {
        let mut d = DmaDescriptor::EMPTY;
        d.set_size(256);
        d.set_length(256);
        d.set_eof(true);
        d.set_owner(Owner::Dma);
        assert_eq!(d.size(), 256);
        assert_eq!(d.length(), 256);
        assert!(d.is_eof());
        assert!(!d.is_sof());
        assert_eq!(d.owner(), Owner::Dma);
        assert_eq!(d.words(), 64);
        assert_eq!(d.flags, 0xC010_0100);

        d.set_owner(Owner::Cpu);
        d.set_eof(false);
        assert_eq!(d.flags, 0x0010_0100);
    }

    #[test]
    fn oversize_values_are_truncated_to_field_width() {
        let mut d = DmaDescriptor::EMPTY;
        d.set_length(0x1_0004);
        assert_eq!(d.length(), 4);
        assert_eq!(d.size(), 0);
    }

    #[test]
    fn descriptor_is_three_words() {
        assert_eq!(
            core::mem::size_of::<DmaDescriptor>(),
            3 * core::mem::size_of::<usize>()
        );
    }
}
