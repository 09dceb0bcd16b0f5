//! Fixed buffer pool and its circular descriptor chain.
//!
//! Storage is a pair of arrays sized at compile time. The DMA engine holds raw
//! pointers into both for as long as the chain is enabled, so the pool must
//! live at a stable address (in practice a `static`) and is only ever
//! mutated from inside a critical section.

use core::cell::UnsafeCell;

use critical_section::CriticalSection;
use platform::{DmaDescriptor, Owner};

use crate::error::StreamError;

/// Position of a buffer (and its descriptor) within the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferId(u8);

impl BufferId {
    /// Index into the pool.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Id for pool slot `index`; `None` if it cannot be represented.
    pub fn new(index: usize) -> Option<Self> {
        u8::try_from(index).ok().map(Self)
    }
}

/// Who may touch a buffer right now.
///
/// Every buffer stays linked into the hardware chain permanently; the lease
/// only tracks the software-side hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Lease {
    /// Waiting in the chain to be clocked out, or being clocked out.
    Hardware,
    /// Reclaimed and muted, waiting in the hand-off queue.
    Queued,
    /// Handed to the producer and being filled.
    Filling,
}

/// `N` buffers of `LEN` words plus one descriptor per buffer.
pub struct BufferPool<const N: usize, const LEN: usize> {
    buffers: UnsafeCell<[[u32; LEN]; N]>,
    descriptors: UnsafeCell<[DmaDescriptor; N]>,
}

// SAFETY: every access to the cells goes through a method that takes a
// `CriticalSection` token (or only computes addresses), so CPU-side access is
// serialised. The DMA engine reads concurrently but never writes.
unsafe impl<const N: usize, const LEN: usize> Sync for BufferPool<N, LEN> {}

impl<const N: usize, const LEN: usize> Default for BufferPool<N, LEN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const LEN: usize> BufferPool<N, LEN> {
    /// Smallest pool that can keep one buffer in flight and one queued.
    pub const MIN_BUFFERS: usize = 2;
    /// Largest pool addressable by [`BufferId`].
    pub const MAX_BUFFERS: usize = u8::MAX as usize;
    /// Buffer size in bytes, as written into each descriptor.
    pub const BUFFER_BYTES: usize = LEN.saturating_mul(core::mem::size_of::<u32>());

    /// Create zeroed, unlinked storage.
    pub const fn new() -> Self {
        Self {
            buffers: UnsafeCell::new([[0; LEN]; N]),
            descriptors: UnsafeCell::new([DmaDescriptor::EMPTY; N]),
        }
    }

    /// Whether `N` × `LEN` fits the id type and the 12-bit descriptor length field.
    pub const fn check_geometry() -> Result<(), StreamError> {
        let buffers_ok = N >= Self::MIN_BUFFERS && N <= Self::MAX_BUFFERS;
        let bytes_ok = LEN > 0 && Self::BUFFER_BYTES <= DmaDescriptor::MAX_BYTES;
        if buffers_ok && bytes_ok {
            Ok(())
        } else {
            Err(StreamError::PoolGeometry {
                buffers: N,
                words: LEN,
            })
        }
    }

    /// Zero every buffer and link the descriptors into a circular chain owned
    /// by the DMA engine, each raising a completion.
    ///
    /// Must not be called while the chain is enabled.
    pub fn initialize(&self, _cs: CriticalSection<'_>) -> Result<(), StreamError> {
        Self::check_geometry()?;

        // SAFETY: inside a critical section and with the chain disabled,
        // nothing else holds a reference into the buffers.
        let buffers = unsafe { &mut *self.buffers.get() };
        for buffer in buffers.iter_mut() {
            buffer.fill(0);
        }

        let buffer_base = self.buffers.get().cast::<[u32; LEN]>();
        let descriptor_base = self.descriptors.get().cast::<DmaDescriptor>();
        // SAFETY: as above, the descriptors are not shared while initialising.
        let descriptors = unsafe { &mut *self.descriptors.get() };
        for (i, desc) in descriptors.iter_mut().enumerate() {
            #[allow(clippy::arithmetic_side_effects)] // Safety: i < N, N >= 2 checked above
            let next = (i + 1) % N;
            *desc = DmaDescriptor::EMPTY;
            desc.set_size(Self::BUFFER_BYTES);
            desc.set_length(Self::BUFFER_BYTES);
            desc.set_eof(true);
            desc.set_owner(Owner::Dma);
            desc.buffer = buffer_base.wrapping_add(i).cast::<u32>();
            desc.next = descriptor_base.wrapping_add(next);
        }

        debug!("pool initialised: {} x {} words", N, LEN);
        Ok(())
    }

    /// Unlink and clear the chain and mute every buffer.
    ///
    /// Must only be called after the DMA engine has stopped.
    pub fn teardown(&self, _cs: CriticalSection<'_>) {
        // SAFETY: the engine is stopped and we are inside a critical section.
        let descriptors = unsafe { &mut *self.descriptors.get() };
        descriptors.fill(DmaDescriptor::EMPTY);
        // SAFETY: as above.
        let buffers = unsafe { &mut *self.buffers.get() };
        for buffer in buffers.iter_mut() {
            buffer.fill(0);
        }
        debug!("pool torn down");
    }

    /// Address of the first descriptor, handed to the DMA engine.
    pub fn base(&self) -> *const DmaDescriptor {
        self.descriptors.get().cast::<DmaDescriptor>().cast_const()
    }

    /// Map a descriptor address reported by the engine back to its buffer.
    ///
    /// Returns `None` for addresses outside the chain or not on a descriptor
    /// boundary.
    pub fn descriptor_index(&self, addr: *const DmaDescriptor) -> Option<BufferId> {
        let stride = core::mem::size_of::<DmaDescriptor>();
        let offset = (addr as usize).checked_sub(self.base() as usize)?;
        if offset.checked_rem(stride)? != 0 {
            return None;
        }
        let index = offset.checked_div(stride)?;
        if index < N {
            BufferId::new(index)
        } else {
            None
        }
    }

    /// Address of a buffer's first word.
    pub fn buffer_address(&self, id: BufferId) -> *const u32 {
        self.buffers
            .get()
            .cast::<[u32; LEN]>()
            .wrapping_add(id.index())
            .cast::<u32>()
            .cast_const()
    }

    /// Copy of a descriptor as currently linked.
    pub fn descriptor(&self, id: BufferId, _cs: CriticalSection<'_>) -> Option<DmaDescriptor> {
        // SAFETY: shared read inside a critical section; no `&mut` is live.
        let descriptors = unsafe { &*self.descriptors.get() };
        descriptors.get(id.index()).copied()
    }

    /// Copy of a buffer's contents.
    pub fn snapshot(&self, id: BufferId, _cs: CriticalSection<'_>) -> Option<[u32; LEN]> {
        // SAFETY: shared read inside a critical section; no `&mut` is live.
        let buffers = unsafe { &*self.buffers.get() };
        buffers.get(id.index()).copied()
    }

    /// Mute a buffer.
    pub(crate) fn zero(&self, id: BufferId, _cs: CriticalSection<'_>) {
        // SAFETY: exclusive CPU access inside a critical section.
        let buffers = unsafe { &mut *self.buffers.get() };
        if let Some(buffer) = buffers.get_mut(id.index()) {
            buffer.fill(0);
        }
    }

    /// Store one word; `false` if `id` or `offset` is out of range.
    pub(crate) fn write_word(
        &self,
        id: BufferId,
        offset: usize,
        word: u32,
        _cs: CriticalSection<'_>,
    ) -> bool {
        // SAFETY: exclusive CPU access inside a critical section.
        let buffers = unsafe { &mut *self.buffers.get() };
        match buffers.get_mut(id.index()).and_then(|b| b.get_mut(offset)) {
            Some(slot) => {
                *slot = word;
                true
            }
            None => false,
        }
    }
}
