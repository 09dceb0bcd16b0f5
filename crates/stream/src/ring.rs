//! Shared state between the producer and the completion interrupt.
//!
//! [`DmaRing`] owns the buffer pool and everything both contexts touch: the
//! hand-off queue, the write cursor, per-buffer leases and counters. All of it
//! sits behind a `critical_section::Mutex`, so every read-modify-write is one
//! masked section and neither side can observe a half-updated queue.
//!
//! Declare the ring as a `static` and hand `&'static` references to the
//! stream; the DMA engine keeps raw pointers into it while running.
//!
//! ```
//! use i2s_stream::DefaultRing;
//!
//! static RING: DefaultRing = DefaultRing::new();
//! assert_eq!(RING.available_samples(), 8 * 64);
//! ```

use core::cell::RefCell;

use critical_section::Mutex;

use crate::error::StreamError;
use crate::handoff::HandoffQueue;
use crate::pool::{BufferId, BufferPool, Lease};

/// Producer position inside the buffer it is filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    pub(crate) buffer: BufferId,
    pub(crate) offset: usize,
}

/// Running counters, reset on every `start`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamStats {
    /// Buffers clocked out and reclaimed.
    pub completions: u32,
    /// Queued buffers dropped because the producer fell behind.
    pub evictions: u32,
    /// Buffers handed to the producer.
    pub handed_out: u32,
    /// Buffers clocked out while the producer was still filling them.
    pub underruns: u32,
    /// Completion signals whose descriptor was not part of the chain.
    pub spurious: u32,
}

impl StreamStats {
    const fn new() -> Self {
        Self {
            completions: 0,
            evictions: 0,
            handed_out: 0,
            underruns: 0,
            spurious: 0,
        }
    }
}

/// Outcome of one completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reclaimed {
    /// Buffer that finished and was queued.
    pub buffer: BufferId,
    /// Older queued buffer dropped to make room.
    pub evicted: Option<BufferId>,
}

pub(crate) struct RingState<const N: usize> {
    pub(crate) active: bool,
    pub(crate) queue: HandoffQueue<N>,
    pub(crate) cursor: Option<Cursor>,
    pub(crate) leases: [Lease; N],
    pub(crate) in_flight: Option<BufferId>,
    pub(crate) callback: Option<fn()>,
    pub(crate) stats: StreamStats,
}

impl<const N: usize> RingState<N> {
    const fn new() -> Self {
        Self {
            active: false,
            queue: HandoffQueue::new(),
            cursor: None,
            leases: [Lease::Hardware; N],
            in_flight: None,
            callback: None,
            stats: StreamStats::new(),
        }
    }

    /// Back to the post-initialisation state: nothing queued, no cursor,
    /// every buffer in the chain. The callback survives.
    fn reset(&mut self) {
        self.queue.clear();
        self.cursor = None;
        self.leases = [Lease::Hardware; N];
        self.in_flight = BufferId::new(0);
        self.stats = StreamStats::new();
    }

    fn set_lease(&mut self, id: BufferId, lease: Lease) {
        if let Some(slot) = self.leases.get_mut(id.index()) {
            *slot = lease;
        }
    }

    pub(crate) fn lease(&self, id: BufferId) -> Option<Lease> {
        self.leases.get(id.index()).copied()
    }

    /// Queue a buffer the engine has just finished.
    pub(crate) fn reclaim(&mut self, buffer: BufferId, words: usize) -> Reclaimed {
        debug_assert_ne!(
            self.lease(buffer),
            Some(Lease::Queued),
            "hardware completed a buffer that was waiting in the queue"
        );

        if let Some(cursor) = self.cursor {
            if cursor.buffer == buffer {
                // Muted under the producer; make it start on a fresh buffer.
                if cursor.offset < words {
                    self.stats.underruns = self.stats.underruns.wrapping_add(1);
                }
                self.cursor = None;
            }
        }

        let evicted = self.queue.push(buffer);
        self.set_lease(buffer, Lease::Queued);
        if let Some(old) = evicted {
            self.set_lease(old, Lease::Hardware);
            self.stats.evictions = self.stats.evictions.wrapping_add(1);
        }

        #[allow(clippy::arithmetic_side_effects)] // Safety: index < N, N >= 2
        let next = BufferId::new((buffer.index() + 1) % N);
        self.in_flight = next;
        debug_assert!(
            next.map_or(true, |id| !self.queue.contains(id)),
            "in-flight buffer is queued"
        );

        self.stats.completions = self.stats.completions.wrapping_add(1);
        Reclaimed { buffer, evicted }
    }

    /// Pop the next reclaimed buffer and point the cursor at its start.
    pub(crate) fn take_next_buffer(&mut self) -> Result<Cursor, StreamError> {
        let buffer = self.queue.pop()?;
        debug_assert_eq!(
            self.lease(buffer),
            Some(Lease::Queued),
            "popped a buffer that was not queued"
        );
        if let Some(previous) = self.cursor {
            if self.lease(previous.buffer) == Some(Lease::Filling) {
                self.set_lease(previous.buffer, Lease::Hardware);
            }
        }
        self.set_lease(buffer, Lease::Filling);
        self.stats.handed_out = self.stats.handed_out.wrapping_add(1);
        Ok(Cursor { buffer, offset: 0 })
    }

    pub(crate) fn cursor_exhausted(&self, words: usize) -> bool {
        self.cursor.map_or(true, |c| c.offset >= words)
    }
}

/// Buffer pool plus the state shared by producer and completion handler.
pub struct DmaRing<const N: usize, const LEN: usize> {
    pub(crate) pool: BufferPool<N, LEN>,
    pub(crate) state: Mutex<RefCell<RingState<N>>>,
}

impl<const N: usize, const LEN: usize> Default for DmaRing<N, LEN> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, const LEN: usize> DmaRing<N, LEN> {
    /// Create an idle ring. `const` so it can initialise a `static`.
    pub const fn new() -> Self {
        Self {
            pool: BufferPool::new(),
            state: Mutex::new(RefCell::new(RingState::new())),
        }
    }

    /// The underlying storage.
    pub fn pool(&self) -> &BufferPool<N, LEN> {
        &self.pool
    }

    /// Initialise the pool and reset the shared state for a new session.
    pub(crate) fn activate(&self) -> Result<(), StreamError> {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if state.active {
                return Err(StreamError::AlreadyRunning);
            }
            self.pool.initialize(cs)?;
            state.reset();
            state.active = true;
            Ok(())
        })
    }

    /// Tear the pool down. The engine must already be stopped.
    ///
    /// Leases go back to `Hardware`; counters are kept until the next start.
    pub(crate) fn deactivate(&self) {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            state.active = false;
            state.queue.clear();
            state.cursor = None;
            state.leases = [Lease::Hardware; N];
            state.in_flight = None;
            self.pool.teardown(cs);
        });
    }

    /// Whether a session is running on this ring.
    pub fn is_active(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).active)
    }

    /// Register (or clear) the function called after every reclaimed buffer.
    ///
    /// It runs in interrupt context: no blocking, no allocation.
    pub fn set_callback(&self, callback: Option<fn()>) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).callback = callback);
    }

    /// No buffer to write into: the cursor is used up (or was never set)
    /// and nothing is queued.
    pub fn is_full(&self) -> bool {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            state.cursor_exhausted(LEN) && state.queue.is_empty()
        })
    }

    /// Every buffer except the one in flight is queued: the producer has
    /// fallen behind and the output is silent.
    pub fn is_empty(&self) -> bool {
        critical_section::with(|cs| self.state.borrow_ref(cs).queue.is_full())
    }

    /// `(N - queued) * LEN` words of output still owned by hardware or the producer.
    pub fn available_samples(&self) -> usize {
        critical_section::with(|cs| {
            let queued = self.state.borrow_ref(cs).queue.len();
            N.saturating_sub(queued).saturating_mul(LEN)
        })
    }

    /// Number of reclaimed buffers waiting for the producer.
    pub fn queued(&self) -> usize {
        critical_section::with(|cs| self.state.borrow_ref(cs).queue.len())
    }

    /// Lease of a buffer.
    pub fn lease(&self, id: BufferId) -> Option<Lease> {
        critical_section::with(|cs| self.state.borrow_ref(cs).lease(id))
    }

    /// Buffer the engine is draining now, if running.
    pub fn in_flight(&self) -> Option<BufferId> {
        critical_section::with(|cs| self.state.borrow_ref(cs).in_flight)
    }

    /// Counter snapshot.
    pub fn stats(&self) -> StreamStats {
        critical_section::with(|cs| self.state.borrow_ref(cs).stats)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn id(i: usize) -> BufferId {
        BufferId::new(i).unwrap()
    }

    #[test]
    fn reclaim_then_take_moves_leases() {
        let mut s = RingState::<4>::new();
        s.reset();
        let r = s.reclaim(id(0), 16);
        assert_eq!(r, Reclaimed { buffer: id(0), evicted: None });
        assert_eq!(s.lease(id(0)), Some(Lease::Queued));
        assert_eq!(s.in_flight, Some(id(1)));

        let c = s.take_next_buffer().unwrap();
        assert_eq!(c, Cursor { buffer: id(0), offset: 0 });
        assert_eq!(s.lease(id(0)), Some(Lease::Filling));
        assert_eq!(s.stats.handed_out, 1);
    }

    #[test]
    fn eviction_returns_buffer_to_hardware() {
        let mut s = RingState::<4>::new();
        s.reset();
        for i in 0..3 {
            assert_eq!(s.reclaim(id(i), 16).evicted, None);
        }
        let r = s.reclaim(id(3), 16);
        assert_eq!(r.evicted, Some(id(0)));
        assert_eq!(s.lease(id(0)), Some(Lease::Hardware));
        assert_eq!(s.stats.evictions, 1);
        assert_eq!(s.in_flight, Some(id(0)));
    }

    #[test]
    fn reclaiming_the_cursor_buffer_drops_the_cursor() {
        let mut s = RingState::<3>::new();
        s.reset();
        s.reclaim(id(0), 8);
        let mut c = s.take_next_buffer().unwrap();
        c.offset = 5;
        s.cursor = Some(c);
        s.reclaim(id(1), 8);
        s.reclaim(id(2), 8);
        s.reclaim(id(0), 8);
        assert_eq!(s.cursor, None);
        assert_eq!(s.stats.underruns, 1);
        assert_eq!(s.lease(id(0)), Some(Lease::Queued));
    }

    #[test]
    fn take_from_empty_queue_fails_without_side_effects() {
        let mut s = RingState::<4>::new();
        s.reset();
        assert_eq!(s.take_next_buffer(), Err(StreamError::EmptyQueue));
        assert_eq!(s.stats.handed_out, 0);
        assert_eq!(s.cursor, None);
    }
}
