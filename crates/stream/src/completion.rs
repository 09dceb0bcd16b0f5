//! Completion handler: runs once per buffer the DMA engine finishes.
//!
//! Call [`DmaRing::on_completion`] (or [`I2sStream::on_completion`]) from the
//! DMA interrupt. It reclaims the finished buffer into the hand-off queue,
//! muting it so an underrun plays silence rather than stale audio.
//!
//! [`I2sStream::on_completion`]: crate::I2sStream::on_completion

use platform::I2sPeripheral;

use crate::ring::{DmaRing, Reclaimed};

enum Outcome {
    Idle,
    Spurious,
    Reclaimed(Reclaimed, Option<fn()>),
}

impl<const N: usize, const LEN: usize> DmaRing<N, LEN> {
    /// Reclaim the buffer the engine just finished.
    ///
    /// Sequence: mask the completion signal, identify the finished
    /// descriptor, then in one critical section mute the buffer and queue it
    /// (evicting the oldest entry if full). The user callback runs after the
    /// state update and before the signal is re-armed.
    ///
    /// Returns `None` if the stream is idle or the engine reports a
    /// descriptor outside the chain. A late completion on an idle ring
    /// leaves the signal masked; a stray descriptor on a running ring
    /// re-arms it.
    pub fn on_completion<S: I2sPeripheral + ?Sized>(&self, dma: &S) -> Option<Reclaimed> {
        dma.disarm_completion_signal();

        let completed = dma.read_completed_descriptor();
        let outcome = critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if !state.active {
                return Outcome::Idle;
            }
            let Some(buffer) = self.pool.descriptor_index(completed) else {
                state.stats.spurious = state.stats.spurious.wrapping_add(1);
                return Outcome::Spurious;
            };
            self.pool.zero(buffer, cs);
            let reclaimed = state.reclaim(buffer, LEN);
            Outcome::Reclaimed(reclaimed, state.callback)
        });

        let (reclaimed, callback) = match outcome {
            Outcome::Idle => {
                debug!("completion after stop ignored");
                return None;
            }
            Outcome::Spurious => {
                warn!("ignored completion for descriptor {}", completed as usize);
                dma.arm_completion_signal();
                return None;
            }
            Outcome::Reclaimed(reclaimed, callback) => (reclaimed, callback),
        };

        trace!("reclaimed buffer {}", reclaimed.buffer.index());
        if let Some(evicted) = reclaimed.evicted {
            warn!("producer behind, dropped queued buffer {}", evicted.index());
        }

        if let Some(callback) = callback {
            callback();
        }

        dma.arm_completion_signal();
        Some(reclaimed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use platform::mocks::MockDmaPeripheral;
    use platform::{DmaDescriptor, I2sPeripheral};

    use crate::pool::Lease;
    use crate::ring::DmaRing;

    fn running(ring: &DmaRing<4, 8>, dma: &MockDmaPeripheral) {
        ring.activate().unwrap();
        dma.set_descriptor_chain_base(ring.pool().base());
        dma.enable_transfer();
        dma.arm_completion_signal();
    }

    #[test]
    fn reclaimed_buffer_is_muted_and_queued() {
        let ring = DmaRing::<4, 8>::new();
        let dma = MockDmaPeripheral::new();
        running(&ring, &dma);

        dma.drain_next().unwrap();
        ring.on_completion(&dma).unwrap();
        assert!(ring.try_write(0xAAAA_5555));
        for _ in 0..3 {
            dma.drain_next().unwrap();
            ring.on_completion(&dma).unwrap();
        }
        // Back around to buffer 0, which carries the sample.
        dma.drain_next().unwrap();
        let r = ring.on_completion(&dma).unwrap();
        assert_eq!(r.buffer.index(), 0);
        assert_eq!(dma.drained().get(32), Some(&0xAAAA_5555));
        critical_section::with(|cs| {
            assert_eq!(ring.pool().snapshot(r.buffer, cs).unwrap(), [0; 8]);
        });
        assert_eq!(ring.lease(r.buffer), Some(Lease::Queued));
        assert!(dma.is_armed());
    }

    #[test]
    fn spurious_descriptor_is_ignored_and_rearmed() {
        let ring = DmaRing::<4, 8>::new();
        let dma = MockDmaPeripheral::new();
        running(&ring, &dma);

        let stray = DmaDescriptor::EMPTY;
        dma.set_completed_descriptor(&stray);
        assert_eq!(ring.on_completion(&dma), None);
        assert!(dma.is_armed());
        assert_eq!(ring.queued(), 0);
        assert_eq!(ring.stats().spurious, 1);
    }

    #[test]
    fn idle_ring_ignores_completions() {
        let ring = DmaRing::<4, 8>::new();
        let dma = MockDmaPeripheral::new();
        dma.set_completed_descriptor(ring.pool().base());
        assert_eq!(ring.on_completion(&dma), None);
        assert_eq!(ring.stats().completions, 0);
        assert!(!dma.is_armed(), "idle ring must not unmask the signal");
    }

    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn count_call() {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    fn callback_runs_once_per_completion() {
        let ring = DmaRing::<4, 8>::new();
        let dma = MockDmaPeripheral::new();
        running(&ring, &dma);
        ring.set_callback(Some(count_call));

        let before = CALLS.load(Ordering::SeqCst);
        for _ in 0..6 {
            dma.drain_next().unwrap();
            ring.on_completion(&dma).unwrap();
        }
        assert_eq!(CALLS.load(Ordering::SeqCst) - before, 6);
        assert_eq!(ring.stats().completions, 6);
        assert_eq!(ring.stats().evictions, 3);
    }
}
