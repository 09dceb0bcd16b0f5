//! End-to-end streaming tests against the mock DMA engine.
//!
//! The mock walks the real descriptor chain, so what it records is exactly
//! what hardware would have clocked out.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::indexing_slicing)]

use std::sync::atomic::{AtomicBool, Ordering};

use i2s_stream::{BufferId, DmaRing, I2sStream, Lease, StreamConfig};
use platform::mocks::{MockDmaPeripheral, MockPins};
use platform::{NoYield, ThreadYield};

const N: usize = 8;
const LEN: usize = 64;

fn non_zero(words: &[u32]) -> Vec<u32> {
    words.iter().copied().filter(|&w| w != 0).collect()
}

/// Drain the whole ring once so every pending buffer reaches the output.
fn flush(ring: &DmaRing<N, LEN>, dma: &MockDmaPeripheral) {
    for _ in 0..N {
        dma.drain_next().unwrap();
        ring.on_completion(dma);
    }
}

// ── Scenario ─────────────────────────────────────────────────────────────────

#[test]
fn available_samples_follows_queue_occupancy() {
    let ring = DmaRing::<N, LEN>::new();
    let dma = MockDmaPeripheral::new();
    let mut stream = I2sStream::new(&ring, &dma, MockPins::new(), NoYield, StreamConfig::default());
    stream.start().unwrap();

    // Queue starts empty: nothing has been reclaimed yet.
    assert_eq!(stream.available_samples(), 512);
    assert!(stream.is_full());
    assert!(!stream.is_empty());

    dma.drain_next().unwrap();
    stream.on_completion().unwrap();
    assert_eq!(stream.available_samples(), 448);

    // Taking the buffer removes it from the queue again.
    assert!(stream.write_sample_nb(1));
    assert_eq!(stream.available_samples(), 512);
}

#[test]
fn starving_producer_fills_queue_and_evicts() {
    let ring = DmaRing::<N, LEN>::new();
    let dma = MockDmaPeripheral::new();
    let mut stream = I2sStream::new(&ring, &dma, MockPins::new(), NoYield, StreamConfig::default());
    stream.start().unwrap();

    for i in 0..N - 1 {
        assert!(!stream.is_empty(), "only {i} queued");
        dma.drain_next().unwrap();
        stream.on_completion().unwrap();
    }
    assert!(stream.is_empty());
    assert_eq!(stream.available_samples(), LEN);

    dma.drain_next().unwrap();
    let r = stream.on_completion().unwrap();
    assert_eq!(r.evicted.map(|b| b.index()), Some(0));
    assert!(stream.is_empty());
    assert_eq!(stream.stats().evictions, 1);
    assert_eq!(ring.lease(r.evicted.unwrap()), Some(Lease::Hardware));

    // The producer resumes with the oldest surviving buffer.
    assert!(stream.write_sample_nb(7));
    assert_eq!(ring.lease(BufferId::new(1).unwrap()), Some(Lease::Filling));
    assert_eq!(stream.stats().handed_out, 1);
}

#[test]
fn reclaimed_buffers_play_silence() {
    let ring = DmaRing::<N, LEN>::new();
    let dma = MockDmaPeripheral::new();
    let mut stream = I2sStream::new(&ring, &dma, MockPins::new(), NoYield, StreamConfig::default());
    stream.start().unwrap();

    dma.drain_next().unwrap();
    stream.on_completion().unwrap();
    for i in 1..=LEN as u32 {
        assert!(stream.write_sample_nb(i));
    }
    // Hardware goes round once with the producer idle.
    flush(&ring, &dma);
    let out = dma.take_drained();
    assert_eq!(non_zero(&out), (1..=LEN as u32).collect::<Vec<_>>());

    // A second lap without new writes is pure silence.
    flush(&ring, &dma);
    assert!(dma.take_drained().iter().all(|&w| w == 0));
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[test]
fn blocking_writer_preserves_order() {
    const TOTAL: u32 = 1_000;
    let ring = DmaRing::<N, LEN>::new();
    let dma = MockDmaPeripheral::new();
    // Each yield lets the "hardware" finish one buffer.
    let hardware = || {
        dma.drain_next();
        ring.on_completion(&dma);
    };
    let mut stream = I2sStream::new(&ring, &dma, MockPins::new(), hardware, StreamConfig::default());
    stream.start().unwrap();

    for sample in 1..=TOTAL {
        assert!(stream.write_sample(sample));
    }
    // The producer kept up: nothing was dropped while it was writing.
    assert_eq!(stream.stats().evictions, 0);

    // A full lap with no pops evicts once (queue holds N - 1) but plays everything.
    flush(&ring, &dma);
    assert_eq!(non_zero(&dma.drained()), (1..=TOTAL).collect::<Vec<_>>());
    assert_eq!(stream.stats().evictions, 1);
    stream.stop().unwrap();
}

#[test]
fn concurrent_producer_and_hardware_preserve_order() {
    const TOTAL: u32 = 5_000;
    let ring = DmaRing::<N, LEN>::new();
    let dma = MockDmaPeripheral::new();
    let mut stream = I2sStream::new(&ring, &dma, MockPins::new(), ThreadYield, StreamConfig::default());
    stream.start().unwrap();
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        let stream = &stream;
        let done = &done;
        let dma = &dma;
        s.spawn(move || {
            // Paced by the producer: clock out a buffer whenever it is blocked.
            while !done.load(Ordering::SeqCst) {
                if stream.is_full() {
                    dma.drain_next();
                    stream.on_completion();
                } else {
                    std::thread::yield_now();
                }
            }
        });
        s.spawn(move || {
            for sample in 1..=TOTAL {
                stream.write_sample(sample);
            }
            done.store(true, Ordering::SeqCst);
        });
    });
    flush(&ring, &dma);

    assert_eq!(non_zero(&dma.drained()), (1..=TOTAL).collect::<Vec<_>>());
    stream.stop().unwrap();
}

// ── Lifecycle ────────────────────────────────────────────────────────────────

#[test]
fn restart_begins_from_a_clean_ring() {
    let ring = DmaRing::<N, LEN>::new();
    let dma = MockDmaPeripheral::new();
    let mut stream = I2sStream::new(&ring, &dma, MockPins::new(), NoYield, StreamConfig::default());
    stream.start().unwrap();
    for _ in 0..3 {
        dma.drain_next().unwrap();
        stream.on_completion().unwrap();
    }
    assert!(stream.write_sample_nb(42));
    stream.stop().unwrap();
    assert!(!stream.write_sample_nb(1), "writes after stop are refused");
    assert_eq!(stream.on_completion(), None);
    dma.take_drained();

    stream.start().unwrap();
    assert_eq!(ring.queued(), 0);
    assert_eq!(stream.stats().completions, 0);
    assert_eq!(stream.available_samples(), N * LEN);
    assert_eq!(ring.in_flight(), BufferId::new(0));

    // Teardown muted the unplayed sample; the new session starts silent.
    flush(&ring, &dma);
    assert_eq!(dma.drained().len(), N * LEN);
    assert!(non_zero(&dma.drained()).is_empty());
}

static CALLBACKS: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

fn on_buffer() {
    CALLBACKS.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn callback_fires_per_completion() {
    let ring = DmaRing::<N, LEN>::new();
    let dma = MockDmaPeripheral::new();
    let mut stream = I2sStream::new(&ring, &dma, MockPins::new(), NoYield, StreamConfig::default());
    stream.set_callback(Some(on_buffer));
    stream.start().unwrap();
    flush(&ring, &dma);
    assert_eq!(CALLBACKS.load(Ordering::SeqCst), N);
    stream.set_callback(None);
    flush(&ring, &dma);
    assert_eq!(CALLBACKS.load(Ordering::SeqCst), N);
}
