//! Property-based tests for the hand-off queue.
//! Random push/pop sequences are checked against a plain drop-oldest model.

#![allow(clippy::arithmetic_side_effects)]
#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;

use i2s_stream::{DmaRing, HandoffQueue, StreamError};
use platform::mocks::{MockDmaPeripheral, MockPins};
use platform::NoYield;
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Complete,
    Pop,
}

fn ops() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(prop_oneof![Just(Op::Complete), Just(Op::Pop)], 0..200)
}

proptest! {
    /// Length stays within [0, N-1] and contents follow drop-oldest FIFO order.
    #[test]
    fn queue_matches_drop_oldest_model(ops in ops()) {
        const N: usize = 8;
        let ring = DmaRing::<N, 4>::new();
        let dma = MockDmaPeripheral::new();
        let mut stream = i2s_stream::I2sStream::new(
            &ring,
            &dma,
            MockPins::new(),
            NoYield,
            i2s_stream::StreamConfig::default(),
        );
        stream.start().unwrap();

        let mut model: VecDeque<usize> = VecDeque::new();
        let mut next_hw = 0usize;
        for op in ops {
            match op {
                Op::Complete => {
                    dma.drain_next().unwrap();
                    let r = stream.on_completion().unwrap();
                    assert_eq!(r.buffer.index(), next_hw);
                    next_hw = (next_hw + 1) % N;
                    let evicted = if model.len() == N - 1 { model.pop_front() } else { None };
                    model.push_back(r.buffer.index());
                    assert_eq!(r.evicted.map(|b| b.index()), evicted);
                }
                Op::Pop => {
                    // Write a full buffer's worth so the next write pops again.
                    let popped = (0..4).all(|_| stream.write_sample_nb(1));
                    let expected = model.pop_front();
                    assert_eq!(popped, expected.is_some());
                    if !popped {
                        assert!(stream.is_full());
                    }
                }
            }
            let len = ring.queued();
            assert!(len <= N - 1, "queue length {len} exceeds N-1");
            assert_eq!(len, model.len());
            assert_eq!(stream.is_empty(), len == N - 1);
            assert_eq!(stream.available_samples(), (N - len) * 4);
        }
    }
}

#[test]
fn empty_pop_is_an_error() {
    let mut q = HandoffQueue::<8>::new();
    assert_eq!(q.pop(), Err(StreamError::EmptyQueue));
}
