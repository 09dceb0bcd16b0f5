//! Mock implementations for testing
//!
//! This module provides mock implementations of all platform traits
//! for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::vec::Vec;

use crate::{Dividers, DmaDescriptor, I2sPeripheral, Owner, SignalPins, YieldPoint};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock DMA engine + serial transmitter
///
/// Walks the real descriptor chain it was given, one descriptor per
/// [`drain_next`](Self::drain_next) call, and records every word it
/// "clocked out". Register state (armed, enabled, divider history) is
/// observable for assertions.
///
/// Thread-safe: a test may drive it from a simulated hardware thread while
/// the producer runs on another.
#[derive(Debug, Default)]
pub struct MockDmaPeripheral {
    base: AtomicUsize,
    cursor: AtomicUsize,
    completed: AtomicUsize,
    enabled: AtomicBool,
    armed: AtomicBool,
    completions: AtomicUsize,
    programmed: Mutex<Vec<Dividers>>,
    drained: Mutex<Vec<u32>>,
}

impl MockDmaPeripheral {
    /// Create an idle mock peripheral
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the transfer is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Whether the completion signal is armed
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Address handed to [`I2sPeripheral::set_descriptor_chain_base`]
    pub fn chain_base(&self) -> *const DmaDescriptor {
        self.base.load(Ordering::SeqCst) as *const DmaDescriptor
    }

    /// Number of times the dividers were programmed
    pub fn program_count(&self) -> usize {
        lock(&self.programmed).len()
    }

    /// Most recently programmed divider pair
    pub fn last_dividers(&self) -> Option<Dividers> {
        lock(&self.programmed).last().copied()
    }

    /// Number of descriptors drained so far
    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Every word clocked out so far, in order
    pub fn drained(&self) -> Vec<u32> {
        lock(&self.drained).clone()
    }

    /// Take and clear the recorded output
    pub fn take_drained(&self) -> Vec<u32> {
        core::mem::take(&mut *lock(&self.drained))
    }

    /// Overwrite the completed-descriptor register, e.g. to simulate a
    /// spurious interrupt.
    pub fn set_completed_descriptor(&self, desc: *const DmaDescriptor) {
        self.completed.store(desc as usize, Ordering::SeqCst);
    }

    /// Drain one descriptor: copy its buffer into the output record, latch
    /// its address as the completed descriptor and follow its `next` link.
    ///
    /// Returns the number of words clocked out, or `None` if the transfer is
    /// disabled or the descriptor is not owned by the DMA engine.
    pub fn drain_next(&self) -> Option<usize> {
        if !self.is_enabled() {
            return None;
        }
        let current = self.cursor.load(Ordering::SeqCst) as *const DmaDescriptor;
        if current.is_null() {
            return None;
        }

        // Bus access is serialised with the CPU the same way the producer
        // serialises its own writes.
        critical_section::with(|_| {
            // SAFETY: `current` was handed over via `set_descriptor_chain_base`
            // or read from a `next` link of that chain while the transfer is
            // enabled; the chain owner keeps it alive until `disable_transfer`.
            let desc = unsafe { current.read() };
            if desc.owner() != Owner::Dma || desc.buffer.is_null() {
                return None;
            }
            let words = desc.words();
            // SAFETY: the descriptor's length covers `words` initialised u32s
            // starting at `buffer`; access is inside the same critical section
            // the producer uses for its writes.
            let data = unsafe { core::slice::from_raw_parts(desc.buffer.cast_const(), words) };
            lock(&self.drained).extend_from_slice(data);

            self.completed.store(current as usize, Ordering::SeqCst);
            self.cursor.store(desc.next as usize, Ordering::SeqCst);
            self.completions.fetch_add(1, Ordering::SeqCst);
            Some(words)
        })
    }
}

impl I2sPeripheral for MockDmaPeripheral {
    fn set_descriptor_chain_base(&self, base: *const DmaDescriptor) {
        self.base.store(base as usize, Ordering::SeqCst);
        self.cursor.store(base as usize, Ordering::SeqCst);
    }

    fn enable_transfer(&self) {
        self.enabled.store(true, Ordering::SeqCst);
    }

    fn disable_transfer(&self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.cursor.store(0, Ordering::SeqCst);
    }

    fn arm_completion_signal(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    fn disarm_completion_signal(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn read_completed_descriptor(&self) -> *const DmaDescriptor {
        self.completed.load(Ordering::SeqCst) as *const DmaDescriptor
    }

    fn program_dividers(&self, dividers: Dividers) {
        lock(&self.programmed).push(dividers);
    }
}

/// Error returned by [`MockPins`] when configured to refuse the claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

/// Mock signal lines
#[derive(Debug, Default)]
pub struct MockPins {
    claimed: bool,
    claims: usize,
    releases: usize,
    fail_claim: bool,
}

impl MockPins {
    /// Create mock pins that accept every claim
    pub fn new() -> Self {
        Self::default()
    }

    /// Create mock pins whose claim always fails
    pub fn failing() -> Self {
        Self {
            fail_claim: true,
            ..Self::default()
        }
    }

    /// Whether the lines are currently claimed
    pub fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Number of successful claims
    pub fn claims(&self) -> usize {
        self.claims
    }

    /// Number of releases
    pub fn releases(&self) -> usize {
        self.releases
    }
}

impl SignalPins for MockPins {
    type Error = MockPinError;

    fn claim(&mut self) -> Result<(), Self::Error> {
        if self.fail_claim {
            return Err(MockPinError);
        }
        self.claimed = true;
        self.claims = self.claims.saturating_add(1);
        Ok(())
    }

    fn release(&mut self) {
        self.claimed = false;
        self.releases = self.releases.saturating_add(1);
    }
}

/// Mock yield point that counts how often the producer gave up the CPU
#[derive(Debug, Default)]
pub struct MockYield {
    count: AtomicUsize,
}

impl MockYield {
    /// Create a new counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of yields so far
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl YieldPoint for MockYield {
    fn yield_now(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
