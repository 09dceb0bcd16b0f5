//! Cooperative suspension for blocking producers.
//!
//! The blocking writer has nothing to do while every buffer is owned by the
//! DMA engine. It calls [`YieldPoint::yield_now`] in a loop until the
//! completion interrupt hands one back. What "yield" means is up to the
//! environment: a spin hint on bare metal, a scheduler yield on a host
//! thread, or a closure that drives simulated hardware in tests.

/// A point where the producer gives up the CPU.
pub trait YieldPoint {
    /// Let other work (including the completion interrupt) make progress.
    fn yield_now(&self);
}

impl<F: Fn()> YieldPoint for F {
    fn yield_now(&self) {
        self();
    }
}

/// Busy-wait hint for bare-metal targets without a scheduler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpinYield;

impl YieldPoint for SpinYield {
    fn yield_now(&self) {
        core::hint::spin_loop();
    }
}

/// Does nothing. Suitable when the completion interrupt preempts the producer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYield;

impl YieldPoint for NoYield {
    fn yield_now(&self) {}
}

/// Yields the current OS thread.
#[cfg(any(test, feature = "std"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadYield;

#[cfg(any(test, feature = "std"))]
impl YieldPoint for ThreadYield {
    fn yield_now(&self) {
        std::thread::yield_now();
    }
}
