//! DMA ring-buffer streamer for I2S sample output
//!
//! Moves pre-computed 32-bit sample words from application code to a serial
//! transmitter through a circular chain of DMA descriptors. The producer
//! fills buffers, the DMA engine drains them at the programmed sample rate,
//! and a completion interrupt hands each drained buffer back.
//!
//! # Data flow
//!
//! ```text
//!   write_sample ──► [Filling] ──► chain ──► DMA engine ──► serial out
//!        ▲                                        │
//!        │                                  completion IRQ
//!        └──── hand-off queue (N-1) ◄── mute + reclaim (drop-oldest)
//! ```
//!
//! # Modules
//!
//! - [`pool`] - buffers, descriptors and leases
//! - [`handoff`] - drop-oldest FIFO between interrupt and producer
//! - [`ring`] - shared state behind a critical section
//! - [`completion`] - the interrupt-side reclaim
//! - [`writer`] - blocking, non-blocking and async sample writers
//! - [`rate`] - sample rate → divider pair search
//! - [`stream`] - start/stop lifecycle
//!
//! # Features
//!
//! - `defmt`: log through defmt and derive `defmt::Format` (hardware builds)
//! - `tracing`: log through tracing (host builds)
//! - `std`: enable `platform/std` for host mocks

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[macro_use]
mod fmt;

pub mod completion;
pub mod config;
pub mod error;
pub mod handoff;
pub mod pool;
pub mod rate;
pub mod ring;
pub mod stream;
pub mod writer;

pub use config::{
    DefaultRing, StreamConfig, DEFAULT_BUFFER_WORDS, DEFAULT_POOL_SIZE, DEFAULT_SAMPLE_RATE_HZ,
};
pub use error::StreamError;
pub use handoff::HandoffQueue;
pub use pool::{BufferId, BufferPool, Lease};
pub use rate::{real_rate, solve_dividers, RateState};
pub use ring::{DmaRing, Reclaimed, StreamStats};
pub use stream::I2sStream;
