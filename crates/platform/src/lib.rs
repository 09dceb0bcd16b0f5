//! Hardware Abstraction Layer (HAL) for DMA-driven I2S output
//!
//! This crate provides the trait seams between the ring-buffer streamer and
//! the hardware it drives, enabling development and testing without
//! physical hardware.
//!
//! # Architecture Layers
//!
//! ```text
//! Application (sample producer)
//!         ↓
//! i2s-stream (buffer pool, hand-off queue, completion handler)
//!         ↓
//! Platform HAL (this crate - trait abstractions)
//!         ↓
//! Hardware Layer (DMA engine + serial transmitter registers)
//! ```
//!
//! # Abstractions
//!
//! - [`I2sPeripheral`] - descriptor-chain DMA plus serial clock dividers
//! - [`SignalPins`] - word-select / data / bit-clock lines and peripheral clock
//! - [`YieldPoint`] - cooperative suspension for the blocking writer
//! - [`DmaDescriptor`] - the linked-list record the DMA engine walks
//!
//! # Features
//!
//! - `std`: host mocks ([`mocks`]) and [`ThreadYield`]
//! - `defmt`: `defmt::Format` derives on public types

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)] // unsafe fn body is not implicitly unsafe block
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register and signal names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors, callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod audio_types;
pub mod clock_config;
pub mod dma;
pub mod pins;
pub mod yield_point;

pub mod mocks;

pub use audio_types::{Dividers, OutOfRangeError, StereoSample};
pub use dma::{DmaDescriptor, I2sPeripheral, Owner};
pub use pins::SignalPins;
pub use yield_point::{NoYield, SpinYield, YieldPoint};

#[cfg(any(test, feature = "std"))]
pub use yield_point::ThreadYield;
