//! Error type for stream setup and control.

use platform::OutOfRangeError;
use thiserror_no_std::Error;

/// Errors returned by the ring-buffer streamer.
///
/// Runtime conditions on the hot path (queue full on reclaim, no buffer
/// available for the non-blocking writer) are not errors and never appear
/// here; see [`crate::StreamStats`] and the `bool` returns of the writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StreamError {
    /// The hand-off queue has no reclaimed buffer to give out.
    #[error("hand-off queue is empty")]
    EmptyQueue,

    /// The compile-time pool dimensions cannot be expressed in a descriptor chain.
    #[error("pool geometry not representable: {buffers} buffers of {words} words")]
    PoolGeometry {
        /// Number of buffers requested.
        buffers: usize,
        /// Words per buffer requested.
        words: usize,
    },

    /// The stream configuration is inconsistent.
    #[error("invalid stream configuration")]
    InvalidConfig,

    /// `start` was called on a running stream.
    #[error("stream already running")]
    AlreadyRunning,

    /// `stop` was called on an idle stream.
    #[error("stream not running")]
    NotRunning,

    /// The signal lines or peripheral clock could not be claimed.
    #[error("signal pins unavailable")]
    PinClaim,

    /// A divider value is outside the programmable range.
    #[error("divider {} outside {}..={}", .0.value, .0.min, .0.max)]
    Divider(OutOfRangeError),
}

impl From<OutOfRangeError> for StreamError {
    fn from(e: OutOfRangeError) -> Self {
        Self::Divider(e)
    }
}
