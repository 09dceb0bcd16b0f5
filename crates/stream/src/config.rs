//! Stream configuration.
//!
//! Pool dimensions are const generics on [`DmaRing`](crate::DmaRing); the
//! defaults below give 8 buffers × 64 words, i.e. 512 stereo frames (about
//! 11.6 ms at 44.1 kHz) of queued output.

use platform::clock_config::{self, BASE_CLOCK_HZ, FRAME_BITS};

use crate::error::StreamError;

/// Default number of buffers in the descriptor chain.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Default buffer length in 32-bit words.
pub const DEFAULT_BUFFER_WORDS: usize = 64;

/// Default sample rate programmed by `start`.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;

/// Ring with the default pool dimensions.
pub type DefaultRing = crate::DmaRing<DEFAULT_POOL_SIZE, DEFAULT_BUFFER_WORDS>;

/// Clock and start-up parameters for an [`I2sStream`](crate::I2sStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamConfig {
    /// Serial peripheral base clock in Hz.
    pub base_clock_hz: u32,
    /// Bits clocked out per stereo frame.
    pub frame_bits: u32,
    /// Rate programmed when the stream starts.
    pub initial_rate_hz: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_clock_hz: BASE_CLOCK_HZ,
            frame_bits: FRAME_BITS,
            initial_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
        }
    }
}

impl StreamConfig {
    /// Frame clock `F = base_clock_hz / frame_bits`, the numerator of every
    /// achievable rate.
    ///
    /// Returns 0 for a zero frame width; [`validate`](Self::validate) rejects that.
    pub fn frame_clock_hz(&self) -> u32 {
        clock_config::frame_clock_hz(self.base_clock_hz, self.frame_bits).unwrap_or(0)
    }

    /// Check that the clock tree yields a usable frame clock.
    pub fn validate(&self) -> Result<(), StreamError> {
        if self.frame_bits == 0 || self.frame_bits > self.base_clock_hz {
            return Err(StreamError::InvalidConfig);
        }
        Ok(())
    }
}
