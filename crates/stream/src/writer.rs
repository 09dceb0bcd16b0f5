//! Producer side: fill the current buffer word by word.
//!
//! When the current buffer is used up the writer pulls the next reclaimed
//! one from the hand-off queue. If none is waiting, the blocking variants
//! suspend until the completion interrupt provides one and the non-blocking
//! variant reports failure without touching any state.

use platform::{I2sPeripheral, SignalPins, StereoSample, YieldPoint};

use crate::pool::Lease;
use crate::ring::DmaRing;
use crate::stream::I2sStream;

impl<const N: usize, const LEN: usize> DmaRing<N, LEN> {
    /// Store one word at the cursor, switching to the next queued buffer if
    /// the current one is full.
    ///
    /// Returns `false`, with nothing changed, when the stream is idle or no
    /// buffer is available.
    pub fn try_write(&self, sample: u32) -> bool {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if !state.active {
                return false;
            }
            let cursor = match state.cursor {
                Some(cursor) if cursor.offset < LEN => cursor,
                _ => match state.take_next_buffer() {
                    Ok(fresh) => fresh,
                    Err(_) => return false,
                },
            };
            debug_assert_eq!(
                state.lease(cursor.buffer),
                Some(Lease::Filling),
                "producer writing into a buffer it does not hold"
            );
            if !self.pool.write_word(cursor.buffer, cursor.offset, sample, cs) {
                return false;
            }
            state.cursor = Some(crate::ring::Cursor {
                buffer: cursor.buffer,
                offset: cursor.offset.saturating_add(1),
            });
            true
        })
    }
}

impl<S, P, Y, const N: usize, const LEN: usize> I2sStream<'_, S, P, Y, N, LEN>
where
    S: I2sPeripheral,
    P: SignalPins,
    Y: YieldPoint,
{
    /// Write one sample, yielding until a buffer is available.
    ///
    /// Never times out; always returns `true`. Use
    /// [`write_sample_nb`](Self::write_sample_nb) when waiting is not allowed.
    pub fn write_sample(&self, sample: u32) -> bool {
        while !self.ring.try_write(sample) {
            self.yielder.yield_now();
        }
        true
    }

    /// Write one stereo frame: `right` in the high half-word, `left` in the low.
    pub fn write_stereo_sample(&self, left: i16, right: i16) -> bool {
        self.write_sample(StereoSample::new(left, right).into())
    }
}

impl<S, P, Y, const N: usize, const LEN: usize> I2sStream<'_, S, P, Y, N, LEN>
where
    S: I2sPeripheral,
    P: SignalPins,
{
    /// Write one sample if a buffer is available; `false` otherwise.
    pub fn write_sample_nb(&self, sample: u32) -> bool {
        self.ring.try_write(sample)
    }

    /// Async variant of [`write_sample`](Self::write_sample): suspends the
    /// task instead of calling the yield point.
    pub async fn write_sample_async(&self, sample: u32) {
        while !self.ring.try_write(sample) {
            embassy_futures::yield_now().await;
        }
    }

    /// The cursor is used up (or unset) and no reclaimed buffer is queued.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// The hand-off queue holds `N - 1` buffers: output is starving.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// `(N - queued) * LEN`.
    pub fn available_samples(&self) -> usize {
        self.ring.available_samples()
    }
}
