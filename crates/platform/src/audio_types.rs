//! Audio domain newtypes for compile-time safety.
//!
//! These zero-cost abstractions prevent common errors:
//! - `Dividers`: both clock dividers lie in 1–63, so they fit the 6-bit fields
//! - `StereoSample`: fixes the channel order inside the 32-bit output word

use crate::clock_config::{DIVIDER_MAX, DIVIDER_MIN};

// ── Error type ───────────────────────────────────────────────────────────────

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

// ── Dividers ─────────────────────────────────────────────────────────────────

/// A cascaded pair of serial clock dividers.
///
/// Wraps `(div1, div2)` with the invariant `1 <= div <= 63` for both.
/// Construct with [`Dividers::try_new`] (fallible, strict) or
/// [`Dividers::new_clamped`] (clamping).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dividers {
    div1: u8,
    div2: u8,
}

impl Dividers {
    /// Create a divider pair, returning an error if either value is outside 1–63.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] for the first offending divider.
    pub fn try_new(div1: u8, div2: u8) -> Result<Self, OutOfRangeError> {
        Ok(Self {
            div1: check_divider(div1)?,
            div2: check_divider(div2)?,
        })
    }

    /// Create a divider pair, clamping each value into 1–63.
    #[must_use]
    pub fn new_clamped(div1: u8, div2: u8) -> Self {
        Self {
            div1: div1.clamp(DIVIDER_MIN, DIVIDER_MAX),
            div2: div2.clamp(DIVIDER_MIN, DIVIDER_MAX),
        }
    }

    /// First-stage divider.
    #[must_use]
    pub fn div1(self) -> u8 {
        self.div1
    }

    /// Second-stage divider.
    #[must_use]
    pub fn div2(self) -> u8 {
        self.div2
    }

    /// Combined division ratio `div1 * div2` (at most 3969).
    #[must_use]
    pub fn product(self) -> u32 {
        // Both factors <= 63, product fits easily in u32.
        u32::from(self.div1).saturating_mul(u32::from(self.div2))
    }
}

fn check_divider(value: u8) -> Result<u8, OutOfRangeError> {
    if (DIVIDER_MIN..=DIVIDER_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(OutOfRangeError {
            value: u32::from(value),
            min: u32::from(DIVIDER_MIN),
            max: u32::from(DIVIDER_MAX),
        })
    }
}

// ── StereoSample ─────────────────────────────────────────────────────────────

/// One stereo frame as it is clocked out: right channel in the high half-word,
/// left channel in the low half-word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(transparent)]
pub struct StereoSample(u32);

impl StereoSample {
    /// Pack two signed 16-bit channels.
    #[must_use]
    #[allow(clippy::cast_sign_loss)] // Safety: reinterpret i16 bits as u16, no value change intended
    pub fn new(left: i16, right: i16) -> Self {
        let left = u32::from(left as u16);
        let right = u32::from(right as u16);
        Self(right.rotate_left(16) | left)
    }

    /// Left channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // Safety: take low half-word bits
    pub fn left(self) -> i16 {
        self.0 as u16 as i16
    }

    /// Right channel.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)] // Safety: take high half-word bits
    pub fn right(self) -> i16 {
        self.0.rotate_right(16) as u16 as i16
    }

    /// The raw output word.
    #[must_use]
    pub fn to_bits(self) -> u32 {
        self.0
    }
}

impl From<StereoSample> for u32 {
    fn from(sample: StereoSample) -> Self {
        sample.0
    }
}
