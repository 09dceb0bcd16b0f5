//! Sample-rate → divider search.
//!
//! The transmitter can only divide the frame clock `F` by an integer product
//! `div1 * div2` with both factors in 1–63, so most rates are approximate.
//! The search is exhaustive over `div1 <= div2` (the product is symmetric)
//! and exact: errors `|F/p - target|` are compared as rationals in `u64`, so
//! no float rounding can reorder candidates. The first pair reached in
//! ascending `(div1, div2)` order wins ties.
//!
//! | target (Hz) | div1 | div2 | real rate (Hz) |
//! |-------------|------|------|----------------|
//! | 44 100      | 2    | 57   | 43 859.65      |
//! | 48 000      | 2    | 52   | 48 076.92      |
//! | 22 050      | 4    | 57   | 21 929.82      |
//! | 8 000       | 25   | 25   | 8 000          |

use platform::clock_config::{DIVIDER_MAX, DIVIDER_MIN};
use platform::Dividers;

/// Last requested rate and the pair programmed for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RateState {
    /// Rate passed to the last `set_rate`; 0 after a reset or a manual
    /// `set_dividers`.
    pub requested_hz: u32,
    /// Dividers currently in hardware, if any were programmed.
    pub dividers: Option<Dividers>,
}

impl RateState {
    /// Nothing requested, nothing programmed.
    pub const RESET: Self = Self {
        requested_hz: 0,
        dividers: None,
    };
}

/// Numerator/denominator of `|F/p - target|` as `|F - target*p| / p`.
fn error_terms(frame_clock_hz: u32, target_hz: u32, product: u32) -> (u64, u64) {
    let scaled = u64::from(target_hz).saturating_mul(u64::from(product));
    (u64::from(frame_clock_hz).abs_diff(scaled), u64::from(product))
}

/// `a/b < c/d` for non-negative rationals with small positive denominators.
fn less_than((a, b): (u64, u64), (c, d): (u64, u64)) -> bool {
    // a, c < 2^45 and b, d <= 3969 < 2^12: products stay below 2^57.
    a.saturating_mul(d) < c.saturating_mul(b)
}

/// Pair whose rate `F / (div1 * div2)` is closest to `target_hz`.
pub fn solve_dividers(frame_clock_hz: u32, target_hz: u32) -> Dividers {
    let mut best = (DIVIDER_MIN, DIVIDER_MIN);
    let mut best_err = error_terms(
        frame_clock_hz,
        target_hz,
        u32::from(DIVIDER_MIN).saturating_mul(u32::from(DIVIDER_MIN)),
    );

    for div1 in DIVIDER_MIN..=DIVIDER_MAX {
        for div2 in div1..=DIVIDER_MAX {
            let product = u32::from(div1).saturating_mul(u32::from(div2));
            let err = error_terms(frame_clock_hz, target_hz, product);
            if less_than(err, best_err) {
                best = (div1, div2);
                best_err = err;
            }
        }
    }

    Dividers::new_clamped(best.0, best.1)
}

/// Rate produced by `dividers` from a frame clock of `frame_clock_hz`.
#[allow(clippy::cast_precision_loss)] // Safety: F < 2^32 and product < 2^12; f32 rounding is the documented precision
pub fn real_rate(frame_clock_hz: u32, dividers: Dividers) -> f32 {
    frame_clock_hz as f32 / dividers.product() as f32
}
