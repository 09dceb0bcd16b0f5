//! Serial output clock tree.
//!
//! The transmitter derives its frame clock from a fixed base clock through a
//! fixed bits-per-frame prescale, then through two cascaded integer dividers:
//!
//! ```text
//! BASE_CLOCK_HZ ──/ FRAME_BITS──► frame clock F ──/ div1 ──/ div2 ──► sample rate
//! ```
//!
//! Each divider is a 6-bit register field, so both lie in
//! [`DIVIDER_MIN`]..=[`DIVIDER_MAX`]. With the defaults here
//! `F = 160 MHz / 32 = 5 MHz`.

/// Serial peripheral base clock (CPU clock at 160 MHz).
pub const BASE_CLOCK_HZ: u32 = 160_000_000;

/// Bits per stereo frame: two 16-bit channels.
pub const FRAME_BITS: u32 = 32;

/// Smallest programmable divider value.
pub const DIVIDER_MIN: u8 = 1;

/// Largest programmable divider value (6-bit field).
pub const DIVIDER_MAX: u8 = 63;

/// Frame clock for a given base clock and frame width.
///
/// Returns `None` when `frame_bits` is zero.
pub const fn frame_clock_hz(base_clock_hz: u32, frame_bits: u32) -> Option<u32> {
    base_clock_hz.checked_div(frame_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_frame_clock_is_5_mhz() {
        assert_eq!(frame_clock_hz(BASE_CLOCK_HZ, FRAME_BITS), Some(5_000_000));
    }

    #[test]
    fn zero_frame_width_has_no_frame_clock() {
        assert_eq!(frame_clock_hz(BASE_CLOCK_HZ, 0), None);
    }
}
