//! Time-of-flight ranging helpers.
//!
//! Echo widths are measured with a free-running `u32` microsecond counter that
//! wraps, so edge timestamps are compared with a signed wrapping difference.
//!
//! # Example
//! ```rust
//! use sfb_core::utils::math::ranging::{echo_to_cm, ticks_diff};
//! let width = ticks_diff(5, u32::MAX - 577);
//! assert_eq!(width, 583);
//! assert!((echo_to_cm(width as u32) - 10.0).abs() < 0.01);
//! ```

/// Speed of sound in cm/us at roughly 20 degrees C.
pub const SOUND_CM_PER_US: f32 = 0.0343;

/// Signed difference `end - start` of two wrapping microsecond timestamps.
///
/// Valid as long as the true interval is shorter than half the counter range;
/// a negative result means `end` was taken before `start`.
pub fn ticks_diff(
    end: u32,
    start: u32,
) -> i32 {
    end.wrapping_sub(start) as i32
}

/// Convert a round-trip echo width into a one-way distance in centimetres.
pub fn echo_to_cm(width_us: u32) -> f32 {
    (width_us as f32 * SOUND_CM_PER_US) / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticks_diff_plain() {
        assert_eq!(ticks_diff(1_500, 1_000), 500);
    }

    #[test]
    fn test_ticks_diff_across_wrap() {
        assert_eq!(ticks_diff(10, u32::MAX - 9), 20);
    }

    #[test]
    fn test_ticks_diff_negative() {
        assert_eq!(ticks_diff(1_000, 1_500), -500);
    }

    #[test]
    fn test_echo_to_cm() {
        // 1 ms round trip is ~17 cm one way
        assert!((echo_to_cm(1_000) - 17.15).abs() < 1e-3);
        assert_eq!(echo_to_cm(0), 0.0);
    }
}
