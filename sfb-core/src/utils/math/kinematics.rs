//! Skid-steer kinematics for a four-motor chassis.
//!
//! Motors 1 and 3 sit on the left side, motors 2 and 4 on the right. Wheels on
//! one side always share a direction; turning in place runs the two sides in
//! opposite directions.
//!
//! # Example
//! ```rust
//! use sfb_core::utils::math::kinematics::{Motion, SkidSteer};
//! let dirs = SkidSteer::wheel_directions(Motion::Left);
//! assert_eq!(dirs, [false, true, false, true]);
//! ```

/// Chassis motions the drivetrain can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Forward,
    Back,
    /// Counter-clockwise in place.
    Left,
    /// Clockwise in place.
    Right,
}

/// Which chassis side a motor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Maps chassis motions to per-wheel logical directions.
pub struct SkidSteer;

impl SkidSteer {
    /// Side of the chassis for each motor slot.
    pub const SIDES: [Side; 4] = [Side::Left, Side::Right, Side::Left, Side::Right];

    /// Logical direction of each side for `motion` as `(left, right)`,
    /// `true` meaning forward.
    pub fn side_directions(motion: Motion) -> (bool, bool) {
        match motion {
            Motion::Forward => (true, true),
            Motion::Back => (false, false),
            Motion::Left => (false, true),
            Motion::Right => (true, false),
        }
    }

    /// Logical forward flag for every motor slot, before polarity correction.
    pub fn wheel_directions(motion: Motion) -> [bool; 4] {
        let (left, right) = Self::side_directions(motion);
        Self::SIDES.map(|side| match side {
            Side::Left => left,
            Side::Right => right,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_motions_share_direction() {
        assert_eq!(SkidSteer::wheel_directions(Motion::Forward), [true; 4]);
        assert_eq!(SkidSteer::wheel_directions(Motion::Back), [false; 4]);
    }

    #[test]
    fn test_turns_oppose_sides() {
        let left = SkidSteer::wheel_directions(Motion::Left);
        let right = SkidSteer::wheel_directions(Motion::Right);
        for i in 0..4 {
            assert_ne!(left[i], right[i], "motor {} should flip between turns", i + 1);
        }
        // same-side wheels agree
        assert_eq!(left[0], left[2]);
        assert_eq!(left[1], left[3]);
    }
}
