//! Tunable parameters for the follow behaviour and the drivetrain.
//!
//! Every field has a default matching the reference build (HC-SR04 sonar,
//! SG90 pan servo, two L298N bridges driven with 16-bit duty values).
//! `FollowConfig` derives `serde` with `#[serde(default)]` so a partial JSON
//! file only needs the fields it overrides.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Inclusive duty range applied to every motor PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeedLimits {
    pub min: u16,
    pub max: u16,
}

impl SpeedLimits {
    pub const fn new(
        min: u16,
        max: u16,
    ) -> Self {
        Self { min, max }
    }

    /// Clamp a requested magnitude into `[min, max]`.
    pub fn clamp(
        &self,
        speed: u16,
    ) -> u16 {
        speed.max(self.min).min(self.max)
    }
}

impl Default for SpeedLimits {
    fn default() -> Self {
        Self::new(10_000, 60_000)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowConfig {
    /// Duty clamp for all drive commands.
    pub limits: SpeedLimits,
    /// Increment applied by the `+`/`-` commands.
    pub speed_step: u16,
    /// Initial commanded speed, also used for autonomous forward/back.
    pub follow_speed: u16,
    /// Duty used for autonomous corrective turns.
    pub turning_speed: u16,

    /// Simple policy: drive forward while the object is this close (cm).
    pub threshold_cm: f32,
    /// Scanning policy: desired following distance (cm).
    pub target_distance_cm: f32,
    /// Scanning policy: half-width of the hold band around the target (cm).
    pub distance_tolerance_cm: f32,
    /// Readings beyond this are "no object" (cm).
    pub far_cutoff_cm: f32,

    /// Bound on each echo edge wait (us).
    pub echo_timeout_us: u32,
    /// Pause at the end of every tick (ms).
    pub sample_interval_ms: u32,
    /// Servo settle time before each scan sample (ms).
    pub servo_settle_ms: u32,
    /// Duration of an autonomous corrective turn (ms).
    pub turn_duration_ms: u32,

    /// Per-motor wiring polarity, indexed by `MotorId::index()`.
    pub polarity: [bool; 4],
}

impl Default for FollowConfig {
    fn default() -> Self {
        Self {
            limits: SpeedLimits::default(),
            speed_step: 5_000,
            follow_speed: 30_000,
            turning_speed: 25_000,
            threshold_cm: 10.0,
            target_distance_cm: 30.0,
            distance_tolerance_cm: 5.0,
            far_cutoff_cm: 150.0,
            echo_timeout_us: 30_000,
            sample_interval_ms: 50,
            servo_settle_ms: 300,
            turn_duration_ms: 200,
            polarity: [true, false, false, true],
        }
    }
}

/// Reasons a `FollowConfig` is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    InvertedLimits { min: u16, max: u16 },
    ZeroSpeedStep,
    SpeedOutOfRange { name: &'static str, value: u16 },
    NonPositive { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            ConfigError::InvertedLimits { min, max } => {
                write!(f, "speed limits inverted: min {} > max {}", min, max)
            }
            ConfigError::ZeroSpeedStep => write!(f, "speed_step must be non-zero"),
            ConfigError::SpeedOutOfRange { name, value } => {
                write!(f, "{} = {} lies outside the speed limits", name, value)
            }
            ConfigError::NonPositive { name } => write!(f, "{} must be positive", name),
        }
    }
}

impl core::error::Error for ConfigError {}

impl FollowConfig {
    /// Check the invariants the control loop relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let SpeedLimits { min, max } = self.limits;
        if min > max {
            return Err(ConfigError::InvertedLimits { min, max });
        }
        if self.speed_step == 0 {
            return Err(ConfigError::ZeroSpeedStep);
        }
        for (name, value) in [
            ("follow_speed", self.follow_speed),
            ("turning_speed", self.turning_speed),
        ] {
            if value < min || value > max {
                return Err(ConfigError::SpeedOutOfRange { name, value });
            }
        }
        for (name, value) in [
            ("threshold_cm", self.threshold_cm),
            ("target_distance_cm", self.target_distance_cm),
            ("distance_tolerance_cm", self.distance_tolerance_cm),
            ("far_cutoff_cm", self.far_cutoff_cm),
        ] {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name });
            }
        }
        if self.echo_timeout_us == 0 {
            return Err(ConfigError::NonPositive {
                name: "echo_timeout_us",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(FollowConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_clamp_limits_both_ends() {
        let limits = SpeedLimits::default();
        assert_eq!(limits.clamp(0), 10_000);
        assert_eq!(limits.clamp(u16::MAX), 60_000);
        assert_eq!(limits.clamp(42_000), 42_000);
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let cfg = FollowConfig {
            limits: SpeedLimits::new(50_000, 20_000),
            ..FollowConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvertedLimits {
                min: 50_000,
                max: 20_000
            })
        );
    }

    #[test]
    fn test_rejects_turning_speed_outside_limits() {
        let cfg = FollowConfig {
            turning_speed: 5_000,
            ..FollowConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::SpeedOutOfRange {
                name: "turning_speed",
                value: 5_000
            })
        );
    }

    #[test]
    fn test_rejects_zero_tolerance() {
        let cfg = FollowConfig {
            distance_tolerance_cm: 0.0,
            ..FollowConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonPositive {
                name: "distance_tolerance_cm"
            })
        );
    }
}
