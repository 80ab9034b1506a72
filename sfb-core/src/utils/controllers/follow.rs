//! Autonomous follow strategies.
//!
//! A strategy looks at the world through a `RangeSensor` and picks the next
//! `FollowAction`. Two are provided: `SimpleFollow` uses a single fixed-ahead
//! reading, `ScanFollow` sweeps a pan servo first and steers toward the
//! closest object. The control loop is generic over the choice.

use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};

use super::{
    drivetrain::DriveError,
    scanner::{Heading, PanScanner, ScanResult},
    sonar::RangeSensor,
};
use crate::utils::config::FollowConfig;

/// What the drivetrain should do for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
    Forward,
    Back,
    TurnLeft,
    TurnRight,
    Stop,
}

/// Produces one follow decision per control tick.
pub trait FollowStrategy {
    fn decide<R: RangeSensor, D: DelayNs>(
        &mut self,
        sensor: &mut R,
        delay: &mut D,
        config: &FollowConfig,
    ) -> Result<FollowAction, DriveError>;
}

/// Fixed-ahead sensor: creep toward anything inside the threshold.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleFollow;

impl SimpleFollow {
    pub fn action_for(
        distance: f32,
        config: &FollowConfig,
    ) -> FollowAction {
        if distance <= config.threshold_cm {
            FollowAction::Forward
        } else {
            FollowAction::Stop
        }
    }
}

impl FollowStrategy for SimpleFollow {
    fn decide<R: RangeSensor, D: DelayNs>(
        &mut self,
        sensor: &mut R,
        delay: &mut D,
        config: &FollowConfig,
    ) -> Result<FollowAction, DriveError> {
        let distance = sensor.measure(delay, config.echo_timeout_us);
        let action = Self::action_for(distance, config);
        tracing::info!(distance, ?action, "simple follow");
        Ok(action)
    }
}

/// Pan-scanning follower that holds a target distance to the closest object.
pub struct ScanFollow<S> {
    scanner: PanScanner<S>,
}

impl<S> ScanFollow<S>
where
    S: SetDutyCycle,
{
    pub fn new(scanner: PanScanner<S>) -> Self {
        Self { scanner }
    }

    /// Map a finished sweep to an action.
    pub fn action_for(
        scan: &ScanResult,
        config: &FollowConfig,
    ) -> FollowAction {
        let distance = scan.closest_distance();
        if distance > config.far_cutoff_cm {
            return FollowAction::Stop;
        }
        match scan.closest {
            Heading::Center => {
                let error = distance - config.target_distance_cm;
                if libm::fabsf(error) <= config.distance_tolerance_cm {
                    FollowAction::Stop
                } else if error > 0.0 {
                    FollowAction::Forward
                } else {
                    FollowAction::Back
                }
            }
            Heading::Left => FollowAction::TurnLeft,
            Heading::Right => FollowAction::TurnRight,
        }
    }

    pub fn release(self) -> PanScanner<S> {
        self.scanner
    }
}

impl<S> FollowStrategy for ScanFollow<S>
where
    S: SetDutyCycle,
{
    fn decide<R: RangeSensor, D: DelayNs>(
        &mut self,
        sensor: &mut R,
        delay: &mut D,
        config: &FollowConfig,
    ) -> Result<FollowAction, DriveError> {
        let scan = self
            .scanner
            .scan(sensor, delay, config.echo_timeout_us, config.servo_settle_ms)?;
        let action = Self::action_for(&scan, config);
        tracing::info!(
            left = scan.left,
            center = scan.center,
            right = scan.right,
            closest = ?scan.closest,
            ?action,
            "scan follow"
        );
        Ok(action)
    }
}
