//! Three-point pan scan with a hobby servo.
//!
//! The sonar is mounted on a servo that is swept left, center and right; the
//! closest of the three readings tells the follow logic which way to go.

use embedded_hal::{delay::DelayNs, pwm::SetDutyCycle};

use super::{drivetrain::DriveError, sonar::RangeSensor};

/// Servo frame length at 50 Hz (us).
pub const SERVO_PERIOD_US: u32 = 20_000;
/// Pulse widths for the three headings (us).
pub const LEFT_PULSE_US: u32 = 1_000;
pub const CENTER_PULSE_US: u32 = 1_500;
pub const RIGHT_PULSE_US: u32 = 2_000;

/// Direction the sonar was pointing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Left,
    Center,
    Right,
}

/// Samples from one sweep plus the heading of the nearest one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanResult {
    pub left: f32,
    pub center: f32,
    pub right: f32,
    pub closest: Heading,
}

impl ScanResult {
    /// Resolve the closest heading. Center wins any tie, then left beats
    /// right.
    pub fn from_samples(
        left: f32,
        center: f32,
        right: f32,
    ) -> Self {
        let mut closest = Heading::Center;
        let mut best = center;
        if left < best {
            closest = Heading::Left;
            best = left;
        }
        if right < best {
            closest = Heading::Right;
        }
        Self {
            left,
            center,
            right,
            closest,
        }
    }

    pub fn sample(
        &self,
        heading: Heading,
    ) -> f32 {
        match heading {
            Heading::Left => self.left,
            Heading::Center => self.center,
            Heading::Right => self.right,
        }
    }

    /// Distance to the closest object.
    pub fn closest_distance(&self) -> f32 {
        self.sample(self.closest)
    }
}

/// Servo-driven sweeper.
pub struct PanScanner<S> {
    servo: S,
    duties: [u16; 3],
}

impl<S> PanScanner<S>
where
    S: SetDutyCycle,
{
    /// Wrap a 50 Hz servo channel. The channel's duty range is read once.
    pub fn new(servo: S) -> Self {
        let max = servo.max_duty_cycle() as u32;
        let duty = |pulse_us: u32| (pulse_us * max / SERVO_PERIOD_US) as u16;
        let duties = [
            duty(LEFT_PULSE_US),
            duty(CENTER_PULSE_US),
            duty(RIGHT_PULSE_US),
        ];
        Self { servo, duties }
    }

    /// Duty written for `heading`.
    pub fn duty_for(
        &self,
        heading: Heading,
    ) -> u16 {
        match heading {
            Heading::Left => self.duties[0],
            Heading::Center => self.duties[1],
            Heading::Right => self.duties[2],
        }
    }

    pub fn point(
        &mut self,
        heading: Heading,
    ) -> Result<(), DriveError> {
        let duty = self.duty_for(heading);
        self.servo.set_duty_cycle(duty).map_err(DriveError::pwm)
    }

    /// Park the servo at center.
    pub fn rest(&mut self) -> Result<(), DriveError> {
        self.point(Heading::Center)
    }

    fn sample_at<R: RangeSensor, D: DelayNs>(
        &mut self,
        heading: Heading,
        sensor: &mut R,
        delay: &mut D,
        timeout_us: u32,
        settle_ms: u32,
    ) -> Result<f32, DriveError> {
        self.point(heading)?;
        delay.delay_ms(settle_ms);
        Ok(sensor.measure(delay, timeout_us))
    }

    /// Sweep left, center, right and return to center.
    pub fn scan<R: RangeSensor, D: DelayNs>(
        &mut self,
        sensor: &mut R,
        delay: &mut D,
        timeout_us: u32,
        settle_ms: u32,
    ) -> Result<ScanResult, DriveError> {
        let left = self.sample_at(Heading::Left, sensor, delay, timeout_us, settle_ms)?;
        let center = self.sample_at(Heading::Center, sensor, delay, timeout_us, settle_ms)?;
        let right = self.sample_at(Heading::Right, sensor, delay, timeout_us, settle_ms)?;
        self.rest()?;

        let result = ScanResult::from_samples(left, center, right);
        tracing::debug!(left, center, right, closest = ?result.closest, "scan complete");
        Ok(result)
    }

    pub fn release(self) -> S {
        self.servo
    }
}
