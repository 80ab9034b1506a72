//! Four-motor skid-steer drivetrain over H-bridge channels.
//!
//! Each motor is driven by a pair of complementary direction outputs and one
//! PWM enable output. A per-motor polarity flag compensates for motors that are
//! wired in reverse, so the directional primitives only ever talk in logical
//! directions.

use embedded_hal::{
    delay::DelayNs,
    digital::{ErrorKind as PinErrorKind, OutputPin},
    pwm::{ErrorKind as PwmErrorKind, SetDutyCycle},
};

use crate::utils::{
    config::SpeedLimits,
    math::kinematics::{Motion, SkidSteer},
};

/// Errors raised by the motor or servo outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveError {
    Pin(PinErrorKind),
    Pwm(PwmErrorKind),
}

impl core::fmt::Display for DriveError {
    fn fmt(
        &self,
        f: &mut core::fmt::Formatter<'_>,
    ) -> core::fmt::Result {
        match self {
            DriveError::Pin(kind) => write!(f, "direction output failed: {:?}", kind),
            DriveError::Pwm(kind) => write!(f, "pwm output failed: {:?}", kind),
        }
    }
}

impl core::error::Error for DriveError {}

impl DriveError {
    pub(crate) fn pin<E: embedded_hal::digital::Error>(e: E) -> Self {
        DriveError::Pin(e.kind())
    }

    pub(crate) fn pwm<E: embedded_hal::pwm::Error>(e: E) -> Self {
        DriveError::Pwm(e.kind())
    }
}

/// Motor slot on the chassis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorId {
    M1,
    M2,
    M3,
    M4,
}

impl MotorId {
    pub const ALL: [MotorId; 4] = [MotorId::M1, MotorId::M2, MotorId::M3, MotorId::M4];

    /// Zero-based slot used for channel and polarity lookup.
    pub const fn index(self) -> usize {
        match self {
            MotorId::M1 => 0,
            MotorId::M2 => 1,
            MotorId::M3 => 2,
            MotorId::M4 => 3,
        }
    }

    /// One-based label printed on the chassis.
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

/// One H-bridge channel: `in1` high drives electrically forward, `in2` high
/// drives electrically backward.
pub struct MotorChannel<P, W> {
    pub in1: P,
    pub in2: P,
    pub en: W,
}

impl<P, W> MotorChannel<P, W>
where
    P: OutputPin,
    W: SetDutyCycle,
{
    pub fn new(
        in1: P,
        in2: P,
        en: W,
    ) -> Self {
        Self { in1, in2, en }
    }

    /// Set the bridge direction. The output being released is always
    /// written first so the pair is never high at the same time.
    fn set_direction(
        &mut self,
        electrical_forward: bool,
    ) -> Result<(), DriveError> {
        if electrical_forward {
            self.in2.set_low().map_err(DriveError::pin)?;
            self.in1.set_high().map_err(DriveError::pin)?;
        } else {
            self.in1.set_low().map_err(DriveError::pin)?;
            self.in2.set_high().map_err(DriveError::pin)?;
        }
        Ok(())
    }

    /// Drive both direction outputs low. Both are attempted even if the
    /// first write fails.
    fn release(&mut self) -> Result<(), DriveError> {
        let in1 = self.in1.set_low().map_err(DriveError::pin);
        let in2 = self.in2.set_low().map_err(DriveError::pin);
        in1.and(in2)
    }

    fn halt(&mut self) -> Result<(), DriveError> {
        let released = self.release();
        let zeroed = self.set_duty(0);
        released.and(zeroed)
    }

    fn set_duty(
        &mut self,
        duty: u16,
    ) -> Result<(), DriveError> {
        self.en.set_duty_cycle(duty).map_err(DriveError::pwm)
    }
}

/// High-level driver for the four drive motors.
pub struct Drivetrain<P, W> {
    motors: [MotorChannel<P, W>; 4],
    polarity: [bool; 4],
    limits: SpeedLimits,
    applied: u16,
}

impl<P, W> Drivetrain<P, W>
where
    P: OutputPin,
    W: SetDutyCycle,
{
    /// Create a drivetrain from channels ordered M1..M4.
    ///
    /// The PWM channels are expected to run with a 16-bit duty range. No pins
    /// are touched until the first command.
    pub fn new(
        motors: [MotorChannel<P, W>; 4],
        polarity: [bool; 4],
        limits: SpeedLimits,
    ) -> Self {
        Self {
            motors,
            polarity,
            limits,
            applied: 0,
        }
    }

    /// Duty most recently written to the motor channels.
    pub fn applied_speed(&self) -> u16 {
        self.applied
    }

    /// Resolve a logical direction into the bridge direction for `motor`.
    pub fn electrical_forward(
        &self,
        motor: MotorId,
        want_forward: bool,
    ) -> bool {
        want_forward ^ !self.polarity[motor.index()]
    }

    /// Clamp `speed` and write it to all four enable channels.
    ///
    /// Returns the duty actually applied.
    pub fn set_speed(
        &mut self,
        speed: u16,
    ) -> Result<u16, DriveError> {
        let duty = self.limits.clamp(speed);
        for channel in self.motors.iter_mut() {
            channel.set_duty(duty)?;
        }
        self.applied = duty;
        Ok(duty)
    }

    /// Drive a single motor in a logical direction at a clamped speed.
    pub fn drive(
        &mut self,
        motor: MotorId,
        want_forward: bool,
        speed: u16,
    ) -> Result<u16, DriveError> {
        let duty = self.limits.clamp(speed);
        let electrical = self.electrical_forward(motor, want_forward);
        tracing::trace!(
            motor = motor.number(),
            want_forward,
            electrical,
            duty,
            "drive"
        );

        let channel = &mut self.motors[motor.index()];
        channel.set_direction(electrical)?;
        channel.set_duty(duty)?;
        self.applied = duty;
        Ok(duty)
    }

    fn motion(
        &mut self,
        motion: Motion,
        speed: u16,
    ) -> Result<u16, DriveError> {
        let directions = SkidSteer::wheel_directions(motion);
        let mut applied = 0;
        for motor in MotorId::ALL {
            applied = self.drive(motor, directions[motor.index()], speed)?;
        }
        tracing::debug!(?motion, applied, "drivetrain motion");
        Ok(applied)
    }

    pub fn forward(
        &mut self,
        speed: u16,
    ) -> Result<u16, DriveError> {
        self.motion(Motion::Forward, speed)
    }

    pub fn back(
        &mut self,
        speed: u16,
    ) -> Result<u16, DriveError> {
        self.motion(Motion::Back, speed)
    }

    /// Spin counter-clockwise: left side back, right side forward.
    pub fn left(
        &mut self,
        speed: u16,
    ) -> Result<u16, DriveError> {
        self.motion(Motion::Left, speed)
    }

    /// Spin clockwise: left side forward, right side back.
    pub fn right(
        &mut self,
        speed: u16,
    ) -> Result<u16, DriveError> {
        self.motion(Motion::Right, speed)
    }

    /// Release every direction output and zero every duty.
    ///
    /// Unlike `set_speed(0)` (which clamps up to the minimum), this leaves the
    /// bridges coasting with no output driven. A failing output does not keep
    /// the remaining ones from being stopped; the first error is returned.
    pub fn stop(&mut self) -> Result<(), DriveError> {
        let mut result = Ok(());
        for channel in self.motors.iter_mut() {
            let outcome = channel.halt();
            if result.is_ok() {
                result = outcome;
            }
        }
        self.applied = 0;
        match result {
            Ok(()) => tracing::debug!("drivetrain stopped"),
            Err(error) => tracing::warn!(?error, "drivetrain stop incomplete"),
        }
        result
    }

    /// Stop a single motor, leaving the others untouched.
    pub fn coast(
        &mut self,
        motor: MotorId,
    ) -> Result<(), DriveError> {
        self.motors[motor.index()].halt()
    }

    /// Wiring check: run each motor logically forward in turn.
    ///
    /// Every wheel should push the chassis forward; one that spins backward
    /// needs its polarity flag flipped.
    pub fn jog_test<D: DelayNs>(
        &mut self,
        delay: &mut D,
        speed: u16,
        run_ms: u32,
        pause_ms: u32,
    ) -> Result<(), DriveError> {
        for motor in MotorId::ALL {
            tracing::info!(motor = motor.number(), "jogging motor forward");
            self.drive(motor, true, speed)?;
            delay.delay_ms(run_ms);
            self.coast(motor)?;
            delay.delay_ms(pause_ms);
        }
        self.applied = 0;
        Ok(())
    }

    /// Give the channels back, e.g. to hand them to another driver.
    pub fn release(self) -> [MotorChannel<P, W>; 4] {
        self.motors
    }
}
