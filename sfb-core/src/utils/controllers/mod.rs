//! Module Exports
//!
//! This file exports the hardware controllers and hosts the control loop that
//! ties them together.
//!
//! - `drivetrain`: four-motor skid-steer driver with polarity correction.
//! - `sonar`: timeout-bounded ultrasonic ranging.
//! - `scanner`: three-point pan scan with closest-heading resolution.
//! - `follow`: autonomous follow strategies.

pub mod drivetrain;
pub mod follow;
pub mod scanner;
pub mod sonar;

use core::sync::atomic::{AtomicBool, Ordering};

use embedded_hal::{delay::DelayNs, digital::OutputPin, pwm::SetDutyCycle};
use embedded_io::{Read, ReadReady, Write};

pub use drivetrain::{DriveError, Drivetrain, MotorChannel, MotorId};
pub use follow::{FollowAction, FollowStrategy, ScanFollow, SimpleFollow};
pub use scanner::{Heading, PanScanner, ScanResult};
pub use sonar::{DistanceSensor, MicrosClock, RangeSensor};

use crate::utils::{
    config::FollowConfig,
    connection::command::{Command, CommandChannel},
};

/// Who is in charge of the motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// The follow strategy decides every tick.
    Auto,
    /// The last serial command stands until `A` is received.
    Manual,
}

/// Mutable state of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    pub mode: DriveMode,
    /// Commanded speed for forward/back/turn commands.
    pub speed: u16,
}

impl ControllerState {
    /// Start in `Auto` at the (clamped) follow speed.
    pub fn new(config: &FollowConfig) -> Self {
        Self {
            mode: DriveMode::Auto,
            speed: config.limits.clamp(config.follow_speed),
        }
    }
}

/// Apply a serial command to the controller state and the drivetrain.
pub fn execute_command<P, W>(
    command: Command,
    state: &mut ControllerState,
    drivetrain: &mut Drivetrain<P, W>,
    config: &FollowConfig,
) -> Result<(), DriveError>
where
    P: OutputPin,
    W: SetDutyCycle,
{
    match command {
        Command::Auto => state.mode = DriveMode::Auto,
        Command::Stop => {
            state.mode = DriveMode::Manual;
            drivetrain.stop()?;
        }
        Command::Forward => {
            state.mode = DriveMode::Manual;
            drivetrain.forward(state.speed)?;
        }
        Command::Back => {
            state.mode = DriveMode::Manual;
            drivetrain.back(state.speed)?;
        }
        Command::Left => {
            state.mode = DriveMode::Manual;
            drivetrain.left(state.speed)?;
        }
        Command::Right => {
            state.mode = DriveMode::Manual;
            drivetrain.right(state.speed)?;
        }
        Command::SpeedUp => {
            state.speed = drivetrain.set_speed(state.speed.saturating_add(config.speed_step))?;
        }
        Command::SpeedDown => {
            state.speed = drivetrain.set_speed(state.speed.saturating_sub(config.speed_step))?;
        }
        Command::Ping => {}
    }
    tracing::info!(?command, mode = ?state.mode, speed = state.speed, "command applied");
    Ok(())
}

/// Cooperative sense/decide/drive loop.
pub struct ControlLoop<P, W, R, F, U, D> {
    drivetrain: Drivetrain<P, W>,
    sensor: R,
    strategy: F,
    commands: CommandChannel<U>,
    delay: D,
    config: FollowConfig,
    state: ControllerState,
}

impl<P, W, R, F, U, D> ControlLoop<P, W, R, F, U, D>
where
    P: OutputPin,
    W: SetDutyCycle,
    R: RangeSensor,
    F: FollowStrategy,
    U: Read + ReadReady + Write,
    D: DelayNs,
{
    pub fn new(
        drivetrain: Drivetrain<P, W>,
        sensor: R,
        strategy: F,
        commands: CommandChannel<U>,
        delay: D,
        config: FollowConfig,
    ) -> Self {
        let state = ControllerState::new(&config);
        Self {
            drivetrain,
            sensor,
            strategy,
            commands,
            delay,
            config,
            state,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn drivetrain(&mut self) -> &mut Drivetrain<P, W> {
        &mut self.drivetrain
    }

    pub fn commands(&mut self) -> &mut CommandChannel<U> {
        &mut self.commands
    }

    /// One loop iteration: command, then (in `Auto`) sense and drive, then
    /// the sample pause.
    ///
    /// Returns the autonomous action taken, `None` in `Manual`.
    ///
    /// If a drive output fails, every motor is stopped before the error is
    /// returned so no bridge is left half-commanded. A command whose drive
    /// call failed is not acknowledged.
    pub fn tick(&mut self) -> Result<Option<FollowAction>, DriveError> {
        let result = self.step();
        if result.is_err() {
            // stop() already logs its own failure
            let _ = self.drivetrain.stop();
        }
        self.delay.delay_ms(self.config.sample_interval_ms);
        result
    }

    fn step(&mut self) -> Result<Option<FollowAction>, DriveError> {
        if let Some(command) = self.commands.next_command() {
            if let Err(error) =
                execute_command(command, &mut self.state, &mut self.drivetrain, &self.config)
            {
                tracing::error!(?command, ?error, "command failed, not acknowledged");
                return Err(error);
            }
            self.commands.acknowledge(command);
        }

        if self.state.mode != DriveMode::Auto {
            return Ok(None);
        }

        let action = self
            .strategy
            .decide(&mut self.sensor, &mut self.delay, &self.config)?;
        self.apply(action)?;
        Ok(Some(action))
    }

    fn apply(
        &mut self,
        action: FollowAction,
    ) -> Result<(), DriveError> {
        match action {
            FollowAction::Forward => {
                self.drivetrain.forward(self.state.speed)?;
            }
            FollowAction::Back => {
                self.drivetrain.back(self.state.speed)?;
            }
            FollowAction::TurnLeft => {
                self.drivetrain.left(self.config.turning_speed)?;
                self.delay.delay_ms(self.config.turn_duration_ms);
                self.drivetrain.stop()?;
            }
            FollowAction::TurnRight => {
                self.drivetrain.right(self.config.turning_speed)?;
                self.delay.delay_ms(self.config.turn_duration_ms);
                self.drivetrain.stop()?;
            }
            FollowAction::Stop => self.drivetrain.stop()?,
        }
        Ok(())
    }

    /// Tick until `shutdown` is raised, then stop the motors.
    ///
    /// Errors inside a tick are logged and the loop carries on; the final stop
    /// error, if any, is returned.
    pub fn run(
        &mut self,
        shutdown: &AtomicBool,
    ) -> Result<(), DriveError> {
        tracing::info!(
            mode = ?self.state.mode,
            speed = self.state.speed,
            "control loop started"
        );
        while !shutdown.load(Ordering::Acquire) {
            if let Err(error) = self.tick() {
                tracing::error!(?error, "control tick failed");
            }
        }
        tracing::info!("shutdown requested, stopping motors");
        self.drivetrain.stop()
    }

    /// Take the loop apart, returning its drivetrain, sensor, strategy and
    /// command channel.
    pub fn release(self) -> (Drivetrain<P, W>, R, F, CommandChannel<U>) {
        (self.drivetrain, self.sensor, self.strategy, self.commands)
    }
}
