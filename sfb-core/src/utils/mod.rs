//! Utility re-exports for the Skid-Follow Bot.
//!
//! - `config`: tunable follow parameters and speed limits
//! - `connection`: single-byte serial command channel
//! - `controllers`: drivetrain, sonar, pan scanner and the control loop
//! - `math`: ranging conversions and skid-steer wheel patterns

pub mod config;
pub mod connection;
pub mod controllers;
pub mod math;

pub use config::{FollowConfig, SpeedLimits};
pub use connection::command::{Command, CommandChannel};
pub use controllers::ControlLoop;
pub use controllers::sonar::{EmbassyClock, NO_ECHO_CM};
