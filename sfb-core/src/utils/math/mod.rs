//! Math utilities for the Skid-Follow Bot.
//!
//! This module provides echo-time ranging conversions and the skid-steer
//! wheel-direction patterns for a four-motor chassis.

pub mod kinematics;
pub mod ranging;
