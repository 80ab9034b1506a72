//! Module Exports
//!
//! This file exports the serial command link used for manual override.
//!
//! # Modules
//! - `command`: single-byte command decoding, polling and acknowledgements.

/// Module for the single-byte serial command protocol.
pub mod command;
