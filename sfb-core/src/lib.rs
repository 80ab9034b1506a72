//! Core drivers and control loop for the Skid-Follow Bot on no-std embedded platforms.
//!
//! For a host-side simulation, see the `sfb-app/mock-mcu` binary.
#![no_std]

pub mod utils;
