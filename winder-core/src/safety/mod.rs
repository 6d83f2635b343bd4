//! Safety supervision
//!
//! Monitors the operator link while a manual jog is running.

pub mod watchdog;

pub use watchdog::*;
