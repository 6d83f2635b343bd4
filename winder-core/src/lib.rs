//! Board-agnostic motion core for the kbWinder coil winder
//!
//! This crate contains all logic that does not depend on a specific board:
//!
//! - Hardware abstraction traits (step output, limit switch, storage)
//! - Task queue and per-task acceleration ramps
//! - Homing sequencer and winder/traverse layer synchronization
//! - Machine state machine and the `Winder` engine that ties them together
//! - Label-addressed variable table, persistence and command dispatch
//!
//! Everything here is polled. `Winder::tick` must be called from a single
//! context as often as the board allows; operator requests may be made
//! between ticks from the same context.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

#[macro_use]
pub mod vars;

pub mod command;
pub mod config;
pub mod motion;
pub mod persist;
pub mod queue;
pub mod safety;
pub mod state;
pub mod status;
pub mod traits;
pub mod winder;

#[cfg(test)]
mod testing;

pub use command::{execute, handle_line, CommandError};
pub use status::Status;
pub use winder::{RequestError, Runtime, Transition, Winder};
