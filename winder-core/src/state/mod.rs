//! Machine state machine
//!
//! The state is a pure function of the previous state and an event; the
//! engine in [`crate::winder`] produces the events.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::{FaultKind, State};
