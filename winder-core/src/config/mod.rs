//! Configuration types
//!
//! Machine geometry and winding recipes. Both are persisted through the
//! variable table, see [`crate::persist`].

pub mod types;

pub use types::*;
