//! Motion generation
//!
//! - `ramp`: per-axis trapezoidal speed profile and step timing
//! - `homing`: traverse search/backoff sequence
//! - `sync`: traverse-follows-winder layer coupling

pub mod homing;
pub mod ramp;
pub mod sync;

pub use homing::{HomingAction, HomingSequencer, HomingState, HOMING_RPM, MAX_HOMING_TRAVEL_MM};
pub use ramp::{
    step_interval_us, AxisRamp, RampPhase, RampProfile, MIN_STEP_RPM, RAMP_UPDATE_INTERVAL_US,
};
pub use sync::{GeometryError, LayerSync};
