//! Hardware abstraction traits
//!
//! These traits define the interface between the motion core and the
//! board-specific pin, switch, and flash implementations.

pub mod stepper;
pub mod storage;

pub use stepper::{Axis, Direction, LimitSwitch, StepOutput};
pub use storage::{NvStorage, RamStorage, StorageError};
