//! Step/direction output and limit switch traits
//!
//! The core never touches pins. It asks for "one step on this axis in this
//! direction" and "is the switch closed", and the board layer decides how.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical stepper axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// Spindle turning the bobbin
    Winder,
    /// Lead screw carrying the wire guide
    Traverse,
}

/// Logical direction of travel
///
/// `Forward` on the traverse moves away from the limit switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    /// Get the opposite direction
    pub fn opposite(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    /// Position change produced by one step in this direction
    pub fn sign(self) -> i64 {
        match self {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }

    /// Direction of travel needed to cover a signed distance
    ///
    /// Zero maps to `Forward`.
    pub fn of_delta(delta: i64) -> Self {
        if delta < 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    /// Apply a polarity inversion flag
    pub fn with_polarity(self, inverted: bool) -> Self {
        if inverted {
            self.opposite()
        } else {
            self
        }
    }
}

/// Step pulse output for both axes
///
/// Implementations emit a single step pulse per call. Any direction setup
/// time the driver needs is the implementation's concern.
pub trait StepOutput {
    /// Emit one step on `axis`, driving the direction pin to `dir` first
    ///
    /// `dir` is the physical direction, polarity already applied.
    fn step(&mut self, axis: Axis, dir: Direction);

    /// Enable or disable both stepper drivers
    fn enable(&mut self, enabled: bool);
}

/// Traverse home limit switch
pub trait LimitSwitch {
    /// Check if the switch is currently closed
    fn is_triggered(&mut self) -> bool;
}
