//! State machine definition
//!
//! Motor outputs are only driven in `Running`, `Homing` and `Moving`.
//! `Error` latches until an explicit reset.

use super::events::Event;
use crate::queue::TaskKind;

/// Machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Nothing queued
    Idle,
    /// Winding run in progress
    Running,
    /// Run or move frozen by a pause request
    Paused,
    /// Traverse homing in progress
    Homing,
    /// Manual jog or positioning move
    Moving,
    /// Fault detected; outputs disabled
    Error(FaultKind),
}

/// Motion faults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// A mandatory task could not be queued
    QueueFull,
    /// Limit switch not found within the travel limit
    HomingFailed,
    /// Limit switch closed outside homing
    UnexpectedLimitTrigger,
}

impl FaultKind {
    pub fn as_token(&self) -> &'static str {
        match self {
            FaultKind::QueueFull => "QUEUE_FULL",
            FaultKind::HomingFailed => "HOMING_FAILED",
            FaultKind::UnexpectedLimitTrigger => "UNEXPECTED_LIMIT_TRIGGER",
        }
    }
}

impl TaskKind {
    /// State the machine is in while a task of this kind runs
    pub fn state(self) -> State {
        match self {
            TaskKind::Homing => State::Homing,
            TaskKind::Winding => State::Running,
            TaskKind::Positioning | TaskKind::Jog => State::Moving,
        }
    }
}

impl State {
    /// Check if this state drives the motors
    pub fn motion_allowed(&self) -> bool {
        matches!(self, State::Running | State::Homing | State::Moving)
    }

    /// Check if this state can be paused
    pub fn pausable(&self) -> bool {
        matches!(self, State::Running | State::Moving)
    }

    /// Check if the limit switch must stay open in this state
    pub fn guards_limit(&self) -> bool {
        matches!(self, State::Running | State::Moving | State::Paused)
    }

    /// Check if this is an error state
    pub fn is_error(&self) -> bool {
        matches!(self, State::Error(_))
    }

    /// Upper-case name for status output
    pub fn name(&self) -> &'static str {
        match self {
            State::Idle => "IDLE",
            State::Running => "RUNNING",
            State::Paused => "PAUSED",
            State::Homing => "HOMING",
            State::Moving => "MOVING",
            State::Error(_) => "ERROR",
        }
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // A new head task decides the state
            (Idle | Running | Homing | Moving, TaskActivated(kind)) => kind.state(),

            // Pause / resume
            (Running | Moving, PauseRequested) => Paused,
            (Paused, ResumeRequested(kind)) => kind.state(),

            // Queue drained or stopped
            (Running | Paused | Homing | Moving, QueueDrained) => Idle,
            (Running | Paused | Homing | Moving, Stop) => Idle,

            // Faults win from anywhere; the newest fault is kept
            (_, Fault(kind)) => Error(kind),

            // Only an explicit reset leaves Error
            (Error(_), Reset) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}
