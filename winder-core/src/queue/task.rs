//! Queued motion task

use crate::motion::{AxisRamp, RampPhase, RampProfile};
use crate::queue::QueueError;
use crate::traits::{Axis, Direction};

/// What a task is for; decides the machine state while it runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskKind {
    /// Traverse homing sequence
    Homing,
    /// Single-axis move outside a winding run
    Positioning,
    /// Synchronized winding run
    Winding,
    /// Open-ended manual jog
    Jog,
}

impl TaskKind {
    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Homing => "HOMING",
            TaskKind::Positioning => "POSITIONING",
            TaskKind::Winding => "WINDING",
            TaskKind::Jog => "JOG",
        }
    }
}

/// Axis selection for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Motor {
    /// `W`
    Winder,
    /// `T`
    Traverse,
    /// `S`: winder ramp with the traverse coupled to it
    Synchronized,
}

impl Motor {
    /// Single-letter code used in status output
    pub fn code(self) -> char {
        match self {
            Motor::Winder => 'W',
            Motor::Traverse => 'T',
            Motor::Synchronized => 'S',
        }
    }

    /// Axis whose ramp paces the task
    pub fn ramp_axis(self) -> Axis {
        match self {
            Motor::Traverse => Axis::Traverse,
            Motor::Winder | Motor::Synchronized => Axis::Winder,
        }
    }
}

/// Where a task is going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    /// Signed step count from wherever the axis is when the task starts
    Relative(i64),
    /// Traverse position in steps from home
    Absolute(i64),
    /// Run until stopped
    Continuous(Direction),
}

/// Progress snapshot of the head task
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskProgress {
    pub kind: TaskKind,
    pub motor: Motor,
    pub current_steps: u64,
    /// `None` for open-ended tasks
    pub target_steps: Option<u64>,
    pub rpm: f32,
}

/// One queued motion command
#[derive(Debug, Clone)]
pub struct Task {
    kind: TaskKind,
    motor: Motor,
    target: Target,
    direction: Direction,
    target_steps: u64,
    current_steps: u64,
    ramp: AxisRamp,
}

impl Task {
    /// Create a task
    ///
    /// Non-jog tasks need a positive target speed and acceleration.
    pub fn new(
        kind: TaskKind,
        motor: Motor,
        target: Target,
        profile: RampProfile,
    ) -> Result<Self, QueueError> {
        let open_ended = matches!(target, Target::Continuous(_));
        if profile.is_degenerate() && !(open_ended && profile.target_rpm > 0.0) {
            return Err(QueueError::DegenerateRamp);
        }

        let (direction, target_steps) = match target {
            Target::Relative(delta) => (Direction::of_delta(delta), delta.unsigned_abs()),
            Target::Absolute(_) => (Direction::Forward, 0),
            Target::Continuous(dir) => (dir, 0),
        };

        Ok(Self {
            kind,
            motor,
            target,
            direction,
            target_steps,
            current_steps: 0,
            ramp: AxisRamp::new(profile),
        })
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn motor(&self) -> Motor {
        self.motor
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn current_steps(&self) -> u64 {
        self.current_steps
    }

    pub fn target_steps(&self) -> u64 {
        self.target_steps
    }

    pub fn ramp(&self) -> &AxisRamp {
        &self.ramp
    }

    pub fn ramp_mut(&mut self) -> &mut AxisRamp {
        &mut self.ramp
    }

    /// Open-ended; runs until finished or stopped
    pub fn is_jog(&self) -> bool {
        matches!(self.target, Target::Continuous(_))
    }

    /// Not yet activated
    pub fn is_pending(&self) -> bool {
        self.ramp.phase() == RampPhase::Pending
    }

    pub fn is_complete(&self) -> bool {
        self.ramp.is_complete()
    }

    /// Steps left to the target, `None` for open-ended tasks
    pub fn remaining_steps(&self) -> Option<u64> {
        if self.is_jog() {
            None
        } else {
            Some(self.target_steps.saturating_sub(self.current_steps))
        }
    }

    /// Make this the running task
    ///
    /// Absolute targets are resolved against `position` here rather than at
    /// enqueue time, since earlier tasks may move the axis.
    pub fn activate(&mut self, now_us: u64, position: i64) {
        if let Target::Absolute(goal) = self.target {
            let delta = goal.saturating_sub(position);
            self.direction = Direction::of_delta(delta);
            self.target_steps = delta.unsigned_abs();
        }
        self.ramp.start(now_us);
        if !self.is_jog() && self.target_steps == 0 {
            self.ramp.finish();
        }
    }

    /// Record one emitted step
    ///
    /// Completes the task when the step count reaches the target.
    pub fn record_step(&mut self, now_us: u64) {
        self.current_steps += 1;
        self.ramp.mark_step(now_us);
        if !self.is_jog() && self.current_steps >= self.target_steps {
            self.ramp.finish();
        }
    }

    /// Mark the task done without further steps
    pub fn finish(&mut self) {
        self.ramp.finish();
    }

    pub fn progress(&self) -> TaskProgress {
        TaskProgress {
            kind: self.kind,
            motor: self.motor,
            current_steps: self.current_steps,
            target_steps: if self.is_jog() {
                None
            } else {
                Some(self.target_steps)
            },
            rpm: self.ramp.current_rpm(),
        }
    }
}
