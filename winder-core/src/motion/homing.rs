//! Traverse homing sequencer
//!
//! Two phases: search toward the switch at `HOMING_RPM`, then back off the
//! switch by the configured distance. The sequencer only decides what to do
//! next; the caller emits the steps and owns the position counter.

use crate::motion::ramp::step_interval_us;
use crate::traits::Direction;

/// Fixed traverse speed while homing (RPM)
pub const HOMING_RPM: f32 = 60.0;

/// Search travel after which homing gives up (mm)
pub const MAX_HOMING_TRAVEL_MM: f32 = 250.0;

/// Homing phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingState {
    Idle,
    /// Moving toward the switch
    Searching,
    /// Moving away from the switch by the backoff distance
    BackingOff,
    Complete,
    /// Switch not found within the travel limit
    Failed,
}

impl HomingState {
    /// Numeric phase as exposed to operators (search = 0, backoff = 1)
    pub fn phase_index(self) -> i32 {
        match self {
            HomingState::BackingOff => 1,
            _ => 0,
        }
    }
}

/// What the caller should do after a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingAction {
    /// Nothing due yet
    Wait,
    /// Emit one traverse step in this direction
    Step(Direction),
    /// Homing finished, the current position is zero
    Complete,
    /// Travel limit exceeded without a switch trigger
    Failed,
}

/// Homing sub-state machine
#[derive(Debug, Clone)]
pub struct HomingSequencer {
    state: HomingState,
    interval_us: u32,
    last_step_us: u64,
    steps_taken: u32,
    max_search_steps: u32,
    backoff_steps: u32,
}

impl Default for HomingSequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl HomingSequencer {
    pub fn new() -> Self {
        Self {
            state: HomingState::Idle,
            interval_us: u32::MAX,
            last_step_us: 0,
            steps_taken: 0,
            max_search_steps: 0,
            backoff_steps: 0,
        }
    }

    pub fn state(&self) -> HomingState {
        self.state
    }

    /// Begin a search
    ///
    /// # Arguments
    /// - `steps_per_rev`: traverse steps per screw revolution
    /// - `steps_per_mm`: traverse steps per millimetre
    /// - `backoff_mm`: distance to move off the switch once found
    pub fn begin(&mut self, now_us: u64, steps_per_rev: u32, steps_per_mm: f32, backoff_mm: f32) {
        self.state = HomingState::Searching;
        self.interval_us = step_interval_us(HOMING_RPM, steps_per_rev);
        self.last_step_us = now_us;
        self.steps_taken = 0;
        self.max_search_steps = to_steps(MAX_HOMING_TRAVEL_MM, steps_per_mm);
        self.backoff_steps = to_steps(backoff_mm, steps_per_mm);
    }

    /// Shift the step timestamp to `now_us` after a pause
    pub fn rebase(&mut self, now_us: u64) {
        self.last_step_us = now_us;
    }

    /// Abandon homing
    pub fn cancel(&mut self) {
        self.state = HomingState::Idle;
    }

    /// Decide the next homing action
    ///
    /// `limit_triggered` is the current switch reading.
    pub fn poll(&mut self, now_us: u64, limit_triggered: bool) -> HomingAction {
        match self.state {
            HomingState::Searching => {
                if limit_triggered {
                    self.state = HomingState::BackingOff;
                    self.steps_taken = 0;
                    self.last_step_us = now_us;
                    return self.finish_if_backed_off();
                }
                if self.steps_taken >= self.max_search_steps {
                    self.state = HomingState::Failed;
                    return HomingAction::Failed;
                }
                if self.due(now_us) {
                    self.steps_taken += 1;
                    self.last_step_us = now_us;
                    return HomingAction::Step(Direction::Reverse);
                }
                HomingAction::Wait
            }
            HomingState::BackingOff => {
                if let HomingAction::Complete = self.finish_if_backed_off() {
                    return HomingAction::Complete;
                }
                if self.due(now_us) {
                    self.steps_taken += 1;
                    self.last_step_us = now_us;
                    return HomingAction::Step(Direction::Forward);
                }
                HomingAction::Wait
            }
            HomingState::Complete => HomingAction::Complete,
            HomingState::Failed => HomingAction::Failed,
            HomingState::Idle => HomingAction::Wait,
        }
    }

    fn finish_if_backed_off(&mut self) -> HomingAction {
        if self.steps_taken >= self.backoff_steps {
            self.state = HomingState::Complete;
            HomingAction::Complete
        } else {
            HomingAction::Wait
        }
    }

    fn due(&self, now_us: u64) -> bool {
        now_us.saturating_sub(self.last_step_us) >= self.interval_us as u64
    }
}

fn to_steps(mm: f32, steps_per_mm: f32) -> u32 {
    let steps = libm::roundf(mm * steps_per_mm);
    if steps <= 0.0 {
        0
    } else {
        steps as u32
    }
}
