//! Simulated hardware for host tests

use std::cell::Cell;
use std::rc::Rc;
use std::vec::Vec;

use crate::traits::{Axis, Direction, LimitSwitch, StepOutput};

/// Behavior of the simulated home switch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitScript {
    /// Never closes
    Open,
    /// Always closed
    Closed,
    /// Closed once the guide is this many net steps behind where it started
    AfterReverseSteps(u32),
}

/// Step recorder
#[derive(Debug, Default)]
pub struct SimOutput {
    pub enabled: bool,
    /// Signed physical winder steps
    pub winder_steps: i64,
    pub traverse_pulses: u64,
    pub forward_traverse: u64,
    pub reverse_traverse: u64,
    pub log: Vec<(Axis, Direction)>,
    position: Rc<Cell<i64>>,
}

impl StepOutput for SimOutput {
    fn step(&mut self, axis: Axis, dir: Direction) {
        self.log.push((axis, dir));
        match axis {
            Axis::Winder => self.winder_steps += dir.sign(),
            Axis::Traverse => {
                self.traverse_pulses += 1;
                match dir {
                    Direction::Forward => self.forward_traverse += 1,
                    Direction::Reverse => self.reverse_traverse += 1,
                }
                self.position.set(self.position.get() + dir.sign());
            }
        }
    }

    fn enable(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

/// Scripted limit switch tracking the simulated guide position
#[derive(Debug)]
pub struct SimLimit {
    pub script: LimitScript,
    position: Rc<Cell<i64>>,
}

impl LimitSwitch for SimLimit {
    fn is_triggered(&mut self) -> bool {
        match self.script {
            LimitScript::Open => false,
            LimitScript::Closed => true,
            LimitScript::AfterReverseSteps(n) => self.position.get() <= -(n as i64),
        }
    }
}

/// Output and switch sharing one guide position
#[derive(Debug)]
pub struct SimHardware {
    pub output: SimOutput,
    pub limit: SimLimit,
}

impl SimHardware {
    pub fn new(script: LimitScript) -> Self {
        let position = Rc::new(Cell::new(0));
        Self {
            output: SimOutput {
                position: position.clone(),
                ..SimOutput::default()
            },
            limit: SimLimit { script, position },
        }
    }
}
