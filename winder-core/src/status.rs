//! Status snapshot for observers
//!
//! Rendered on one line for the `STATUS` command:
//!
//! ```text
//! STATE=RUNNING FAULT=NONE HOMED=1 POS=1240 LAYER=-37 QUEUE=1 TASK=WINDING/S 5120/64000 RPM=612.0
//! ```

use core::fmt;

use crate::queue::TaskProgress;
use crate::state::{FaultKind, State};
use crate::traits::Direction;

/// Read-only engine snapshot
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    pub state: State,
    pub last_fault: Option<FaultKind>,
    pub homed: bool,
    /// Traverse position in steps from home
    pub position_steps: i64,
    pub layer_dir: Direction,
    /// Traverse steps into the current layer
    pub layer_steps: u64,
    pub queue_len: usize,
    pub task: Option<TaskProgress>,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fault = self.last_fault.map_or("NONE", |k| k.as_token());
        let layer = match self.layer_dir {
            Direction::Forward => '+',
            Direction::Reverse => '-',
        };
        write!(
            f,
            "STATE={} FAULT={} HOMED={} POS={} LAYER={}{} QUEUE={}",
            self.state.name(),
            fault,
            self.homed as u8,
            self.position_steps,
            layer,
            self.layer_steps,
            self.queue_len,
        )?;
        match &self.task {
            Some(task) => {
                write!(f, " TASK={}/{} {}", task.kind.name(), task.motor.code(), task.current_steps)?;
                if let Some(target) = task.target_steps {
                    write!(f, "/{}", target)?;
                }
                write!(f, " RPM={:.1}", task.rpm)
            }
            None => write!(f, " TASK=NONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{Motor, TaskKind};
    use std::string::ToString;

    #[test]
    fn test_idle_rendering() {
        let status = Status {
            state: State::Idle,
            last_fault: None,
            homed: false,
            position_steps: 0,
            layer_dir: Direction::Forward,
            layer_steps: 0,
            queue_len: 0,
            task: None,
        };
        assert_eq!(
            status.to_string(),
            "STATE=IDLE FAULT=NONE HOMED=0 POS=0 LAYER=+0 QUEUE=0 TASK=NONE"
        );
    }

    #[test]
    fn test_running_rendering() {
        let status = Status {
            state: State::Running,
            last_fault: None,
            homed: true,
            position_steps: 1240,
            layer_dir: Direction::Reverse,
            layer_steps: 37,
            queue_len: 1,
            task: Some(TaskProgress {
                kind: TaskKind::Winding,
                motor: Motor::Synchronized,
                current_steps: 5120,
                target_steps: Some(64_000),
                rpm: 612.0,
            }),
        };
        assert_eq!(
            status.to_string(),
            "STATE=RUNNING FAULT=NONE HOMED=1 POS=1240 LAYER=-37 QUEUE=1 TASK=WINDING/S 5120/64000 RPM=612.0"
        );
    }

    #[test]
    fn test_error_rendering_keeps_fault() {
        let status = Status {
            state: State::Error(FaultKind::HomingFailed),
            last_fault: Some(FaultKind::HomingFailed),
            homed: false,
            position_steps: -50_000,
            layer_dir: Direction::Forward,
            layer_steps: 0,
            queue_len: 0,
            task: None,
        };
        let text = status.to_string();
        assert!(text.starts_with("STATE=ERROR FAULT=HOMING_FAILED"));
    }
}
