//! Events that trigger state transitions

use super::machine::FaultKind;
use crate::queue::TaskKind;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Queue events
    /// A task became the head of the queue and started
    TaskActivated(TaskKind),
    /// Last queued task finished
    QueueDrained,

    // Operator events
    /// Pause flag observed while moving
    PauseRequested,
    /// Pause flag cleared; carries the kind of the task being resumed
    ResumeRequested(TaskKind),
    /// Stop request, queue already cleared
    Stop,
    /// Operator acknowledged the fault
    Reset,

    // Safety events
    /// Motion fault detected
    Fault(FaultKind),
}
