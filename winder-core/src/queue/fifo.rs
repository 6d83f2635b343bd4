//! Bounded task FIFO

use heapless::Deque;

use super::task::Task;

/// Number of tasks that can be queued at once
///
/// A winding start needs at most three: home, move to offset, wind.
pub const QUEUE_CAPACITY: usize = 3;

/// Errors that can occur when queueing a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum QueueError {
    /// Queue already holds `capacity` tasks
    QueueFull,
    /// Zero target speed or acceleration on a task that must finish
    DegenerateRamp,
}

impl QueueError {
    pub fn as_token(&self) -> &'static str {
        match self {
            QueueError::QueueFull => "QUEUE_FULL",
            QueueError::DegenerateRamp => "DEGENERATE_RAMP",
        }
    }
}

/// Fixed-capacity FIFO of tasks; the head is the current task
#[derive(Debug, Clone)]
pub struct TaskQueue<const N: usize = QUEUE_CAPACITY> {
    tasks: Deque<Task, N>,
}

impl<const N: usize> Default for TaskQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> TaskQueue<N> {
    pub const fn new() -> Self {
        Self {
            tasks: Deque::new(),
        }
    }

    /// Append a task
    ///
    /// Fails without touching the queue when it is full.
    pub fn enqueue(&mut self, task: Task) -> Result<(), QueueError> {
        self.tasks.push_back(task).map_err(|_| QueueError::QueueFull)
    }

    /// Remove the head task; no-op when empty
    pub fn dequeue(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    /// Head task
    pub fn current(&self) -> Option<&Task> {
        self.tasks.front()
    }

    pub fn current_mut(&mut self) -> Option<&mut Task> {
        self.tasks.front_mut()
    }

    /// Abandon every queued task
    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.tasks.is_full()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Tasks in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }
}
