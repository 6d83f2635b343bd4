//! Motion task queue
//!
//! Start, home, jog and manual move requests become `Task`s executed in
//! strict FIFO order. Only the head task is ever driven.

pub mod fifo;
pub mod task;

pub use fifo::{QueueError, TaskQueue, QUEUE_CAPACITY};
pub use task::{Motor, Target, Task, TaskKind, TaskProgress};
