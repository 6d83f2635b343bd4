//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels.

pub mod motion;
pub mod serial_rx;
pub mod serial_tx;

pub use motion::motion_task;
pub use serial_rx::serial_rx_task;
pub use serial_tx::serial_tx_task;
