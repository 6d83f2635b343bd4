//! Inter-task communication channels
//!
//! The motion task owns the engine. Serial tasks only exchange text with it
//! through these channels.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;

use winder_protocol::Line;

/// Largest reply; a full `GET` dump is the longest
pub const REPLY_LEN: usize = 2048;

/// Reply text for one request line
pub type Reply = String<REPLY_LEN>;

/// Channel capacity for received lines
const LINE_CHANNEL_SIZE: usize = 4;

/// Channel capacity for outgoing replies
const REPLY_CHANNEL_SIZE: usize = 2;

/// Complete request lines from the serial port
pub static LINE_CHANNEL: Channel<CriticalSectionRawMutex, Line, LINE_CHANNEL_SIZE> =
    Channel::new();

/// Replies waiting to be written to the serial port
pub static REPLY_CHANNEL: Channel<CriticalSectionRawMutex, Reply, REPLY_CHANNEL_SIZE> =
    Channel::new();
