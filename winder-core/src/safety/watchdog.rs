//! Jog keep-alive watchdog
//!
//! A jog runs open-ended, so a dropped operator link would leave an axis
//! spinning. The operator repeats `JOG PING` while the jog control is held;
//! the engine stops the jog when pings stop arriving.

/// Time without a ping after which a jog is stopped
pub const JOG_WATCHDOG_TIMEOUT_MS: u64 = 1500;

/// Watchdog status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WatchdogStatus {
    /// Disarmed, or pinged recently
    Ok,
    /// Armed and no ping within the timeout
    Expired,
}

/// Jog keep-alive tracker
#[derive(Debug, Clone)]
pub struct JogWatchdog {
    armed: bool,
    last_ping_ms: u64,
    timeout_ms: u64,
}

impl Default for JogWatchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl JogWatchdog {
    pub fn new() -> Self {
        Self::with_timeout(JOG_WATCHDOG_TIMEOUT_MS)
    }

    pub fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            armed: false,
            last_ping_ms: 0,
            timeout_ms,
        }
    }

    /// Start supervising a jog
    pub fn arm(&mut self, now_ms: u64) {
        self.armed = true;
        self.last_ping_ms = now_ms;
    }

    /// Stop supervising
    pub fn disarm(&mut self) {
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Record a keep-alive; ignored while disarmed
    pub fn ping(&mut self, now_ms: u64) {
        if self.armed {
            self.last_ping_ms = now_ms;
        }
    }

    pub fn check(&self, now_ms: u64) -> WatchdogStatus {
        if self.armed && now_ms.saturating_sub(self.last_ping_ms) >= self.timeout_ms {
            WatchdogStatus::Expired
        } else {
            WatchdogStatus::Ok
        }
    }
}
