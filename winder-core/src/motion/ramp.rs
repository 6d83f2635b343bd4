//! Per-axis acceleration ramp
//!
//! Converts a start/target speed pair and an acceleration rate into a live
//! step interval. Speed changes only on ramp-update boundaries
//! (`RAMP_UPDATE_INTERVAL_US`); between boundaries the cached interval is
//! compared against the elapsed time since the last step, which keeps the
//! per-tick cost to a subtraction and a compare.

/// Interval between speed updates in microseconds
pub const RAMP_UPDATE_INTERVAL_US: u64 = 10_000;

/// Lowest speed a ramp will ever step at (RPM)
pub const MIN_STEP_RPM: f32 = 1.0;

/// Ramp phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RampPhase {
    /// Queued, not yet started
    Pending,
    /// Speed rising toward target
    Accelerating,
    /// At target speed
    Cruising,
    /// Speed falling toward the terminal speed
    Decelerating,
    /// Target reached or stopped
    Complete,
}

/// Speed profile parameters for one ramp
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RampProfile {
    pub start_rpm: f32,
    pub target_rpm: f32,
    /// Acceleration and deceleration rate (RPM per second)
    pub accel_rpm_per_s: f32,
    pub steps_per_rev: u32,
}

impl RampProfile {
    /// Check that the profile can reach a non-zero speed in finite time
    pub fn is_degenerate(&self) -> bool {
        !(self.target_rpm > 0.0 && self.accel_rpm_per_s > 0.0) || self.steps_per_rev == 0
    }

    /// Speed the ramp starts from and decelerates back to
    pub fn floor_rpm(&self) -> f32 {
        let floor = if self.start_rpm > MIN_STEP_RPM {
            self.start_rpm
        } else {
            MIN_STEP_RPM
        };
        if self.target_rpm > 0.0 && self.target_rpm < floor {
            self.target_rpm
        } else {
            floor
        }
    }
}

/// Step interval in microseconds for a speed
///
/// Returns `u32::MAX` for a stopped axis so it never becomes due.
pub fn step_interval_us(rpm: f32, steps_per_rev: u32) -> u32 {
    if rpm <= 0.0 || steps_per_rev == 0 {
        return u32::MAX;
    }
    let interval = 60_000_000.0 / (rpm * steps_per_rev as f32);
    if interval >= u32::MAX as f32 {
        u32::MAX
    } else if interval < 1.0 {
        1
    } else {
        interval as u32
    }
}

/// Live ramp state for the axis a task drives
#[derive(Debug, Clone)]
pub struct AxisRamp {
    profile: RampProfile,
    phase: RampPhase,
    current_rpm: f32,
    cached_delay_us: u32,
    last_step_us: u64,
    last_update_us: u64,
    /// Steps taken while accelerating
    accel_steps: u64,
}

impl AxisRamp {
    /// Create a pending ramp
    pub fn new(profile: RampProfile) -> Self {
        Self {
            profile,
            phase: RampPhase::Pending,
            current_rpm: 0.0,
            cached_delay_us: u32::MAX,
            last_step_us: 0,
            last_update_us: 0,
            accel_steps: 0,
        }
    }

    pub fn profile(&self) -> &RampProfile {
        &self.profile
    }

    pub fn phase(&self) -> RampPhase {
        self.phase
    }

    pub fn current_rpm(&self) -> f32 {
        self.current_rpm
    }

    pub fn cached_delay_us(&self) -> u32 {
        self.cached_delay_us
    }

    pub fn last_step_us(&self) -> u64 {
        self.last_step_us
    }

    /// Steps it took to leave the accelerating phase
    pub fn accel_steps(&self) -> u64 {
        self.accel_steps
    }

    pub fn is_complete(&self) -> bool {
        self.phase == RampPhase::Complete
    }

    /// Start ramping from the floor speed at `now_us`
    pub fn start(&mut self, now_us: u64) {
        let floor = self.profile.floor_rpm();
        self.current_rpm = floor;
        self.phase = if floor >= self.profile.target_rpm {
            RampPhase::Cruising
        } else {
            RampPhase::Accelerating
        };
        self.cached_delay_us = step_interval_us(floor, self.profile.steps_per_rev);
        self.last_step_us = now_us;
        self.last_update_us = now_us;
    }

    /// Shift timestamps to `now_us` after a pause
    ///
    /// Speed and phase are left untouched.
    pub fn rebase(&mut self, now_us: u64) {
        self.last_step_us = now_us;
        self.last_update_us = now_us;
    }

    /// Steps needed to slow from the current speed to the floor speed
    pub fn decel_distance(&self) -> f32 {
        if self.profile.accel_rpm_per_s <= 0.0 {
            return f32::MAX;
        }
        let floor = self.profile.floor_rpm();
        let span = self.current_rpm * self.current_rpm - floor * floor;
        if span <= 0.0 {
            return 0.0;
        }
        span * self.profile.steps_per_rev as f32 / (120.0 * self.profile.accel_rpm_per_s)
    }

    /// Advance the speed profile
    ///
    /// Does nothing until a full ramp-update interval has passed since the
    /// previous update. `remaining` is the number of steps left to the
    /// target, or `None` for open-ended moves that never decelerate.
    pub fn update(&mut self, now_us: u64, remaining: Option<u64>) {
        if matches!(self.phase, RampPhase::Pending | RampPhase::Complete) {
            return;
        }
        let elapsed = now_us.saturating_sub(self.last_update_us);
        if elapsed < RAMP_UPDATE_INTERVAL_US {
            return;
        }
        self.last_update_us = now_us;

        let floor = self.profile.floor_rpm();
        if let Some(remaining) = remaining {
            if self.phase != RampPhase::Decelerating
                && self.current_rpm > floor
                && remaining as f32 <= self.decel_distance()
            {
                self.phase = RampPhase::Decelerating;
            }
        }

        let delta = self.profile.accel_rpm_per_s * elapsed as f32 / 1_000_000.0;
        match self.phase {
            RampPhase::Accelerating => {
                self.current_rpm += delta;
                if self.current_rpm >= self.profile.target_rpm {
                    self.current_rpm = self.profile.target_rpm;
                    self.phase = RampPhase::Cruising;
                }
            }
            RampPhase::Decelerating => {
                self.current_rpm -= delta;
                if self.current_rpm < floor {
                    self.current_rpm = floor;
                }
            }
            _ => return,
        }
        self.cached_delay_us = step_interval_us(self.current_rpm, self.profile.steps_per_rev);
    }

    /// Check if a step is due at `now_us`
    pub fn step_due(&self, now_us: u64) -> bool {
        match self.phase {
            RampPhase::Pending | RampPhase::Complete => false,
            _ => now_us.saturating_sub(self.last_step_us) >= self.cached_delay_us as u64,
        }
    }

    /// Record that a step was emitted at `now_us`
    pub fn mark_step(&mut self, now_us: u64) {
        self.last_step_us = now_us;
        if self.phase == RampPhase::Accelerating {
            self.accel_steps += 1;
        }
    }

    /// Stop the ramp; no further steps become due
    pub fn finish(&mut self) {
        self.phase = RampPhase::Complete;
    }
}
