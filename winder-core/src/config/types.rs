//! Configuration type definitions
//!
//! `MachineConfig` describes the machine and changes rarely. `WindingPreset`
//! is one coil recipe; the active copy is edited in place and saved to one of
//! `MAX_PRESETS` slots.

use heapless::String;

use crate::traits::Axis;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum preset name length in bytes
pub const PRESET_NAME_LEN: usize = 15;

/// Number of preset slots in storage
pub const MAX_PRESETS: usize = 25;

/// Machine geometry and speed limits
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MachineConfig {
    /// Traverse lead screw pitch (mm per revolution)
    pub screw_pitch: f32,
    /// Winder steps per revolution, microstepping included
    pub steps_per_rev_w: i32,
    /// Traverse steps per revolution, microstepping included
    pub steps_per_rev_t: i32,
    pub max_rpm_w: i32,
    pub max_rpm_t: i32,
    pub start_rpm_w: i32,
    pub start_rpm_t: i32,
    /// Default acceleration (RPM per second)
    pub default_ramp_w: i32,
    pub default_ramp_t: i32,
    /// Invert the winder direction signal
    pub invert_dir_w: bool,
    /// Invert the traverse direction signal
    pub invert_dir_t: bool,
    /// A traverse home switch is fitted
    pub use_limit_switch: bool,
    /// Home the traverse before every winding run
    pub home_before_start: bool,
    /// Move the traverse to the preset start offset before winding
    pub use_start_offset: bool,
    /// Distance to back off the switch after homing (mm)
    pub backoff_distance_mm: f32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            screw_pitch: 1.0,
            steps_per_rev_w: 3200,
            steps_per_rev_t: 3200,
            max_rpm_w: 1500,
            max_rpm_t: 300,
            start_rpm_w: 30,
            start_rpm_t: 30,
            default_ramp_w: 200,
            default_ramp_t: 300,
            invert_dir_w: false,
            invert_dir_t: false,
            use_limit_switch: true,
            home_before_start: true,
            use_start_offset: false,
            backoff_distance_mm: 1.0,
        }
    }
}

impl MachineConfig {
    /// Traverse steps per millimetre of guide travel
    ///
    /// Zero when the pitch is not positive.
    pub fn steps_per_mm(&self) -> f32 {
        if self.screw_pitch > 0.0 {
            self.steps_per_rev_t as f32 / self.screw_pitch
        } else {
            0.0
        }
    }

    /// Convert a traverse distance to whole steps, rounded to nearest
    pub fn mm_to_steps(&self, mm: f32) -> i64 {
        libm::roundf(mm * self.steps_per_mm()) as i64
    }

    pub fn steps_per_rev(&self, axis: Axis) -> u32 {
        let value = match axis {
            Axis::Winder => self.steps_per_rev_w,
            Axis::Traverse => self.steps_per_rev_t,
        };
        value.max(0) as u32
    }

    pub fn max_rpm(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Winder => self.max_rpm_w as f32,
            Axis::Traverse => self.max_rpm_t as f32,
        }
    }

    pub fn start_rpm(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Winder => self.start_rpm_w as f32,
            Axis::Traverse => self.start_rpm_t as f32,
        }
    }

    pub fn default_ramp(&self, axis: Axis) -> f32 {
        match axis {
            Axis::Winder => self.default_ramp_w as f32,
            Axis::Traverse => self.default_ramp_t as f32,
        }
    }

    /// Direction signal inversion for an axis
    pub fn inverted(&self, axis: Axis) -> bool {
        match axis {
            Axis::Winder => self.invert_dir_w,
            Axis::Traverse => self.invert_dir_t,
        }
    }
}

/// One winding recipe
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WindingPreset {
    pub name: String<PRESET_NAME_LEN>,
    /// Wire diameter including insulation (mm)
    pub wire_dia: f32,
    /// Bobbin width between flanges (mm)
    pub coil_width: f32,
    pub total_turns: i64,
    pub target_rpm: i32,
    /// Winder acceleration (RPM per second)
    pub ramp_rpm: i32,
    /// Traverse position of the first layer edge (mm from home)
    pub start_offset: f32,
}

impl Default for WindingPreset {
    fn default() -> Self {
        let mut name = String::new();
        // Fits within PRESET_NAME_LEN
        let _ = name.push_str("DEFAULT");
        Self {
            name,
            wire_dia: 0.063,
            coil_width: 10.0,
            total_turns: 8000,
            target_rpm: 800,
            ramp_rpm: 200,
            start_offset: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_per_mm() {
        let config = MachineConfig {
            screw_pitch: 0.8,
            steps_per_rev_t: 1600,
            ..Default::default()
        };
        assert_eq!(config.steps_per_mm(), 2000.0);
        assert_eq!(config.mm_to_steps(1.5), 3000);
        assert_eq!(config.mm_to_steps(-0.25), -500);
    }

    #[test]
    fn test_zero_pitch_is_safe() {
        let config = MachineConfig {
            screw_pitch: 0.0,
            ..Default::default()
        };
        assert_eq!(config.steps_per_mm(), 0.0);
        assert_eq!(config.mm_to_steps(10.0), 0);
    }

    #[test]
    fn test_axis_lookups() {
        let config = MachineConfig::default();
        assert_eq!(config.steps_per_rev(Axis::Winder), 3200);
        assert_eq!(config.max_rpm(Axis::Traverse), 300.0);
        assert!(!config.inverted(Axis::Winder));
    }

    #[test]
    fn test_default_preset() {
        let preset = WindingPreset::default();
        assert_eq!(preset.name.as_str(), "DEFAULT");
        assert!(preset.wire_dia > 0.0);
        assert!(preset.total_turns > 0);
    }
}
