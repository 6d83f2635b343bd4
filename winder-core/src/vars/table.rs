//! The winder's variable table
//!
//! Labels are the operator-facing names and must not change: saved blocks
//! and exported files depend on both the labels and their order within a
//! category.

use super::Registry;
use crate::config::PRESET_NAME_LEN;
use crate::winder::Winder;

pub static REGISTRY: Registry<Winder> = Registry::new(&[
    // Machine configuration
    field_var!(Winder, Float: f32, "SCREW PITCH", Machine, config.screw_pitch),
    field_var!(Winder, Int: i32, "WINDER STEPS PER REV", Machine, config.steps_per_rev_w),
    field_var!(Winder, Int: i32, "TRAVERSE STEPS PER REV", Machine, config.steps_per_rev_t),
    field_var!(Winder, Int: i32, "WINDER MAX SPEED", Machine, config.max_rpm_w),
    field_var!(Winder, Int: i32, "TRAVERSE MAX SPEED", Machine, config.max_rpm_t),
    field_var!(Winder, Int: i32, "WINDER START SPEED", Machine, config.start_rpm_w),
    field_var!(Winder, Int: i32, "TRAVERSE START SPEED", Machine, config.start_rpm_t),
    field_var!(Winder, Int: i32, "WINDER DEFAULT RAMP", Machine, config.default_ramp_w),
    field_var!(Winder, Int: i32, "TRAVERSE DEFAULT RAMP", Machine, config.default_ramp_t),
    field_var!(Winder, Bool: bool, "WINDER DIRECTION", Machine, config.invert_dir_w),
    field_var!(Winder, Bool: bool, "TRAVERSE DIRECTION", Machine, config.invert_dir_t),
    field_var!(Winder, Bool: bool, "LIMIT SWITCH", Machine, config.use_limit_switch),
    field_var!(Winder, Bool: bool, "HOME BEFORE START", Machine, config.home_before_start),
    field_var!(Winder, Bool: bool, "USE START OFFSET", Machine, config.use_start_offset),
    field_var!(Winder, Float: f32, "BACKOFF DISTANCE", Machine, config.backoff_distance_mm),
    // Active preset
    text_var!(Winder, "NAME", Preset, PRESET_NAME_LEN, preset.name),
    field_var!(Winder, Float: f32, "WIRE", Preset, preset.wire_dia),
    field_var!(Winder, Float: f32, "COIL LENGTH", Preset, preset.coil_width),
    field_var!(Winder, Long: i64, "TURNS", Preset, preset.total_turns),
    field_var!(Winder, Int: i32, "TARGET RPM", Preset, preset.target_rpm),
    field_var!(Winder, Int: i32, "RAMP", Preset, preset.ramp_rpm),
    field_var!(Winder, Float: f32, "START OFFSET", Preset, preset.start_offset),
    // Runtime
    field_var!(Winder, Bool: bool, "IS PAUSE REQUESTED", Runtime, runtime.is_pause_requested),
    derived_var!(Winder, Long: i64, "POSITION", |w| w.runtime().abs_pos),
    derived_var!(Winder, Text, "OS VERSION", |_w| env!("CARGO_PKG_VERSION")),
    derived_var!(Winder, Float: f32, "STEPS PER MM", |w| w.config().steps_per_mm()),
    derived_var!(Winder, Bool: bool, "IS HOMED", |w| w.runtime().is_homed),
    derived_var!(Winder, Int: i32, "HOMING PHASE", |w| w.homing_state().phase_index()),
    derived_var!(Winder, Long: i64, "LAST STEP MICROS", |w| w.runtime().last_step_us as i64),
    derived_var!(Winder, Float: f32, "TRAVERSE ACCUMULATOR", |w| w
        .layer_sync()
        .accumulator_fraction()),
    derived_var!(Winder, Long: i64, "CURRENT LAYER STEPS", |w| w
        .layer_sync()
        .current_layer_steps() as i64),
    derived_var!(Winder, Int: i32, "LAYER DIRECTION", |w| w.layer_sync().layer_dir().sign() as i32),
    derived_var!(Winder, Text, "STATE", |w| w.state().name()),
    derived_var!(Winder, Text, "LAST ERROR", |w| w
        .last_fault()
        .map_or("NONE", |kind| kind.as_token())),
    derived_var!(Winder, Float: f32, "CURRENT RPM", |w| w.current_rpm()),
    derived_var!(Winder, Long: i64, "TASK STEPS", |w| w
        .queue()
        .current()
        .map_or(0, |task| task.current_steps() as i64)),
    derived_var!(Winder, Int: i32, "QUEUE LENGTH", |w| w.queue().len() as i32),
]);
