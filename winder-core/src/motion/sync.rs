//! Winder/traverse layer synchronization
//!
//! Every winder step advances the wire guide by `wire_dia / (spr_w)` mm,
//! i.e. `wire_dia * spr_t / (pitch * spr_w)` traverse steps. The fraction is
//! kept as an exact integer ratio (nanometre units) so the accumulator never
//! drifts: after `n` winder steps the guide has moved exactly
//! `floor(n * numerator / threshold)` steps.

use crate::traits::Direction;

/// Geometry did not produce a usable ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GeometryError {
    /// Wire diameter, pitch, coil width or steps per revolution not positive
    NonPositive,
    /// More than one traverse step would be needed per winder step
    RatioTooSteep,
}

/// Layer synchronization state
#[derive(Debug, Clone)]
pub struct LayerSync {
    /// Added to the accumulator on every winder step
    numerator: u64,
    /// Accumulator value that equals one traverse step
    threshold: u64,
    accumulator: u64,
    /// Traverse steps in one layer
    layer_steps: u64,
    current_layer_steps: u64,
    layer_dir: Direction,
    traverse_steps: u64,
}

impl Default for LayerSync {
    fn default() -> Self {
        Self::new()
    }
}

fn nanometres(mm: f32) -> u64 {
    let nm = libm::roundf(mm * 1_000_000.0);
    if nm <= 0.0 {
        0
    } else {
        nm as u64
    }
}

impl LayerSync {
    /// Create an inactive synchronizer
    pub fn new() -> Self {
        Self {
            numerator: 0,
            threshold: 0,
            accumulator: 0,
            layer_steps: 0,
            current_layer_steps: 0,
            layer_dir: Direction::Forward,
            traverse_steps: 0,
        }
    }

    /// Create a synchronizer from a raw ratio
    ///
    /// One traverse step is emitted every time `numerator` accumulates past
    /// `threshold`. `layer_steps` of zero disables reversal.
    pub fn with_ratio(numerator: u64, threshold: u64, layer_steps: u64) -> Self {
        Self {
            numerator,
            threshold,
            layer_steps,
            ..Self::new()
        }
    }

    /// Derive the ratio from winding geometry and reset progress
    pub fn configure(
        &mut self,
        wire_dia_mm: f32,
        screw_pitch_mm: f32,
        coil_width_mm: f32,
        steps_per_rev_w: u32,
        steps_per_rev_t: u32,
    ) -> Result<(), GeometryError> {
        let wire = nanometres(wire_dia_mm);
        let pitch = nanometres(screw_pitch_mm);
        if wire == 0
            || pitch == 0
            || coil_width_mm <= 0.0
            || steps_per_rev_w == 0
            || steps_per_rev_t == 0
        {
            return Err(GeometryError::NonPositive);
        }

        let numerator = wire * steps_per_rev_t as u64;
        let threshold = pitch * steps_per_rev_w as u64;
        if numerator > threshold {
            return Err(GeometryError::RatioTooSteep);
        }

        let steps_per_mm = steps_per_rev_t as f32 / screw_pitch_mm;
        let layer_steps = libm::roundf(coil_width_mm * steps_per_mm);
        *self = Self::with_ratio(numerator, threshold, layer_steps.max(1.0) as u64);
        Ok(())
    }

    /// Account for one winder step
    ///
    /// Returns the direction of the traverse step to emit, if one is due.
    pub fn on_winder_step(&mut self) -> Option<Direction> {
        if self.threshold == 0 {
            return None;
        }
        self.accumulator += self.numerator;
        if self.accumulator < self.threshold {
            return None;
        }
        self.accumulator -= self.threshold;

        let dir = self.layer_dir;
        self.traverse_steps += 1;
        self.current_layer_steps += 1;
        if self.layer_steps > 0 && self.current_layer_steps >= self.layer_steps {
            self.layer_dir = self.layer_dir.opposite();
            self.current_layer_steps = 0;
        }
        Some(dir)
    }

    /// Fraction of a traverse step accumulated so far, in `[0, 1)`
    pub fn accumulator_fraction(&self) -> f32 {
        if self.threshold == 0 {
            0.0
        } else {
            self.accumulator as f32 / self.threshold as f32
        }
    }

    pub fn layer_dir(&self) -> Direction {
        self.layer_dir
    }

    pub fn current_layer_steps(&self) -> u64 {
        self.current_layer_steps
    }

    pub fn layer_steps(&self) -> u64 {
        self.layer_steps
    }

    /// Traverse steps emitted since configuration
    pub fn traverse_steps(&self) -> u64 {
        self.traverse_steps
    }
}
