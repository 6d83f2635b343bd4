//! Board bindings for the motion core traits
//!
//! Pin assignment (BTT SKR Pico):
//!
//! | Signal          | GPIO |
//! |-----------------|------|
//! | Winder STEP     | 11   |
//! | Winder DIR      | 10   |
//! | Winder EN       | 12   |
//! | Traverse STEP   | 6    |
//! | Traverse DIR    | 5    |
//! | Traverse EN     | 7    |
//! | Home switch     | 4    |
//! | UART0 TX / RX   | 0 / 1|
//!
//! Driver enables are active low. The home switch closes to ground.

use embassy_rp::gpio::{Input, Level, Output};

use winder_core::traits::{Axis, Direction, LimitSwitch, StepOutput};

/// Busy-wait cycles for DIR setup and STEP high time (~2 µs at 125 MHz)
const STEP_PULSE_CYCLES: u32 = 250;

/// STEP/DIR/EN pins of one driver
pub struct DriverPins {
    step: Output<'static>,
    dir: Output<'static>,
    enable: Output<'static>,
    dir_level: Level,
}

impl DriverPins {
    pub fn new(step: Output<'static>, dir: Output<'static>, enable: Output<'static>) -> Self {
        let dir_level = dir.get_output_level();
        Self {
            step,
            dir,
            enable,
            dir_level,
        }
    }

    fn pulse(&mut self, dir: Direction) {
        let level = match dir {
            Direction::Forward => Level::High,
            Direction::Reverse => Level::Low,
        };
        if level != self.dir_level {
            self.dir.set_level(level);
            self.dir_level = level;
            cortex_m::asm::delay(STEP_PULSE_CYCLES);
        }
        self.step.set_high();
        cortex_m::asm::delay(STEP_PULSE_CYCLES);
        self.step.set_low();
    }

    fn set_enabled(&mut self, enabled: bool) {
        // Active low
        self.enable.set_level(if enabled { Level::Low } else { Level::High });
    }
}

/// Both stepper drivers
pub struct Steppers {
    pub winder: DriverPins,
    pub traverse: DriverPins,
}

impl StepOutput for Steppers {
    fn step(&mut self, axis: Axis, dir: Direction) {
        match axis {
            Axis::Winder => self.winder.pulse(dir),
            Axis::Traverse => self.traverse.pulse(dir),
        }
    }

    fn enable(&mut self, enabled: bool) {
        self.winder.set_enabled(enabled);
        self.traverse.set_enabled(enabled);
    }
}

/// Traverse home switch
pub struct HomeSwitch {
    input: Input<'static>,
}

impl HomeSwitch {
    pub fn new(input: Input<'static>) -> Self {
        Self { input }
    }
}

impl LimitSwitch for HomeSwitch {
    fn is_triggered(&mut self) -> bool {
        self.input.is_low()
    }
}
