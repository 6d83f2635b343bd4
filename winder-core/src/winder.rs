//! Winding engine
//!
//! `Winder` owns everything the motion core mutates: configuration, the
//! active preset, runtime counters, the task queue and the sub-sequencers.
//! Operator requests queue tasks; `tick` drives the head task forward by at
//! most one step per axis and never blocks.
//!
//! Call `tick` as often as possible. Step timing is only as good as the
//! interval between calls.

use heapless::Deque;

use crate::config::{MachineConfig, WindingPreset};
use crate::motion::{
    GeometryError, HomingAction, HomingSequencer, HomingState, LayerSync, RampProfile, HOMING_RPM,
};
use crate::queue::{Motor, QueueError, QUEUE_CAPACITY, Target, Task, TaskKind, TaskProgress, TaskQueue};
use crate::safety::{JogWatchdog, WatchdogStatus};
use crate::state::{Event, FaultKind, State};
use crate::status::Status;
use crate::traits::{Axis, Direction, LimitSwitch, StepOutput};

/// Number of state changes kept for `take_transition`
const TRANSITION_LOG_LEN: usize = 4;

/// Live counters owned by the engine; never persisted
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Runtime {
    /// Traverse position in steps from home
    pub abs_pos: i64,
    pub is_homed: bool,
    /// Pause flag; the engine pauses or resumes when it observes a change
    pub is_pause_requested: bool,
    /// Timestamp of the most recent step on either axis
    pub last_step_us: u64,
}

/// A state change, with the event that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transition {
    pub from: State,
    pub to: State,
    pub event: Event,
}

/// Errors that can occur when an operator request is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestError {
    /// Request needs an idle machine
    Busy,
    /// Reset requested outside the error state
    NotInError,
    /// Task could not be queued
    Queue(QueueError),
    /// Preset and machine geometry cannot be wound
    Geometry(GeometryError),
    /// Argument or preset value outside its usable range
    InvalidValue,
}

impl RequestError {
    pub fn as_token(&self) -> &'static str {
        match self {
            RequestError::Busy => "BUSY",
            RequestError::NotInError => "NOT_IN_ERROR",
            RequestError::Queue(e) => e.as_token(),
            RequestError::Geometry(_) => "INVALID_GEOMETRY",
            RequestError::InvalidValue => "INVALID_VALUE",
        }
    }
}

impl From<QueueError> for RequestError {
    fn from(e: QueueError) -> Self {
        RequestError::Queue(e)
    }
}

impl From<GeometryError> for RequestError {
    fn from(e: GeometryError) -> Self {
        RequestError::Geometry(e)
    }
}

/// Tasks queued together by one request
type Sequence = heapless::Vec<Task, QUEUE_CAPACITY>;

/// Result of driving the head task for one tick
enum Drive {
    Continue,
    Complete,
    Fault(FaultKind),
}

/// The winding engine context
pub struct Winder {
    pub(crate) config: MachineConfig,
    pub(crate) preset: WindingPreset,
    pub(crate) runtime: Runtime,
    state: State,
    last_fault: Option<FaultKind>,
    queue: TaskQueue,
    homing: HomingSequencer,
    sync: LayerSync,
    jog_watchdog: JogWatchdog,
    outputs_enabled: bool,
    transitions: Deque<Transition, TRANSITION_LOG_LEN>,
}

impl Default for Winder {
    fn default() -> Self {
        Self::new(MachineConfig::default(), WindingPreset::default())
    }
}

impl Winder {
    /// Create an idle engine
    pub fn new(config: MachineConfig, preset: WindingPreset) -> Self {
        Self {
            config,
            preset,
            runtime: Runtime::default(),
            state: State::Idle,
            last_fault: None,
            queue: TaskQueue::new(),
            homing: HomingSequencer::new(),
            sync: LayerSync::new(),
            jog_watchdog: JogWatchdog::new(),
            outputs_enabled: false,
            transitions: Deque::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Nothing queued or running; new work is only accepted here
    pub fn is_idle(&self) -> bool {
        self.state == State::Idle && self.queue.is_empty()
    }

    /// Most recent fault, kept until reset
    pub fn last_fault(&self) -> Option<FaultKind> {
        self.last_fault
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut MachineConfig {
        &mut self.config
    }

    pub fn preset(&self) -> &WindingPreset {
        &self.preset
    }

    pub fn preset_mut(&mut self) -> &mut WindingPreset {
        &mut self.preset
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn homing_state(&self) -> HomingState {
        self.homing.state()
    }

    pub fn layer_sync(&self) -> &LayerSync {
        &self.sync
    }

    /// Speed of the head task's ramp, zero when nothing runs
    pub fn current_rpm(&self) -> f32 {
        match self.queue.current() {
            Some(task) if !task.is_pending() => task.ramp().current_rpm(),
            _ => 0.0,
        }
    }

    pub fn progress(&self) -> Option<TaskProgress> {
        self.queue.current().map(Task::progress)
    }

    /// Take the oldest unreported state change
    pub fn take_transition(&mut self) -> Option<Transition> {
        self.transitions.pop_front()
    }

    /// Read-only snapshot for observers
    pub fn status(&self) -> Status {
        Status {
            state: self.state,
            last_fault: self.last_fault,
            homed: self.runtime.is_homed,
            position_steps: self.runtime.abs_pos,
            layer_dir: self.sync.layer_dir(),
            layer_steps: self.sync.current_layer_steps(),
            queue_len: self.queue.len(),
            task: self.progress(),
        }
    }

    // ----- Operator requests -----

    /// Queue a task
    ///
    /// The ramp starts from the axis' configured start speed.
    pub fn enqueue(
        &mut self,
        kind: TaskKind,
        motor: Motor,
        target: Target,
        rpm: f32,
        ramp: f32,
    ) -> Result<(), QueueError> {
        let task = self.build_task(kind, motor, target, rpm, ramp)?;
        self.queue.enqueue(task)
    }

    fn build_task(
        &self,
        kind: TaskKind,
        motor: Motor,
        target: Target,
        rpm: f32,
        ramp: f32,
    ) -> Result<Task, QueueError> {
        let axis = motor.ramp_axis();
        let profile = RampProfile {
            start_rpm: self.config.start_rpm(axis),
            target_rpm: rpm,
            accel_rpm_per_s: ramp,
            steps_per_rev: self.config.steps_per_rev(axis),
        };
        Task::new(kind, motor, target, profile)
    }

    /// Start a winding run
    ///
    /// Queues homing (if configured), the move to the start offset (if
    /// configured) and the synchronized winding task. Every task is built
    /// before any is queued, so a refused start leaves the queue empty.
    pub fn request_start(&mut self) -> Result<(), RequestError> {
        self.ensure_idle()?;

        let rpm = self.winding_rpm();
        let ramp = self.preset.ramp_rpm as f32;
        if rpm <= 0.0 || ramp <= 0.0 {
            return Err(QueueError::DegenerateRamp.into());
        }
        if self.preset.total_turns <= 0 {
            return Err(RequestError::InvalidValue);
        }
        self.sync.configure(
            self.preset.wire_dia,
            self.config.screw_pitch,
            self.preset.coil_width,
            self.config.steps_per_rev(Axis::Winder),
            self.config.steps_per_rev(Axis::Traverse),
        )?;

        let home_in_place = self.config.home_before_start && !self.config.use_limit_switch;
        let mut sequence = Sequence::new();
        if self.config.home_before_start && self.config.use_limit_switch {
            push(&mut sequence, self.homing_task()?)?;
        }
        if self.config.use_start_offset {
            let offset = self.config.mm_to_steps(self.preset.start_offset);
            let task = self.build_task(
                TaskKind::Positioning,
                Motor::Traverse,
                Target::Absolute(offset),
                self.config.max_rpm(Axis::Traverse),
                self.config.default_ramp(Axis::Traverse),
            )?;
            push(&mut sequence, task)?;
        }
        let steps = self
            .preset
            .total_turns
            .saturating_mul(self.config.steps_per_rev(Axis::Winder) as i64);
        let winding = self.build_task(
            TaskKind::Winding,
            Motor::Synchronized,
            Target::Relative(steps),
            rpm,
            ramp,
        )?;
        push(&mut sequence, winding)?;

        self.enqueue_sequence(sequence)?;
        if home_in_place {
            self.home_in_place();
        }
        self.runtime.is_pause_requested = false;
        Ok(())
    }

    /// Home the traverse
    pub fn request_home(&mut self) -> Result<(), RequestError> {
        self.ensure_idle()?;
        if !self.config.use_limit_switch {
            self.home_in_place();
            return Ok(());
        }
        let mut sequence = Sequence::new();
        push(&mut sequence, self.homing_task()?)?;
        self.enqueue_sequence(sequence)?;
        self.runtime.is_pause_requested = false;
        Ok(())
    }

    /// Jog an axis until stopped
    ///
    /// The sign of `rpm` selects the direction. Repeating the same jog keeps
    /// it alive; a zero speed stops it.
    pub fn request_jog(&mut self, axis: Axis, rpm: i32, now_ms: u64) -> Result<(), RequestError> {
        let direction = Direction::of_delta(rpm as i64);
        if let Some(task) = self.queue.current() {
            let same_jog = task.kind() == TaskKind::Jog
                && task.motor().ramp_axis() == axis
                && task.direction() == direction;
            if rpm == 0 && task.kind() == TaskKind::Jog {
                self.request_stop();
                return Ok(());
            }
            if same_jog {
                self.jog_watchdog.ping(now_ms);
                return Ok(());
            }
        }
        self.ensure_idle()?;
        if rpm == 0 {
            return Ok(());
        }

        let speed = (rpm.unsigned_abs() as f32).min(self.config.max_rpm(axis));
        let motor = match axis {
            Axis::Winder => Motor::Winder,
            Axis::Traverse => Motor::Traverse,
        };
        self.enqueue(
            TaskKind::Jog,
            motor,
            Target::Continuous(direction),
            speed,
            self.config.default_ramp(axis),
        )?;
        self.runtime.is_pause_requested = false;
        self.jog_watchdog.arm(now_ms);
        Ok(())
    }

    /// Keep an active jog alive
    pub fn jog_ping(&mut self, now_ms: u64) {
        self.jog_watchdog.ping(now_ms);
    }

    /// Relative winder move
    pub fn request_move_winder(&mut self, steps: i64) -> Result<(), RequestError> {
        self.ensure_idle()?;
        self.enqueue(
            TaskKind::Positioning,
            Motor::Winder,
            Target::Relative(steps),
            self.config.max_rpm(Axis::Winder),
            self.config.default_ramp(Axis::Winder),
        )?;
        self.runtime.is_pause_requested = false;
        Ok(())
    }

    /// Absolute traverse move, in mm from home
    pub fn request_move_traverse(&mut self, mm: f32) -> Result<(), RequestError> {
        self.ensure_idle()?;
        if !mm.is_finite() {
            return Err(RequestError::InvalidValue);
        }
        self.enqueue(
            TaskKind::Positioning,
            Motor::Traverse,
            Target::Absolute(self.config.mm_to_steps(mm)),
            self.config.max_rpm(Axis::Traverse),
            self.config.default_ramp(Axis::Traverse),
        )?;
        self.runtime.is_pause_requested = false;
        Ok(())
    }

    /// Ask the engine to pause at the next tick
    ///
    /// Ignored when nothing is queued or running.
    pub fn request_pause(&mut self) {
        if !self.is_idle() && !self.state.is_error() {
            self.runtime.is_pause_requested = true;
        }
    }

    /// Ask the engine to resume at the next tick
    pub fn request_resume(&mut self) {
        self.runtime.is_pause_requested = false;
    }

    /// Abandon all queued and running tasks
    ///
    /// Does not leave the error state.
    pub fn request_stop(&mut self) {
        if self.state.is_error() {
            return;
        }
        self.abandon();
        self.apply(Event::Stop);
    }

    /// Acknowledge a fault
    pub fn request_reset(&mut self) -> Result<(), RequestError> {
        if !self.state.is_error() {
            return Err(RequestError::NotInError);
        }
        self.last_fault = None;
        self.apply(Event::Reset);
        Ok(())
    }

    // ----- Scheduler tick -----

    /// Advance the engine
    ///
    /// Emits at most one step per axis. Constant time.
    pub fn tick<O: StepOutput, L: LimitSwitch>(&mut self, now_us: u64, out: &mut O, limit: &mut L) {
        self.sync_outputs(out);
        self.advance(now_us, out, limit);
        self.sync_outputs(out);
    }

    fn advance<O: StepOutput, L: LimitSwitch>(&mut self, now_us: u64, out: &mut O, limit: &mut L) {
        if self.state.is_error() {
            return;
        }

        if self.jog_watchdog.check(now_us / 1000) == WatchdogStatus::Expired {
            self.request_stop();
            return;
        }

        if self.config.use_limit_switch && self.state.guards_limit() && limit.is_triggered() {
            self.fault(FaultKind::UnexpectedLimitTrigger);
            return;
        }

        if self.state == State::Paused {
            if self.runtime.is_pause_requested {
                return;
            }
            self.resume(now_us);
        } else if self.runtime.is_pause_requested && self.state.pausable() {
            self.apply(Event::PauseRequested);
            return;
        }

        let activated = match self.queue.current_mut() {
            None => {
                self.runtime.is_pause_requested = false;
                self.apply(Event::QueueDrained);
                return;
            }
            Some(task) if task.is_pending() => {
                task.activate(now_us, self.runtime.abs_pos);
                Some(task.kind())
            }
            Some(_) => None,
        };
        if let Some(kind) = activated {
            if kind == TaskKind::Homing {
                self.runtime.is_homed = false;
                self.homing.begin(
                    now_us,
                    self.config.steps_per_rev(Axis::Traverse),
                    self.config.steps_per_mm(),
                    self.config.backoff_distance_mm,
                );
            }
            self.apply(Event::TaskActivated(kind));
            self.sync_outputs(out);
        }

        match self.drive(now_us, out, limit) {
            Drive::Continue => {}
            Drive::Complete => {
                if let Some(task) = self.queue.dequeue() {
                    if task.kind() == TaskKind::Jog {
                        self.jog_watchdog.disarm();
                    }
                }
                if self.queue.is_empty() {
                    self.apply(Event::QueueDrained);
                }
            }
            Drive::Fault(kind) => self.fault(kind),
        }
    }

    /// Drive the head task by one tick
    fn drive<O: StepOutput, L: LimitSwitch>(
        &mut self,
        now_us: u64,
        out: &mut O,
        limit: &mut L,
    ) -> Drive {
        let Self {
            config,
            runtime,
            queue,
            homing,
            sync,
            ..
        } = self;
        let Some(task) = queue.current_mut() else {
            return Drive::Complete;
        };
        if task.is_complete() {
            return Drive::Complete;
        }

        match task.kind() {
            TaskKind::Homing => match homing.poll(now_us, limit.is_triggered()) {
                HomingAction::Wait => {}
                HomingAction::Step(dir) => {
                    emit(out, config, Axis::Traverse, dir);
                    runtime.abs_pos += dir.sign();
                    runtime.last_step_us = now_us;
                    task.record_step(now_us);
                }
                HomingAction::Complete => {
                    runtime.abs_pos = 0;
                    runtime.is_homed = true;
                    task.finish();
                }
                HomingAction::Failed => return Drive::Fault(FaultKind::HomingFailed),
            },
            TaskKind::Winding => {
                let remaining = task.remaining_steps();
                task.ramp_mut().update(now_us, remaining);
                if task.ramp().step_due(now_us) {
                    emit(out, config, Axis::Winder, task.direction());
                    task.record_step(now_us);
                    if let Some(dir) = sync.on_winder_step() {
                        emit(out, config, Axis::Traverse, dir);
                        runtime.abs_pos += dir.sign();
                    }
                    runtime.last_step_us = now_us;
                }
            }
            TaskKind::Positioning | TaskKind::Jog => {
                let remaining = task.remaining_steps();
                task.ramp_mut().update(now_us, remaining);
                if task.ramp().step_due(now_us) {
                    let axis = task.motor().ramp_axis();
                    emit(out, config, axis, task.direction());
                    if axis == Axis::Traverse {
                        runtime.abs_pos += task.direction().sign();
                    }
                    runtime.last_step_us = now_us;
                    task.record_step(now_us);
                }
            }
        }

        if task.is_complete() {
            Drive::Complete
        } else {
            Drive::Continue
        }
    }

    // ----- Internals -----

    fn ensure_idle(&self) -> Result<(), RequestError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(RequestError::Busy)
        }
    }

    fn winding_rpm(&self) -> f32 {
        (self.preset.target_rpm as f32).min(self.config.max_rpm(Axis::Winder))
    }

    fn homing_task(&self) -> Result<Task, QueueError> {
        self.build_task(
            TaskKind::Homing,
            Motor::Traverse,
            Target::Continuous(Direction::Reverse),
            HOMING_RPM,
            HOMING_RPM,
        )
    }

    /// Without a switch the current position becomes home
    fn home_in_place(&mut self) {
        self.runtime.abs_pos = 0;
        self.runtime.is_homed = true;
    }

    /// Queue a whole sequence or nothing
    ///
    /// A sequence that does not fit is a fault.
    fn enqueue_sequence(&mut self, tasks: Sequence) -> Result<(), RequestError> {
        if self.queue.capacity() - self.queue.len() < tasks.len() {
            self.fault(FaultKind::QueueFull);
            return Err(QueueError::QueueFull.into());
        }
        for task in tasks {
            self.queue.enqueue(task)?;
        }
        Ok(())
    }

    fn resume(&mut self, now_us: u64) {
        match self.queue.current_mut() {
            Some(task) => {
                task.ramp_mut().rebase(now_us);
                let kind = task.kind();
                if kind == TaskKind::Homing {
                    self.homing.rebase(now_us);
                }
                self.apply(Event::ResumeRequested(kind));
            }
            None => self.apply(Event::QueueDrained),
        }
    }

    /// Drop all motion state shared by stop and fault
    fn abandon(&mut self) {
        self.queue.clear();
        self.homing.cancel();
        self.jog_watchdog.disarm();
        self.runtime.is_pause_requested = false;
    }

    fn fault(&mut self, kind: FaultKind) {
        self.abandon();
        self.last_fault = Some(kind);
        self.apply(Event::Fault(kind));
    }

    fn apply(&mut self, event: Event) {
        let next = self.state.transition(event);
        if next == self.state {
            return;
        }
        if self.transitions.is_full() {
            self.transitions.pop_front();
        }
        // Cannot fail: room was made above
        let _ = self.transitions.push_back(Transition {
            from: self.state,
            to: next,
            event,
        });
        self.state = next;
    }

    /// Drivers are enabled while a task runs or is paused
    fn sync_outputs<O: StepOutput>(&mut self, out: &mut O) {
        let wanted = self.state.motion_allowed() || self.state == State::Paused;
        if wanted != self.outputs_enabled {
            out.enable(wanted);
            self.outputs_enabled = wanted;
        }
    }
}

fn push(sequence: &mut Sequence, task: Task) -> Result<(), QueueError> {
    sequence.push(task).map_err(|_| QueueError::QueueFull)
}

/// Emit a step, applying the axis' direction polarity
fn emit<O: StepOutput>(out: &mut O, config: &MachineConfig, axis: Axis, dir: Direction) {
    out.step(axis, dir.with_polarity(config.inverted(axis)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::step_interval_us;
    use crate::testing::{LimitScript, SimHardware};

    const TICK_US: u64 = 50;

    fn small_machine() -> MachineConfig {
        MachineConfig {
            screw_pitch: 1.0,
            steps_per_rev_w: 200,
            steps_per_rev_t: 200,
            max_rpm_w: 600,
            max_rpm_t: 300,
            start_rpm_w: 30,
            start_rpm_t: 30,
            default_ramp_w: 600,
            default_ramp_t: 600,
            use_limit_switch: true,
            home_before_start: false,
            use_start_offset: false,
            backoff_distance_mm: 0.5,
            ..MachineConfig::default()
        }
    }

    fn small_preset() -> WindingPreset {
        WindingPreset {
            wire_dia: 0.1,
            coil_width: 0.5,
            total_turns: 20,
            target_rpm: 300,
            ramp_rpm: 600,
            start_offset: 0.0,
            ..WindingPreset::default()
        }
    }

    /// Tick until `done` holds or `max_ticks` pass; returns the final time
    fn run_until(
        winder: &mut Winder,
        hw: &mut SimHardware,
        mut now: u64,
        max_ticks: u64,
        done: impl Fn(&Winder) -> bool,
    ) -> u64 {
        for _ in 0..max_ticks {
            now += TICK_US;
            winder.tick(now, &mut hw.output, &mut hw.limit);
            if done(winder) {
                return now;
            }
        }
        panic!("condition not reached, state {:?}", winder.state());
    }

    #[test]
    fn test_starts_idle() {
        let winder = Winder::default();
        assert_eq!(winder.state(), State::Idle);
        assert!(winder.queue().is_empty());
        assert_eq!(winder.last_fault(), None);
    }

    #[test]
    fn test_winding_run_completes() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);

        winder.request_start().unwrap();
        assert_eq!(winder.queue().len(), 1);

        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Running);
        assert!(hw.output.enabled);

        run_until(&mut winder, &mut hw, TICK_US, 10_000_000, |w| {
            w.state() == State::Idle
        });

        // 20 turns of 200 steps, 0.1 mm wire on a 1 mm screw
        assert_eq!(hw.output.winder_steps, 4000);
        assert_eq!(hw.output.traverse_pulses, 400);
        // 100 steps per layer: four layers, out and back twice
        assert_eq!(winder.runtime().abs_pos, 0);
        assert!(!hw.output.enabled);
    }

    #[test]
    fn test_traverse_follows_winder_in_same_tick() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_start().unwrap();
        run_until(&mut winder, &mut hw, 0, 10_000_000, |w| {
            w.layer_sync().traverse_steps() == 1
        });
        // Tenth winder step produced the first traverse step right after it
        let log = &hw.output.log;
        assert_eq!(log.len(), 11);
        assert_eq!(log[9], (Axis::Winder, Direction::Forward));
        assert_eq!(log[10], (Axis::Traverse, Direction::Forward));
    }

    #[test]
    fn test_home_request() {
        let mut winder = Winder::new(small_machine(), small_preset());
        winder.runtime.abs_pos = 1234;
        let mut hw = SimHardware::new(LimitScript::AfterReverseSteps(300));

        winder.request_home().unwrap();
        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Homing);
        assert!(!winder.runtime().is_homed);

        run_until(&mut winder, &mut hw, TICK_US, 10_000_000, |w| {
            w.state() == State::Idle
        });

        assert!(winder.runtime().is_homed);
        assert_eq!(winder.runtime().abs_pos, 0);
        assert_eq!(hw.output.reverse_traverse, 300);
        // 0.5 mm at 200 steps/mm
        assert_eq!(hw.output.forward_traverse, 100);
    }

    #[test]
    fn test_home_without_switch_is_satisfied() {
        let mut winder = Winder::new(
            MachineConfig {
                use_limit_switch: false,
                ..small_machine()
            },
            small_preset(),
        );
        winder.runtime.abs_pos = 77;
        winder.request_home().unwrap();
        assert!(winder.runtime().is_homed);
        assert_eq!(winder.runtime().abs_pos, 0);
        assert!(winder.queue().is_empty());
        assert_eq!(winder.state(), State::Idle);
    }

    #[test]
    fn test_homing_failure_faults() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_home().unwrap();
        run_until(&mut winder, &mut hw, 0, 100_000_000, |w| w.state().is_error());
        assert_eq!(winder.state(), State::Error(FaultKind::HomingFailed));
        assert_eq!(winder.last_fault(), Some(FaultKind::HomingFailed));
        assert!(winder.queue().is_empty());
    }

    #[test]
    fn test_start_sequence_with_homing_and_offset() {
        let mut winder = Winder::new(
            MachineConfig {
                home_before_start: true,
                use_start_offset: true,
                ..small_machine()
            },
            WindingPreset {
                start_offset: 2.0,
                ..small_preset()
            },
        );
        let mut hw = SimHardware::new(LimitScript::AfterReverseSteps(50));

        winder.request_start().unwrap();
        assert_eq!(winder.queue().len(), 3);

        let mut seen = std::vec::Vec::new();
        let mut now = 0;
        while seen.last() != Some(&State::Idle) || seen.len() < 2 {
            now += TICK_US;
            winder.tick(now, &mut hw.output, &mut hw.limit);
            while let Some(t) = winder.take_transition() {
                seen.push(t.to);
            }
            assert!(now < 600_000_000, "run did not finish");
        }
        assert_eq!(
            seen,
            [State::Homing, State::Moving, State::Running, State::Idle]
        );
        assert!(winder.runtime().is_homed);
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_start().unwrap();
        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.request_start(), Err(RequestError::Busy));
        assert_eq!(winder.request_home(), Err(RequestError::Busy));
        assert_eq!(winder.request_move_winder(10), Err(RequestError::Busy));
    }

    #[test]
    fn test_start_rejects_degenerate_preset() {
        let mut winder = Winder::new(
            small_machine(),
            WindingPreset {
                ramp_rpm: 0,
                ..small_preset()
            },
        );
        assert_eq!(
            winder.request_start(),
            Err(RequestError::Queue(QueueError::DegenerateRamp))
        );
        assert!(winder.queue().is_empty());
        assert_eq!(winder.state(), State::Idle);
    }

    #[test]
    fn test_start_rejects_bad_geometry() {
        let mut winder = Winder::new(
            small_machine(),
            WindingPreset {
                wire_dia: 0.0,
                ..small_preset()
            },
        );
        assert_eq!(
            winder.request_start(),
            Err(RequestError::Geometry(GeometryError::NonPositive))
        );
        assert!(winder.queue().is_empty());
    }

    #[test]
    fn test_refused_start_queues_nothing() {
        let mut winder = Winder::new(
            MachineConfig {
                home_before_start: true,
                use_start_offset: true,
                default_ramp_t: 0,
                ..small_machine()
            },
            small_preset(),
        );
        let mut hw = SimHardware::new(LimitScript::AfterReverseSteps(50));
        assert_eq!(
            winder.request_start(),
            Err(RequestError::Queue(QueueError::DegenerateRamp))
        );
        assert!(winder.queue().is_empty());

        for i in 1..100 {
            winder.tick(i * TICK_US, &mut hw.output, &mut hw.limit);
        }
        assert_eq!(winder.state(), State::Idle);
        assert_eq!(hw.output.traverse_pulses, 0);
    }

    #[test]
    fn test_refused_start_keeps_home_reference() {
        let mut winder = Winder::new(
            MachineConfig {
                use_limit_switch: false,
                home_before_start: true,
                use_start_offset: true,
                max_rpm_t: 0,
                ..small_machine()
            },
            small_preset(),
        );
        winder.runtime.abs_pos = 42;
        assert!(winder.request_start().is_err());
        assert_eq!(winder.runtime().abs_pos, 42);
        assert!(!winder.runtime().is_homed);
    }

    #[test]
    fn test_start_rejects_non_positive_turns() {
        for turns in [0, -5] {
            let mut winder = Winder::new(
                small_machine(),
                WindingPreset {
                    total_turns: turns,
                    ..small_preset()
                },
            );
            assert_eq!(winder.request_start(), Err(RequestError::InvalidValue));
            assert!(winder.queue().is_empty());
        }
    }

    #[test]
    fn test_pause_while_idle_does_not_stick() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);

        winder.request_pause();
        assert!(!winder.runtime().is_pause_requested);
        winder.request_move_winder(50).unwrap();
        let now = run_until(&mut winder, &mut hw, 0, 10_000_000, |w| w.state() == State::Idle);
        assert_eq!(hw.output.winder_steps, 50);

        // Flag written directly while idle is cleared by the next move
        winder.runtime.is_pause_requested = true;
        winder.request_move_winder(50).unwrap();
        assert!(!winder.runtime().is_pause_requested);
        run_until(&mut winder, &mut hw, now, 10_000_000, |w| w.state() == State::Idle);
        assert_eq!(hw.output.winder_steps, 100);
    }

    #[test]
    fn test_move_traverse_rejects_non_finite() {
        let mut winder = Winder::new(small_machine(), small_preset());
        for mm in [f32::INFINITY, f32::NEG_INFINITY, f32::NAN] {
            assert_eq!(
                winder.request_move_traverse(mm),
                Err(RequestError::InvalidValue)
            );
        }
        assert!(winder.queue().is_empty());
    }

    #[test]
    fn test_pause_freezes_ramp() {
        let mut winder = Winder::new(
            small_machine(),
            WindingPreset {
                total_turns: 1000,
                ramp_rpm: 100,
                ..small_preset()
            },
        );
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_start().unwrap();

        // Part way up the ramp
        let now = run_until(&mut winder, &mut hw, 0, 10_000_000, |w| {
            w.current_rpm() > 100.0
        });
        winder.request_pause();
        let now = run_until(&mut winder, &mut hw, now, 10, |w| w.state() == State::Paused);
        let rpm_at_pause = winder.current_rpm();
        let steps_at_pause = hw.output.winder_steps;
        assert!(rpm_at_pause < 300.0);

        // A long pause moves nothing and keeps the speed
        let mut now = now;
        for _ in 0..100_000 {
            now += TICK_US;
            winder.tick(now, &mut hw.output, &mut hw.limit);
        }
        assert_eq!(hw.output.winder_steps, steps_at_pause);
        assert_eq!(winder.current_rpm(), rpm_at_pause);

        winder.request_resume();
        now += TICK_US;
        winder.tick(now, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Running);
        assert_eq!(winder.current_rpm(), rpm_at_pause);

        // No burst of catch-up steps after resuming
        let interval = step_interval_us(rpm_at_pause, 200) as u64;
        for _ in 0..(interval / TICK_US) {
            now += TICK_US;
            winder.tick(now, &mut hw.output, &mut hw.limit);
        }
        assert!(hw.output.winder_steps - steps_at_pause <= 1);
    }

    #[test]
    fn test_pause_flag_from_variable() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_start().unwrap();
        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);

        winder.runtime.is_pause_requested = true;
        winder.tick(2 * TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Paused);
        // Drivers hold while paused
        assert!(hw.output.enabled);

        winder.runtime.is_pause_requested = false;
        winder.tick(3 * TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Running);
    }

    #[test]
    fn test_unexpected_limit_trigger() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_start().unwrap();
        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Running);

        hw.limit.script = LimitScript::Closed;
        winder.tick(2 * TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(
            winder.state(),
            State::Error(FaultKind::UnexpectedLimitTrigger)
        );
        assert!(winder.queue().is_empty());
        assert!(!hw.output.enabled);

        // Latched: further ticks and stop do nothing
        let steps = hw.output.winder_steps;
        winder.request_stop();
        for i in 3..1000 {
            winder.tick(i * TICK_US, &mut hw.output, &mut hw.limit);
        }
        assert_eq!(hw.output.winder_steps, steps);
        assert!(winder.state().is_error());

        winder.request_reset().unwrap();
        assert_eq!(winder.state(), State::Idle);
        assert_eq!(winder.last_fault(), None);
        assert_eq!(winder.request_reset(), Err(RequestError::NotInError));
    }

    #[test]
    fn test_limit_ignored_when_not_fitted() {
        let mut winder = Winder::new(
            MachineConfig {
                use_limit_switch: false,
                ..small_machine()
            },
            small_preset(),
        );
        let mut hw = SimHardware::new(LimitScript::Closed);
        winder.request_start().unwrap();
        for i in 1..100 {
            winder.tick(i * TICK_US, &mut hw.output, &mut hw.limit);
        }
        assert_eq!(winder.state(), State::Running);
    }

    #[test]
    fn test_stop_clears_queue() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_start().unwrap();
        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);
        winder.request_pause();
        winder.tick(2 * TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Paused);

        winder.request_stop();
        assert_eq!(winder.state(), State::Idle);
        assert!(winder.queue().is_empty());
        assert!(!winder.runtime().is_pause_requested);

        winder.tick(3 * TICK_US, &mut hw.output, &mut hw.limit);
        assert!(!hw.output.enabled);
    }

    #[test]
    fn test_jog_runs_until_watchdog() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);

        winder.request_jog(Axis::Traverse, 120, 0).unwrap();
        let mut now = 0;
        // Keep pinging for two seconds
        while now < 2_000_000 {
            now += TICK_US;
            if now % 700_000 == 0 {
                winder.jog_ping(now / 1000);
            }
            winder.tick(now, &mut hw.output, &mut hw.limit);
            assert_eq!(winder.state(), State::Moving);
        }
        assert!(hw.output.forward_traverse > 0);
        assert_eq!(winder.runtime().abs_pos, hw.output.forward_traverse as i64);

        // Pings stop; the jog is stopped within the timeout
        run_until(&mut winder, &mut hw, now, 2_000_000, |w| {
            w.state() == State::Idle
        });
        assert!(winder.queue().is_empty());
    }

    #[test]
    fn test_jog_zero_stops() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_jog(Axis::Winder, -200, 0).unwrap();
        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);
        assert_eq!(winder.state(), State::Moving);

        // Same jog again is a keep-alive, another axis is refused
        winder.request_jog(Axis::Winder, -200, 0).unwrap();
        assert_eq!(
            winder.request_jog(Axis::Traverse, 50, 0),
            Err(RequestError::Busy)
        );

        winder.request_jog(Axis::Winder, 0, 0).unwrap();
        assert_eq!(winder.state(), State::Idle);
    }

    #[test]
    fn test_jog_speed_clamped() {
        let mut winder = Winder::new(small_machine(), small_preset());
        winder.request_jog(Axis::Traverse, -10_000, 0).unwrap();
        let task = winder.queue().current().unwrap();
        assert_eq!(task.ramp().profile().target_rpm, 300.0);
        assert_eq!(task.direction(), Direction::Reverse);
    }

    #[test]
    fn test_move_traverse_absolute() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.runtime.abs_pos = 500;

        winder.request_move_traverse(1.0).unwrap();
        run_until(&mut winder, &mut hw, 0, 10_000_000, |w| w.state() == State::Idle);
        assert_eq!(winder.runtime().abs_pos, 200);
        assert_eq!(hw.output.reverse_traverse, 300);
    }

    #[test]
    fn test_move_winder_relative() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_move_winder(-250).unwrap();
        run_until(&mut winder, &mut hw, 0, 10_000_000, |w| w.state() == State::Idle);
        assert_eq!(hw.output.winder_steps, -250);
        assert_eq!(winder.runtime().abs_pos, 0);
    }

    #[test]
    fn test_polarity_applied_at_output() {
        let mut winder = Winder::new(
            MachineConfig {
                invert_dir_w: true,
                ..small_machine()
            },
            small_preset(),
        );
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_move_winder(10).unwrap();
        run_until(&mut winder, &mut hw, 0, 10_000_000, |w| w.state() == State::Idle);
        // Logical forward, physical reverse
        assert_eq!(hw.output.winder_steps, -10);
    }

    #[test]
    fn test_transition_log() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_move_winder(1).unwrap();
        run_until(&mut winder, &mut hw, 0, 10_000_000, |w| w.state() == State::Idle);

        let first = winder.take_transition().unwrap();
        assert_eq!(first.from, State::Idle);
        assert_eq!(first.to, State::Moving);
        assert_eq!(first.event, Event::TaskActivated(TaskKind::Positioning));
        let second = winder.take_transition().unwrap();
        assert_eq!(second.to, State::Idle);
        assert_eq!(winder.take_transition(), None);
    }

    #[test]
    fn test_status_snapshot() {
        let mut winder = Winder::new(small_machine(), small_preset());
        let mut hw = SimHardware::new(LimitScript::Open);
        winder.request_start().unwrap();
        winder.tick(TICK_US, &mut hw.output, &mut hw.limit);

        let status = winder.status();
        assert_eq!(status.state, State::Running);
        assert_eq!(status.queue_len, 1);
        let task = status.task.unwrap();
        assert_eq!(task.kind, TaskKind::Winding);
        assert_eq!(task.target_steps, Some(4000));
    }
}
