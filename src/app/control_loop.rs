//! The control loop: one call to [`ControlLoop::tick`] per control period.
//!
//! ```text
//!                 ┌─────────────────────────────────────────────┐
//!  RequestQueue ─▶│ acks → sample → abort/start → safety →      │──▶ EventSink
//!                 │ runner → PID → outputs (once) → events      │
//!  Temperature ──▶│                                             │──▶ ActuatorSink
//!  Source         └─────────────────────────────────────────────┘
//! ```
//!
//! Every decision for a tick is made before any output is written, and
//! outputs are written before any event is emitted, so a display never
//! sees an abort while the heater is still on.  "Outputs" covers the
//! heater, fan, aux and case fan duties, the panel lamps, and the alarm
//! on the tick a run ends.

use heapless::Vec;
use log::{debug, info, warn};

use crate::config::OvenConfig;
use crate::control::PidController;
use crate::error::{ConfigError, StartError};
use crate::fsm::context::RunState;
use crate::profile::{ProfileDefinition, ProfileRunner, RunStatus};
use crate::safety::SafetyMonitor;
use crate::sensors::{TemperatureFrame, TemperatureReader};

use super::events::{AppEvent, ProgressReport, RunOutcome};
use super::ports::{ActuatorSink, Alarm, EventSink, Indicators, TemperatureSource};
use super::requests::RequestQueue;

/// Upper bound on events one tick can produce.
const MAX_EVENTS_PER_TICK: usize = 16;

/// Duties written on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputCommand {
    pub heater: u8,
    pub fan: u8,
    pub aux: u8,
    pub case_fan: u8,
    pub indicators: Indicators,
}

/// What happened on one tick, for tracing and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSnapshot {
    pub tick: u64,
    pub status: RunStatus,
    pub measured_c: Option<f32>,
    pub setpoint_c: Option<f32>,
    pub outputs: OutputCommand,
}

/// Owns the reader, runner, PID and safety monitor, and drives the
/// hardware `H` (temperature inputs and outputs) once per tick.
pub struct ControlLoop<'q, H, E>
where
    H: TemperatureSource + ActuatorSink,
    E: EventSink,
{
    config: OvenConfig,
    reader: TemperatureReader,
    runner: ProfileRunner,
    pid: PidController,
    safety: SafetyMonitor,
    hw: H,
    events: E,
    requests: &'q RequestQueue,
    tick_count: u64,
    last_progress_ms: Option<u64>,
    last_outputs: OutputCommand,
}

impl<'q, H, E> ControlLoop<'q, H, E>
where
    H: TemperatureSource + ActuatorSink,
    E: EventSink,
{
    /// Validate `config` and build the loop.  Outputs are switched off.
    pub fn new(
        config: OvenConfig,
        mut hw: H,
        events: E,
        requests: &'q RequestQueue,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        hw.all_off();
        info!(
            "control loop: {} ms tick, {} channel(s), max {:.0}°C",
            config.tick_period_ms,
            config.channels.len(),
            config.limits.max_temperature_c
        );
        Ok(Self {
            reader: TemperatureReader::new(&config),
            runner: ProfileRunner::new(&config),
            pid: PidController::new(config.pid),
            safety: SafetyMonitor::new(config.limits),
            config,
            hw,
            events,
            requests,
            tick_count: 0,
            last_progress_ms: None,
            last_outputs: OutputCommand::default(),
        })
    }

    /// Swap the oven configuration.  Refused while a run is active.
    pub fn replace_config(&mut self, config: OvenConfig) -> Result<(), StartError> {
        if self.runner.is_running() {
            return Err(StartError::AlreadyRunning);
        }
        config.validate()?;
        self.reader.reconfigure(&config);
        self.runner.apply_config(&config);
        self.safety.set_limits(config.limits);
        self.pid.set_gains(config.pid);
        self.pid.reset();
        self.config = config;
        info!("control loop: configuration replaced");
        Ok(())
    }

    /// Run one control period.
    pub fn tick(&mut self) -> TickSnapshot {
        self.tick_count += 1;
        let mut pending: Vec<AppEvent, MAX_EVENTS_PER_TICK> = Vec::new();
        let was_running = self.runner.is_running();

        // 1. Requests posted since the last tick.
        let requests = self.requests.take();
        for channel in requests.acknowledge {
            match self.reader.rearm(channel) {
                Ok(true) => push(&mut pending, AppEvent::ChannelRearmed { channel }),
                Ok(false) => debug!("TC{channel}: acknowledge ignored, not faulted"),
                Err(e) => warn!("acknowledge rejected: {e}"),
            }
        }

        // 2. Sample.
        let frame = self.reader.sample(&mut self.hw);
        for &channel in &frame.newly_faulted {
            if let Some(fault) = frame.readings.get(channel).and_then(|r| r.fault) {
                push(&mut pending, AppEvent::ChannelFaulted { channel, fault });
            }
        }

        // 3. Abort wins over a start posted for the same tick.
        let mut started = false;
        if let Some(reason) = requests.abort {
            if self.runner.abort(reason) {
                info!("abort requested: {reason}");
            } else {
                debug!("abort ({reason}) ignored, no run active");
            }
            if requests.start.is_some() {
                warn!("start discarded: abort requested on the same tick");
            }
        } else if let Some(profile) = requests.start {
            started = self.apply_start(profile, &frame, &mut pending);
        }

        // 4. Safety, independent of the runner's own view.
        let previous_verdict = self.safety.last_verdict();
        let verdict = self.safety.evaluate(&frame);
        if let Some(reason) = verdict {
            if previous_verdict != verdict {
                push(&mut pending, AppEvent::SafetyTripped(reason));
            }
            self.runner.abort(reason);
        }

        // 5. Advance the run.  The start tick itself runs at elapsed 0.
        if self.runner.is_running() && !started {
            self.runner.tick(frame.measured);
        }
        if self.runner.phase_changed() {
            self.push_phase_changed(&mut pending);
        }
        let status = self.runner.status();
        let outcome = ((was_running || started) && !self.runner.is_running()).then(|| {
            match status {
                RunStatus::Aborted(reason) => RunOutcome::Aborted(reason),
                _ => RunOutcome::Completed,
            }
        });

        // 6. Outputs, written exactly once.
        let outputs = self.compute_outputs(&frame);
        self.hw.set_heater_duty(outputs.heater);
        self.hw.set_fan_duty(outputs.fan);
        self.hw.set_aux_duty(outputs.aux);
        self.hw.set_case_fan_duty(outputs.case_fan);
        self.hw.set_indicators(outputs.indicators);
        if let Some(outcome) = outcome {
            self.hw.sound_alarm(match outcome {
                RunOutcome::Completed => Alarm::Complete,
                RunOutcome::Aborted(_) => Alarm::Aborted,
            });
        }
        self.last_outputs = outputs;

        // 7. Events.
        if self.runner.is_running() {
            self.push_progress(&mut pending, frame.measured, outputs.heater, started);
        }
        if let Some(outcome) = outcome {
            self.pid.reset();
            self.last_progress_ms = None;
            push(&mut pending, AppEvent::Terminal(outcome));
        }
        for event in &pending {
            self.events.emit(event);
        }

        TickSnapshot {
            tick: self.tick_count,
            status,
            measured_c: frame.measured,
            setpoint_c: self.runner.setpoint(),
            outputs,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> RunStatus {
        self.runner.status()
    }

    pub fn run_state(&self) -> &RunState {
        self.runner.run_state()
    }

    pub fn runner(&self) -> &ProfileRunner {
        &self.runner
    }

    pub fn reader(&self) -> &TemperatureReader {
        &self.reader
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn config(&self) -> &OvenConfig {
        &self.config
    }

    pub fn last_outputs(&self) -> OutputCommand {
        self.last_outputs
    }

    pub fn hardware(&self) -> &H {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn events(&self) -> &E {
        &self.events
    }

    /// Tear the loop down, switching every output off.
    pub fn into_parts(mut self) -> (H, E) {
        self.hw.all_off();
        (self.hw, self.events)
    }

    // ── Internal ──────────────────────────────────────────────

    fn apply_start(
        &mut self,
        profile: ProfileDefinition,
        frame: &TemperatureFrame,
        pending: &mut Vec<AppEvent, MAX_EVENTS_PER_TICK>,
    ) -> bool {
        let gains = profile.pid.unwrap_or(self.config.pid);
        let name = profile.name.clone();
        let phases = profile.len();
        match self
            .runner
            .start(profile, frame.measured, &self.config.limits)
        {
            Ok(()) => {
                self.pid.set_gains(gains);
                self.pid.reset();
                self.last_progress_ms = None;
                push(
                    pending,
                    AppEvent::RunStarted {
                        profile: name,
                        phases,
                        start_c: self.runner.run_state().phase_entry_c,
                    },
                );
                true
            }
            Err(e) => {
                warn!("start of '{name}' rejected: {e}");
                push(pending, AppEvent::StartRejected(e));
                false
            }
        }
    }

    fn compute_outputs(&mut self, frame: &TemperatureFrame) -> OutputCommand {
        let fans = self.config.fans;
        let measured = frame.measured;
        let running = self.runner.is_running();
        let warm_enclosure = frame.enclosure_c.is_some_and(|t| t > fans.case_fan_above_c);
        let case_fan = if running || warm_enclosure {
            fans.case_fan_duty
        } else {
            0
        };

        let (heater, fan, aux) = match self.runner.current_phase().map(|p| p.kind) {
            Some(phase) => {
                let heater = match (phase.is_powered(), self.runner.setpoint(), measured) {
                    (true, Some(sp), Some(t)) => {
                        duty(self.pid.update(sp, t, self.config.tick_secs()))
                    }
                    _ => {
                        self.pid.reset();
                        0
                    }
                };
                let fan = if phase.is_cooling() {
                    fans.cooling_duty
                } else {
                    fans.convection_duty
                };
                (heater, fan, fans.aux_duty_running)
            }
            None => {
                // Not running: heater off; keep cooling a hot oven after a run.
                let finished = self.runner.is_finished();
                let hot = measured.is_none_or(|t| t > fans.cool_down_above_c);
                (0, if finished && hot { fans.cooling_duty } else { 0 }, 0)
            }
        };

        OutputCommand {
            heater,
            fan,
            aux,
            case_fan,
            indicators: Indicators {
                heater: heater > 0,
                fan: fan > 0,
            },
        }
    }

    fn push_phase_changed(&self, pending: &mut Vec<AppEvent, MAX_EVENTS_PER_TICK>) {
        if let Some(phase) = self.runner.current_phase() {
            let run = self.runner.run_state();
            push(
                pending,
                AppEvent::PhaseChanged {
                    phase_index: run.phase_index,
                    phase_name: phase.name.clone(),
                    entry_c: run.phase_entry_c,
                    elapsed_ms: run.elapsed_ms,
                },
            );
        }
    }

    fn push_progress(
        &mut self,
        pending: &mut Vec<AppEvent, MAX_EVENTS_PER_TICK>,
        measured: Option<f32>,
        heater: u8,
        force: bool,
    ) {
        let run = *self.runner.run_state();
        let due = match self.last_progress_ms {
            None => true,
            Some(last) => {
                run.elapsed_ms.saturating_sub(last) >= u64::from(self.config.progress_interval_ms)
            }
        };
        if !(due || force) {
            return;
        }
        let Some(phase) = self.runner.current_phase() else {
            return;
        };
        push(
            pending,
            AppEvent::Progress(ProgressReport {
                phase_index: run.phase_index,
                phase_name: phase.name.clone(),
                setpoint_c: run.setpoint_c,
                measured_c: measured,
                elapsed_ms: run.elapsed_ms,
                heater_duty: heater,
            }),
        );
        self.last_progress_ms = Some(run.elapsed_ms);
    }
}

fn push(pending: &mut Vec<AppEvent, MAX_EVENTS_PER_TICK>, event: AppEvent) {
    if pending.push(event).is_err() {
        warn!("event buffer full, event dropped");
    }
}

/// PID output (already clamped to the gain bounds) as a whole percent.
fn duty(output: f32) -> u8 {
    if output.is_finite() {
        output.round().clamp(0.0, 100.0) as u8
    } else {
        0
    }
}
