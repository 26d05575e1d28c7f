//! Profile execution: one run at a time, driven one tick at a time.

use serde::{Deserialize, Serialize};

use crate::config::{OvenConfig, SafetyLimits};
use crate::error::{AbortReason, StartError};
use crate::fsm::context::{RunContext, RunState, Terminal};
use crate::fsm::{Fsm, StateId, states};

use super::definition::{Phase, ProfileDefinition};

/// Externally visible lifecycle of the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Idle,
    Running { phase_index: usize },
    Completed,
    Aborted(AbortReason),
}

impl RunStatus {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Executes a [`ProfileDefinition`] against measured temperatures.
///
/// The runner only produces setpoints; it never touches outputs.
pub struct ProfileRunner {
    fsm: Fsm,
    ctx: RunContext,
}

impl ProfileRunner {
    pub fn new(config: &OvenConfig) -> Self {
        let mut ctx = RunContext::new(
            config.tick_period_ms,
            config.ramp_arrival_band_c,
            config.limits.max_phase_secs,
        );
        let mut fsm = Fsm::new(states::build_state_table(), StateId::Idle);
        fsm.start(&mut ctx);
        Self { fsm, ctx }
    }

    /// Pick up new timing and limit settings.  Only called between runs.
    pub(crate) fn apply_config(&mut self, config: &OvenConfig) {
        self.ctx.tick_ms = config.tick_period_ms;
        self.ctx.arrival_band_c = config.ramp_arrival_band_c;
        self.ctx.max_phase_ms = u64::from(config.limits.max_phase_secs) * 1000;
    }

    /// Begin executing `profile` from the current oven temperature.
    ///
    /// Allowed from `Idle` and from either terminal state.  The start tick
    /// itself has elapsed time zero.
    pub fn start(
        &mut self,
        profile: ProfileDefinition,
        measured_c: Option<f32>,
        limits: &SafetyLimits,
    ) -> Result<(), StartError> {
        if self.fsm.current_state() == StateId::Running {
            return Err(StartError::AlreadyRunning);
        }
        profile.validate(limits)?;
        let measured_c = measured_c
            .filter(|t| t.is_finite())
            .ok_or(StartError::NoMeasurement)?;

        self.ctx.profile = profile;
        self.ctx.measured_c = measured_c;
        self.fsm.force_transition(StateId::Running, &mut self.ctx);
        Ok(())
    }

    /// Advance the run by one tick period.  A no-op unless `Running`.
    ///
    /// A missing measurement leaves the setpoint advancing but can never
    /// complete a ramp; the safety monitor aborts the run on the same tick.
    pub fn tick(&mut self, measured_c: Option<f32>) -> RunStatus {
        self.ctx.measured_c = measured_c.unwrap_or(f32::NAN);
        self.fsm.tick(&mut self.ctx);
        self.status()
    }

    /// End the run with `reason`.  Returns `false` (and changes nothing)
    /// when no run is active, so a repeated abort keeps the first reason.
    pub fn abort(&mut self, reason: AbortReason) -> bool {
        if self.fsm.current_state() != StateId::Running {
            return false;
        }
        self.ctx.run.terminal = Terminal::Aborted(reason);
        self.fsm.force_transition(StateId::Aborted, &mut self.ctx);
        true
    }

    /// Return a finished runner to `Idle`.
    pub fn reset(&mut self) -> Result<(), StartError> {
        if self.fsm.current_state() == StateId::Running {
            return Err(StartError::AlreadyRunning);
        }
        self.fsm.force_transition(StateId::Idle, &mut self.ctx);
        Ok(())
    }

    pub fn status(&self) -> RunStatus {
        match self.fsm.current_state() {
            StateId::Idle => RunStatus::Idle,
            StateId::Running => RunStatus::Running {
                phase_index: self.ctx.run.phase_index,
            },
            StateId::Completed => RunStatus::Completed,
            StateId::Aborted => match self.ctx.run.terminal {
                Terminal::Aborted(reason) => RunStatus::Aborted(reason),
                _ => RunStatus::Aborted(AbortReason::UserRequest),
            },
        }
    }

    pub fn is_running(&self) -> bool {
        self.fsm.current_state() == StateId::Running
    }

    /// Completed or aborted, until the next start or reset.
    pub fn is_finished(&self) -> bool {
        self.fsm.current_state().is_terminal()
    }

    /// Current setpoint, only while running.
    pub fn setpoint(&self) -> Option<f32> {
        self.is_running().then_some(self.ctx.run.setpoint_c)
    }

    pub fn run_state(&self) -> &RunState {
        &self.ctx.run
    }

    pub fn profile(&self) -> &ProfileDefinition {
        &self.ctx.profile
    }

    /// Phase being executed, only while running.
    pub fn current_phase(&self) -> Option<&Phase> {
        if self.is_running() {
            self.ctx.current_phase()
        } else {
            None
        }
    }

    /// Whether the last start or tick entered a new phase.
    pub fn phase_changed(&self) -> bool {
        self.is_running() && self.ctx.phase_changed
    }
}
