//! Outbound application events.
//!
//! The [`ControlLoop`](super::control_loop::ControlLoop) emits these
//! through the [`EventSink`](super::ports::EventSink) port, always after
//! the tick's outputs have been written.

use serde::{Deserialize, Serialize};

use crate::error::{AbortReason, SensorFault, StartError};
use crate::profile::definition::{PhaseName, ProfileName};

/// How a run ended.  Reported exactly once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    Completed,
    Aborted(AbortReason),
}

/// Periodic progress for a display or host plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub phase_index: usize,
    pub phase_name: PhaseName,
    pub setpoint_c: f32,
    pub measured_c: Option<f32>,
    pub elapsed_ms: u64,
    pub heater_duty: u8,
}

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A start request was accepted.
    RunStarted {
        profile: ProfileName,
        phases: usize,
        start_c: f32,
    },

    /// A start request was refused; the runner did not change state.
    StartRejected(StartError),

    /// The run entered a phase (including phase 0 on start).
    PhaseChanged {
        phase_index: usize,
        phase_name: PhaseName,
        entry_c: f32,
        elapsed_ms: u64,
    },

    Progress(ProgressReport),

    Terminal(RunOutcome),

    /// A channel latched `Faulted` and left the aggregate.
    ChannelFaulted { channel: usize, fault: SensorFault },

    /// A faulted channel was acknowledged and is back in service.
    ChannelRearmed { channel: usize },

    /// The safety monitor started reporting a violation.
    SafetyTripped(AbortReason),
}
