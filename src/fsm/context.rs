//! Run state threaded through every FSM handler.
//!
//! `RunContext` is the blackboard the state handlers read and write: the
//! profile being executed, the latest aggregated temperature, timing
//! settings and the [`RunState`] the rest of the controller observes.

use serde::{Deserialize, Serialize};

use crate::error::AbortReason;
use crate::profile::{Phase, ProfileDefinition};

/// How a run ended, if it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Terminal {
    #[default]
    None,
    Completed,
    Aborted(AbortReason),
}

/// Observable progress of the current (or last) run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RunState {
    pub phase_index: usize,
    /// Run time at which the current phase was entered.
    pub phase_entry_ms: u64,
    /// Measured temperature when the current phase was entered.
    pub phase_entry_c: f32,
    pub setpoint_c: f32,
    /// Run time: ticks since start multiplied by the tick period.
    pub elapsed_ms: u64,
    pub terminal: Terminal,
}

impl RunState {
    pub fn phase_elapsed_ms(&self) -> u64 {
        self.elapsed_ms - self.phase_entry_ms
    }
}

pub struct RunContext {
    pub profile: ProfileDefinition,
    pub run: RunState,
    /// Aggregated oven temperature for this tick.
    pub measured_c: f32,
    pub tick_ms: u32,
    pub arrival_band_c: f32,
    pub max_phase_ms: u64,
    /// Set by the running state whenever it enters a new phase.
    pub phase_changed: bool,
}

impl RunContext {
    pub fn new(tick_ms: u32, arrival_band_c: f32, max_phase_secs: u32) -> Self {
        Self {
            profile: ProfileDefinition::default(),
            run: RunState::default(),
            measured_c: f32::NAN,
            tick_ms,
            arrival_band_c,
            max_phase_ms: u64::from(max_phase_secs) * 1000,
            phase_changed: false,
        }
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.profile.phase(self.run.phase_index)
    }
}
