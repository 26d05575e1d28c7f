//! Declarative reflow profile: an ordered list of named phases.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

use crate::config::{PidGains, SafetyLimits};
use crate::error::ProfileError;

/// Maximum number of phases in one profile.
pub const MAX_PHASES: usize = 12;

pub type PhaseName = String<16>;
pub type ProfileName = String<24>;

/// What a phase does with the setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PhaseKind {
    /// Move the setpoint linearly toward `target_c`, at most `max_rate_c_per_sec`.
    RampTo {
        target_c: f32,
        max_rate_c_per_sec: f32,
    },
    /// Constant setpoint for `duration_secs`.
    Hold { target_c: f32, duration_secs: u32 },
    /// Decreasing-only ramp.  When `powered` is false the heater stays off
    /// and only the fan cools the oven.
    RampDown {
        target_c: f32,
        max_rate_c_per_sec: f32,
        powered: bool,
    },
}

impl PhaseKind {
    pub fn target_c(&self) -> f32 {
        match *self {
            Self::RampTo { target_c, .. }
            | Self::Hold { target_c, .. }
            | Self::RampDown { target_c, .. } => target_c,
        }
    }

    /// Whether the PID drives the heater during this phase.
    pub fn is_powered(&self) -> bool {
        match *self {
            Self::RampTo { .. } | Self::Hold { .. } => true,
            Self::RampDown { powered, .. } => powered,
        }
    }

    pub fn is_cooling(&self) -> bool {
        matches!(self, Self::RampDown { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: PhaseName,
    pub kind: PhaseKind,
}

impl Phase {
    pub fn ramp_to(name: &str, target_c: f32, max_rate_c_per_sec: f32) -> Self {
        Self {
            name: truncated(name),
            kind: PhaseKind::RampTo {
                target_c,
                max_rate_c_per_sec,
            },
        }
    }

    pub fn hold(name: &str, target_c: f32, duration_secs: u32) -> Self {
        Self {
            name: truncated(name),
            kind: PhaseKind::Hold {
                target_c,
                duration_secs,
            },
        }
    }

    pub fn ramp_down(name: &str, target_c: f32, max_rate_c_per_sec: f32, powered: bool) -> Self {
        Self {
            name: truncated(name),
            kind: PhaseKind::RampDown {
                target_c,
                max_rate_c_per_sec,
                powered,
            },
        }
    }
}

/// Immutable description of a reflow profile.
///
/// The engine accepts any well-formed sequence; that the temperatures
/// follow a sensible reflow shape is up to whoever authored the profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileDefinition {
    pub name: ProfileName,
    pub phases: Vec<Phase, MAX_PHASES>,
    /// Per-profile gains overriding the oven's defaults.
    #[serde(default)]
    pub pid: Option<PidGains>,
}

impl ProfileDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: truncated(name),
            phases: Vec::new(),
            pid: None,
        }
    }

    /// Append a phase.
    pub fn push(&mut self, phase: Phase) -> Result<(), ProfileError> {
        self.phases
            .push(phase)
            .map_err(|_| ProfileError::TooManyPhases)
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_phase(mut self, phase: Phase) -> Result<Self, ProfileError> {
        self.push(phase)?;
        Ok(self)
    }

    pub fn with_gains(mut self, gains: PidGains) -> Self {
        self.pid = Some(gains);
        self
    }

    pub fn phase(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Check the profile can be executed under `limits`.
    pub fn validate(&self, limits: &SafetyLimits) -> Result<(), ProfileError> {
        if self.phases.is_empty() {
            return Err(ProfileError::Empty);
        }
        for (i, phase) in self.phases.iter().enumerate() {
            let target = phase.kind.target_c();
            if !target.is_finite() || target < 0.0 {
                return Err(ProfileError::InvalidTarget(i));
            }
            if target >= limits.max_temperature_c {
                return Err(ProfileError::TargetAboveLimit(i));
            }
            match phase.kind {
                PhaseKind::RampTo {
                    max_rate_c_per_sec,
                    ..
                }
                | PhaseKind::RampDown {
                    max_rate_c_per_sec,
                    ..
                } => {
                    if !(max_rate_c_per_sec.is_finite() && max_rate_c_per_sec > 0.0) {
                        return Err(ProfileError::InvalidRate(i));
                    }
                }
                PhaseKind::Hold { duration_secs, .. } => {
                    if duration_secs == 0 {
                        return Err(ProfileError::ZeroHold(i));
                    }
                    if duration_secs > limits.max_phase_secs {
                        return Err(ProfileError::HoldExceedsPhaseLimit(i));
                    }
                }
            }
        }
        if let Some(gains) = &self.pid {
            gains.validate().map_err(|_| ProfileError::InvalidGains)?;
        }
        Ok(())
    }
}

/// Copy as much of `s` as fits, on a character boundary.
pub(crate) fn truncated<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
