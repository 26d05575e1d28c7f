//! Safety monitor.
//!
//! Runs every tick after sampling and before the profile runner, and looks
//! only at the temperature frame and the configured limits.  The verdict
//! does not depend on the runner or the PID, so a bug in either cannot
//! hide a trip.  Checks, first match wins:
//!
//! 1. no usable measurement → `NoSensor`
//! 2. any sampled channel ≥ the absolute maximum → `OverTemperature`
//! 3. hottest minus coldest sampled channel ≥ the divergence limit →
//!    `SensorDivergence`
//! 4. enclosure ≥ its limit → `EnclosureOverTemperature`
//!
//! Checks 2 and 3 see every value a converter delivered this tick,
//! including ones the reader rejected as implausible.  A probe that jumps
//! or falls off the board still trips here instead of quietly dropping
//! out of the aggregate.
//!
//! The monitor keeps the last verdict only to log edges; `evaluate` is a
//! function of its inputs.

use crate::config::SafetyLimits;
use crate::error::AbortReason;
use crate::sensors::TemperatureFrame;
use log::{error, info};

pub struct SafetyMonitor {
    limits: SafetyLimits,
    last: Option<AbortReason>,
}

impl SafetyMonitor {
    pub fn new(limits: SafetyLimits) -> Self {
        Self { limits, last: None }
    }

    pub(crate) fn set_limits(&mut self, limits: SafetyLimits) {
        self.limits = limits;
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }

    /// Verdict for this tick, or `None` when it is safe to continue.
    pub fn evaluate(&mut self, frame: &TemperatureFrame) -> Option<AbortReason> {
        let verdict = check(&self.limits, frame);
        if verdict != self.last {
            match verdict {
                Some(reason) => error!("SAFETY TRIP: {reason}"),
                None => info!("SAFETY: conditions clear"),
            }
            self.last = verdict;
        }
        verdict
    }

    /// Verdict from the most recent evaluation.
    pub fn last_verdict(&self) -> Option<AbortReason> {
        self.last
    }
}

/// The stateless check itself.
pub fn check(limits: &SafetyLimits, frame: &TemperatureFrame) -> Option<AbortReason> {
    if frame.measured.is_none() {
        return Some(AbortReason::NoSensor);
    }

    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for t in frame.sampled_temperatures() {
        lo = lo.min(t);
        hi = hi.max(t);
    }

    if hi >= limits.max_temperature_c {
        return Some(AbortReason::OverTemperature);
    }
    if hi > lo && hi - lo >= limits.max_divergence_c {
        return Some(AbortReason::SensorDivergence);
    }
    if frame
        .enclosure_c
        .is_some_and(|t| t >= limits.max_enclosure_c)
    {
        return Some(AbortReason::EnclosureOverTemperature);
    }
    None
}
