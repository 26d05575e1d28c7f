//! Pure setpoint generation and phase-completion rules.
//!
//! Everything here is a function of the phase, the temperature measured
//! when the phase was entered and the time spent in it, so trajectories can
//! be tested and replayed without a running oven.

use super::definition::PhaseKind;

/// Setpoint `elapsed_secs` into a phase that was entered at `entry_c`.
pub fn setpoint(kind: &PhaseKind, entry_c: f32, elapsed_secs: f32) -> f32 {
    let elapsed = elapsed_secs.max(0.0);
    match *kind {
        PhaseKind::RampTo {
            target_c,
            max_rate_c_per_sec,
        } => {
            let distance = target_c - entry_c;
            let travel = max_rate_c_per_sec * elapsed;
            if travel >= distance.abs() {
                target_c
            } else {
                entry_c + travel.copysign(distance)
            }
        }
        PhaseKind::Hold { target_c, .. } => target_c,
        PhaseKind::RampDown {
            target_c,
            max_rate_c_per_sec,
            ..
        } => {
            if entry_c <= target_c {
                entry_c
            } else {
                (entry_c - max_rate_c_per_sec * elapsed).max(target_c)
            }
        }
    }
}

/// Whether a ramp's setpoint has arrived at its target.  Holds never "arrive".
pub fn ramp_reached(kind: &PhaseKind, entry_c: f32, elapsed_secs: f32) -> bool {
    match *kind {
        PhaseKind::RampTo { target_c, .. } => setpoint(kind, entry_c, elapsed_secs) == target_c,
        PhaseKind::RampDown { target_c, .. } => {
            entry_c <= target_c || setpoint(kind, entry_c, elapsed_secs) <= target_c
        }
        PhaseKind::Hold { .. } => false,
    }
}

/// Whether the phase is finished.
///
/// * `RampTo`: setpoint at target and the oven within `band_c` of it.
/// * `Hold`: the duration has elapsed.
/// * `RampDown`: setpoint at target and the oven no more than `band_c` above it.
pub fn phase_complete(
    kind: &PhaseKind,
    entry_c: f32,
    elapsed_ms: u64,
    measured_c: f32,
    band_c: f32,
) -> bool {
    let elapsed_secs = elapsed_ms as f32 / 1000.0;
    match *kind {
        PhaseKind::RampTo { target_c, .. } => {
            ramp_reached(kind, entry_c, elapsed_secs) && (measured_c - target_c).abs() <= band_c
        }
        PhaseKind::Hold { duration_secs, .. } => elapsed_ms >= u64::from(duration_secs) * 1000,
        PhaseKind::RampDown { target_c, .. } => {
            ramp_reached(kind, entry_c, elapsed_secs) && measured_c <= target_c + band_c
        }
    }
}
