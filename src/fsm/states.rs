//! State handlers and table builder for the run lifecycle.
//!
//! ```text
//!  IDLE ──[start]──▶ RUNNING ──[last phase done]──▶ COMPLETED
//!                       │
//!                       ├──[phase timeout]──▶ ABORTED
//!                       └──[abort / safety]─▶ ABORTED
//!
//!  COMPLETED / ABORTED ──[start]──▶ RUNNING,  ──[reset]──▶ IDLE
//! ```
//!
//! Transitions into `Running` and the externally caused ones into
//! `Aborted` are forced by the profile runner; the handlers here only
//! advance phases and detect completion or a stuck phase.

use super::context::{RunContext, RunState, Terminal};
use super::{StateDescriptor, StateId};
use crate::error::AbortReason;
use crate::profile::setpoint::{phase_complete, setpoint};
use log::{info, warn};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        StateDescriptor {
            id: StateId::Idle,
            name: "Idle",
            on_enter: Some(idle_enter),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: StateId::Running,
            name: "Running",
            on_enter: Some(running_enter),
            on_exit: Some(running_exit),
            on_update: running_update,
        },
        StateDescriptor {
            id: StateId::Completed,
            name: "Completed",
            on_enter: Some(completed_enter),
            on_exit: None,
            on_update: stay,
        },
        StateDescriptor {
            id: StateId::Aborted,
            name: "Aborted",
            on_enter: Some(aborted_enter),
            on_exit: None,
            on_update: stay,
        },
    ]
}

/// Idle and the terminal states never leave on their own.
fn stay(_ctx: &mut RunContext) -> Option<StateId> {
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE
// ═══════════════════════════════════════════════════════════════════════════

fn idle_enter(ctx: &mut RunContext) {
    ctx.run = RunState::default();
    ctx.phase_changed = false;
    info!("IDLE: heater off, waiting for a profile");
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUNNING
// ═══════════════════════════════════════════════════════════════════════════

fn running_enter(ctx: &mut RunContext) {
    let entry_c = ctx.measured_c;
    let first = ctx.profile.phase(0).map(|p| p.kind);
    ctx.run = RunState {
        phase_index: 0,
        phase_entry_ms: 0,
        phase_entry_c: entry_c,
        setpoint_c: first.map_or(entry_c, |kind| setpoint(&kind, entry_c, 0.0)),
        elapsed_ms: 0,
        terminal: Terminal::None,
    };
    ctx.phase_changed = true;
    info!(
        "RUNNING: profile '{}' ({} phases) from {:.1}°C",
        ctx.profile.name,
        ctx.profile.len(),
        entry_c
    );
}

fn running_exit(ctx: &mut RunContext) {
    info!(
        "RUNNING: left after {} ms in phase {}",
        ctx.run.elapsed_ms, ctx.run.phase_index
    );
}

fn running_update(ctx: &mut RunContext) -> Option<StateId> {
    ctx.phase_changed = false;
    ctx.run.elapsed_ms += u64::from(ctx.tick_ms);

    let Some(kind) = ctx.current_phase().map(|p| p.kind) else {
        return Some(StateId::Completed);
    };

    let phase_ms = ctx.run.phase_elapsed_ms();
    ctx.run.setpoint_c = setpoint(&kind, ctx.run.phase_entry_c, phase_ms as f32 / 1000.0);

    if phase_complete(
        &kind,
        ctx.run.phase_entry_c,
        phase_ms,
        ctx.measured_c,
        ctx.arrival_band_c,
    ) {
        return advance_phase(ctx);
    }

    if phase_ms > ctx.max_phase_ms {
        warn!(
            "RUNNING: phase {} stuck for {} ms (limit {} ms)",
            ctx.run.phase_index, phase_ms, ctx.max_phase_ms
        );
        ctx.run.terminal = Terminal::Aborted(AbortReason::PhaseTimeout);
        return Some(StateId::Aborted);
    }

    None
}

fn advance_phase(ctx: &mut RunContext) -> Option<StateId> {
    // A hold can end on time while the measurement is missing.
    let entry_c = if ctx.measured_c.is_finite() {
        ctx.measured_c
    } else {
        ctx.run.setpoint_c
    };
    ctx.run.phase_index += 1;
    ctx.run.phase_entry_ms = ctx.run.elapsed_ms;
    ctx.run.phase_entry_c = entry_c;
    ctx.phase_changed = true;

    match ctx.current_phase() {
        Some(phase) => {
            let kind = phase.kind;
            info!(
                "RUNNING: phase {} '{}' at t={} ms, {:.1}°C",
                ctx.run.phase_index, phase.name, ctx.run.elapsed_ms, entry_c
            );
            ctx.run.setpoint_c = setpoint(&kind, entry_c, 0.0);
            None
        }
        None => Some(StateId::Completed),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Terminal states
// ═══════════════════════════════════════════════════════════════════════════

fn completed_enter(ctx: &mut RunContext) {
    ctx.run.terminal = Terminal::Completed;
    info!(
        "COMPLETED: profile '{}' finished in {} ms",
        ctx.profile.name, ctx.run.elapsed_ms
    );
}

fn aborted_enter(ctx: &mut RunContext) {
    match ctx.run.terminal {
        Terminal::Aborted(reason) => {
            warn!(
                "ABORTED: {} in phase {} at t={} ms, heater off",
                reason, ctx.run.phase_index, ctx.run.elapsed_ms
            );
        }
        _ => {
            debug_assert!(false, "entered Aborted without a reason");
            ctx.run.terminal = Terminal::Aborted(AbortReason::UserRequest);
            warn!("ABORTED: no reason recorded");
        }
    }
}
