//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every application event through the
//! `log` facade (UART / USB-CDC on the board, stderr in the simulator).

use log::{error, info, warn};

use crate::app::events::{AppEvent, RunOutcome};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Progress(p) => {
                let measured = p.measured_c.unwrap_or(f32::NAN);
                info!(
                    "PROG | t={:>6.1}s | phase {} {:<8} | SP={:.1}\u{00b0}C PV={:.1}\u{00b0}C | heater={}%",
                    p.elapsed_ms as f32 / 1000.0,
                    p.phase_index,
                    p.phase_name,
                    p.setpoint_c,
                    measured,
                    p.heater_duty,
                );
            }
            AppEvent::PhaseChanged {
                phase_index,
                phase_name,
                entry_c,
                elapsed_ms,
            } => {
                info!(
                    "PHASE | {} '{}' at t={:.1}s from {:.1}\u{00b0}C",
                    phase_index,
                    phase_name,
                    *elapsed_ms as f32 / 1000.0,
                    entry_c
                );
            }
            AppEvent::RunStarted {
                profile,
                phases,
                start_c,
            } => {
                info!("START | '{}' ({} phases) at {:.1}\u{00b0}C", profile, phases, start_c);
            }
            AppEvent::StartRejected(e) => warn!("START | rejected: {}", e),
            AppEvent::Terminal(RunOutcome::Completed) => info!("DONE | profile completed"),
            AppEvent::Terminal(RunOutcome::Aborted(reason)) => {
                error!("DONE | aborted: {}", reason);
            }
            AppEvent::ChannelFaulted { channel, fault } => {
                warn!("TC{} | faulted: {}", channel, fault);
            }
            AppEvent::ChannelRearmed { channel } => info!("TC{} | re-armed", channel),
            AppEvent::SafetyTripped(reason) => error!("SAFETY | {}", reason),
        }
    }
}
