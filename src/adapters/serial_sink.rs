//! Serial telemetry sink.
//!
//! Encodes run events as COBS-framed `postcard` records and hands them to
//! the USB-CDC writer through a bounded channel, for live plotting on a
//! host.  The control tick never waits on the host: when the channel is
//! full the newest frame is dropped and counted.
//!
//! ```text
//! ┌─────────────┐ emit() ┌──────────────────┐ TELEMETRY ┌────────────┐
//! │ ControlLoop │───────▶│ SerialTelemetry- │──────────▶│ USB writer │
//! │   (tick)    │        │ Sink (encode)    │  channel  │   task     │
//! └─────────────┘        └──────────────────┘           └────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::app::events::{AppEvent, RunOutcome};
use crate::app::ports::EventSink;
use crate::error::{AbortReason, SensorFault};
use crate::profile::definition::PhaseName;

/// Largest encoded frame, including COBS overhead and the 0x00 delimiter.
pub const FRAME_MAX: usize = 64;

/// Frames buffered for the writer.
pub const TELEMETRY_DEPTH: usize = 16;

pub type TelemetryFrame = Vec<u8, FRAME_MAX>;
pub type TelemetryChannel = Channel<CriticalSectionRawMutex, TelemetryFrame, TELEMETRY_DEPTH>;

/// On-the-wire record.  Times are milliseconds since run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryRecord {
    RunStarted {
        phases: u8,
        start_c: f32,
    },
    Phase {
        index: u8,
        name: PhaseName,
        elapsed_ms: u32,
    },
    Progress {
        phase_index: u8,
        setpoint_c: f32,
        measured_c: Option<f32>,
        elapsed_ms: u32,
        heater: u8,
    },
    Terminal(RunOutcome),
    ChannelFaulted {
        channel: u8,
        fault: SensorFault,
    },
    SafetyTripped(AbortReason),
}

impl TelemetryRecord {
    /// The wire form of `event`, if it is streamed at all.
    pub fn from_event(event: &AppEvent) -> Option<Self> {
        Some(match event {
            AppEvent::RunStarted {
                phases, start_c, ..
            } => Self::RunStarted {
                phases: saturate_u8(*phases),
                start_c: *start_c,
            },
            AppEvent::PhaseChanged {
                phase_index,
                phase_name,
                elapsed_ms,
                ..
            } => Self::Phase {
                index: saturate_u8(*phase_index),
                name: phase_name.clone(),
                elapsed_ms: saturate_u32(*elapsed_ms),
            },
            AppEvent::Progress(p) => Self::Progress {
                phase_index: saturate_u8(p.phase_index),
                setpoint_c: p.setpoint_c,
                measured_c: p.measured_c,
                elapsed_ms: saturate_u32(p.elapsed_ms),
                heater: p.heater_duty,
            },
            AppEvent::Terminal(outcome) => Self::Terminal(*outcome),
            AppEvent::ChannelFaulted { channel, fault } => Self::ChannelFaulted {
                channel: saturate_u8(*channel),
                fault: *fault,
            },
            AppEvent::SafetyTripped(reason) => Self::SafetyTripped(*reason),
            AppEvent::StartRejected(_) | AppEvent::ChannelRearmed { .. } => return None,
        })
    }

    /// COBS-encode into a frame ending in the 0x00 delimiter.
    pub fn encode(&self) -> Option<TelemetryFrame> {
        let mut buf = [0u8; FRAME_MAX];
        let used = postcard::to_slice_cobs(self, &mut buf).ok()?;
        Vec::from_slice(used).ok()
    }

    /// Decode one frame (with or without the trailing delimiter).
    pub fn decode(frame: &mut [u8]) -> Option<Self> {
        postcard::from_bytes_cobs(frame).ok()
    }
}

fn saturate_u8(v: usize) -> u8 {
    u8::try_from(v).unwrap_or(u8::MAX)
}

fn saturate_u32(v: u64) -> u32 {
    u32::try_from(v).unwrap_or(u32::MAX)
}

/// [`EventSink`] feeding a [`TelemetryChannel`].
pub struct SerialTelemetrySink<'a> {
    channel: &'a TelemetryChannel,
    dropped: u32,
}

impl<'a> SerialTelemetrySink<'a> {
    pub fn new(channel: &'a TelemetryChannel) -> Self {
        Self { channel, dropped: 0 }
    }

    /// Frames lost because the writer fell behind.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl EventSink for SerialTelemetrySink<'_> {
    fn emit(&mut self, event: &AppEvent) {
        let Some(record) = TelemetryRecord::from_event(event) else {
            return;
        };
        let Some(frame) = record.encode() else {
            warn!("telemetry: record does not fit in {FRAME_MAX} bytes");
            return;
        };
        if self.channel.try_send(frame).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
        }
    }
}
