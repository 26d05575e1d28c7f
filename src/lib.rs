//! SMT reflow oven controller library.
//!
//! Drives a converted toaster/convection oven through a solder reflow
//! profile: thermocouple sampling, profile sequencing, PID heater control
//! and an independent safety monitor that can abort a run at any tick.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter     LogEventSink     SerialTelemetrySink      │
//! │  (MAX31855 + SSR)    (log facade)     (COBS frames)            │
//! │  SimulatedOven (host feature "sim")                            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlLoop (pure logic)                  │    │
//! │  │  Reader · ProfileRunner (FSM) · Safety · PID           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  RequestQueue (start / abort / acknowledge, drained per tick)  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod drivers;
pub mod error;
pub mod fsm;
pub mod profile;
pub mod safety;
pub mod sensors;

#[cfg(feature = "sim")]
pub mod sim;

pub use app::{ControlLoop, RequestQueue};
pub use config::OvenConfig;
pub use error::{AbortReason, Error, Result};
pub use profile::{ProfileDefinition, RunStatus};
