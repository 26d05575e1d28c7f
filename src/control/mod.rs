//! Closed-loop heater control.

pub mod pid;

pub use pid::{ControllerState, PidController};
