//! Reflow profiles and their execution.

pub mod definition;
pub mod presets;
pub mod runner;
pub mod setpoint;

pub use definition::{MAX_PHASES, Phase, PhaseKind, ProfileDefinition};
pub use runner::{ProfileRunner, RunStatus};
