//! Application core: the control loop and its boundary.
//!
//! The domain logic lives in [`control_loop`]; everything it touches in
//! the outside world goes through the port traits in [`ports`], and
//! everything the outside world asks of it goes through [`requests`].

pub mod control_loop;
pub mod events;
pub mod ports;
pub mod requests;

pub use control_loop::{ControlLoop, OutputCommand, TickSnapshot};
pub use events::{AppEvent, ProgressReport, RunOutcome};
pub use ports::{ActuatorSink, Alarm, EventSink, Indicators, TemperatureSource};
pub use requests::RequestQueue;
