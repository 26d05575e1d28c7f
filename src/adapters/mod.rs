//! Adapters: concrete implementations of the port traits.
//!
//! | Adapter        | Implements                         | Connects to                |
//! |----------------|------------------------------------|----------------------------|
//! | `hardware`     | TemperatureSource + ActuatorSink   | MAX31855 bank, SSR, PWM, panel |
//! | `log_sink`     | EventSink                          | `log` facade               |
//! | `serial_sink`  | EventSink                          | USB-CDC telemetry channel  |
//!
//! The host simulator in [`crate::sim`] is the fourth implementation of
//! the hardware ports.

pub mod hardware;
pub mod log_sink;
pub mod serial_sink;
