//! Port traits: the boundary between the control core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlLoop (domain)
//! ```
//!
//! Drivers, the simulator and test mocks implement these traits.  The
//! [`ControlLoop`](super::control_loop::ControlLoop) receives them at
//! construction, so the core never touches registers or globals.

use serde::{Deserialize, Serialize};

use crate::error::SensorFault;
use crate::sensors::thermocouple::RawSample;

// ───────────────────────────────────────────────────────────────
// Temperature source (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw thermocouple inputs.
pub trait TemperatureSource {
    /// Latest completed sample for channel `index`, or the fault the
    /// converter signalled.  Called once per enabled channel per tick and
    /// must not block.
    fn read_channel_raw(&mut self, index: usize) -> Result<RawSample, SensorFault>;

    /// Controller enclosure temperature (°C), if the board measures it.
    fn read_enclosure_c(&mut self) -> Option<f32> {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator sink (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Front-panel indicator lamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicators {
    pub heater: bool,
    pub fan: bool,
}

/// Buzzer patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alarm {
    /// Run finished its last phase.
    Complete,
    /// Run ended early, for any reason.
    Aborted,
}

/// Heater, fan and auxiliary outputs.  Duties are percent, 0..=100.
///
/// The control loop calls each setter exactly once per tick, after the
/// whole decision pipeline has run.  Boards without a case fan, lamps or
/// buzzer keep the default no-op methods.
pub trait ActuatorSink {
    fn set_heater_duty(&mut self, percent: u8);

    fn set_fan_duty(&mut self, percent: u8);

    fn set_aux_duty(&mut self, percent: u8);

    /// Enclosure (electronics) fan.
    fn set_case_fan_duty(&mut self, _percent: u8) {}

    fn set_indicators(&mut self, _indicators: Indicators) {}

    /// Start a buzzer pattern.  Called once when a run ends.
    fn sound_alarm(&mut self, _alarm: Alarm) {}

    /// Everything off.
    fn all_off(&mut self) {
        self.set_heater_duty(0);
        self.set_fan_duty(0);
        self.set_aux_duty(0);
        self.set_case_fan_duty(0);
        self.set_indicators(Indicators::default());
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → display / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core reports through this port.  Nothing in the control path
/// depends on the events being consumed.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Discards every event.
impl EventSink for () {
    fn emit(&mut self, _event: &super::events::AppEvent) {}
}
