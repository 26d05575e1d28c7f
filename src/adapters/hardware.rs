//! Hardware adapter: bridges real peripherals to the port traits.
//!
//! Owns the thermocouple source and the output drivers and exposes them as
//! one [`TemperatureSource`] + [`ActuatorSink`], which is what the control
//! loop takes at construction.  The case fan and the front panel are
//! optional; boards without them keep the `()` defaults.

use crate::app::ports::{ActuatorSink, Alarm, Indicators, TemperatureSource};
use crate::drivers::output::PercentOutput;
use crate::drivers::panel::IndicatorOutput;
use crate::error::SensorFault;
use crate::sensors::thermocouple::RawSample;

pub struct HardwareAdapter<S, H, F, A, C = (), P = ()> {
    source: S,
    heater: H,
    fan: F,
    aux: A,
    case_fan: C,
    panel: P,
}

impl<S, H, F, A> HardwareAdapter<S, H, F, A>
where
    S: TemperatureSource,
    H: PercentOutput,
    F: PercentOutput,
    A: PercentOutput,
{
    pub fn new(source: S, heater: H, fan: F, aux: A) -> Self {
        Self {
            source,
            heater,
            fan,
            aux,
            case_fan: (),
            panel: (),
        }
    }
}

impl<S, H, F, A, C, P> HardwareAdapter<S, H, F, A, C, P>
where
    S: TemperatureSource,
    H: PercentOutput,
    F: PercentOutput,
    A: PercentOutput,
    C: PercentOutput,
    P: IndicatorOutput,
{
    /// Fit an enclosure fan.
    pub fn with_case_fan<C2: PercentOutput>(self, case_fan: C2) -> HardwareAdapter<S, H, F, A, C2, P> {
        HardwareAdapter {
            source: self.source,
            heater: self.heater,
            fan: self.fan,
            aux: self.aux,
            case_fan,
            panel: self.panel,
        }
    }

    /// Fit front-panel lamps and buzzer.
    pub fn with_panel<P2: IndicatorOutput>(self, panel: P2) -> HardwareAdapter<S, H, F, A, C, P2> {
        HardwareAdapter {
            source: self.source,
            heater: self.heater,
            fan: self.fan,
            aux: self.aux,
            case_fan: self.case_fan,
            panel,
        }
    }

    /// Current duties as (heater, fan, aux).
    pub fn duties(&self) -> (u8, u8, u8) {
        (self.heater.percent(), self.fan.percent(), self.aux.percent())
    }

    pub fn case_fan_duty(&self) -> u8 {
        self.case_fan.percent()
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn into_parts(self) -> (S, H, F, A) {
        (self.source, self.heater, self.fan, self.aux)
    }
}

// ── TemperatureSource implementation ──────────────────────────

impl<S, H, F, A, C, P> TemperatureSource for HardwareAdapter<S, H, F, A, C, P>
where
    S: TemperatureSource,
{
    fn read_channel_raw(&mut self, index: usize) -> Result<RawSample, SensorFault> {
        self.source.read_channel_raw(index)
    }

    fn read_enclosure_c(&mut self) -> Option<f32> {
        self.source.read_enclosure_c()
    }
}

// ── ActuatorSink implementation ───────────────────────────────

impl<S, H, F, A, C, P> ActuatorSink for HardwareAdapter<S, H, F, A, C, P>
where
    H: PercentOutput,
    F: PercentOutput,
    A: PercentOutput,
    C: PercentOutput,
    P: IndicatorOutput,
{
    fn set_heater_duty(&mut self, percent: u8) {
        self.heater.set_percent(percent);
    }

    fn set_fan_duty(&mut self, percent: u8) {
        self.fan.set_percent(percent);
    }

    fn set_aux_duty(&mut self, percent: u8) {
        self.aux.set_percent(percent);
    }

    fn set_case_fan_duty(&mut self, percent: u8) {
        self.case_fan.set_percent(percent);
    }

    fn set_indicators(&mut self, indicators: Indicators) {
        self.panel.show(indicators);
    }

    fn sound_alarm(&mut self, alarm: Alarm) {
        self.panel.alarm(alarm);
    }
}
