//! Mock hardware adapter for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history, and serves scripted per-channel thermocouple readings.

use smtoven::app::events::AppEvent;
use smtoven::app::ports::{ActuatorSink, Alarm, EventSink, Indicators, TemperatureSource};
use smtoven::error::SensorFault;
use smtoven::sensors::thermocouple::{RawSample, celsius_to_emf_mv};

/// Reference-junction temperature reported by the mock board.
pub const BOARD_C: f32 = 25.0;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Heater(u8),
    Fan(u8),
    Aux(u8),
    CaseFan(u8),
    Indicators(Indicators),
}

/// Raw sample a converter would report for a probe at `celsius`.
pub fn raw_sample(celsius: f32) -> RawSample {
    RawSample {
        thermocouple_uv: (celsius_to_emf_mv(celsius) - celsius_to_emf_mv(BOARD_C)) * 1000.0,
        cold_junction_c: BOARD_C,
    }
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    /// Next reading per channel; a missing entry reads `NoResponse`.
    pub readings: Vec<Result<f32, SensorFault>>,
    pub reads: usize,
    /// Enclosure temperature the board reports, if any.
    pub enclosure: Option<f32>,
    pub alarms: Vec<Alarm>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(channels: usize, celsius: f32) -> Self {
        Self {
            calls: Vec::new(),
            readings: vec![Ok(celsius); channels],
            reads: 0,
            enclosure: None,
            alarms: Vec::new(),
        }
    }

    /// Every channel reads `celsius`.
    pub fn set_all(&mut self, celsius: f32) {
        for r in &mut self.readings {
            *r = Ok(celsius);
        }
    }

    /// Every channel reports `fault`.
    pub fn fail_all(&mut self, fault: SensorFault) {
        for r in &mut self.readings {
            *r = Err(fault);
        }
    }

    pub fn set(&mut self, channel: usize, reading: Result<f32, SensorFault>) {
        self.readings[channel] = reading;
    }

    fn last(&self, pick: fn(&ActuatorCall) -> Option<u8>) -> Option<u8> {
        self.calls.iter().rev().find_map(pick)
    }

    pub fn heater(&self) -> Option<u8> {
        self.last(|c| match c {
            ActuatorCall::Heater(d) => Some(*d),
            _ => None,
        })
    }

    pub fn fan(&self) -> Option<u8> {
        self.last(|c| match c {
            ActuatorCall::Fan(d) => Some(*d),
            _ => None,
        })
    }

    pub fn aux(&self) -> Option<u8> {
        self.last(|c| match c {
            ActuatorCall::Aux(d) => Some(*d),
            _ => None,
        })
    }

    pub fn case_fan(&self) -> Option<u8> {
        self.last(|c| match c {
            ActuatorCall::CaseFan(d) => Some(*d),
            _ => None,
        })
    }

    pub fn indicators(&self) -> Option<Indicators> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Indicators(i) => Some(*i),
            _ => None,
        })
    }

    pub fn heater_writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::Heater(_)))
            .count()
    }
}

impl TemperatureSource for MockHardware {
    fn read_channel_raw(&mut self, index: usize) -> Result<RawSample, SensorFault> {
        self.reads += 1;
        let reading = self
            .readings
            .get(index)
            .copied()
            .unwrap_or(Err(SensorFault::NoResponse))?;
        Ok(raw_sample(reading))
    }

    fn read_enclosure_c(&mut self) -> Option<f32> {
        self.enclosure
    }
}

impl ActuatorSink for MockHardware {
    fn set_heater_duty(&mut self, percent: u8) {
        self.calls.push(ActuatorCall::Heater(percent));
    }

    fn set_fan_duty(&mut self, percent: u8) {
        self.calls.push(ActuatorCall::Fan(percent));
    }

    fn set_aux_duty(&mut self, percent: u8) {
        self.calls.push(ActuatorCall::Aux(percent));
    }

    fn set_case_fan_duty(&mut self, percent: u8) {
        self.calls.push(ActuatorCall::CaseFan(percent));
    }

    fn set_indicators(&mut self, indicators: Indicators) {
        self.calls.push(ActuatorCall::Indicators(indicators));
    }

    fn sound_alarm(&mut self, alarm: Alarm) {
        self.alarms.push(alarm);
    }
}

// ── EventLog ─────────────────────────────────────────────────

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
