//! Host-side oven simulation.
//!
//! A lumped thermal model of a converted toaster oven plus simulated
//! thermocouple channels with fault injection.  [`SimulatedOven`]
//! implements both hardware ports, so the real [`ControlLoop`] runs
//! against it unchanged.
//!
//! Model, per step of `dt` seconds:
//!
//! ```text
//! element += (heater − element) · dt / (τ_element + dt)
//! dT/dt    = k_heat · element − (k_loss + k_fan · fan) · (T − T_ambient)
//! probe   += (T − probe) · dt / (τ_probe + dt)
//! dE/dt    = k_case · (T − E) − k_casefan · casefan · (E − T_ambient) + q_extra
//! ```
//!
//! `E` is the controller enclosure, which also holds the thermocouple
//! reference junctions.
//!
//! [`ControlLoop`]: crate::app::ControlLoop

use heapless::Vec;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::app::control_loop::OutputCommand;
use crate::app::ports::{ActuatorSink, Alarm, Indicators, TemperatureSource};
use crate::config::MAX_CHANNELS;
use crate::error::SensorFault;
use crate::sensors::thermocouple::{RawSample, celsius_to_emf_mv};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OvenParams {
    pub ambient_c: f32,
    /// Heating rate near ambient at 100 % heater (°C/s).
    pub heat_rate_c_per_sec: f32,
    /// Passive loss coefficient (1/s).
    pub loss_per_sec: f32,
    /// Extra loss at 100 % fan (1/s).
    pub fan_loss_per_sec: f32,
    /// Heating element time constant (s).
    pub element_lag_secs: f32,
    /// Thermocouple bead time constant (s).
    pub probe_lag_secs: f32,
    /// Gaussian noise on every reading (°C, 0 disables).
    pub noise_std_c: f32,
    /// Controller board (enclosure) temperature at power-up.
    pub board_c: f32,
    /// Heat leaking from the oven into the enclosure (1/s).
    pub enclosure_coupling_per_sec: f32,
    /// Enclosure loss at 100 % case fan (1/s).
    pub case_fan_loss_per_sec: f32,
}

impl Default for OvenParams {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            heat_rate_c_per_sec: 4.0,
            loss_per_sec: 0.004,
            fan_loss_per_sec: 0.02,
            element_lag_secs: 8.0,
            probe_lag_secs: 1.5,
            noise_std_c: 0.2,
            board_c: 30.0,
            enclosure_coupling_per_sec: 0.0005,
            case_fan_loss_per_sec: 0.01,
        }
    }
}

/// Plant state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OvenModel {
    pub params: OvenParams,
    /// Load / air temperature.
    pub temp_c: f32,
    /// Lagged heater output, 0..=1.
    pub element: f32,
}

impl OvenModel {
    pub fn new(params: OvenParams) -> Self {
        Self {
            params,
            temp_c: params.ambient_c,
            element: 0.0,
        }
    }

    /// Advance by `dt` seconds with the given duties in percent.
    pub fn step(&mut self, heater: u8, fan: u8, dt: f32) {
        let p = &self.params;
        let heater = f32::from(heater.min(100)) / 100.0;
        let fan = f32::from(fan.min(100)) / 100.0;
        self.element += (heater - self.element) * dt / (p.element_lag_secs + dt);
        let loss = (p.loss_per_sec + p.fan_loss_per_sec * fan) * (self.temp_c - p.ambient_c);
        self.temp_c += (p.heat_rate_c_per_sec * self.element - loss) * dt;
    }
}

/// Fault injected into one simulated channel.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum InjectedFault {
    #[default]
    None,
    /// Converter reports an open thermocouple.
    Open,
    /// Converter bus dead.
    NoResponse,
    /// Reading frozen at a value.
    Stuck { value_c: f32 },
    /// Probe drifting away from the load (fell off the board).
    Drift { c_per_sec: f32 },
    /// Every `every`th read fails.
    Dropout { every: u32 },
}

#[derive(Debug, Clone, Copy)]
struct SimChannel {
    fault: InjectedFault,
    fault_since_ms: u64,
    probe_c: f32,
    reads: u32,
}

/// Simulated oven wired as controller hardware.
pub struct SimulatedOven {
    model: OvenModel,
    channels: Vec<SimChannel, MAX_CHANNELS>,
    duties: OutputCommand,
    last_alarm: Option<Alarm>,
    heater_stuck_on: bool,
    enclosure_c: f32,
    /// Extra heat into the enclosure (°C/s), e.g. a blocked vent.
    enclosure_heat_c_per_sec: f32,
    noise: Option<Normal<f32>>,
    rng: StdRng,
    elapsed_ms: u64,
}

impl SimulatedOven {
    pub fn new(params: OvenParams, channels: usize, seed: u64) -> Self {
        let mut sim_channels = Vec::new();
        for _ in 0..channels.min(MAX_CHANNELS) {
            let _ = sim_channels.push(SimChannel {
                fault: InjectedFault::None,
                fault_since_ms: 0,
                probe_c: params.ambient_c,
                reads: 0,
            });
        }
        Self {
            model: OvenModel::new(params),
            channels: sim_channels,
            duties: OutputCommand::default(),
            last_alarm: None,
            heater_stuck_on: false,
            enclosure_c: params.board_c,
            enclosure_heat_c_per_sec: 0.0,
            noise: (params.noise_std_c > 0.0)
                .then(|| Normal::new(0.0, params.noise_std_c).ok())
                .flatten(),
            rng: StdRng::seed_from_u64(seed),
            elapsed_ms: 0,
        }
    }

    /// Advance the plant by one step using the duties last written.
    pub fn advance(&mut self, dt_ms: u32) {
        let dt = dt_ms as f32 / 1000.0;
        let heater = if self.heater_stuck_on {
            100
        } else {
            self.duties.heater
        };
        self.model.step(heater, self.duties.fan, dt);

        let p = &self.model.params;
        let case_fan = f32::from(self.duties.case_fan.min(100)) / 100.0;
        self.enclosure_c += (p.enclosure_coupling_per_sec * (self.model.temp_c - self.enclosure_c)
            - p.case_fan_loss_per_sec * case_fan * (self.enclosure_c - p.ambient_c)
            + self.enclosure_heat_c_per_sec)
            * dt;

        let lag = p.probe_lag_secs;
        for ch in &mut self.channels {
            ch.probe_c += (self.model.temp_c - ch.probe_c) * dt / (lag + dt);
        }
        self.elapsed_ms += u64::from(dt_ms);
    }

    /// Inject `fault` into `channel` from now on.  `false` if no such channel.
    pub fn set_fault(&mut self, channel: usize, fault: InjectedFault) -> bool {
        let now = self.elapsed_ms;
        match self.channels.get_mut(channel) {
            Some(ch) => {
                ch.fault = fault;
                ch.fault_since_ms = now;
                true
            }
            None => false,
        }
    }

    /// Add `c_per_sec` of heat into the enclosure (failed cooling).
    pub fn set_enclosure_heating(&mut self, c_per_sec: f32) {
        self.enclosure_heat_c_per_sec = c_per_sec;
    }

    pub fn enclosure_c(&self) -> f32 {
        self.enclosure_c
    }

    /// Buzzer pattern most recently started.
    pub fn last_alarm(&self) -> Option<Alarm> {
        self.last_alarm
    }

    /// Simulate a welded heater relay.
    pub fn set_heater_stuck_on(&mut self, stuck: bool) {
        self.heater_stuck_on = stuck;
    }

    pub fn temperature_c(&self) -> f32 {
        self.model.temp_c
    }

    pub fn model(&self) -> &OvenModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut OvenModel {
        &mut self.model
    }

    pub fn duties(&self) -> OutputCommand {
        self.duties
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    fn probe_reading(&mut self, index: usize) -> Result<f32, SensorFault> {
        let now = self.elapsed_ms;
        let ch = self
            .channels
            .get_mut(index)
            .ok_or(SensorFault::NoResponse)?;
        ch.reads = ch.reads.wrapping_add(1);
        let value = match ch.fault {
            InjectedFault::None => ch.probe_c,
            InjectedFault::Open => return Err(SensorFault::OpenCircuit),
            InjectedFault::NoResponse => return Err(SensorFault::NoResponse),
            InjectedFault::Stuck { value_c } => return Ok(value_c),
            InjectedFault::Drift { c_per_sec } => {
                ch.probe_c + c_per_sec * (now - ch.fault_since_ms) as f32 / 1000.0
            }
            InjectedFault::Dropout { every } => {
                if every > 0 && ch.reads % every == 0 {
                    return Err(SensorFault::NoResponse);
                }
                ch.probe_c
            }
        };
        let noise = self.noise.map_or(0.0, |n| n.sample(&mut self.rng));
        Ok(value + noise)
    }
}

impl TemperatureSource for SimulatedOven {
    fn read_channel_raw(&mut self, index: usize) -> Result<RawSample, SensorFault> {
        let hot_c = self.probe_reading(index)?;
        let board_c = self.enclosure_c;
        Ok(RawSample {
            thermocouple_uv: (celsius_to_emf_mv(hot_c) - celsius_to_emf_mv(board_c)) * 1000.0,
            cold_junction_c: board_c,
        })
    }

    fn read_enclosure_c(&mut self) -> Option<f32> {
        Some(self.enclosure_c)
    }
}

impl ActuatorSink for SimulatedOven {
    fn set_heater_duty(&mut self, percent: u8) {
        self.duties.heater = percent.min(100);
    }

    fn set_fan_duty(&mut self, percent: u8) {
        self.duties.fan = percent.min(100);
    }

    fn set_aux_duty(&mut self, percent: u8) {
        self.duties.aux = percent.min(100);
    }

    fn set_case_fan_duty(&mut self, percent: u8) {
        self.duties.case_fan = percent.min(100);
    }

    fn set_indicators(&mut self, indicators: Indicators) {
        self.duties.indicators = indicators;
    }

    fn sound_alarm(&mut self, alarm: Alarm) {
        self.last_alarm = Some(alarm);
    }
}
