//! Oven configuration parameters
//!
//! All tunable parameters for the controller.  Loaded once at boot by the
//! settings layer and read-only while a run is in progress.

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Maximum number of thermocouple inputs on the controller board.
pub const MAX_CHANNELS: usize = 4;

/// PID gains and output shaping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Time constant of the derivative low-pass filter (seconds).
    pub derivative_filter_secs: f32,
    /// Lower output bound (percent).
    pub output_min: f32,
    /// Upper output bound (percent).
    pub output_max: f32,
    /// Maximum output change per second (percent/s), if limited.
    pub max_slew_per_sec: Option<f32>,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 4.0,
            ki: 0.05,
            kd: 20.0,
            derivative_filter_secs: 2.0,
            output_min: 0.0,
            output_max: 100.0,
            max_slew_per_sec: None,
        }
    }
}

impl PidGains {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite_non_negative = |v: f32| v.is_finite() && v >= 0.0;
        if !finite_non_negative(self.kp)
            || !finite_non_negative(self.ki)
            || !finite_non_negative(self.kd)
        {
            return Err(ConfigError::ValidationFailed(
                "pid gains must be finite and non-negative",
            ));
        }
        if !finite_non_negative(self.derivative_filter_secs) {
            return Err(ConfigError::ValidationFailed(
                "pid derivative filter must be finite and non-negative",
            ));
        }
        if !(self.output_min.is_finite() && self.output_max.is_finite())
            || self.output_min < 0.0
            || self.output_max > 100.0
            || self.output_min >= self.output_max
        {
            return Err(ConfigError::ValidationFailed(
                "pid output bounds must satisfy 0 <= min < max <= 100",
            ));
        }
        match self.max_slew_per_sec {
            Some(slew) if !(slew.is_finite() && slew > 0.0) => Err(
                ConfigError::ValidationFailed("pid slew limit must be positive"),
            ),
            _ => Ok(()),
        }
    }
}

/// Limits enforced by the safety monitor and the profile runner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Any channel at or above this aborts the run (°C).
    pub max_temperature_c: f32,
    /// Spread between hottest and coldest active channel that aborts (°C).
    pub max_divergence_c: f32,
    /// Consecutive invalid samples before a channel is marked Faulted.
    pub max_consecutive_faults: u8,
    /// Longest any single phase may run before it is considered stuck (s).
    pub max_phase_secs: u32,
    /// Controller enclosure temperature that aborts the run (°C).
    pub max_enclosure_c: f32,
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_temperature_c: 275.0,
            max_divergence_c: 25.0,
            max_consecutive_faults: 3,
            max_phase_secs: 480,
            max_enclosure_c: 70.0,
        }
    }
}

/// Per-channel linear correction applied after thermocouple linearisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelCalibration {
    pub gain: f32,
    pub offset_c: f32,
}

impl Default for ChannelCalibration {
    fn default() -> Self {
        Self {
            gain: 1.0,
            offset_c: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Disabled channels are never sampled.
    pub enabled: bool,
    pub calibration: ChannelCalibration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            calibration: ChannelCalibration::default(),
        }
    }
}

/// Plausibility bounds used to classify samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorBounds {
    pub min_plausible_c: f32,
    pub max_plausible_c: f32,
    /// The fastest a real oven load can change temperature (°C/s).
    pub max_slew_c_per_sec: f32,
}

impl Default for SensorBounds {
    fn default() -> Self {
        Self {
            min_plausible_c: -20.0,
            max_plausible_c: 450.0,
            max_slew_c_per_sec: 20.0,
        }
    }
}

/// How active channels are combined into the controller's measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Aggregation {
    /// Mean of all active channels.
    #[default]
    Average,
    /// Hottest active channel (protects heat-sensitive parts).
    Hottest,
}

/// Oven fan and auxiliary output duties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FanConfig {
    /// Circulation fan duty during powered phases (percent).
    pub convection_duty: u8,
    /// Fan duty while cooling (percent).
    pub cooling_duty: u8,
    /// After a run ends, keep cooling while the oven is above this (°C).
    pub cool_down_above_c: f32,
    /// Auxiliary output duty while a run is active (percent).
    pub aux_duty_running: u8,
    /// Enclosure fan duty while running or while the enclosure is warm.
    pub case_fan_duty: u8,
    /// Enclosure temperature above which the case fan runs when idle (°C).
    pub case_fan_above_c: f32,
}

impl Default for FanConfig {
    fn default() -> Self {
        Self {
            convection_duty: 30,
            cooling_duty: 100,
            cool_down_above_c: 50.0,
            aux_duty_running: 0,
            case_fan_duty: 100,
            case_fan_above_c: 40.0,
        }
    }
}

/// Complete controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvenConfig {
    /// Control loop period (milliseconds).
    pub tick_period_ms: u32,
    /// Default oven PID gains; a profile may override them.
    pub pid: PidGains,
    pub limits: SafetyLimits,
    /// One entry per thermocouple input, in channel order.
    pub channels: Vec<ChannelConfig, MAX_CHANNELS>,
    pub sensor: SensorBounds,
    pub aggregation: Aggregation,
    /// A ramp is complete only once the measurement is within this band (°C).
    pub ramp_arrival_band_c: f32,
    pub fans: FanConfig,
    /// Interval between progress reports while running (milliseconds).
    pub progress_interval_ms: u32,
}

impl Default for OvenConfig {
    fn default() -> Self {
        let mut channels = Vec::new();
        // Two probes: one on the board, one in free air near it.
        for _ in 0..2 {
            let _ = channels.push(ChannelConfig::default());
        }
        Self {
            tick_period_ms: 250, // 4 Hz
            pid: PidGains::default(),
            limits: SafetyLimits::default(),
            channels,
            sensor: SensorBounds::default(),
            aggregation: Aggregation::Average,
            ramp_arrival_band_c: 5.0,
            fans: FanConfig::default(),
            progress_interval_ms: 1000,
        }
    }
}

impl OvenConfig {
    /// Control period in seconds.
    pub fn tick_secs(&self) -> f32 {
        self.tick_period_ms as f32 / 1000.0
    }

    /// Reject any out-of-range value.  Values are never clamped: a bad
    /// settings blob must not silently widen a safety limit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(50..=1000).contains(&self.tick_period_ms) {
            return Err(ConfigError::ValidationFailed(
                "tick period must be 50..=1000 ms",
            ));
        }
        self.pid.validate()?;

        let l = &self.limits;
        if !(l.max_temperature_c.is_finite() && l.max_temperature_c > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "max temperature must be positive",
            ));
        }
        if !(l.max_divergence_c.is_finite() && l.max_divergence_c > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "divergence limit must be positive",
            ));
        }
        if l.max_consecutive_faults == 0 {
            return Err(ConfigError::ValidationFailed(
                "fault threshold must be at least 1",
            ));
        }
        if l.max_phase_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "phase time limit must be positive",
            ));
        }
        if !(l.max_enclosure_c.is_finite() && l.max_enclosure_c > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "enclosure limit must be positive",
            ));
        }

        if !self.channels.iter().any(|c| c.enabled) {
            return Err(ConfigError::ValidationFailed(
                "at least one channel must be enabled",
            ));
        }
        for ch in &self.channels {
            let cal = ch.calibration;
            if !(cal.gain.is_finite() && cal.gain > 0.0 && cal.offset_c.is_finite()) {
                return Err(ConfigError::ValidationFailed(
                    "channel calibration must be finite with positive gain",
                ));
            }
        }

        let s = &self.sensor;
        if !(s.min_plausible_c.is_finite()
            && s.max_plausible_c.is_finite()
            && s.min_plausible_c < s.max_plausible_c)
        {
            return Err(ConfigError::ValidationFailed(
                "sensor plausible range is empty",
            ));
        }
        if l.max_temperature_c >= s.max_plausible_c {
            return Err(ConfigError::ValidationFailed(
                "max temperature must be below the plausible sensor range",
            ));
        }
        if !(s.max_slew_c_per_sec.is_finite() && s.max_slew_c_per_sec > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "sensor slew bound must be positive",
            ));
        }

        if !(self.ramp_arrival_band_c.is_finite() && self.ramp_arrival_band_c > 0.0) {
            return Err(ConfigError::ValidationFailed(
                "ramp arrival band must be positive",
            ));
        }

        let f = &self.fans;
        if f.convection_duty > 100
            || f.cooling_duty > 100
            || f.aux_duty_running > 100
            || f.case_fan_duty > 100
        {
            return Err(ConfigError::ValidationFailed("duty must be 0..=100"));
        }
        if !f.cool_down_above_c.is_finite() {
            return Err(ConfigError::ValidationFailed(
                "cool-down threshold must be finite",
            ));
        }
        if !(f.case_fan_above_c.is_finite() && f.case_fan_above_c < l.max_enclosure_c) {
            return Err(ConfigError::ValidationFailed(
                "case fan threshold must be below the enclosure limit",
            ));
        }

        if self.progress_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "progress interval must be positive",
            ));
        }
        Ok(())
    }
}
