//! Unified error types for the oven controller.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform. All variants are `Copy` so they
//! can be carried through the request cells, the run state and emitted
//! events without allocation.

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the controller funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A thermocouple channel could not be read or returned bad data.
    Sensor(SensorFault),
    /// Configuration is invalid.
    Config(ConfigError),
    /// A profile definition is malformed.
    Profile(ProfileError),
    /// A run could not be started.
    Start(StartError),
    /// A request could not be queued for the next tick.
    Request(RequestError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Profile(e) => write!(f, "profile: {e}"),
            Self::Start(e) => write!(f, "start: {e}"),
            Self::Request(e) => write!(f, "request: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor faults
// ---------------------------------------------------------------------------

/// Why a single thermocouple sample was classified as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorFault {
    /// Thermocouple open circuit (probe unplugged or broken wire).
    OpenCircuit,
    /// Thermocouple shorted to ground.
    ShortToGround,
    /// Thermocouple shorted to supply.
    ShortToVcc,
    /// Converter output pinned at its rail.
    AdcSaturated,
    /// Converter did not answer (bus floating, SPI error).
    NoResponse,
    /// Calibrated value outside the physically plausible range.
    OutOfRange,
    /// Value moved faster than the oven can physically heat or cool.
    SlewExceeded,
}

impl fmt::Display for SensorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenCircuit => write!(f, "open circuit"),
            Self::ShortToGround => write!(f, "short to GND"),
            Self::ShortToVcc => write!(f, "short to VCC"),
            Self::AdcSaturated => write!(f, "ADC saturated"),
            Self::NoResponse => write!(f, "no response"),
            Self::OutOfRange => write!(f, "reading out of range"),
            Self::SlewExceeded => write!(f, "implausible slew"),
        }
    }
}

impl From<SensorFault> for Error {
    fn from(e: SensorFault) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Abort reasons
// ---------------------------------------------------------------------------

/// Why a run ended without completing.  Every variant is fatal to the run:
/// the heater is forced off and nothing is retried automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbortReason {
    /// Every thermocouple channel is faulted.
    NoSensor,
    /// A channel reached the absolute temperature limit.
    OverTemperature,
    /// Two active channels disagree by more than the divergence limit.
    SensorDivergence,
    /// The controller enclosure reached its temperature limit.
    EnclosureOverTemperature,
    /// A phase ran longer than the stuck-phase limit.
    PhaseTimeout,
    /// Operator pressed abort or a host command requested it.
    UserRequest,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSensor => write!(f, "no valid sensor"),
            Self::OverTemperature => write!(f, "over temperature"),
            Self::SensorDivergence => write!(f, "sensor divergence"),
            Self::EnclosureOverTemperature => write!(f, "enclosure over temperature"),
            Self::PhaseTimeout => write!(f, "phase timeout"),
            Self::UserRequest => write!(f, "user request"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from [`OvenConfig::validate`](crate::config::OvenConfig::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Profile errors
// ---------------------------------------------------------------------------

/// A profile that cannot be executed.  Phase indices are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileError {
    /// The profile has no phases.
    Empty,
    /// More phases than a profile can hold.
    TooManyPhases,
    /// Target temperature is not a finite number or is below freezing.
    InvalidTarget(usize),
    /// Ramp rate is not a finite, positive number.
    InvalidRate(usize),
    /// Hold duration is zero.
    ZeroHold(usize),
    /// Hold duration exceeds the stuck-phase limit and would always time out.
    HoldExceedsPhaseLimit(usize),
    /// Target temperature is at or above the absolute safety limit.
    TargetAboveLimit(usize),
    /// The profile carries PID gains that are out of range.
    InvalidGains,
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "profile has no phases"),
            Self::TooManyPhases => write!(f, "too many phases"),
            Self::InvalidTarget(i) => write!(f, "phase {i}: invalid target temperature"),
            Self::InvalidRate(i) => write!(f, "phase {i}: invalid ramp rate"),
            Self::ZeroHold(i) => write!(f, "phase {i}: zero hold duration"),
            Self::HoldExceedsPhaseLimit(i) => {
                write!(f, "phase {i}: hold longer than the phase time limit")
            }
            Self::TargetAboveLimit(i) => {
                write!(f, "phase {i}: target at or above the safety limit")
            }
            Self::InvalidGains => write!(f, "profile PID gains out of range"),
        }
    }
}

impl From<ProfileError> for Error {
    fn from(e: ProfileError) -> Self {
        Self::Profile(e)
    }
}

// ---------------------------------------------------------------------------
// Start errors
// ---------------------------------------------------------------------------

/// Why a `start()` request was refused.  The run never enters `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartError {
    /// A run is already in progress; abort it first.
    AlreadyRunning,
    /// No thermocouple currently provides a valid temperature.
    NoMeasurement,
    /// The oven configuration is invalid.
    Config(ConfigError),
    /// The requested profile is malformed.
    Profile(ProfileError),
}

impl fmt::Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "a run is already in progress"),
            Self::NoMeasurement => write!(f, "no valid temperature measurement"),
            Self::Config(e) => write!(f, "{e}"),
            Self::Profile(e) => write!(f, "{e}"),
        }
    }
}

impl From<ConfigError> for StartError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ProfileError> for StartError {
    fn from(e: ProfileError) -> Self {
        Self::Profile(e)
    }
}

impl From<StartError> for Error {
    fn from(e: StartError) -> Self {
        Self::Start(e)
    }
}

// ---------------------------------------------------------------------------
// Request errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// Channel index does not exist on this oven.
    NoSuchChannel(usize),
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchChannel(ch) => write!(f, "no such channel: {ch}"),
        }
    }
}

impl From<RequestError> for Error {
    fn from(e: RequestError) -> Self {
        Self::Request(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
