//! Sensor subsystem: thermocouple conversion and the aggregating
//! [`TemperatureReader`].
//!
//! The reader owns every [`Channel`] and produces a [`TemperatureFrame`]
//! each tick.  A channel that keeps failing is latched `Faulted` and only
//! returns after an explicit [`TemperatureReader::rearm`]; a probe that
//! works loose mid-run must not silently come back.

pub mod thermocouple;

use heapless::Vec;
use log::{info, warn};

use crate::app::ports::TemperatureSource;
use crate::config::{Aggregation, ChannelCalibration, MAX_CHANNELS, OvenConfig, SensorBounds};
use crate::error::{RequestError, SensorFault};

/// A calibrated temperature tagged with a validity flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature {
    pub celsius: f32,
    pub valid: bool,
}

impl Temperature {
    pub const INVALID: Self = Self {
        celsius: 0.0,
        valid: false,
    };

    pub fn valid(celsius: f32) -> Self {
        Self {
            celsius,
            valid: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    /// Not fitted or switched off in the configuration.
    Disabled,
    Enabled,
    /// Latched after too many consecutive invalid samples.
    Faulted,
}

/// One physical thermocouple input.
#[derive(Debug, Clone)]
pub struct Channel {
    pub index: usize,
    pub status: ChannelStatus,
    pub consecutive_faults: u8,
    pub last_valid: Option<f32>,
    pub last_fault: Option<SensorFault>,
    /// Ticks since the last valid sample (widens the slew window).
    ticks_since_valid: u32,
    calibration: ChannelCalibration,
}

impl Channel {
    fn new(index: usize, enabled: bool, calibration: ChannelCalibration) -> Self {
        Self {
            index,
            status: if enabled {
                ChannelStatus::Enabled
            } else {
                ChannelStatus::Disabled
            },
            consecutive_faults: 0,
            last_valid: None,
            last_fault: None,
            ticks_since_valid: 0,
            calibration,
        }
    }
}

/// Per-channel result of one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelReading {
    pub index: usize,
    pub status: ChannelStatus,
    /// This tick's sample after the plausibility checks.
    pub temperature: Temperature,
    /// Calibrated value read without a converter fault this tick, before
    /// the range and slew checks.  The safety monitor judges this one.
    pub sampled_c: Option<f32>,
    /// Why this tick's sample is invalid.
    pub fault: Option<SensorFault>,
    /// Value this channel contributes to the aggregate, if any.
    pub contribution: Option<f32>,
}

/// Everything the rest of the tick needs to know about temperature.
#[derive(Debug, Clone, Default)]
pub struct TemperatureFrame {
    pub readings: Vec<ChannelReading, MAX_CHANNELS>,
    /// Aggregate measurement for the controller; `None` when no enabled
    /// channel has a usable value.
    pub measured: Option<f32>,
    /// Channels that latched `Faulted` on this tick.
    pub newly_faulted: Vec<usize, MAX_CHANNELS>,
    /// Controller enclosure temperature, when the board reports one.
    pub enclosure_c: Option<f32>,
}

impl TemperatureFrame {
    /// Every value a converter delivered this tick, plausible or not.
    pub fn sampled_temperatures(&self) -> impl Iterator<Item = f32> + '_ {
        self.readings.iter().filter_map(|r| r.sampled_c)
    }
}

/// Converts raw samples into calibrated, classified temperatures.
pub struct TemperatureReader {
    channels: Vec<Channel, MAX_CHANNELS>,
    bounds: SensorBounds,
    fault_threshold: u8,
    aggregation: Aggregation,
    tick_secs: f32,
}

impl TemperatureReader {
    pub fn new(config: &OvenConfig) -> Self {
        let mut channels = Vec::new();
        for (index, ch) in config.channels.iter().enumerate() {
            // Capacity equals the config's capacity; cannot overflow.
            let _ = channels.push(Channel::new(index, ch.enabled, ch.calibration));
        }
        Self {
            channels,
            bounds: config.sensor,
            fault_threshold: config.limits.max_consecutive_faults.max(1),
            aggregation: config.aggregation,
            tick_secs: config.tick_secs(),
        }
    }

    /// Apply new channel, bounds and aggregation settings.
    ///
    /// Fault latches survive: a channel faulted before stays faulted until
    /// it is re-armed, even if the new config enables it.
    pub fn reconfigure(&mut self, config: &OvenConfig) {
        self.channels.truncate(config.channels.len());
        for (index, cfg) in config.channels.iter().enumerate() {
            match self.channels.get_mut(index) {
                Some(ch) => {
                    ch.calibration = cfg.calibration;
                    ch.status = match (cfg.enabled, ch.status) {
                        (false, _) => ChannelStatus::Disabled,
                        (true, ChannelStatus::Faulted) => ChannelStatus::Faulted,
                        (true, _) => ChannelStatus::Enabled,
                    };
                }
                None => {
                    let _ = self
                        .channels
                        .push(Channel::new(index, cfg.enabled, cfg.calibration));
                }
            }
        }
        self.bounds = config.sensor;
        self.fault_threshold = config.limits.max_consecutive_faults.max(1);
        self.aggregation = config.aggregation;
        self.tick_secs = config.tick_secs();
    }

    /// Sample every enabled channel once.  Never blocks.
    pub fn sample(&mut self, source: &mut impl TemperatureSource) -> TemperatureFrame {
        let mut frame = TemperatureFrame::default();

        for ch in &mut self.channels {
            let reading = match ch.status {
                ChannelStatus::Disabled | ChannelStatus::Faulted => ChannelReading {
                    index: ch.index,
                    status: ch.status,
                    temperature: Temperature::INVALID,
                    sampled_c: None,
                    fault: ch.last_fault.filter(|_| ch.status == ChannelStatus::Faulted),
                    contribution: None,
                },
                ChannelStatus::Enabled => {
                    let sampled = source.read_channel_raw(ch.index).and_then(|raw| {
                        thermocouple::calibrate(raw, &ch.calibration)
                            .ok_or(SensorFault::OutOfRange)
                    });
                    let sampled_c = sampled.ok();
                    let outcome =
                        sampled.and_then(|t| classify(t, ch, &self.bounds, self.tick_secs));

                    match outcome {
                        Ok(t) => {
                            ch.consecutive_faults = 0;
                            ch.ticks_since_valid = 0;
                            ch.last_valid = Some(t);
                            ChannelReading {
                                index: ch.index,
                                status: ChannelStatus::Enabled,
                                temperature: Temperature::valid(t),
                                sampled_c,
                                fault: None,
                                contribution: Some(t),
                            }
                        }
                        Err(fault) => {
                            ch.consecutive_faults = ch.consecutive_faults.saturating_add(1);
                            ch.ticks_since_valid = ch.ticks_since_valid.saturating_add(1);
                            ch.last_fault = Some(fault);
                            if ch.consecutive_faults >= self.fault_threshold {
                                ch.status = ChannelStatus::Faulted;
                                warn!(
                                    "TC{}: faulted after {} bad samples ({})",
                                    ch.index, ch.consecutive_faults, fault
                                );
                                let _ = frame.newly_faulted.push(ch.index);
                            }
                            ChannelReading {
                                index: ch.index,
                                status: ch.status,
                                temperature: Temperature::INVALID,
                                sampled_c,
                                fault: Some(fault),
                                // Hold the last good value until the channel latches.
                                contribution: if ch.status == ChannelStatus::Enabled {
                                    ch.last_valid
                                } else {
                                    None
                                },
                            }
                        }
                    }
                }
            };
            let _ = frame.readings.push(reading);
        }

        frame.measured = aggregate(self.aggregation, frame.readings.iter().filter_map(|r| r.contribution));
        frame.enclosure_c = source.read_enclosure_c().filter(|t| t.is_finite());
        frame
    }

    /// Return a faulted channel to service.  Returns `true` if the channel
    /// was faulted.
    pub fn rearm(&mut self, index: usize) -> Result<bool, RequestError> {
        let ch = self
            .channels
            .get_mut(index)
            .ok_or(RequestError::NoSuchChannel(index))?;
        if ch.status != ChannelStatus::Faulted {
            return Ok(false);
        }
        ch.status = ChannelStatus::Enabled;
        ch.consecutive_faults = 0;
        ch.ticks_since_valid = 0;
        ch.last_valid = None;
        ch.last_fault = None;
        info!("TC{}: re-armed", index);
        Ok(true)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Option<&Channel> {
        self.channels.get(index)
    }

    /// True while at least one channel is enabled and not faulted.
    pub fn has_active_channel(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.status == ChannelStatus::Enabled)
    }
}

/// Range and slew checks on a calibrated value.
fn classify(
    t: f32,
    ch: &Channel,
    bounds: &SensorBounds,
    tick_secs: f32,
) -> Result<f32, SensorFault> {
    if !t.is_finite() || t < bounds.min_plausible_c || t > bounds.max_plausible_c {
        return Err(SensorFault::OutOfRange);
    }
    if let Some(prev) = ch.last_valid {
        let window = (ch.ticks_since_valid + 1) as f32 * tick_secs;
        if (t - prev).abs() > bounds.max_slew_c_per_sec * window {
            return Err(SensorFault::SlewExceeded);
        }
    }
    Ok(t)
}

fn aggregate(mode: Aggregation, values: impl Iterator<Item = f32>) -> Option<f32> {
    let mut count = 0u32;
    let mut sum = 0.0f32;
    let mut hottest = f32::MIN;
    for v in values {
        count += 1;
        sum += v;
        hottest = hottest.max(v);
    }
    if count == 0 {
        return None;
    }
    Some(match mode {
        Aggregation::Average => sum / count as f32,
        Aggregation::Hottest => hottest,
    })
}

#[cfg(test)]
mod tests {
    use super::thermocouple::RawSample;
    use super::*;
    use crate::config::ChannelConfig;

    /// Source whose channels read a fixed board temperature (zero EMF).
    struct FixedSource {
        values: [Result<f32, SensorFault>; MAX_CHANNELS],
    }

    impl FixedSource {
        fn all(t: f32) -> Self {
            Self { values: [Ok(t); MAX_CHANNELS] }
        }
    }

    impl TemperatureSource for FixedSource {
        fn read_channel_raw(&mut self, index: usize) -> Result<RawSample, SensorFault> {
            let t = self.values.get(index).copied().unwrap_or(Err(SensorFault::NoResponse))?;
            Ok(RawSample {
                thermocouple_uv: 0.0,
                cold_junction_c: t,
            })
        }
    }

    fn config(channels: usize, threshold: u8) -> OvenConfig {
        let mut c = OvenConfig::default();
        c.channels.clear();
        for _ in 0..channels {
            c.channels.push(ChannelConfig::default()).unwrap();
        }
        c.limits.max_consecutive_faults = threshold;
        c
    }

    #[test]
    fn averages_valid_channels() {
        let mut reader = TemperatureReader::new(&config(2, 3));
        let mut src = FixedSource::all(100.0);
        src.values[1] = Ok(110.0);
        let frame = reader.sample(&mut src);
        assert!((frame.measured.unwrap() - 105.0).abs() < 0.2);
        assert!(frame.readings.iter().all(|r| r.temperature.valid));
    }

    #[test]
    fn hottest_aggregation_picks_max() {
        let mut cfg = config(2, 3);
        cfg.aggregation = Aggregation::Hottest;
        let mut reader = TemperatureReader::new(&cfg);
        let mut src = FixedSource::all(100.0);
        src.values[1] = Ok(110.0);
        let frame = reader.sample(&mut src);
        assert!((frame.measured.unwrap() - 110.0).abs() < 0.2);
    }

    #[test]
    fn glitch_holds_last_value_until_threshold() {
        let mut reader = TemperatureReader::new(&config(1, 3));
        let mut src = FixedSource::all(80.0);
        reader.sample(&mut src);

        src.values[0] = Err(SensorFault::OpenCircuit);
        for _ in 0..2 {
            let frame = reader.sample(&mut src);
            assert!((frame.measured.unwrap() - 80.0).abs() < 0.2);
            assert_eq!(frame.readings[0].status, ChannelStatus::Enabled);
            assert!(!frame.readings[0].temperature.valid);
        }

        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[0].status, ChannelStatus::Faulted);
        assert_eq!(frame.measured, None);
        assert_eq!(frame.newly_faulted.as_slice(), &[0]);
    }

    #[test]
    fn faulted_channel_excluded_and_stays_faulted() {
        let mut reader = TemperatureReader::new(&config(2, 1));
        let mut src = FixedSource::all(60.0);
        src.values[0] = Err(SensorFault::ShortToGround);
        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[0].status, ChannelStatus::Faulted);

        // Probe recovers electrically; it must not rejoin on its own.
        src.values[0] = Ok(60.0);
        src.values[1] = Ok(62.0);
        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[0].status, ChannelStatus::Faulted);
        assert!((frame.measured.unwrap() - 62.0).abs() < 0.2);
    }

    #[test]
    fn rearm_returns_channel_to_service() {
        let mut reader = TemperatureReader::new(&config(1, 1));
        let mut src = FixedSource::all(40.0);
        src.values[0] = Err(SensorFault::OpenCircuit);
        reader.sample(&mut src);
        assert!(!reader.has_active_channel());

        assert_eq!(reader.rearm(0), Ok(true));
        assert_eq!(reader.rearm(0), Ok(false));
        src.values[0] = Ok(40.0);
        let frame = reader.sample(&mut src);
        assert!(frame.measured.is_some());
    }

    #[test]
    fn rearm_unknown_channel_is_an_error() {
        let mut reader = TemperatureReader::new(&config(2, 3));
        assert_eq!(reader.rearm(7), Err(RequestError::NoSuchChannel(7)));
    }

    #[test]
    fn implausible_jump_is_a_fault() {
        let mut reader = TemperatureReader::new(&config(1, 3));
        let mut src = FixedSource::all(50.0);
        reader.sample(&mut src);
        // 20 °C/s * 0.25 s allows 5 °C per tick.
        src.values[0] = Ok(90.0);
        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[0].fault, Some(SensorFault::SlewExceeded));
    }

    #[test]
    fn implausible_value_still_reaches_the_safety_view() {
        let mut reader = TemperatureReader::new(&config(2, 3));
        let mut src = FixedSource::all(150.0);
        reader.sample(&mut src);
        src.values[1] = Ok(300.0);
        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[1].fault, Some(SensorFault::SlewExceeded));
        assert!(frame.readings[0].temperature.valid);
        assert!(!frame.readings[1].temperature.valid);
        let sampled: std::vec::Vec<f32> = frame.sampled_temperatures().collect();
        assert_eq!(sampled.len(), 2);
        assert!((sampled[1] - 300.0).abs() < 0.5);
    }

    #[test]
    fn converter_fault_has_no_sampled_value() {
        let mut reader = TemperatureReader::new(&config(1, 3));
        let mut src = FixedSource::all(50.0);
        src.values[0] = Err(SensorFault::OpenCircuit);
        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[0].sampled_c, None);
        assert_eq!(frame.enclosure_c, None);
    }

    #[test]
    fn out_of_range_is_a_fault() {
        let mut reader = TemperatureReader::new(&config(1, 3));
        let mut src = FixedSource::all(-60.0);
        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[0].fault, Some(SensorFault::OutOfRange));
    }

    #[test]
    fn disabled_channel_never_read() {
        let mut cfg = config(2, 3);
        cfg.channels[1].enabled = false;
        let mut reader = TemperatureReader::new(&cfg);
        let mut src = FixedSource::all(30.0);
        src.values[1] = Err(SensorFault::NoResponse);
        let frame = reader.sample(&mut src);
        assert_eq!(frame.readings[1].status, ChannelStatus::Disabled);
        assert!(frame.newly_faulted.is_empty());
        assert!((frame.measured.unwrap() - 30.0).abs() < 0.2);
    }
}
