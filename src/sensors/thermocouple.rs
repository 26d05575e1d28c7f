//! Type-K thermocouple linearisation and cold-junction compensation.
//!
//! Converters such as the MAX31855 report the hot-junction temperature
//! assuming a constant 41.276 µV/°C Seebeck coefficient, which is off by
//! several degrees at reflow temperatures.  Samples therefore reach the
//! reader as raw EMF plus the cold-junction temperature, and are converted
//! here with the NIST ITS-90 polynomials:
//!
//! 1. cold-junction temperature → equivalent EMF (forward polynomial),
//! 2. add to the measured EMF (compensation),
//! 3. total EMF → temperature (inverse polynomial),
//! 4. per-channel gain/offset trim.

use serde::{Deserialize, Serialize};

use crate::config::ChannelCalibration;

/// One raw reading from a thermocouple input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Thermocouple EMF relative to the cold junction (microvolts).
    pub thermocouple_uv: f32,
    /// Temperature of the reference junction on the board (°C).
    pub cold_junction_c: f32,
}

// NIST ITS-90 Type K, temperature (°C) → EMF (mV).
const FORWARD_NEG: [f64; 11] = [
    0.0,
    3.945_012_802_5e-2,
    2.362_237_359_8e-5,
    -3.285_890_678_4e-7,
    -4.990_482_877_7e-9,
    -6.750_905_917_3e-11,
    -5.741_032_742_8e-13,
    -3.108_887_289_4e-15,
    -1.045_160_936_5e-17,
    -1.988_926_687_8e-20,
    -1.632_269_748_6e-23,
];
const FORWARD_POS: [f64; 10] = [
    -1.760_041_368_6e-2,
    3.892_120_497_5e-2,
    1.855_877_003_2e-5,
    -9.945_759_287_4e-8,
    3.184_094_571_9e-10,
    -5.607_284_488_9e-13,
    5.607_505_905_9e-16,
    -3.202_072_000_3e-19,
    9.715_114_715_2e-23,
    -1.210_472_127_5e-26,
];
const FORWARD_EXP: (f64, f64, f64) = (1.185_976e-1, -1.183_432e-4, 126.968_6);

// NIST ITS-90 Type K, EMF (mV) → temperature (°C).
const INVERSE_NEG: [f64; 9] = [
    0.0,
    2.517_346_2e1,
    -1.166_287_8,
    -1.083_363_8,
    -8.977_354_0e-1,
    -3.734_237_7e-1,
    -8.663_264_3e-2,
    -1.045_059_8e-2,
    -5.192_057_7e-4,
];
const INVERSE_LOW: [f64; 10] = [
    0.0,
    2.508_355e1,
    7.860_106e-2,
    -2.503_131e-1,
    8.315_270e-2,
    -1.228_034e-2,
    9.804_036e-4,
    -4.413_030e-5,
    1.057_734e-6,
    -1.052_755e-8,
];
const INVERSE_HIGH: [f64; 7] = [
    -1.318_058e2,
    4.830_222e1,
    -1.646_031,
    5.464_731e-2,
    -9.650_715e-4,
    8.802_193e-6,
    -3.110_810e-8,
];

const EMF_MIN_MV: f64 = -5.891;
const EMF_SPLIT_MV: f64 = 20.644;
const EMF_MAX_MV: f64 = 54.886;

fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// EMF (mV) a Type-K junction at `t_c` produces relative to 0 °C.
pub fn celsius_to_emf_mv(t_c: f32) -> f32 {
    let t = f64::from(t_c);
    let mv = if t < 0.0 {
        horner(&FORWARD_NEG, t)
    } else {
        let (a0, a1, a2) = FORWARD_EXP;
        horner(&FORWARD_POS, t) + a0 * (a1 * (t - a2) * (t - a2)).exp()
    };
    mv as f32
}

/// Temperature for a 0 °C-referenced EMF, or `None` outside the Type-K range.
pub fn emf_mv_to_celsius(mv: f32) -> Option<f32> {
    let e = f64::from(mv);
    if !e.is_finite() || !(EMF_MIN_MV..=EMF_MAX_MV).contains(&e) {
        return None;
    }
    let t = if e < 0.0 {
        horner(&INVERSE_NEG, e)
    } else if e < EMF_SPLIT_MV {
        horner(&INVERSE_LOW, e)
    } else {
        horner(&INVERSE_HIGH, e)
    };
    Some(t as f32)
}

/// Cold-junction-compensated, linearised hot-junction temperature.
pub fn compensate(sample: RawSample) -> Option<f32> {
    if !(sample.thermocouple_uv.is_finite() && sample.cold_junction_c.is_finite()) {
        return None;
    }
    let total_mv = sample.thermocouple_uv / 1000.0 + celsius_to_emf_mv(sample.cold_junction_c);
    emf_mv_to_celsius(total_mv)
}

/// Full conversion for one channel: compensation, linearisation and trim.
pub fn calibrate(sample: RawSample, cal: &ChannelCalibration) -> Option<f32> {
    compensate(sample).map(|t| t * cal.gain + cal.offset_c)
}
