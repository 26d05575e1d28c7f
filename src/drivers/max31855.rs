//! MAX31855 thermocouple-to-digital converter.
//!
//! Read-only SPI device: every read clocks out one 32-bit frame.
//!
//! ```text
//!  31            18 17 16 15          4  3  2   1   0
//! ┌───────────────┬──┬──┬─────────────┬──┬───┬───┬──┐
//! │ TC temp (14b) │ r│ F│ CJ temp(12b)│ r│SCV│SCG│OC│
//! └───────────────┴──┴──┴─────────────┴──┴───┴───┴──┘
//!   0.25 °C/LSB          0.0625 °C/LSB
//! ```
//!
//! The chip's hot-junction value assumes a linear 41.276 µV/°C Seebeck
//! coefficient.  The driver undoes that and hands the reader the raw EMF
//! plus the cold-junction temperature, so linearisation happens in one
//! place for every converter.
//!
//! The cold junction sits on the controller board, so the bank also
//! reports it as the enclosure temperature.

use embedded_hal::spi::SpiDevice;
use heapless::Vec;
use log::debug;

use crate::app::ports::TemperatureSource;
use crate::config::MAX_CHANNELS;
use crate::error::SensorFault;
use crate::sensors::thermocouple::RawSample;

/// Sensitivity the MAX31855 assumes for type K (µV/°C).
pub const SEEBECK_UV_PER_C: f32 = 41.276;

const FAULT_BIT: u32 = 1 << 16;
const OC_BIT: u32 = 1 << 0;
const SCG_BIT: u32 = 1 << 1;
const SCV_BIT: u32 = 1 << 2;

const TC_RAW_MAX: i32 = 0x1FFF;
const TC_RAW_MIN: i32 = -0x2000;

/// Decode one frame.
pub fn decode(frame: u32) -> Result<RawSample, SensorFault> {
    // A floating MISO line reads as all zeros or all ones.
    if frame == 0 || frame == u32::MAX {
        return Err(SensorFault::NoResponse);
    }
    if frame & FAULT_BIT != 0 {
        return Err(if frame & OC_BIT != 0 {
            SensorFault::OpenCircuit
        } else if frame & SCG_BIT != 0 {
            SensorFault::ShortToGround
        } else if frame & SCV_BIT != 0 {
            SensorFault::ShortToVcc
        } else {
            SensorFault::NoResponse
        });
    }

    // Arithmetic shifts sign-extend both fields.
    let tc_raw = (frame as i32) >> 18;
    let cj_raw = ((frame << 16) as i32) >> 20;
    if tc_raw >= TC_RAW_MAX || tc_raw <= TC_RAW_MIN {
        return Err(SensorFault::AdcSaturated);
    }

    let tc_c = tc_raw as f32 * 0.25;
    let cj_c = cj_raw as f32 * 0.0625;
    Ok(RawSample {
        thermocouple_uv: (tc_c - cj_c) * SEEBECK_UV_PER_C,
        cold_junction_c: cj_c,
    })
}

/// One converter on its own chip select.
pub struct Max31855<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> Max31855<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Clock out the raw 32-bit frame.
    pub fn read_frame(&mut self) -> Result<u32, SensorFault> {
        let mut buf = [0u8; 4];
        self.spi
            .read(&mut buf)
            .map_err(|_| SensorFault::NoResponse)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read(&mut self) -> Result<RawSample, SensorFault> {
        let frame = self.read_frame()?;
        decode(frame).inspect_err(|fault| debug!("MAX31855 frame {frame:#010x}: {fault}"))
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

/// Up to [`MAX_CHANNELS`] converters, channel index = position.
pub struct Max31855Bank<SPI> {
    devices: Vec<Max31855<SPI>, MAX_CHANNELS>,
    /// Hottest cold junction seen since the last enclosure read.
    cold_junction_c: Option<f32>,
}

impl<SPI: SpiDevice> Max31855Bank<SPI> {
    pub fn new() -> Self {
        Self {
            devices: Vec::new(),
            cold_junction_c: None,
        }
    }

    /// Add the next channel.  Returns the device back when the bank is full.
    pub fn push(&mut self, spi: SPI) -> Result<usize, SPI> {
        let index = self.devices.len();
        self.devices
            .push(Max31855::new(spi))
            .map_err(Max31855::release)?;
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl<SPI: SpiDevice> Default for Max31855Bank<SPI> {
    fn default() -> Self {
        Self::new()
    }
}

impl<SPI: SpiDevice> TemperatureSource for Max31855Bank<SPI> {
    fn read_channel_raw(&mut self, index: usize) -> Result<RawSample, SensorFault> {
        let sample = self
            .devices
            .get_mut(index)
            .ok_or(SensorFault::NoResponse)?
            .read()?;
        let cj = sample.cold_junction_c;
        self.cold_junction_c = Some(self.cold_junction_c.map_or(cj, |t| t.max(cj)));
        Ok(sample)
    }

    /// Only reports when a converter answered since the previous call.
    fn read_enclosure_c(&mut self) -> Option<f32> {
        self.cold_junction_c.take()
    }
}
