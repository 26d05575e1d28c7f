//! Percent-duty output drivers for the heater, fan and aux channels.
//!
//! Two flavours:
//!
//! - [`PwmOutput`]: hardware PWM (fan via triac/MOSFET driver, aux).
//! - [`TimeProportionedOutput`]: slow software PWM on a plain GPIO for a
//!   zero-cross solid-state relay.  Mains heaters cannot be switched at
//!   kHz rates, so the duty is spread over a window of control ticks and
//!   the pin is updated once per tick.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::error;

/// An output that takes a duty in percent.
pub trait PercentOutput {
    /// Apply `percent` (values above 100 are treated as 100).
    fn set_percent(&mut self, percent: u8);

    /// Duty last requested.
    fn percent(&self) -> u8;
}

/// An output that is not fitted.
impl PercentOutput for () {
    fn set_percent(&mut self, _percent: u8) {}

    fn percent(&self) -> u8 {
        0
    }
}

// ───────────────────────────────────────────────────────────────
// Hardware PWM
// ───────────────────────────────────────────────────────────────

pub struct PwmOutput<P> {
    pwm: P,
    percent: u8,
    name: &'static str,
}

impl<P: SetDutyCycle> PwmOutput<P> {
    /// Wrap `pwm` and drive it to 0 %.
    pub fn new(pwm: P, name: &'static str) -> Self {
        let mut out = Self {
            pwm,
            percent: 0,
            name,
        };
        out.set_percent(0);
        out
    }

    pub fn release(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> PercentOutput for PwmOutput<P> {
    fn set_percent(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.pwm.set_duty_cycle_percent(percent).is_err() {
            error!("{}: PWM write failed ({}%)", self.name, percent);
        }
        self.percent = percent;
    }

    fn percent(&self) -> u8 {
        self.percent
    }
}

// ───────────────────────────────────────────────────────────────
// Time-proportioned (slow PWM) for SSRs
// ───────────────────────────────────────────────────────────────

pub struct TimeProportionedOutput<P> {
    pin: P,
    /// Window length in ticks.
    window: u16,
    /// Position inside the window, `0..window`.
    position: u16,
    percent: u8,
    on: bool,
    name: &'static str,
}

impl<P: OutputPin> TimeProportionedOutput<P> {
    /// `window_ticks` of 0 is treated as 1 (plain on/off).
    pub fn new(pin: P, window_ticks: u16, name: &'static str) -> Self {
        let mut out = Self {
            pin,
            window: window_ticks.max(1),
            position: 0,
            percent: 0,
            on: true,
            name,
        };
        out.write(false);
        out
    }

    /// Whether the pin is currently driven high.
    pub fn is_on(&self) -> bool {
        self.on
    }

    pub fn release(self) -> P {
        self.pin
    }

    fn write(&mut self, on: bool) {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            error!("{}: pin write failed", self.name);
        }
        self.on = on;
    }
}

impl<P: OutputPin> PercentOutput for TimeProportionedOutput<P> {
    /// Also advances the window by one tick.
    fn set_percent(&mut self, percent: u8) {
        self.percent = percent.min(100);
        let on = u32::from(self.position) * 100 < u32::from(self.percent) * u32::from(self.window);
        self.write(on);
        self.position = (self.position + 1) % self.window;
    }

    fn percent(&self) -> u8 {
        self.percent
    }
}
