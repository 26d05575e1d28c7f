//! Front panel: heater and fan lamps plus a piezo buzzer, all on plain
//! GPIOs.
//!
//! The buzzer plays a short pattern when a run ends.  The pattern is
//! stepped once per control tick from [`IndicatorOutput::show`], which
//! the control loop calls every tick, so no timer is needed.
//!
//! | Alarm      | Pattern (one slot per tick)           |
//! |------------|---------------------------------------|
//! | `Complete` | three beeps: on, off, on, off, on     |
//! | `Aborted`  | one long tone, twelve ticks           |

use embedded_hal::digital::OutputPin;
use log::error;

use crate::app::ports::{Alarm, Indicators};

const COMPLETE_PATTERN: &[bool] = &[true, false, true, false, true];
const ABORTED_PATTERN: &[bool] = &[true; 12];

/// Lamps and buzzer as one output.
pub trait IndicatorOutput {
    /// Apply lamp states and step the buzzer pattern by one tick.
    fn show(&mut self, indicators: Indicators);

    /// Start `alarm`, replacing any pattern still playing.
    fn alarm(&mut self, alarm: Alarm);
}

/// No lamps, no buzzer.
impl IndicatorOutput for () {
    fn show(&mut self, _indicators: Indicators) {}
    fn alarm(&mut self, _alarm: Alarm) {}
}

pub struct Panel<HL, FL, BZ> {
    heater_led: HL,
    fan_led: FL,
    buzzer: BZ,
    pattern: &'static [bool],
    step: usize,
    shown: Indicators,
}

impl<HL, FL, BZ> Panel<HL, FL, BZ>
where
    HL: OutputPin,
    FL: OutputPin,
    BZ: OutputPin,
{
    /// Take the pins and drive them all low.
    pub fn new(heater_led: HL, fan_led: FL, buzzer: BZ) -> Self {
        let mut panel = Self {
            heater_led,
            fan_led,
            buzzer,
            pattern: &[],
            step: 0,
            shown: Indicators::default(),
        };
        panel.apply(Indicators::default(), false);
        panel
    }

    pub fn indicators(&self) -> Indicators {
        self.shown
    }

    /// Whether a buzzer pattern is still playing.
    pub fn is_sounding(&self) -> bool {
        self.step < self.pattern.len()
    }

    pub fn release(self) -> (HL, FL, BZ) {
        (self.heater_led, self.fan_led, self.buzzer)
    }

    fn apply(&mut self, indicators: Indicators, buzz: bool) {
        let ok = write(&mut self.heater_led, indicators.heater)
            & write(&mut self.fan_led, indicators.fan)
            & write(&mut self.buzzer, buzz);
        if !ok {
            error!("panel: pin write failed");
        }
        self.shown = indicators;
    }
}

impl<HL, FL, BZ> IndicatorOutput for Panel<HL, FL, BZ>
where
    HL: OutputPin,
    FL: OutputPin,
    BZ: OutputPin,
{
    fn show(&mut self, indicators: Indicators) {
        let buzz = self.pattern.get(self.step).copied().unwrap_or(false);
        self.step = self.step.saturating_add(1).min(self.pattern.len());
        self.apply(indicators, buzz);
    }

    fn alarm(&mut self, alarm: Alarm) {
        self.pattern = match alarm {
            Alarm::Complete => COMPLETE_PATTERN,
            Alarm::Aborted => ABORTED_PATTERN,
        };
        self.step = 0;
    }
}

fn write(pin: &mut impl OutputPin, high: bool) -> bool {
    let result = if high { pin.set_high() } else { pin.set_low() };
    result.is_ok()
}
