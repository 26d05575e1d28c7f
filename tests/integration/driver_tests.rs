//! Driver stack tests: MAX31855 bank + SSR/PWM outputs behind the
//! `HardwareAdapter`, driven by the real control loop against fake
//! `embedded-hal` devices.

use std::cell::Cell;
use std::rc::Rc;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use embedded_hal::spi::{self, Operation, SpiDevice};

use smtoven::adapters::hardware::HardwareAdapter;
use smtoven::adapters::log_sink::LogEventSink;
use smtoven::app::ports::TemperatureSource;
use smtoven::drivers::max31855::Max31855Bank;
use smtoven::drivers::output::{PwmOutput, TimeProportionedOutput};
use smtoven::drivers::panel::Panel;
use smtoven::error::{AbortReason, SensorFault};
use smtoven::profile::{Phase, ProfileDefinition, RunStatus};
use smtoven::{ControlLoop, OvenConfig, RequestQueue};

// ── Fake devices ─────────────────────────────────────────────

/// Chip-unit frame for a hot junction at `tc_c` and cold junction at `cj_c`.
fn frame(tc_c: f32, cj_c: f32) -> u32 {
    let tc = ((tc_c / 0.25) as i32 as u32 & 0x3FFF) << 18;
    let cj = ((cj_c / 0.0625) as i32 as u32 & 0x0FFF) << 4;
    tc | cj
}

#[derive(Clone)]
struct FakeSpi {
    frame: Rc<Cell<u32>>,
    fail: Rc<Cell<bool>>,
}

impl FakeSpi {
    fn new(frame: u32) -> Self {
        Self {
            frame: Rc::new(Cell::new(frame)),
            fail: Rc::new(Cell::new(false)),
        }
    }
}

impl spi::ErrorType for FakeSpi {
    type Error = spi::ErrorKind;
}

impl SpiDevice for FakeSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.fail.get() {
            return Err(spi::ErrorKind::Other);
        }
        let bytes = self.frame.get().to_be_bytes();
        for op in operations {
            if let Operation::Read(buf) = op {
                let n = buf.len().min(4);
                buf[..n].copy_from_slice(&bytes[..n]);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakePin(Rc<Cell<bool>>);

impl digital::ErrorType for FakePin {
    type Error = digital::ErrorKind;
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct FakePwm(Rc<Cell<u16>>);

impl pwm::ErrorType for FakePwm {
    type Error = pwm::ErrorKind;
}

impl SetDutyCycle for FakePwm {
    fn max_duty_cycle(&self) -> u16 {
        1000
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.0.set(duty);
        Ok(())
    }
}

type Board = HardwareAdapter<
    Max31855Bank<FakeSpi>,
    TimeProportionedOutput<FakePin>,
    PwmOutput<FakePwm>,
    PwmOutput<FakePwm>,
>;

struct Rig {
    probes: [FakeSpi; 2],
    heater_pin: FakePin,
    fan_pwm: FakePwm,
}

fn board(tc_c: f32) -> (Board, Rig) {
    let rig = Rig {
        probes: [FakeSpi::new(frame(tc_c, 25.0)), FakeSpi::new(frame(tc_c, 25.0))],
        heater_pin: FakePin::default(),
        fan_pwm: FakePwm::default(),
    };
    let mut bank = Max31855Bank::new();
    for probe in &rig.probes {
        assert!(bank.push(probe.clone()).is_ok());
    }
    let hw = HardwareAdapter::new(
        bank,
        TimeProportionedOutput::new(rig.heater_pin.clone(), 4, "heater"),
        PwmOutput::new(rig.fan_pwm.clone(), "fan"),
        PwmOutput::new(FakePwm::default(), "aux"),
    );
    (hw, rig)
}

fn profile() -> ProfileDefinition {
    ProfileDefinition::new("ramp")
        .with_phase(Phase::ramp_to("preheat", 150.0, 2.0))
        .unwrap()
}

// ── Tests ────────────────────────────────────────────────────

#[test]
fn bank_reads_each_channel_and_reports_missing_ones() {
    let (mut hw, rig) = board(100.0);
    rig.probes[1].frame.set(0);
    assert!(hw.read_channel_raw(0).is_ok());
    assert_eq!(hw.read_channel_raw(1), Err(SensorFault::NoResponse));
    assert_eq!(hw.read_channel_raw(2), Err(SensorFault::NoResponse));
}

#[test]
fn bank_reports_cold_junction_as_enclosure() {
    let (mut hw, rig) = board(100.0);
    assert_eq!(hw.read_enclosure_c(), None);
    rig.probes[1].frame.set(frame(100.0, 31.5));
    assert!(hw.read_channel_raw(0).is_ok());
    assert!(hw.read_channel_raw(1).is_ok());
    assert_eq!(hw.read_enclosure_c(), Some(31.5));
    // Nothing read since.
    assert_eq!(hw.read_enclosure_c(), None);
}

#[test]
fn loop_measures_through_converters() {
    let (hw, _rig) = board(100.0);
    let q = RequestQueue::new();
    let mut cl = ControlLoop::new(OvenConfig::default(), hw, LogEventSink::new(), &q).unwrap();
    let snap = cl.tick();
    let measured = snap.measured_c.unwrap();
    assert!((measured - 100.0).abs() < 1.0, "measured {measured}");
}

#[test]
fn running_loop_drives_fan_pwm_and_heater_ssr() {
    let (hw, rig) = board(25.0);
    let q = RequestQueue::new();
    let mut cl = ControlLoop::new(OvenConfig::default(), hw, LogEventSink::new(), &q).unwrap();
    q.request_start(profile());

    let mut heater_on_ticks = 0;
    for _ in 0..40 {
        cl.tick();
        if rig.heater_pin.0.get() {
            heater_on_ticks += 1;
        }
    }
    let convection = u16::from(cl.config().fans.convection_duty);
    assert_eq!(rig.fan_pwm.0.get(), convection * 10);
    assert!(heater_on_ticks > 0, "SSR never switched on");

    let (heater, fan, _) = cl.hardware().duties();
    assert_eq!(fan, cl.config().fans.convection_duty);
    assert_eq!(heater, cl.last_outputs().heater);
}

#[test]
fn dead_bus_aborts_and_opens_the_ssr() {
    let (hw, rig) = board(25.0);
    let q = RequestQueue::new();
    let mut cl = ControlLoop::new(OvenConfig::default(), hw, LogEventSink::new(), &q).unwrap();
    q.request_start(profile());
    for _ in 0..20 {
        cl.tick();
    }
    for probe in &rig.probes {
        probe.fail.set(true);
    }
    let threshold = cl.config().limits.max_consecutive_faults;
    let mut snap = cl.tick();
    for _ in 1..threshold {
        snap = cl.tick();
    }
    assert_eq!(snap.status, RunStatus::Aborted(AbortReason::NoSensor));
    assert_eq!(snap.outputs.heater, 0);
    assert!(!rig.heater_pin.0.get());
}

#[test]
fn into_parts_leaves_outputs_off() {
    let (hw, rig) = board(25.0);
    let q = RequestQueue::new();
    let mut cl = ControlLoop::new(OvenConfig::default(), hw, LogEventSink::new(), &q).unwrap();
    q.request_start(profile());
    for _ in 0..10 {
        cl.tick();
    }
    let (hw, _events) = cl.into_parts();
    assert_eq!(hw.duties(), (0, 0, 0));
    assert_eq!(rig.fan_pwm.0.get(), 0);
    assert!(!rig.heater_pin.0.get());
}

#[test]
fn case_fan_and_panel_driven_through_the_loop() {
    let (hw, _rig) = board(25.0);
    let case_fan = FakePwm::default();
    let heater_led = FakePin::default();
    let buzzer = FakePin::default();
    let hw = hw
        .with_case_fan(PwmOutput::new(case_fan.clone(), "case fan"))
        .with_panel(Panel::new(heater_led.clone(), FakePin::default(), buzzer.clone()));
    let q = RequestQueue::new();
    let mut cl = ControlLoop::new(OvenConfig::default(), hw, LogEventSink::new(), &q).unwrap();
    q.request_start(profile());
    for _ in 0..12 {
        cl.tick();
    }
    let duty = cl.config().fans.case_fan_duty;
    assert_eq!(case_fan.0.get(), u16::from(duty) * 10);
    assert_eq!(cl.hardware().case_fan_duty(), duty);
    assert!(heater_led.0.get());
    assert!(!buzzer.0.get());

    q.request_abort(AbortReason::UserRequest);
    cl.tick();
    assert!(!heater_led.0.get());
    // The tone starts on the tick after the run ends.
    cl.tick();
    assert!(buzzer.0.get());
    assert!(cl.hardware().panel().is_sounding());
}
