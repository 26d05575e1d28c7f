//! Integration tests for the requests → ControlLoop → actuators pipeline.
//!
//! These run on the host and drive the real loop against `MockHardware`,
//! asserting on the actuator call history and the emitted events.

use crate::mock_hw::{ActuatorCall, EventLog, MockHardware};

use smtoven::app::events::{AppEvent, RunOutcome};
use smtoven::app::ports::{Alarm, Indicators};
use smtoven::config::{OvenConfig, PidGains};
use smtoven::error::{AbortReason, ProfileError, SensorFault, StartError};
use smtoven::profile::{Phase, ProfileDefinition, RunStatus};
use smtoven::sensors::ChannelStatus;
use smtoven::{ControlLoop, RequestQueue};

fn ramp_profile() -> ProfileDefinition {
    ProfileDefinition::new("ramp")
        .with_phase(Phase::ramp_to("preheat", 150.0, 1.0))
        .unwrap()
}

/// Default config with a slew bound wide enough for step changes.
fn fast_sensors() -> OvenConfig {
    let mut cfg = OvenConfig::default();
    cfg.sensor.max_slew_c_per_sec = 2000.0;
    cfg
}

fn make_loop(q: &RequestQueue, cfg: OvenConfig, t: f32) -> ControlLoop<'_, MockHardware, EventLog> {
    let channels = cfg.channels.len();
    ControlLoop::new(cfg, MockHardware::new(channels, t), EventLog::new(), q).unwrap()
}

// ── Output writes ────────────────────────────────────────────

#[test]
fn construction_switches_everything_off() {
    let q = RequestQueue::new();
    let cl = make_loop(&q, OvenConfig::default(), 25.0);
    assert_eq!(
        cl.hardware().calls,
        vec![
            ActuatorCall::Heater(0),
            ActuatorCall::Fan(0),
            ActuatorCall::Aux(0),
            ActuatorCall::CaseFan(0),
            ActuatorCall::Indicators(Indicators::default()),
        ]
    );
}

#[test]
fn every_output_written_once_per_tick() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ramp_profile());
    for _ in 0..10 {
        cl.tick();
    }
    // Five writes at construction, five per tick.
    assert_eq!(cl.hardware().calls.len(), 5 + 5 * 10);
    assert_eq!(cl.hardware().heater_writes(), 1 + 10);
}

#[test]
fn powered_ramp_drives_heater_and_convection_fan() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ramp_profile());
    for _ in 0..12 {
        cl.tick();
    }
    let hw = cl.hardware();
    assert!(hw.heater().unwrap() > 0, "heater should follow the ramp");
    assert_eq!(hw.fan(), Some(cl.config().fans.convection_duty));
    assert_eq!(hw.aux(), Some(cl.config().fans.aux_duty_running));
}

#[test]
fn unpowered_ramp_down_runs_cooling_fan_only() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 200.0);
    let profile = ProfileDefinition::new("cool")
        .with_phase(Phase::ramp_down("cool", 50.0, 3.0, false))
        .unwrap();
    q.request_start(profile);
    for _ in 0..4 {
        cl.tick();
    }
    assert_eq!(cl.hardware().heater(), Some(0));
    assert_eq!(cl.hardware().fan(), Some(cl.config().fans.cooling_duty));
}

#[test]
fn fan_keeps_cooling_after_abort_until_oven_is_cool() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, fast_sensors(), 200.0);
    q.request_start(ramp_profile());
    cl.tick();
    q.request_abort(AbortReason::UserRequest);
    let snap = cl.tick();
    assert_eq!(snap.status, RunStatus::Aborted(AbortReason::UserRequest));
    assert_eq!(snap.outputs.heater, 0);
    assert_eq!(snap.outputs.fan, cl.config().fans.cooling_duty);

    cl.hardware_mut().set_all(40.0);
    let snap = cl.tick();
    assert_eq!(snap.outputs.fan, 0);
}

// ── Start handling ───────────────────────────────────────────

#[test]
fn start_without_measurement_is_rejected() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    cl.hardware_mut().fail_all(SensorFault::OpenCircuit);
    q.request_start(ramp_profile());
    let snap = cl.tick();
    assert_eq!(snap.status, RunStatus::Idle);
    assert_eq!(
        cl.events().events,
        vec![AppEvent::StartRejected(StartError::NoMeasurement)]
    );
    assert_eq!(snap.outputs.heater, 0);
}

#[test]
fn malformed_profile_is_rejected() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ProfileDefinition::new("empty"));
    assert_eq!(cl.tick().status, RunStatus::Idle);
    assert_eq!(
        cl.events().events,
        vec![AppEvent::StartRejected(StartError::Profile(ProfileError::Empty))]
    );
}

#[test]
fn start_while_running_is_rejected_and_run_continues() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ramp_profile());
    cl.tick();
    q.request_start(ramp_profile());
    let snap = cl.tick();
    assert!(snap.status.is_running());
    assert_eq!(cl.run_state().elapsed_ms, 250);
    assert_eq!(
        cl.events()
            .count(|e| *e == AppEvent::StartRejected(StartError::AlreadyRunning)),
        1
    );
}

#[test]
fn profile_gains_override_oven_gains() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    let gains = PidGains {
        kp: 7.5,
        ..PidGains::default()
    };
    q.request_start(ramp_profile().with_gains(gains));
    cl.tick();
    assert_eq!(*cl.pid().gains(), gains);
}

// ── Events ───────────────────────────────────────────────────

#[test]
fn progress_reported_at_interval() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ramp_profile());
    // Start tick at 0 ms, then 250 ms steps up to 2250 ms.
    for _ in 0..10 {
        cl.tick();
    }
    let elapsed: Vec<u64> = cl
        .events()
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Progress(p) => Some(p.elapsed_ms),
            _ => None,
        })
        .collect();
    assert_eq!(elapsed, vec![0, 1000, 2000]);
}

#[test]
fn terminal_reported_exactly_once() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ramp_profile());
    cl.tick();
    q.request_abort(AbortReason::UserRequest);
    for _ in 0..5 {
        cl.tick();
    }
    q.request_abort(AbortReason::PhaseTimeout);
    cl.tick();
    assert_eq!(
        cl.events().count(|e| matches!(e, AppEvent::Terminal(_))),
        1
    );
    assert!(
        cl.events()
            .events
            .contains(&AppEvent::Terminal(RunOutcome::Aborted(AbortReason::UserRequest)))
    );
}

#[test]
fn first_phase_change_reported_on_start() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ramp_profile());
    cl.tick();
    let changes = cl
        .events()
        .count(|e| matches!(e, AppEvent::PhaseChanged { phase_index: 0, .. }));
    assert_eq!(changes, 1);
}

// ── Channel faults ───────────────────────────────────────────

#[test]
fn faulted_channel_latches_until_acknowledged() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    cl.hardware_mut().set(0, Err(SensorFault::ShortToGround));
    for _ in 0..3 {
        cl.tick();
    }
    assert_eq!(
        cl.events().count(|e| matches!(
            e,
            AppEvent::ChannelFaulted {
                channel: 0,
                fault: SensorFault::ShortToGround
            }
        )),
        1
    );
    assert_eq!(cl.reader().channel(0).unwrap().status, ChannelStatus::Faulted);

    // Repaired but still latched.
    cl.hardware_mut().set(0, Ok(25.0));
    cl.tick();
    assert_eq!(cl.reader().channel(0).unwrap().status, ChannelStatus::Faulted);

    q.request_acknowledge_fault(0).unwrap();
    cl.tick();
    assert_eq!(cl.reader().channel(0).unwrap().status, ChannelStatus::Enabled);
    assert_eq!(
        cl.events()
            .count(|e| *e == AppEvent::ChannelRearmed { channel: 0 }),
        1
    );
}

#[test]
fn faulted_channel_is_not_read() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    cl.hardware_mut().set(1, Err(SensorFault::NoResponse));
    for _ in 0..3 {
        cl.tick();
    }
    let before = cl.hardware().reads;
    cl.tick();
    assert_eq!(cl.hardware().reads - before, 1);
}

// ── Enclosure, panel and buzzer ──────────────────────────────

#[test]
fn hot_enclosure_aborts_the_run() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    q.request_start(ramp_profile());
    for _ in 0..4 {
        cl.tick();
    }
    let limit = cl.config().limits.max_enclosure_c;
    cl.hardware_mut().enclosure = Some(limit + 1.0);
    let snap = cl.tick();
    assert_eq!(
        snap.status,
        RunStatus::Aborted(AbortReason::EnclosureOverTemperature)
    );
    assert_eq!(snap.outputs.heater, 0);
    assert_eq!(snap.outputs.case_fan, cl.config().fans.case_fan_duty);
    assert_eq!(cl.hardware().alarms, vec![Alarm::Aborted]);
}

#[test]
fn case_fan_runs_during_a_run_and_while_the_enclosure_is_warm() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    let fans = cl.config().fans;
    cl.tick();
    assert_eq!(cl.hardware().case_fan(), Some(0));

    cl.hardware_mut().enclosure = Some(fans.case_fan_above_c + 1.0);
    cl.tick();
    assert_eq!(cl.hardware().case_fan(), Some(fans.case_fan_duty));

    cl.hardware_mut().enclosure = Some(fans.case_fan_above_c - 5.0);
    cl.tick();
    assert_eq!(cl.hardware().case_fan(), Some(0));

    q.request_start(ramp_profile());
    cl.tick();
    assert_eq!(cl.hardware().case_fan(), Some(fans.case_fan_duty));
}

#[test]
fn indicators_follow_heater_and_fan() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    cl.tick();
    assert_eq!(cl.hardware().indicators(), Some(Indicators::default()));

    q.request_start(ramp_profile());
    for _ in 0..12 {
        cl.tick();
    }
    assert_eq!(
        cl.hardware().indicators(),
        Some(Indicators {
            heater: true,
            fan: true
        })
    );
}

#[test]
fn alarm_sounds_once_when_a_run_completes() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 148.0);
    let short = ProfileDefinition::new("short")
        .with_phase(Phase::ramp_to("ramp", 150.0, 2.0))
        .unwrap();
    q.request_start(short);
    let mut snap = cl.tick();
    for _ in 0..40 {
        if !snap.status.is_running() {
            break;
        }
        snap = cl.tick();
    }
    assert_eq!(snap.status, RunStatus::Completed);
    for _ in 0..5 {
        cl.tick();
    }
    assert_eq!(cl.hardware().alarms, vec![Alarm::Complete]);
}

// ── Configuration ────────────────────────────────────────────

#[test]
fn replace_config_while_idle_resizes_channels() {
    let q = RequestQueue::new();
    let mut cl = make_loop(&q, OvenConfig::default(), 25.0);
    let mut cfg = OvenConfig::default();
    cfg.channels.truncate(1);
    cl.replace_config(cfg).unwrap();
    assert_eq!(cl.reader().channels().len(), 1);
}
