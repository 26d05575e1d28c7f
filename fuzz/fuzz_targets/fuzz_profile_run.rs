//! Fuzz target: arbitrary profile executed against arbitrary readings.
//!
//! Input layout: one byte phase count, four bytes per phase
//! (kind, target, rate, duration), then one byte per tick of measured
//! temperature (0xFF = no measurement).  Whatever validation accepts must
//! run without panicking, never move backwards through its phases and
//! never leave a terminal state.
//!
//! cargo fuzz run fuzz_profile_run

#![no_main]

use libfuzzer_sys::fuzz_target;
use smtoven::config::OvenConfig;
use smtoven::profile::{Phase, ProfileDefinition, ProfileRunner, RunStatus};

fn phase(bytes: &[u8]) -> Phase {
    let target = f32::from(bytes[1]) * 1.2;
    let rate = f32::from(bytes[2]) / 32.0;
    let duration = u32::from(bytes[3]) * 2;
    match bytes[0] % 4 {
        0 => Phase::ramp_to("ramp", target, rate),
        1 => Phase::hold("hold", target, duration),
        2 => Phase::ramp_down("cool", target, rate, false),
        _ => Phase::ramp_down("cool", target, rate, true),
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&count, rest)) = data.split_first() else {
        return;
    };
    let count = usize::from(count % 16);
    if rest.len() < count * 4 {
        return;
    }
    let (phase_bytes, readings) = rest.split_at(count * 4);

    let mut profile = ProfileDefinition::new("fuzz");
    for bytes in phase_bytes.chunks_exact(4) {
        if profile.push(phase(bytes)).is_err() {
            break;
        }
    }

    let cfg = OvenConfig::default();
    let mut runner = ProfileRunner::new(&cfg);
    if runner.start(profile, Some(25.0), &cfg.limits).is_err() {
        assert!(!runner.is_running());
        return;
    }

    let mut last_index = 0;
    let mut terminal = None;
    for &b in readings {
        let measured = (b != 0xFF).then(|| f32::from(b) * 1.2);
        let status = runner.tick(measured);
        if let Some(t) = terminal {
            assert_eq!(status, t);
            continue;
        }
        match status {
            RunStatus::Running { phase_index } => {
                assert!(phase_index >= last_index);
                last_index = phase_index;
            }
            RunStatus::Completed | RunStatus::Aborted(_) => terminal = Some(status),
            RunStatus::Idle => panic!("runner fell back to Idle"),
        }
    }
});
