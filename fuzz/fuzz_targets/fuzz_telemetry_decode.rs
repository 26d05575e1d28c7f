//! Fuzz target: `TelemetryRecord::decode`
//!
//! A host reading the serial stream sees arbitrary bytes after a glitch;
//! decoding must never panic, and anything it accepts must re-encode.
//!
//! cargo fuzz run fuzz_telemetry_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use smtoven::adapters::serial_sink::TelemetryRecord;

fuzz_target!(|data: &[u8]| {
    let mut frame = data.to_vec();
    if let Some(record) = TelemetryRecord::decode(&mut frame) {
        let _ = record.encode();
    }
});
