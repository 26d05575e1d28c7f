//! Fuzz target: `max31855::decode` followed by linearisation.
//!
//! Any 32-bit frame must decode to a fault or to a finite sample whose
//! compensation either yields a finite temperature or is rejected.
//!
//! cargo fuzz run fuzz_max31855_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use smtoven::drivers::max31855;
use smtoven::sensors::thermocouple;

fuzz_target!(|data: &[u8]| {
    for chunk in data.chunks_exact(4) {
        let frame = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if let Ok(sample) = max31855::decode(frame) {
            assert!(sample.thermocouple_uv.is_finite());
            assert!(sample.cold_junction_c.is_finite());
            if let Some(t) = thermocouple::compensate(sample) {
                assert!(t.is_finite(), "frame {frame:#010x} linearised to {t}");
            }
        }
    }
});
