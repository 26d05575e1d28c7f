//! Built-in solder-paste profiles.
//!
//! Temperatures follow the paste vendors' recommended windows; the
//! cool-down phases are unpowered so only the fan brings the oven down.

use super::definition::{Phase, ProfileDefinition};

fn build(name: &str, phases: &[Phase]) -> ProfileDefinition {
    let mut profile = ProfileDefinition::new(name);
    for phase in phases {
        // Presets are well below the phase capacity.
        let _ = profile.push(phase.clone());
    }
    profile
}

/// Eutectic tin-lead paste, peak 220 °C.
pub fn sn63_pb37() -> ProfileDefinition {
    build(
        "Sn63/Pb37",
        &[
            Phase::ramp_to("preheat", 150.0, 1.5),
            Phase::ramp_to("soak", 180.0, 0.4),
            Phase::ramp_to("reflow", 220.0, 1.5),
            Phase::hold("peak", 220.0, 15),
            Phase::ramp_down("cool", 50.0, 3.0, false),
        ],
    )
}

/// Lead-free SAC305 paste, peak 245 °C.
pub fn sac305() -> ProfileDefinition {
    build(
        "SAC305",
        &[
            Phase::ramp_to("preheat", 150.0, 1.5),
            Phase::ramp_to("soak", 200.0, 0.5),
            Phase::ramp_to("reflow", 245.0, 1.5),
            Phase::hold("peak", 245.0, 15),
            Phase::ramp_down("cool", 50.0, 3.0, false),
        ],
    )
}

/// Low-temperature bismuth paste, peak 165 °C.
pub fn sn42_bi58() -> ProfileDefinition {
    build(
        "Sn42/Bi58",
        &[
            Phase::ramp_to("preheat", 90.0, 1.0),
            Phase::ramp_to("soak", 130.0, 0.5),
            Phase::ramp_to("reflow", 165.0, 1.0),
            Phase::hold("peak", 165.0, 20),
            Phase::ramp_down("cool", 50.0, 2.0, false),
        ],
    )
}

/// Every built-in profile.
pub fn all() -> [ProfileDefinition; 3] {
    [sn63_pb37(), sac305(), sn42_bi58()]
}

/// Look a preset up by name, ignoring ASCII case.
pub fn by_name(name: &str) -> Option<ProfileDefinition> {
    all()
        .into_iter()
        .find(|p| p.name.as_str().eq_ignore_ascii_case(name))
}
