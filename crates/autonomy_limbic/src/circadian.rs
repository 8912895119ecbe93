//! Deterministic wall-clock-hour function returning small PAD deltas and a
//! proactivity multiplier, consulted by the Emotion Service and the BDI
//! engine (§4.2).

use autonomy_core::affect::PadDelta;
use chrono::Timelike;

/// A coarse circadian phase label, used by the Speak stage for ambient
/// time-of-day awareness. Not part of the PAD calculation itself.
pub fn phase_label(hour: u32) -> &'static str {
    match hour {
        0..=4 => "late_night",
        5..=7 => "early_morning",
        8..=11 => "morning",
        12..=13 => "midday",
        14..=17 => "afternoon",
        18..=21 => "evening",
        _ => "night",
    }
}

/// Small ambient PAD nudge for the hour of day: slightly lower arousal at
/// night, slightly higher during the day.
pub fn pad_delta_for_hour(hour: u32) -> PadDelta {
    match hour {
        0..=4 => PadDelta::new(-0.02, -0.05, -0.02),
        5..=7 => PadDelta::new(0.0, -0.02, 0.0),
        8..=11 => PadDelta::new(0.01, 0.02, 0.01),
        12..=17 => PadDelta::new(0.0, 0.01, 0.0),
        18..=21 => PadDelta::new(0.01, 0.0, 0.0),
        _ => PadDelta::new(-0.01, -0.03, -0.01),
    }
}

/// Proactivity multiplier in [0.1, 1.0]: how willing the BDI engine should
/// be to initiate conversation at this hour.
pub fn proactivity_modifier(hour: u32) -> f32 {
    match hour {
        0..=4 => 0.1,
        5..=7 => 0.4,
        8..=11 => 1.0,
        12..=17 => 0.9,
        18..=21 => 1.0,
        _ => 0.3,
    }
}

/// Convenience wrapper over the current wall-clock hour.
pub fn current_pad_delta(now: chrono::DateTime<chrono::Local>) -> PadDelta {
    pad_delta_for_hour(now.hour())
}

pub fn current_proactivity(now: chrono::DateTime<chrono::Local>) -> f32 {
    proactivity_modifier(now.hour())
}

pub fn current_phase_label(now: chrono::DateTime<chrono::Local>) -> &'static str {
    phase_label(now.hour())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proactivity_is_within_bounds_for_every_hour() {
        for h in 0..24 {
            let m = proactivity_modifier(h);
            assert!((0.1..=1.0).contains(&m), "hour {h} produced {m}");
        }
    }

    #[test]
    fn phase_label_covers_all_hours() {
        for h in 0..24 {
            assert!(!phase_label(h).is_empty());
        }
    }

    #[test]
    fn late_night_has_lowest_proactivity() {
        assert!(proactivity_modifier(2) < proactivity_modifier(9));
    }
}
