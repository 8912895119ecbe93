//! Fixed emotion-label → PAD-delta table consulted at orchestrator
//! pipeline step 7 (§4.9). `think_output.emotion` (or the sentiment
//! fallback of `sentiment::infer_emotion`) is mapped through this table;
//! unknown labels map to a neutral (zero) delta.

use autonomy_core::affect::PadDelta;

pub fn emotion_to_delta(label: &str) -> PadDelta {
    match label.to_lowercase().as_str() {
        "happy" => PadDelta::new(0.3, 0.2, 0.1),
        "excited" => PadDelta::new(0.4, 0.5, 0.2),
        "sad" => PadDelta::new(-0.3, -0.1, -0.2),
        "angry" => PadDelta::new(-0.4, 0.3, 0.4),
        "afraid" => PadDelta::new(-0.3, 0.4, -0.4),
        "curious" => PadDelta::new(0.1, 0.2, 0.1),
        "confused" => PadDelta::new(-0.1, 0.1, -0.2),
        "neutral" => PadDelta::new(0.0, 0.0, 0.0),
        _ => PadDelta::new(0.0, 0.0, 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_maps_to_positive_pleasure() {
        let delta = emotion_to_delta("happy");
        assert!(delta.pleasure > 0.0);
    }

    #[test]
    fn angry_maps_to_negative_pleasure_and_positive_dominance() {
        let delta = emotion_to_delta("angry");
        assert!(delta.pleasure < 0.0);
        assert!(delta.dominance > 0.0);
    }

    #[test]
    fn unknown_label_is_neutral() {
        let delta = emotion_to_delta("bewildered_nonsense");
        assert_eq!(delta.pleasure, 0.0);
        assert_eq!(delta.arousal, 0.0);
        assert_eq!(delta.dominance, 0.0);
    }
}
