//! PAD (Pleasure-Arousal-Dominance) emotional state and the grudge latch.
//!
//! This module only carries the data shape and its invariants (clamping,
//! NaN-safe deserialization). The update algorithm — inertia, decay, grudge
//! dampening — lives in `autonomy_limbic::emotion`, which owns the PAD
//! vector at runtime.

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize};

/// Replace non-finite floats with a fallback instead of erroring.
///
/// LLM-adjacent state occasionally round-trips through JSON written by
/// other processes; a stray `NaN` must degrade, not panic the deserializer.
pub fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

pub fn deserialize_safe_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer).map_err(DeError::custom)?;
    let v = raw as f32;
    Ok(sanitize_f32(v, 0.0))
}

/// Three real numbers in [-1, 1]: pleasure, arousal, dominance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pad {
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub pleasure: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub arousal: f32,
    #[serde(deserialize_with = "deserialize_safe_f32")]
    pub dominance: f32,
}

impl Default for Pad {
    fn default() -> Self {
        Self {
            pleasure: 0.0,
            arousal: 0.0,
            dominance: 0.0,
        }
    }
}

impl Pad {
    pub fn new(pleasure: f32, arousal: f32, dominance: f32) -> Self {
        Self {
            pleasure: pleasure.clamp(-1.0, 1.0),
            arousal: arousal.clamp(-1.0, 1.0),
            dominance: dominance.clamp(-1.0, 1.0),
        }
    }

    pub fn clamp(&mut self) {
        self.pleasure = self.pleasure.clamp(-1.0, 1.0);
        self.arousal = self.arousal.clamp(-1.0, 1.0);
        self.dominance = self.dominance.clamp(-1.0, 1.0);
    }

    pub fn is_in_bounds(&self) -> bool {
        (-1.0..=1.0).contains(&self.pleasure)
            && (-1.0..=1.0).contains(&self.arousal)
            && (-1.0..=1.0).contains(&self.dominance)
    }
}

/// A signed delta applied to a `Pad` by a stimulus.
#[derive(Debug, Clone, Copy, Default)]
pub struct PadDelta {
    pub pleasure: f32,
    pub arousal: f32,
    pub dominance: f32,
}

impl PadDelta {
    pub fn new(pleasure: f32, arousal: f32, dominance: f32) -> Self {
        Self {
            pleasure,
            arousal,
            dominance,
        }
    }
}

/// Persistent emotional-mode flag: low pleasure + high dominance latches a
/// "cold, defensive" mood until an apology, a mood recovery, or a timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrudgeState {
    pub active: bool,
    pub trigger_reason: String,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for GrudgeState {
    fn default() -> Self {
        Self {
            active: false,
            trigger_reason: String::new(),
            started_at: None,
        }
    }
}

const APOLOGY_TOKENS: &[&str] = &["sorry", "apology", "apologize", "my bad", "forgive"];

impl GrudgeState {
    pub fn trigger(&mut self, reason: impl Into<String>, now: chrono::DateTime<chrono::Utc>) {
        self.active = true;
        self.trigger_reason = reason.into();
        self.started_at = Some(now);
    }

    pub fn clear(&mut self) {
        self.active = false;
        self.trigger_reason.clear();
        self.started_at = None;
    }

    /// Whether the reason text contains an apology token (case-insensitive).
    pub fn is_apology(text: &str) -> bool {
        let lower = text.to_lowercase();
        APOLOGY_TOKENS.iter().any(|tok| lower.contains(tok))
    }
}
