//! Importance gate (§4.4): scores an incoming message in [0,1] so the
//! hierarchical memory can decide whether it's worth admitting to semantic
//! (vector-store) memory.

use autonomy_core::message::{Message, Role};

const PERSONAL_INFO_KEYWORDS: &[&str] = &["my name is", "i live", "i work"];
const PREFERENCE_KEYWORDS: &[&str] = &["i like", "i love", "i prefer", "i hate", "i dislike"];
const FUTURE_INTENT_KEYWORDS: &[&str] = &["i will", "i'm going to", "i plan to", "tomorrow", "next week"];
const EMOTIONAL_KEYWORDS: &[&str] = &["i feel", "i'm sad", "i'm happy", "i'm angry", "i'm scared", "i'm excited"];
const CORRECTION_KEYWORDS: &[&str] = &["actually", "i meant", "correction", "that's wrong", "not what i"];

/// Compute an importance score in [0,1] for admission to semantic memory.
pub fn score(message: &Message) -> f32 {
    let lower = message.content.to_lowercase();
    let word_count = message.content.split_whitespace().count();

    let mut score = match message.role {
        Role::User => 0.5,
        Role::Assistant => 0.3,
        Role::System => 0.3,
    };

    if PERSONAL_INFO_KEYWORDS.iter().any(|k| lower.contains(k)) {
        score += 0.3;
    }
    if PREFERENCE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        score += 0.2;
    }
    if FUTURE_INTENT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        score += 0.2;
    }
    if EMOTIONAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
        score += 0.15;
    }
    if CORRECTION_KEYWORDS.iter().any(|k| lower.contains(k)) {
        score += 0.25;
    }
    if word_count > 30 {
        score += 0.1;
    }
    if word_count < 3 {
        score -= 0.2;
    }
    if message.content.contains('?') {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}
