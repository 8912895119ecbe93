//! Sentiment-keyword heuristic (SPEC_FULL §4): used when the Think stage's
//! `emotion` field is empty or unparseable, as a fallback input to the
//! emotion-update table consulted at orchestrator pipeline step 7.

const HAPPY: &[&str] = &["happy", "glad", "great", "awesome", "love", "yay", "thanks", "wonderful"];
const SAD: &[&str] = &["sad", "sorry to hear", "unfortunate", "miss you", "depressed", "down"];
const ANGRY: &[&str] = &["angry", "furious", "pissed", "hate", "stupid", "shut up", "screw you"];
const AFRAID: &[&str] = &["scared", "afraid", "worried", "anxious", "nervous"];
const CURIOUS: &[&str] = &["why", "how does", "what if", "curious", "wonder"];
const EXCITED: &[&str] = &["can't wait", "so excited", "amazing", "incredible", "let's go"];

/// Returns one of the orchestrator's known emotion labels, or `"neutral"`
/// if no keyword matches.
pub fn infer_emotion(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    if ANGRY.iter().any(|k| lower.contains(k)) {
        "angry"
    } else if AFRAID.iter().any(|k| lower.contains(k)) {
        "afraid"
    } else if SAD.iter().any(|k| lower.contains(k)) {
        "sad"
    } else if EXCITED.iter().any(|k| lower.contains(k)) {
        "excited"
    } else if HAPPY.iter().any(|k| lower.contains(k)) {
        "happy"
    } else if CURIOUS.iter().any(|k| lower.contains(k)) {
        "curious"
    } else {
        "neutral"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_anger_over_happiness_when_both_present() {
        assert_eq!(infer_emotion("I hate that, but thanks anyway"), "angry");
    }

    #[test]
    fn detects_happy() {
        assert_eq!(infer_emotion("this is awesome, I love it"), "happy");
    }

    #[test]
    fn falls_back_to_neutral() {
        assert_eq!(infer_emotion("the sky is blue today"), "neutral");
    }

    #[test]
    fn detects_curiosity() {
        assert_eq!(infer_emotion("why does this happen?"), "curious");
    }
}
