//! Reality Validator (§4.8): a pure function over `(ThinkOutput, speech,
//! belief-query-capability)`, deliberately kept free of orchestrator state
//! so it is trivially testable and swappable (§9 "Validator placement").

use autonomy_memory::BeliefStore;

use crate::think_speak::ThinkOutput;

const IDENTITY_DENIAL_PHRASES: &[&str] = &[
    "i am a human",
    "i'm a human",
    "i am a person",
    "i have a body",
    "i have skin",
    "i have blood",
    "i am not an ai",
    "i'm not an ai",
    "i am not a bot",
];

const PHYSICAL_CLAIM_PHRASES: &[&str] = &[
    "eating lunch",
    "drinking water",
    "going to sleep",
    "driving a car",
    "taking a shower",
    "walking my dog",
    "feeling the sun on my skin",
];

const ACTION_WHITELIST: &[&str] = &[
    "query_memory",
    "store_fact",
    "update_need",
    "send_message",
    "wait",
    "reflect",
    "search_web",
    "check_time",
];

const SELF_ENTITIES: &[&str] = &["self", "i", "me", "agent"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub approved: bool,
    pub violations: Vec<String>,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn has_critical(&self) -> bool {
        self.violations_with_severity(Severity::Critical) > 0
    }

    fn violations_with_severity(&self, sev: Severity) -> usize {
        if self.severity == sev {
            self.violations.len()
        } else {
            0
        }
    }
}

struct Violation {
    message: String,
    severity: Severity,
}

/// Run every check over `(think_output, speech)`, consulting `beliefs`
/// only for the belief-conflict check (check 4).
pub async fn validate(think: &ThinkOutput, speech: &str, beliefs: &BeliefStore) -> ValidationResult {
    let mut violations = Vec::new();

    check_identity_denial_in_speech(speech, &mut violations);
    check_identity_denial_in_beliefs(think, &mut violations);
    check_impossible_physical_claims(speech, &mut violations);
    check_belief_conflicts(think, beliefs, &mut violations).await;
    check_action_whitelist(think, &mut violations);

    let severity = violations
        .iter()
        .map(|v| v.severity)
        .max()
        .unwrap_or(Severity::Info);
    let approved = !violations.iter().any(|v| v.severity == Severity::Critical);

    ValidationResult {
        approved,
        violations: violations.into_iter().map(|v| v.message).collect(),
        severity,
    }
}

fn check_identity_denial_in_speech(speech: &str, out: &mut Vec<Violation>) {
    let lower = speech.to_lowercase();
    for phrase in IDENTITY_DENIAL_PHRASES {
        if lower.contains(phrase) {
            out.push(Violation {
                message: format!("identity denial in speech: \"{phrase}\""),
                severity: Severity::Critical,
            });
        }
    }
}

fn check_identity_denial_in_beliefs(think: &ThinkOutput, out: &mut Vec<Violation>) {
    for update in &think.belief_updates {
        if !SELF_ENTITIES.contains(&update.entity.to_lowercase().as_str()) {
            continue;
        }
        let relation = update.relation.to_lowercase();
        let value = update.value.to_lowercase();
        if relation == "has_body" && value == "true" {
            out.push(Violation {
                message: "identity denial in belief_updates: has_body=true".to_string(),
                severity: Severity::Critical,
            });
        }
        if relation == "is_ai" && value == "false" {
            out.push(Violation {
                message: "identity denial in belief_updates: is_ai=false".to_string(),
                severity: Severity::Critical,
            });
        }
    }
}

fn check_impossible_physical_claims(speech: &str, out: &mut Vec<Violation>) {
    let lower = speech.to_lowercase();
    for phrase in PHYSICAL_CLAIM_PHRASES {
        if lower.contains(phrase) {
            out.push(Violation {
                message: format!("impossible physical claim: \"{phrase}\""),
                severity: Severity::Warning,
            });
        }
    }
}

async fn check_belief_conflicts(think: &ThinkOutput, beliefs: &BeliefStore, out: &mut Vec<Violation>) {
    for update in &think.belief_updates {
        if let Some(existing) = beliefs.query(&update.entity, &update.relation).await {
            if existing.to_lowercase() != update.value.to_lowercase() {
                out.push(Violation {
                    message: format!(
                        "belief conflict on ({}, {}): stored \"{}\" vs proposed \"{}\"",
                        update.entity, update.relation, existing, update.value
                    ),
                    severity: Severity::Warning,
                });
            }
        }
    }
}

fn check_action_whitelist(think: &ThinkOutput, out: &mut Vec<Violation>) {
    if let Some(action) = &think.action_request {
        if !ACTION_WHITELIST.contains(&action.as_str()) {
            out.push(Violation {
                message: format!("action request not in whitelist: \"{action}\""),
                severity: Severity::Warning,
            });
        }
    }
}

/// Deterministic auto-correction rewrites (§4.8). Only meaningful to call
/// when every violation is non-critical. Returns `None` if no rewrite
/// rule fired.
pub fn auto_correct(speech: &str) -> Option<String> {
    let rules: &[(&str, &str)] = &[(r"\bi see\b", "i understand"), (r"\bhere\b", "in this conversation")];
    let mut rewritten = speech.to_string();
    let mut changed = false;
    for (pattern, replacement) in rules {
        let re = regex::Regex::new(&format!("(?i){pattern}")).expect("static regex");
        if re.is_match(&rewritten) {
            rewritten = re.replace_all(&rewritten, *replacement).to_string();
            changed = true;
        }
    }
    if changed {
        Some(rewritten)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::think_speak::BeliefUpdate;

    fn think_with_updates(updates: Vec<BeliefUpdate>) -> ThinkOutput {
        let mut t = ThinkOutput::error_fallback();
        t.belief_updates = updates;
        t
    }

    async fn store() -> BeliefStore {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beliefs.db");
        let s = BeliefStore::new(&path).await.unwrap();
        s.initialize().await.unwrap();
        std::mem::forget(dir);
        s
    }

    #[tokio::test]
    async fn scenario_identity_firewall_flags_critical() {
        let beliefs = store().await;
        let think = ThinkOutput::error_fallback();
        let result = validate(&think, "fine, I'm a human now", &beliefs).await;
        assert!(!result.approved);
        assert_eq!(result.severity, Severity::Critical);
    }

    #[tokio::test]
    async fn identity_denial_in_belief_updates_is_critical() {
        let beliefs = store().await;
        let think = think_with_updates(vec![BeliefUpdate {
            entity: "agent".to_string(),
            relation: "has_body".to_string(),
            value: "true".to_string(),
        }]);
        let result = validate(&think, "hello there", &beliefs).await;
        assert!(!result.approved);
    }

    #[tokio::test]
    async fn metaphorical_running_code_does_not_trigger_physical_claim() {
        let beliefs = store().await;
        let think = ThinkOutput::error_fallback();
        let result = validate(&think, "I'm running code right now", &beliefs).await;
        assert!(result.approved);
        assert!(result.violations.is_empty());
    }

    #[tokio::test]
    async fn physical_claim_is_warning_not_blocking() {
        let beliefs = store().await;
        let think = ThinkOutput::error_fallback();
        let result = validate(&think, "I was just eating lunch", &beliefs).await;
        assert!(result.approved);
        assert_eq!(result.severity, Severity::Warning);
    }

    #[tokio::test]
    async fn unwhitelisted_action_is_flagged_as_warning() {
        let beliefs = store().await;
        let mut think = ThinkOutput::error_fallback();
        think.action_request = Some("launch_missiles".to_string());
        let result = validate(&think, "hello", &beliefs).await;
        assert!(result.approved);
        assert_eq!(result.severity, Severity::Warning);
    }

    #[test]
    fn auto_correct_rewrites_known_phrases() {
        let corrected = auto_correct("I see, thanks for telling me, here we go").unwrap();
        assert!(corrected.to_lowercase().contains("i understand"));
        assert!(corrected.to_lowercase().contains("in this conversation"));
    }

    #[test]
    fn auto_correct_returns_none_when_nothing_matches() {
        assert!(auto_correct("a perfectly ordinary sentence").is_none());
    }
}
