//! Cognitive Core (§4.7): the two-stage Think → Speak LLM invocation, with
//! the robust JSON recovery pipeline for the Think stage's structured
//! output.

use std::collections::HashMap;

use autonomy_core::traits::{LlmClient, LlmMessage};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `{entity, relation, value}` — one item of `ThinkOutput.belief_updates`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BeliefUpdate {
    pub entity: String,
    pub relation: String,
    pub value: String,
}

/// Structured JSON produced by the Think stage (§3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThinkOutput {
    #[serde(default = "default_intent")]
    pub intent: String,
    #[serde(default = "default_emotion")]
    pub emotion: String,
    #[serde(default)]
    pub belief_updates: Vec<BeliefUpdate>,
    #[serde(default)]
    pub memory_queries: Vec<String>,
    #[serde(default)]
    pub needs_update: HashMap<String, f32>,
    #[serde(default)]
    pub action_request: Option<String>,
    #[serde(default)]
    pub speech_plan: String,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub reasoning_trace: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn default_intent() -> String {
    "text_response".to_string()
}
fn default_emotion() -> String {
    "neutral".to_string()
}
fn default_confidence() -> f32 {
    0.5
}

impl ThinkOutput {
    /// Think-stage exception fallback (§4.7 failure modes).
    pub fn error_fallback() -> Self {
        Self {
            intent: "error".to_string(),
            emotion: "confused".to_string(),
            belief_updates: Vec::new(),
            memory_queries: Vec::new(),
            needs_update: HashMap::new(),
            action_request: None,
            speech_plan: "apologize".to_string(),
            confidence: 0.0,
            reasoning_trace: String::new(),
            timestamp: Utc::now(),
        }
    }

    /// Final sanity fallback after every JSON repair stage has failed
    /// (§4.7 step 5).
    fn sanity_fallback(raw: &str) -> Self {
        Self {
            intent: "text_response".to_string(),
            emotion: "neutral".to_string(),
            belief_updates: Vec::new(),
            memory_queries: Vec::new(),
            needs_update: HashMap::new(),
            action_request: None,
            speech_plan: sanitize_fallback_text(raw),
            confidence: 0.3,
            reasoning_trace: String::new(),
            timestamp: Utc::now(),
        }
    }
}

fn sanitize_fallback_text(raw: &str) -> String {
    let url_re = Regex::new(r"https?://\S+").expect("static regex");
    let without_urls = url_re.replace_all(raw, "");
    without_urls.trim().chars().take(100).collect()
}

/// Run the staged recovery pipeline over raw Think-stage LLM output
/// (§4.7). Never fails: the final stage is a sanity fallback.
pub fn parse_think_output(raw: &str) -> ThinkOutput {
    let stripped = strip_fences(raw);
    let without_comments = strip_line_comments(&stripped);
    let candidate = extract_largest_brace_block(&without_comments).unwrap_or(without_comments.clone());

    if let Ok(parsed) = serde_json::from_str::<ThinkOutput>(&candidate) {
        return parsed;
    }

    let repaired = repair_json(&candidate);
    if let Ok(parsed) = serde_json::from_str::<ThinkOutput>(&repaired) {
        return parsed;
    }

    ThinkOutput::sanity_fallback(raw)
}

fn strip_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    let fence_re = Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("static regex");
    if let Some(caps) = fence_re.captures(trimmed) {
        caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_else(|| trimmed.to_string())
    } else {
        trimmed.to_string()
    }
}

fn strip_line_comments(text: &str) -> String {
    text.lines()
        .map(strip_trailing_comment)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_trailing_comment(line: &str) -> String {
    let mut in_string = false;
    let mut escape = false;
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            if c == '"' {
                in_string = true;
            } else if c == '#' {
                return chars[..i].iter().collect();
            } else if c == '/' && i + 1 < chars.len() && chars[i + 1] == '/' {
                return chars[..i].iter().collect();
            }
        }
        i += 1;
    }
    line.to_string()
}

fn extract_largest_brace_block(text: &str) -> Option<String> {
    let bytes: Vec<char> = text.chars().collect();
    let mut best: Option<(usize, usize)> = None;
    let mut stack = Vec::new();
    for (i, &c) in bytes.iter().enumerate() {
        if c == '{' {
            stack.push(i);
        } else if c == '}' {
            if let Some(start) = stack.pop() {
                if stack.is_empty() {
                    let len = i - start;
                    if best.map(|(s, e)| e - s < len).unwrap_or(true) {
                        best = Some((start, i));
                    }
                }
            }
        }
    }
    best.map(|(s, e)| bytes[s..=e].iter().collect())
}

/// Deterministic repair pass (§4.7 step 4): missing commas between
/// adjacent value lines, trailing commas before closers, and unbalanced
/// opening braces/brackets.
fn repair_json(candidate: &str) -> String {
    let missing_comma_re =
        Regex::new(r#"(?m)("(?:[^"\\]|\\.)*"|true|false|null|-?\d+(?:\.\d+)?)\s*\n\s*(")"#)
            .expect("static regex");
    let with_commas = missing_comma_re.replace_all(candidate, "$1,\n$2").to_string();

    let trailing_comma_re = Regex::new(r",\s*([}\]])").expect("static regex");
    let without_trailing = trailing_comma_re.replace_all(&with_commas, "$1").to_string();

    balance_braces(&without_trailing)
}

fn balance_braces(text: &str) -> String {
    let mut brace_depth: i64 = 0;
    let mut bracket_depth: i64 = 0;
    let mut in_string = false;
    let mut escape = false;
    for c in text.chars() {
        if in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => brace_depth += 1,
            '}' => brace_depth -= 1,
            '[' => bracket_depth += 1,
            ']' => bracket_depth -= 1,
            _ => {}
        }
    }
    let mut result = text.to_string();
    for _ in 0..bracket_depth.max(0) {
        result.push(']');
    }
    for _ in 0..brace_depth.max(0) {
        result.push('}');
    }
    result
}

/// Invoke the Think stage (§4.7): low temperature, JSON-mode request.
/// Never returns `Err` — LLM failures become the documented error
/// fallback, matching the failure model of §7 (no exception crosses a
/// public API method).
pub async fn think(
    llm: &dyn LlmClient,
    system_prompt: &str,
    user_input: &str,
    max_tokens: u32,
) -> ThinkOutput {
    let messages = vec![
        LlmMessage::system(system_prompt),
        LlmMessage::user(user_input),
    ];
    match llm.generate(&messages, 0.3, max_tokens, None, true).await {
        Ok(raw) => parse_think_output(&raw),
        Err(e) => {
            tracing::error!(error = %e, "think stage failed");
            ThinkOutput::error_fallback()
        }
    }
}

/// Invoke the Speak stage (§4.7). On failure, returns the safe
/// placeholder `"..."` so downstream still produces output.
pub async fn speak(
    llm: &dyn LlmClient,
    system_prompt: &str,
    history: &[LlmMessage],
    user_input: &str,
    persona_anchor: &str,
    temperature: f32,
    max_tokens: u32,
    stop_tokens: &[String],
) -> String {
    let mut messages = vec![LlmMessage::system(system_prompt)];
    messages.extend(history.iter().cloned());
    messages.push(LlmMessage::user(user_input));
    messages.push(LlmMessage::system(persona_anchor));

    match llm
        .generate(&messages, temperature, max_tokens, Some(stop_tokens), false)
        .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "speak stage failed");
            "...".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_json_parses_as_a_no_op() {
        let raw = r#"{"intent":"text_response","emotion":"happy","belief_updates":[],"memory_queries":[],"needs_update":{},"action_request":null,"speech_plan":"say hi","confidence":0.9,"reasoning_trace":"","timestamp":"2024-01-01T00:00:00Z"}"#;
        let parsed = parse_think_output(raw);
        assert_eq!(parsed.intent, "text_response");
        assert_eq!(parsed.speech_plan, "say hi");
    }

    #[test]
    fn fenced_block_is_stripped_before_parsing() {
        let raw = "```json\n{\"intent\":\"chat\",\"speech_plan\":\"hello\",\"confidence\":0.7}\n```";
        let parsed = parse_think_output(raw);
        assert_eq!(parsed.intent, "chat");
        assert_eq!(parsed.speech_plan, "hello");
    }

    #[test]
    fn trailing_comment_is_stripped() {
        let raw = r#"{"intent":"chat", // inline note
"speech_plan":"hi there", "confidence":0.5}"#;
        let parsed = parse_think_output(raw);
        assert_eq!(parsed.intent, "chat");
    }

    #[test]
    fn truncated_brace_is_repaired() {
        let raw = r#"{"intent":"chat","speech_plan":"hi there","confidence":0.5"#;
        let parsed = parse_think_output(raw);
        assert_eq!(parsed.intent, "chat");
        assert_eq!(parsed.speech_plan, "hi there");
    }

    #[test]
    fn trailing_comma_is_repaired() {
        let raw = r#"{"intent":"chat","speech_plan":"hi there","confidence":0.5,}"#;
        let parsed = parse_think_output(raw);
        assert_eq!(parsed.intent, "chat");
    }

    #[test]
    fn irrecoverable_garbage_yields_sanity_fallback() {
        let raw = "this is not json at all, visit http://example.com/x for more";
        let parsed = parse_think_output(raw);
        assert_eq!(parsed.intent, "text_response");
        assert_eq!(parsed.emotion, "neutral");
        assert!((parsed.confidence - 0.3).abs() < 1e-6);
        assert!(!parsed.speech_plan.contains("http"));
        assert!(parsed.speech_plan.chars().count() <= 100);
    }

    #[test]
    fn error_fallback_has_expected_shape() {
        let fb = ThinkOutput::error_fallback();
        assert_eq!(fb.intent, "error");
        assert_eq!(fb.emotion, "confused");
        assert_eq!(fb.speech_plan, "apologize");
        assert_eq!(fb.confidence, 0.0);
    }
}
