//! Speech Governor (§4.10): segments a single model utterance into
//! chat-like bursts and paces their delivery through a `Transport`.

use std::time::Duration;

use autonomy_core::traits::Transport;
use rand::Rng;

const SPLIT_TOKEN: &str = "<SPLIT>";
const SENTENCE_ENDERS: &[char] = &['.', '!', '?', '~'];

#[derive(Debug, Clone)]
pub struct GovernorConfig {
    pub wpm: f32,
    pub min_delay_seconds: f32,
    pub variance: f32,
    pub max_chunk_len: usize,
    pub hard_limit: usize,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            wpm: 280.0,
            min_delay_seconds: 0.7,
            variance: 0.2,
            max_chunk_len: 400,
            hard_limit: 1900,
        }
    }
}

impl GovernorConfig {
    fn chars_per_second(&self) -> f32 {
        // Average English word length ~5 characters.
        self.wpm * 5.0 / 60.0
    }
}

pub struct SpeechGovernor {
    config: GovernorConfig,
}

impl SpeechGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self { config }
    }

    /// Segment `text` into chat-like chunks per the four-stage priority
    /// in §4.10. Never emits a `<SPLIT>` token to the transport (§9).
    pub fn segment(&self, text: &str) -> Vec<String> {
        if let Some(pieces) = split_on_token(text) {
            return pieces.into_iter().flat_map(|p| self.segment(&p)).collect();
        }

        if text.contains('\n') {
            return text
                .split('\n')
                .flat_map(|line| self.segment(line))
                .filter(|s| !s.is_empty())
                .collect();
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let packed = if trimmed.chars().count() > self.config.max_chunk_len {
            pack_sentences(trimmed, self.config.max_chunk_len)
        } else {
            vec![trimmed.to_string()]
        };

        packed
            .into_iter()
            .flat_map(|chunk| hard_chop(&chunk, self.config.hard_limit))
            .collect()
    }

    /// Delay model (§4.10). `is_first` applies the 30% "thinking time
    /// already elapsed" discount.
    pub fn compute_delay(&self, chunk: &str, is_first: bool) -> Duration {
        let len = chunk.chars().count() as f32;
        let base = len / self.config.chars_per_second();
        let jitter = base * self.config.variance * rand::thread_rng().gen_range(-0.5..0.5);
        let overhead = 0.2 + 0.002 * len;
        let delay = (base + jitter + overhead).max(self.config.min_delay_seconds);
        let scaled = if is_first { delay * 0.3 } else { delay };
        Duration::from_secs_f32(scaled.max(0.0))
    }

    fn micro_pause(&self) -> Duration {
        Duration::from_secs_f32(rand::thread_rng().gen_range(0.2..0.5))
    }

    /// Deliver `text` as a sequence of chunks through `transport`, pacing
    /// each by `compute_delay` and inserting inter-chunk micro-pauses.
    pub async fn deliver(&self, transport: &dyn Transport, channel_id: &str, text: &str) -> anyhow::Result<()> {
        let chunks = self.segment(text);
        for (i, chunk) in chunks.iter().enumerate() {
            let delay = self.compute_delay(chunk, i == 0);
            tokio::time::sleep(delay).await;
            transport.send_chunk(channel_id, chunk).await?;
            if i + 1 < chunks.len() {
                tokio::time::sleep(self.micro_pause()).await;
            }
        }
        Ok(())
    }
}

fn split_on_token(text: &str) -> Option<Vec<String>> {
    if text.contains(SPLIT_TOKEN) {
        Some(text.split(SPLIT_TOKEN).map(|s| s.to_string()).collect())
    } else {
        None
    }
}

/// Greedily pack sentence-ending-delimited fragments into chunks up to
/// `max_len` characters.
fn pack_sentences(text: &str, max_len: usize) -> Vec<String> {
    let sentences = split_sentences(text);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if current.is_empty() {
            current = sentence;
            continue;
        }
        if current.chars().count() + 1 + sentence.chars().count() <= max_len {
            current.push(' ');
            current.push_str(&sentence);
        } else {
            chunks.push(std::mem::take(&mut current));
            current = sentence;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        current.push(c);
        if SENTENCE_ENDERS.contains(&c) {
            sentences.push(current.trim().to_string());
            current.clear();
        }
    }
    if !current.trim().is_empty() {
        sentences.push(current.trim().to_string());
    }
    sentences
}

/// Final safety pass (§4.10 step 4): fixed-size slicing of anything still
/// longer than the transport's hard limit.
fn hard_chop(chunk: &str, hard_limit: usize) -> Vec<String> {
    let chars: Vec<char> = chunk.chars().collect();
    if chars.len() <= hard_limit {
        return vec![chunk.to_string()];
    }
    chars
        .chunks(hard_limit)
        .map(|slice| slice.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn governor() -> SpeechGovernor {
        SpeechGovernor::new(GovernorConfig::default())
    }

    #[test]
    fn split_token_takes_priority_over_everything_else() {
        let gov = governor();
        let chunks = gov.segment("hello there<SPLIT>how are you?");
        assert_eq!(chunks, vec!["hello there".to_string(), "how are you?".to_string()]);
    }

    #[test]
    fn newlines_are_segmented_line_by_line() {
        let gov = governor();
        let chunks = gov.segment("line one\nline two\nline three");
        assert_eq!(chunks, vec!["line one", "line two", "line three"]);
    }

    #[test]
    fn split_never_leaks_into_output() {
        let gov = governor();
        let chunks = gov.segment("a<SPLIT>b<SPLIT>c");
        assert!(chunks.iter().all(|c| !c.contains("<SPLIT>")));
    }

    #[test]
    fn long_line_is_packed_by_sentence_boundary() {
        let gov = SpeechGovernor::new(GovernorConfig {
            max_chunk_len: 20,
            ..GovernorConfig::default()
        });
        let chunks = gov.segment("Short one. Another short one. And a third.");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20 || c.split_whitespace().count() <= 6));
    }

    #[test]
    fn hard_limit_chops_unsplittable_text() {
        let gov = SpeechGovernor::new(GovernorConfig {
            hard_limit: 10,
            max_chunk_len: 10_000,
            ..GovernorConfig::default()
        });
        let text = "a".repeat(35);
        let chunks = gov.segment(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
        assert_eq!(chunks.iter().map(|c| c.chars().count()).sum::<usize>(), 35);
    }

    #[test]
    fn delay_never_falls_below_min_delay() {
        let gov = governor();
        let delay = gov.compute_delay("hi", false);
        assert!(delay.as_secs_f32() >= gov.config.min_delay_seconds * 0.99);
    }

    #[test]
    fn first_chunk_delay_is_discounted() {
        let gov = SpeechGovernor::new(GovernorConfig {
            min_delay_seconds: 0.0,
            ..GovernorConfig::default()
        });
        let chunk = "a".repeat(200);
        let first = gov.compute_delay(&chunk, true);
        let later = gov.compute_delay(&chunk, false);
        assert!(first.as_secs_f32() < later.as_secs_f32());
    }
}
