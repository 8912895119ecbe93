//! Hierarchical Memory (§4.4): working memory (last 10 messages, in-process
//! only), the episodic ring buffer (capacity `M`, default 50), and semantic
//! memory (the `VectorStore`), wired together with the importance gate and
//! consolidation.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use autonomy_core::message::{Message, Role};
use tokio::sync::RwLock;

use crate::importance;
use crate::vector_store::VectorStore;

const WORKING_MEMORY_CAPACITY: usize = 10;
const EPISODIC_CONTEXT_TAIL: usize = 15;

/// `get_context(query) -> {working, episodic, semantic}` (§4.4).
#[derive(Debug, Clone, Default)]
pub struct RetrievedContext {
    pub working: Vec<Message>,
    pub episodic: Vec<Message>,
    pub semantic: Vec<String>,
}

/// Summarizes an episodic buffer into a single consolidated digest. The
/// LLM-backed summarizer (an optional upgrade mentioned in §4.4) lives in
/// `autonomy_cognition`, which can supply its own implementation without
/// `autonomy_memory` depending on the LLM client; this trait is the seam.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, messages: &[Message]) -> String;
}

/// Deterministic keyword-frequency fallback summarizer (§4.4): no LLM
/// dependency, always available.
pub struct KeywordFrequencySummarizer;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "to", "of", "and", "in", "on", "for", "it",
    "that", "this", "i", "you", "he", "she", "they", "we", "be", "do", "does", "did", "with",
    "at", "as", "but", "or", "not", "have", "has", "had", "my", "your", "his", "her", "their",
];

#[async_trait]
impl Summarizer for KeywordFrequencySummarizer {
    async fn summarize(&self, messages: &[Message]) -> String {
        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
        for msg in messages {
            for word in msg.content.to_lowercase().split_whitespace() {
                let cleaned: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
                if cleaned.len() < 3 || STOPWORDS.contains(&cleaned.as_str()) {
                    continue;
                }
                *counts.entry(cleaned).or_insert(0) += 1;
            }
        }
        let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let top_keywords: Vec<String> = ranked.into_iter().take(8).map(|(w, _)| w).collect();
        if top_keywords.is_empty() {
            format!("Conversation summary: {} messages exchanged.", messages.len())
        } else {
            format!(
                "Conversation summary ({} messages): topics included {}.",
                messages.len(),
                top_keywords.join(", ")
            )
        }
    }
}

struct State {
    working: VecDeque<Message>,
    episodic: VecDeque<Message>,
}

/// Owner of all three memory tiers.
pub struct HierarchicalMemory {
    state: RwLock<State>,
    semantic: Arc<VectorStore>,
    summarizer: Arc<dyn Summarizer>,
    episodic_capacity: usize,
    consolidation_threshold: usize,
    importance_threshold: f32,
}

impl HierarchicalMemory {
    pub fn new(
        semantic: Arc<VectorStore>,
        episodic_capacity: usize,
        consolidation_threshold: usize,
        importance_threshold: f32,
    ) -> Self {
        assert!(
            consolidation_threshold < episodic_capacity,
            "consolidation_threshold must be strictly less than the episodic buffer capacity"
        );
        Self {
            state: RwLock::new(State {
                working: VecDeque::with_capacity(WORKING_MEMORY_CAPACITY),
                episodic: VecDeque::with_capacity(episodic_capacity),
            }),
            semantic,
            summarizer: Arc::new(KeywordFrequencySummarizer),
            episodic_capacity,
            consolidation_threshold,
            importance_threshold,
        }
    }

    pub fn with_summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.summarizer = summarizer;
        self
    }

    /// Rebuild working memory from the tail of episodic memory on restart
    /// (§4.4; the episodic buffer itself isn't persisted, but the caller
    /// may replay recent messages loaded from a snapshot or transport log).
    pub async fn rebuild_working_from_tail(&self, tail: &[Message]) {
        let mut guard = self.state.write().await;
        guard.working.clear();
        for msg in tail.iter().rev().take(WORKING_MEMORY_CAPACITY).rev() {
            guard.working.push_back(msg.clone());
        }
    }

    /// Append to working (evicting oldest past capacity), append to
    /// episodic (ring), conditionally submit to semantic memory, then
    /// consolidate if the episodic buffer has reached threshold.
    pub async fn add_message(&self, msg: Message) {
        let score = importance::score(&msg);

        {
            let mut guard = self.state.write().await;
            guard.working.push_back(msg.clone());
            while guard.working.len() > WORKING_MEMORY_CAPACITY {
                guard.working.pop_front();
            }
            guard.episodic.push_back(msg.clone());
            while guard.episodic.len() > self.episodic_capacity {
                guard.episodic.pop_front();
            }
        }

        self.semantic.add_message(&msg, score, self.importance_threshold).await;

        let should_consolidate = {
            let guard = self.state.read().await;
            guard.episodic.len() >= self.consolidation_threshold
        };
        if should_consolidate {
            self.consolidate().await;
        }
    }

    /// Consolidation (§4.4): summarize the buffer, insert a single
    /// `system`-role summary message into semantic memory tagged
    /// `type=summary, importance=0.9, message_count=N`, then clear the
    /// buffer but re-add the tail (last `WORKING_MEMORY_CAPACITY` messages).
    pub async fn consolidate(&self) {
        let (messages, preserve_tail) = {
            let guard = self.state.read().await;
            let messages: Vec<Message> = guard.episodic.iter().cloned().collect();
            let preserve_tail: Vec<Message> = messages
                .iter()
                .rev()
                .take(WORKING_MEMORY_CAPACITY)
                .rev()
                .cloned()
                .collect();
            (messages, preserve_tail)
        };
        if messages.is_empty() {
            return;
        }
        let count = messages.len();
        let summary_text = self.summarizer.summarize(&messages).await;

        let mut summary_msg = Message::new(Role::System, summary_text)
            .with_metadata("type", serde_json::json!("summary"))
            .with_metadata("message_count", serde_json::json!(count));

        // importance=0.9 unconditionally, regardless of the scorer, per §4.4.
        self.semantic.add_message(&summary_msg, 0.9, 0.0).await;
        summary_msg.metadata.insert("importance".to_string(), serde_json::json!(0.9));

        let mut guard = self.state.write().await;
        guard.episodic.clear();
        for msg in preserve_tail {
            guard.episodic.push_back(msg);
        }
    }

    /// `get_context(query) -> {working, episodic, semantic}` (§4.4).
    pub async fn get_context(&self, query: &str, semantic_limit: usize) -> RetrievedContext {
        let (working, episodic) = {
            let guard = self.state.read().await;
            let working: Vec<Message> = guard.working.iter().cloned().collect();
            let episodic: Vec<Message> = guard
                .episodic
                .iter()
                .rev()
                .take(EPISODIC_CONTEXT_TAIL)
                .rev()
                .cloned()
                .collect();
            (working, episodic)
        };
        let semantic = self
            .semantic
            .search(query, semantic_limit, true, 0.3)
            .await
            .into_iter()
            .map(|r| r.entry.document)
            .collect();
        RetrievedContext {
            working,
            episodic,
            semantic,
        }
    }

    pub async fn episodic_len(&self) -> usize {
        self.state.read().await.episodic.len()
    }

    pub async fn working_len(&self) -> usize {
        self.state.read().await.working.len()
    }
}
