//! Vector Store (§4.5): embedded cosine-similarity search over message
//! text, with a recency-weighted rerank and an in-memory substring-matching
//! fallback when the embedding backend is unavailable.
//!
//! Uses a `sqlx` pool with migration-at-construction and a `fastembed`
//! model plus `cosine_similarity`, around a generic
//! `{id, embedding, document, metadata}` entry shape.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

use autonomy_core::message::Message;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::embedding::{cosine_similarity, EmbeddingModel};

const RECENCY_HALF_LIFE_SECONDS: f64 = 7.0 * 86_400.0;
const FALLBACK_CAP: usize = 1000;

/// `{id, embedding, document, metadata}`. Metadata always carries `role`,
/// `timestamp`, `importance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub document: String,
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub entry: VectorStoreEntry,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct VectorStoreStats {
    pub count: u64,
    pub backend: &'static str,
}

struct FallbackEntry {
    entry: VectorStoreEntry,
    inserted_at: DateTime<Utc>,
}

enum Backend {
    Embedded {
        pool: Pool<Sqlite>,
        model: Arc<EmbeddingModel>,
    },
    Fallback {
        entries: VecDeque<FallbackEntry>,
    },
}

/// Single owning component for semantic memory. Concurrent writes from
/// different components are not supported — callers serialize through
/// `HierarchicalMemory`.
pub struct VectorStore {
    backend: Mutex<Backend>,
}

impl VectorStore {
    /// Attempts to build the embedding-backed store; on embedding-backend
    /// failure, degrades to the in-memory fallback and logs a prominent
    /// warning once, per §7's "store unavailable" error taxonomy entry.
    pub async fn new<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Self> {
        match Self::new_embedded(db_path).await {
            Ok(store) => Ok(store),
            Err(e) => {
                tracing::warn!(error = %e, "embedding backend unavailable, degrading to in-memory vector store fallback");
                Ok(Self::new_fallback())
            }
        }
    }

    async fn new_embedded<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Self> {
        let model = Arc::new(EmbeddingModel::new()?);
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new().connect(&db_url).await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS vector_entries (
                id TEXT PRIMARY KEY,
                document TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(Self {
            backend: Mutex::new(Backend::Embedded { pool, model }),
        })
    }

    pub fn new_fallback() -> Self {
        Self {
            backend: Mutex::new(Backend::Fallback {
                entries: VecDeque::new(),
            }),
        }
    }

    /// Insert `msg` iff `importance >= threshold` (§4.5's admission
    /// invariant). Returns whether it was inserted.
    pub async fn add_message(&self, msg: &Message, importance: f32, threshold: f32) -> bool {
        if importance < threshold {
            return false;
        }
        let mut metadata = msg.metadata.clone();
        metadata.insert("role".to_string(), serde_json::json!(msg.role.as_str()));
        metadata.insert("timestamp".to_string(), serde_json::json!(msg.timestamp.to_rfc3339()));
        metadata.insert("importance".to_string(), serde_json::json!(importance));

        let entry = VectorStoreEntry {
            id: Uuid::new_v4().to_string(),
            embedding: None,
            document: msg.content.clone(),
            metadata,
        };

        let mut backend = self.backend.lock().await;
        match &mut *backend {
            Backend::Embedded { pool, model } => {
                let embedding = match model.embed(&entry.document) {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to embed message, dropping insert");
                        return false;
                    }
                };
                let blob = match bincode::serialize(&embedding) {
                    Ok(b) => b,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to encode embedding");
                        return false;
                    }
                };
                let metadata_json = serde_json::to_string(&entry.metadata).unwrap_or_default();
                let result = sqlx::query(
                    "INSERT INTO vector_entries (id, document, embedding, metadata, timestamp) VALUES (?, ?, ?, ?, ?)",
                )
                .bind(&entry.id)
                .bind(&entry.document)
                .bind(&blob)
                .bind(&metadata_json)
                .bind(msg.timestamp.timestamp_millis())
                .execute(&*pool)
                .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "vector store insert failed");
                    return false;
                }
                true
            }
            Backend::Fallback { entries } => {
                entries.push_back(FallbackEntry {
                    entry,
                    inserted_at: msg.timestamp,
                });
                while entries.len() > FALLBACK_CAP {
                    entries.pop_front();
                }
                true
            }
        }
    }

    /// `search(query, limit, rerank=true, time_weight=0.3) -> list` (§4.5).
    ///
    /// Retrieves `3*limit` candidates by similarity, then reranks by
    /// `final = (1 - time_weight) * similarity + time_weight * recency`
    /// with `recency = 0.5^(age_seconds / (7 days))`, descending.
    pub async fn search(&self, query: &str, limit: usize, rerank: bool, time_weight: f32) -> Vec<SearchResult> {
        let now = Utc::now();
        let mut backend = self.backend.lock().await;
        let candidate_pool = limit.saturating_mul(3).max(limit);

        let mut scored: Vec<(VectorStoreEntry, f32, DateTime<Utc>)> = match &mut *backend {
            Backend::Embedded { pool, model } => {
                let query_embedding = match model.embed(query) {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to embed query");
                        return Vec::new();
                    }
                };
                let rows = match sqlx::query("SELECT id, document, embedding, metadata, timestamp FROM vector_entries")
                    .fetch_all(&*pool)
                    .await
                {
                    Ok(rows) => rows,
                    Err(e) => {
                        tracing::error!(error = %e, "vector store search query failed");
                        return Vec::new();
                    }
                };
                let mut candidates: Vec<(VectorStoreEntry, f32, DateTime<Utc>)> = rows
                    .into_iter()
                    .filter_map(|row| {
                        let blob: Vec<u8> = row.get("embedding");
                        let embedding: Vec<f32> = bincode::deserialize(&blob).ok()?;
                        let similarity = cosine_similarity(&query_embedding, &embedding);
                        let metadata_json: String = row.get("metadata");
                        let metadata: HashMap<String, serde_json::Value> =
                            serde_json::from_str(&metadata_json).unwrap_or_default();
                        let ts_millis: i64 = row.get("timestamp");
                        let ts = DateTime::from_timestamp_millis(ts_millis).unwrap_or(now);
                        Some((
                            VectorStoreEntry {
                                id: row.get("id"),
                                embedding: None,
                                document: row.get("document"),
                                metadata,
                            },
                            similarity,
                            ts,
                        ))
                    })
                    .collect();
                candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
                candidates.truncate(candidate_pool);
                candidates
            }
            Backend::Fallback { entries } => {
                let query_lower = query.to_lowercase();
                let query_words: Vec<&str> = query_lower.split_whitespace().collect();
                let mut candidates: Vec<(VectorStoreEntry, f32, DateTime<Utc>)> = entries
                    .iter()
                    .map(|fe| {
                        let doc_lower = fe.entry.document.to_lowercase();
                        let matches = query_words.iter().filter(|w| doc_lower.contains(**w)).count();
                        let similarity = if query_words.is_empty() {
                            0.0
                        } else {
                            matches as f32 / query_words.len() as f32
                        };
                        (fe.entry.clone(), similarity, fe.inserted_at)
                    })
                    .collect();
                candidates.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
                candidates.truncate(candidate_pool);
                candidates
            }
        };
        drop(backend);

        if rerank {
            let mut reranked: Vec<(VectorStoreEntry, f32)> = scored
                .drain(..)
                .map(|(entry, similarity, ts)| {
                    let age_seconds = (now - ts).num_milliseconds().max(0) as f64 / 1000.0;
                    let recency = 0.5f64.powf(age_seconds / RECENCY_HALF_LIFE_SECONDS) as f32;
                    let final_score = (1.0 - time_weight) * similarity + time_weight * recency;
                    (entry, final_score)
                })
                .collect();
            reranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            reranked.truncate(limit);
            reranked
                .into_iter()
                .map(|(entry, score)| SearchResult { entry, score })
                .collect()
        } else {
            scored.truncate(limit);
            scored
                .into_iter()
                .map(|(entry, score, _)| SearchResult { entry, score })
                .collect()
        }
    }

    pub async fn clear(&self) {
        let mut backend = self.backend.lock().await;
        match &mut *backend {
            Backend::Embedded { pool, .. } => {
                if let Err(e) = sqlx::query("DELETE FROM vector_entries").execute(&*pool).await {
                    tracing::error!(error = %e, "vector store clear failed");
                }
            }
            Backend::Fallback { entries } => entries.clear(),
        }
    }

    pub async fn get_stats(&self) -> VectorStoreStats {
        let mut backend = self.backend.lock().await;
        match &mut *backend {
            Backend::Embedded { pool, .. } => {
                let count: i64 = sqlx::query("SELECT COUNT(*) as c FROM vector_entries")
                    .fetch_one(&*pool)
                    .await
                    .map(|r| r.get("c"))
                    .unwrap_or(0);
                VectorStoreStats {
                    count: count as u64,
                    backend: "embedded",
                }
            }
            Backend::Fallback { entries } => VectorStoreStats {
                count: entries.len() as u64,
                backend: "fallback",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autonomy_core::message::Role;

    fn msg(content: &str) -> Message {
        Message::new(Role::User, content)
    }

    #[tokio::test]
    async fn fallback_rejects_entries_below_importance_threshold() {
        let store = VectorStore::new_fallback();
        assert!(!store.add_message(&msg("hello"), 0.2, 0.4).await);
        let stats = store.get_stats().await;
        assert_eq!(stats.count, 0);
    }

    #[tokio::test]
    async fn fallback_admits_entries_at_or_above_threshold() {
        let store = VectorStore::new_fallback();
        assert!(store.add_message(&msg("my name is Alice"), 0.8, 0.4).await);
        let stats = store.get_stats().await;
        assert_eq!(stats.count, 1);
        assert_eq!(stats.backend, "fallback");
    }

    #[tokio::test]
    async fn fallback_search_ranks_substring_matches_first() {
        let store = VectorStore::new_fallback();
        store.add_message(&msg("I really love pizza and pasta"), 0.8, 0.4).await;
        store.add_message(&msg("the weather today is sunny"), 0.8, 0.4).await;
        let results = store.search("pizza", 5, true, 0.3).await;
        assert!(!results.is_empty());
        assert!(results[0].entry.document.contains("pizza"));
    }

    #[tokio::test]
    async fn fallback_evicts_fifo_past_cap() {
        let store = VectorStore::new_fallback();
        for i in 0..(FALLBACK_CAP + 10) {
            store.add_message(&msg(&format!("message number {i}")), 0.8, 0.4).await;
        }
        let stats = store.get_stats().await;
        assert_eq!(stats.count, FALLBACK_CAP as u64);
    }

    #[tokio::test]
    async fn search_results_are_sorted_by_score_descending() {
        let store = VectorStore::new_fallback();
        store.add_message(&msg("cats cats cats are great"), 0.8, 0.4).await;
        store.add_message(&msg("cats are okay I guess"), 0.8, 0.4).await;
        store.add_message(&msg("nothing related here"), 0.8, 0.4).await;
        let results = store.search("cats", 3, false, 0.3).await;
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let store = VectorStore::new_fallback();
        store.add_message(&msg("my name is Bob"), 0.8, 0.4).await;
        store.clear().await;
        let stats = store.get_stats().await;
        assert_eq!(stats.count, 0);
    }
}
