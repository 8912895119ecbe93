//! Belief System (§4.3): a triplet store `(entity, relation, value)` with
//! immutable genesis axioms. Each row is keyed by `(entity, relation)`;
//! writing a new value for an existing key supersedes it unless the stored
//! row's source is `genesis`, in which case only another `genesis` write
//! (an idempotent overwrite) is accepted.
//!
//! Uses a `sqlx` pool opened once, with `CREATE TABLE IF NOT EXISTS`
//! migrations run at construction, and every operation borrowing the pool
//! rather than holding a long-lived connection.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};

pub const GENESIS: &str = "genesis";
pub const SOURCE_INFERENCE: &str = "inference";
pub const SOURCE_USER_TOLD: &str = "user_told";

/// A single `(entity, relation, value)` triplet with provenance metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Triplet {
    pub entity: String,
    pub relation: String,
    pub value: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f32,
    pub source: String,
}

/// `get_agent_profile()`'s four buckets (§4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentProfile {
    pub identity: HashMap<String, String>,
    pub opinions: HashMap<String, String>,
    pub traits: HashMap<String, String>,
    pub memories: HashMap<String, String>,
}

/// Counts by source (`summary()`'s return shape).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BeliefSummary {
    pub total: u64,
    pub by_source: HashMap<String, u64>,
}

const IDENTITY_ALLOWLIST: &[&str] = &[
    "is_ai",
    "has_body",
    "name",
    "type",
    "created_by",
    "purpose",
];

fn is_identity_relation(relation: &str) -> bool {
    IDENTITY_ALLOWLIST.contains(&relation) || relation.starts_with("can_")
}

fn categorize(relation: &str) -> &'static str {
    if is_identity_relation(relation) {
        "identity"
    } else if relation.starts_with("trait_") {
        "traits"
    } else if relation.starts_with("memory_") {
        "memories"
    } else {
        // opinion_on_*, likes_*, dislikes_* and everything unrecognized
        // default to "opinions" per §4.3.
        "opinions"
    }
}

/// Owner of the triplet store. `initialize()` must be called exactly once
/// before the first read; it is distinct from the schema setup that
/// happens in `new()`.
pub struct BeliefStore {
    pool: Pool<Sqlite>,
    initialized: std::sync::atomic::AtomicBool,
}

impl BeliefStore {
    pub async fn new<P: AsRef<Path>>(db_path: P) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db_url = format!("sqlite://{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePoolOptions::new().connect(&db_url).await?;
        let store = Self {
            pool,
            initialized: std::sync::atomic::AtomicBool::new(false),
        };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS beliefs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entity TEXT NOT NULL,
                relation TEXT NOT NULL,
                value TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                confidence REAL NOT NULL,
                source TEXT NOT NULL,
                UNIQUE(entity, relation)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_beliefs_entity ON beliefs(entity)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_beliefs_relation ON beliefs(relation)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_beliefs_source ON beliefs(source)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Must be called exactly once before the first read. Logs a prominent
    /// warning if the agent has no genesis identity yet.
    pub async fn initialize(&self) -> anyhow::Result<()> {
        self.initialized.store(true, std::sync::atomic::Ordering::SeqCst);
        let count: i64 = sqlx::query("SELECT COUNT(*) as c FROM beliefs WHERE source = ?")
            .bind(GENESIS)
            .fetch_one(&self.pool)
            .await
            .map(|row| row.get("c"))
            .unwrap_or(0);
        if count == 0 {
            tracing::warn!("belief store has no genesis triplets — agent has no seeded identity");
        } else {
            tracing::info!(genesis_count = count, "belief store initialized");
        }
        Ok(())
    }

    /// `store(entity, relation, value, confidence, source) -> bool`.
    ///
    /// Rejects (returns `false`, no-op) a non-genesis write against a key
    /// whose existing entry has source `genesis`. Genesis writes always
    /// succeed (idempotent overwrite). Never lets `timestamp` regress for a
    /// given key. On backend error, returns `false` and logs.
    pub async fn store(
        &self,
        entity: &str,
        relation: &str,
        value: &str,
        confidence: f32,
        source: &str,
    ) -> bool {
        match self.try_store(entity, relation, value, confidence, source).await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::error!(error = %e, entity, relation, "belief store write failed");
                false
            }
        }
    }

    async fn try_store(
        &self,
        entity: &str,
        relation: &str,
        value: &str,
        confidence: f32,
        source: &str,
    ) -> anyhow::Result<bool> {
        let existing = sqlx::query("SELECT source, timestamp FROM beliefs WHERE entity = ? AND relation = ?")
            .bind(entity)
            .bind(relation)
            .fetch_optional(&self.pool)
            .await?;

        let mut now = Utc::now().timestamp_millis();
        if let Some(row) = &existing {
            let existing_source: String = row.get("source");
            let existing_ts: i64 = row.get("timestamp");
            if existing_source == GENESIS && source != GENESIS {
                return Ok(false);
            }
            // timestamp is monotonically non-decreasing for a given key.
            if now <= existing_ts {
                now = existing_ts + 1;
            }
        }

        sqlx::query(
            r#"
            INSERT INTO beliefs (entity, relation, value, timestamp, confidence, source)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(entity, relation) DO UPDATE SET
                value = excluded.value,
                timestamp = excluded.timestamp,
                confidence = excluded.confidence,
                source = excluded.source
            "#,
        )
        .bind(entity)
        .bind(relation)
        .bind(value)
        .bind(now)
        .bind(confidence)
        .bind(source)
        .execute(&self.pool)
        .await?;
        Ok(true)
    }

    /// `query(entity, relation) -> value?`. Returns `None` on backend error
    /// (logged) as well as on a genuine miss — both are a safe empty value.
    pub async fn query(&self, entity: &str, relation: &str) -> Option<String> {
        match sqlx::query("SELECT value FROM beliefs WHERE entity = ? AND relation = ?")
            .bind(entity)
            .bind(relation)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row.map(|r| r.get("value")),
            Err(e) => {
                tracing::error!(error = %e, "belief query failed");
                None
            }
        }
    }

    /// `verify(entity, relation, value) -> bool`. Unknown is not a
    /// contradiction: `true` if no entry exists, otherwise case-insensitive
    /// string equality.
    pub async fn verify(&self, entity: &str, relation: &str, value: &str) -> bool {
        match self.query(entity, relation).await {
            None => true,
            Some(stored) => stored.to_lowercase() == value.to_lowercase(),
        }
    }

    /// `get_all(entity) -> map<relation, value>`.
    pub async fn get_all(&self, entity: &str) -> HashMap<String, String> {
        match sqlx::query("SELECT relation, value FROM beliefs WHERE entity = ?")
            .bind(entity)
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .map(|r| (r.get::<String, _>("relation"), r.get::<String, _>("value")))
                .collect(),
            Err(e) => {
                tracing::error!(error = %e, "belief get_all failed");
                HashMap::new()
            }
        }
    }

    /// Partitions all `entity = "agent"` triplets into identity/opinions/
    /// traits/memories by relation-name prefix (§4.3).
    pub async fn get_agent_profile(&self) -> AgentProfile {
        let all = self.get_all("agent").await;
        let mut profile = AgentProfile::default();
        for (relation, value) in all {
            match categorize(&relation) {
                "identity" => profile.identity.insert(relation, value),
                "traits" => profile.traits.insert(relation, value),
                "memories" => profile.memories.insert(relation, value),
                _ => profile.opinions.insert(relation, value),
            };
        }
        profile
    }

    /// `search(entity?, relation?, limit) -> list`.
    pub async fn search(
        &self,
        entity: Option<&str>,
        relation: Option<&str>,
        limit: i64,
    ) -> Vec<Triplet> {
        let result = sqlx::query(
            "SELECT entity, relation, value, timestamp, confidence, source FROM beliefs
             WHERE (?1 IS NULL OR entity = ?1) AND (?2 IS NULL OR relation = ?2)
             ORDER BY timestamp DESC LIMIT ?3",
        )
        .bind(entity)
        .bind(relation)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;

        match result {
            Ok(rows) => rows.into_iter().map(row_to_triplet).collect(),
            Err(e) => {
                tracing::error!(error = %e, "belief search failed");
                Vec::new()
            }
        }
    }

    /// Read-only supplemental method (SPEC_FULL §4): counts by source.
    pub async fn summary(&self) -> BeliefSummary {
        match sqlx::query("SELECT source, COUNT(*) as c FROM beliefs GROUP BY source")
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => {
                let mut by_source = HashMap::new();
                let mut total = 0u64;
                for row in rows {
                    let source: String = row.get("source");
                    let c: i64 = row.get("c");
                    total += c as u64;
                    by_source.insert(source, c as u64);
                }
                BeliefSummary { total, by_source }
            }
            Err(e) => {
                tracing::error!(error = %e, "belief summary failed");
                BeliefSummary::default()
            }
        }
    }

    /// Read-only supplemental method (SPEC_FULL §4): full dump for
    /// operational tooling.
    pub async fn export_all(&self) -> Vec<Triplet> {
        match sqlx::query(
            "SELECT entity, relation, value, timestamp, confidence, source FROM beliefs ORDER BY entity, relation",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows.into_iter().map(row_to_triplet).collect(),
            Err(e) => {
                tracing::error!(error = %e, "belief export failed");
                Vec::new()
            }
        }
    }
}

fn row_to_triplet(row: sqlx::sqlite::SqliteRow) -> Triplet {
    let ts_millis: i64 = row.get("timestamp");
    Triplet {
        entity: row.get("entity"),
        relation: row.get("relation"),
        value: row.get("value"),
        timestamp: DateTime::from_timestamp_millis(ts_millis).unwrap_or_else(Utc::now),
        confidence: row.get("confidence"),
        source: row.get("source"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (BeliefStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = BeliefStore::new(dir.path().join("beliefs.db")).await.unwrap();
        store.initialize().await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn store_then_query_roundtrips() {
        let (store, _dir) = store().await;
        assert!(store.store("agent", "name", "Korone", 1.0, GENESIS).await);
        assert_eq!(store.query("agent", "name").await, Some("Korone".to_string()));
    }

    #[tokio::test]
    async fn scenario_genesis_immutability() {
        let (store, _dir) = store().await;
        assert!(store.store("agent", "name", "Korone", 1.0, GENESIS).await);
        let rejected = store
            .store("agent", "name", "Bob", 0.8, SOURCE_INFERENCE)
            .await;
        assert!(!rejected);
        assert_eq!(store.query("agent", "name").await, Some("Korone".to_string()));
    }

    #[tokio::test]
    async fn genesis_write_can_overwrite_genesis_idempotently() {
        let (store, _dir) = store().await;
        assert!(store.store("agent", "name", "Korone", 1.0, GENESIS).await);
        assert!(store.store("agent", "name", "Korone", 1.0, GENESIS).await);
        assert_eq!(store.query("agent", "name").await, Some("Korone".to_string()));
    }

    #[tokio::test]
    async fn verify_unknown_key_is_not_a_contradiction() {
        let (store, _dir) = store().await;
        assert!(store.verify("agent", "opinion_on_dogs", "anything").await);
    }

    #[tokio::test]
    async fn verify_is_case_insensitive() {
        let (store, _dir) = store().await;
        store.store("agent", "opinion_on_cats", "Love_Them", 0.8, SOURCE_INFERENCE).await;
        assert!(store.verify("agent", "opinion_on_cats", "love_them").await);
        assert!(!store.verify("agent", "opinion_on_cats", "hate_them").await);
    }

    #[tokio::test]
    async fn scenario_opinion_formation_lands_in_agent_profile_opinions() {
        let (store, _dir) = store().await;
        store
            .store("agent", "opinion_on_cats", "love_them", 0.8, SOURCE_INFERENCE)
            .await;
        let profile = store.get_agent_profile().await;
        assert_eq!(profile.opinions.get("opinion_on_cats").map(String::as_str), Some("love_them"));
    }

    #[tokio::test]
    async fn agent_profile_categorizes_by_relation_prefix() {
        let (store, _dir) = store().await;
        store.store("agent", "is_ai", "true", 1.0, GENESIS).await;
        store.store("agent", "trait_curious", "high", 0.9, SOURCE_INFERENCE).await;
        store.store("agent", "memory_first_chat", "hello world", 0.7, SOURCE_INFERENCE).await;
        store.store("agent", "likes_cats", "true", 0.7, SOURCE_INFERENCE).await;

        let profile = store.get_agent_profile().await;
        assert!(profile.identity.contains_key("is_ai"));
        assert!(profile.traits.contains_key("trait_curious"));
        assert!(profile.memories.contains_key("memory_first_chat"));
        assert!(profile.opinions.contains_key("likes_cats"));
    }

    #[tokio::test]
    async fn timestamp_is_monotonic_for_repeated_writes_to_same_key() {
        let (store, _dir) = store().await;
        store.store("user", "mood", "happy", 0.5, SOURCE_INFERENCE).await;
        store.store("user", "mood", "sad", 0.6, SOURCE_INFERENCE).await;
        let results = store.search(Some("user"), Some("mood"), 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].value, "sad");
    }

    #[tokio::test]
    async fn search_filters_by_entity_and_relation() {
        let (store, _dir) = store().await;
        store.store("agent", "name", "Korone", 1.0, GENESIS).await;
        store.store("user", "name", "Alice", 0.9, SOURCE_USER_TOLD).await;
        let results = store.search(Some("agent"), None, 10).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity, "agent");
    }

    #[tokio::test]
    async fn summary_counts_by_source() {
        let (store, _dir) = store().await;
        store.store("agent", "name", "Korone", 1.0, GENESIS).await;
        store.store("agent", "opinion_on_cats", "love", 0.8, SOURCE_INFERENCE).await;
        let summary = store.summary().await;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.by_source.get(GENESIS), Some(&1));
    }

    #[tokio::test]
    async fn export_all_returns_every_triplet() {
        let (store, _dir) = store().await;
        store.store("agent", "name", "Korone", 1.0, GENESIS).await;
        store.store("user", "name", "Alice", 0.9, SOURCE_USER_TOLD).await;
        let all = store.export_all().await;
        assert_eq!(all.len(), 2);
    }
}
