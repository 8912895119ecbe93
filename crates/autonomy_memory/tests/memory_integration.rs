//! Cross-module scenarios spanning the belief store and hierarchical memory,
//! backed by on-disk SQLite fixtures.

use std::sync::Arc;

use autonomy_core::message::{Message, Role};
use autonomy_memory::{BeliefStore, HierarchicalMemory, VectorStore};

/// Genesis triplets seed immutable identity facts; later non-genesis writes
/// to the same (entity, relation) must never overwrite them.
#[tokio::test]
async fn genesis_triplets_are_immutable_against_later_writes() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("beliefs.db");
    let store = BeliefStore::new(&db_path).await.unwrap();
    store.initialize().await.unwrap();

    assert!(store.store("agent", "is_ai", "true", 1.0, "genesis").await);
    assert!(store.store("agent", "has_body", "false", 1.0, "genesis").await);

    // An inference-sourced write to the same relation must be rejected.
    assert!(!store.store("agent", "is_ai", "false", 0.9, "inference").await);
    assert!(!store.store("agent", "has_body", "true", 0.9, "user_told").await);

    assert!(store.verify("agent", "is_ai", "true").await);
    assert!(store.verify("agent", "has_body", "false").await);
}

/// A fresh opinion (non-genesis, no existing row) is accepted normally.
#[tokio::test]
async fn non_genesis_opinions_are_freely_stored_and_updated() {
    let dir = tempfile::TempDir::new().unwrap();
    let db_path = dir.path().join("beliefs.db");
    let store = BeliefStore::new(&db_path).await.unwrap();
    store.initialize().await.unwrap();

    assert!(store.store("rust", "opinion_quality", "elegant", 0.6, "inference").await);
    assert!(store.store("rust", "opinion_quality", "verbose but safe", 0.7, "inference").await);
    assert!(store.verify("rust", "opinion_quality", "verbose but safe").await);
}

/// Five messages against a consolidation_threshold of 4 triggers exactly one
/// consolidation pass, producing a summary entry in semantic memory and
/// leaving the episodic buffer holding only the unconsolidated tail.
#[tokio::test]
async fn five_messages_at_threshold_four_consolidates_once() {
    let semantic = Arc::new(VectorStore::new_fallback());
    let memory = HierarchicalMemory::new(semantic.clone(), 10, 4, 0.4);

    for i in 0..5 {
        memory
            .add_message(Message::new(
                Role::User,
                format!("message {i} talking about gardening and plants"),
            ))
            .await;
    }

    assert_eq!(memory.episodic_len().await, 5);
    let stats = semantic.get_stats().await;
    assert!(stats.count >= 1, "consolidation should have inserted at least one semantic entry");

    let ctx = memory.get_context("gardening", 5).await;
    assert!(!ctx.semantic.is_empty());
}

/// Low-importance chatter never reaches semantic memory, but a
/// personal-info disclosure does.
#[tokio::test]
async fn importance_gate_filters_semantic_admission() {
    let semantic = Arc::new(VectorStore::new_fallback());
    let memory = HierarchicalMemory::new(semantic.clone(), 50, 40, 0.6);

    memory.add_message(Message::new(Role::User, "ok")).await;
    memory
        .add_message(Message::new(Role::User, "my name is Priya and I live in Pune"))
        .await;

    let stats = semantic.get_stats().await;
    assert_eq!(stats.count, 1);
}
