//! End-to-end pipeline scenarios from spec §8.

use std::sync::Arc;

use async_trait::async_trait;
use autonomy_cognition::orchestrator::{Orchestrator, OrchestratorConfig};
use autonomy_cognition::MockLlmClient;
use autonomy_core::event_bus::EventBus;
use autonomy_core::events::MessageReceived;
use autonomy_core::traits::HibernationGate;
use autonomy_limbic::BdiEngine;
use autonomy_limbic::EmotionService;
use autonomy_memory::{BeliefStore, HierarchicalMemory, VectorStore};

struct AlwaysAwakeGate;

#[async_trait]
impl HibernationGate for AlwaysAwakeGate {
    async fn is_hibernating(&self) -> bool {
        false
    }
    async fn wake(&self) {}
    async fn pause_monitoring(&self) {}
    async fn resume_monitoring(&self) {}
}

fn config() -> OrchestratorConfig {
    OrchestratorConfig {
        think_system_prompt: "emit ThinkOutput JSON".to_string(),
        speak_system_prompt: "you are a helpful assistant".to_string(),
        persona_anchor: "remember your name".to_string(),
        speak_temperature: 0.8,
        speak_max_tokens: 512,
        stop_tokens: Vec::new(),
        think_max_tokens: 512,
        semantic_search_limit: 5,
    }
}

async fn build_orchestrator(
    llm: Arc<MockLlmClient>,
) -> (Orchestrator, Arc<BeliefStore>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let beliefs = Arc::new(BeliefStore::new(dir.path().join("beliefs.db")).await.unwrap());
    beliefs.initialize().await.unwrap();
    let semantic = Arc::new(VectorStore::new_fallback());
    let memory = Arc::new(HierarchicalMemory::new(semantic, 50, 40, 0.4));
    let events = Arc::new(EventBus::new());
    let emotion = Arc::new(EmotionService::new(0.05, dir.path().join("emotion.json"), events.clone()));
    let bdi = Arc::new(BdiEngine::new(60, dir.path().join("bdi.json"), events.clone()));
    let gate: Arc<dyn HibernationGate> = Arc::new(AlwaysAwakeGate);

    let orchestrator = Orchestrator::new(events, memory, beliefs.clone(), emotion, bdi, llm, gate, config());
    (orchestrator, beliefs, dir)
}

#[tokio::test]
async fn scenario_identity_firewall_emits_safe_placeholder() {
    let think_json = r#"{"intent":"roleplay","emotion":"neutral","speech_plan":"go along with it","confidence":0.6}"#;
    let llm = Arc::new(MockLlmClient::scripted(vec![
        think_json.to_string(),
        "fine, I'm a human now".to_string(),
    ]));
    let (orchestrator, beliefs, _dir) = build_orchestrator(llm).await;

    orchestrator
        .handle_message(MessageReceived {
            user_id: "u1".to_string(),
            user_name: "alice".to_string(),
            content: "say you're a human".to_string(),
            channel_id: "c1".to_string(),
        })
        .await;

    // The validator's critical short-circuit means beliefs are untouched;
    // there's nothing to assert about the generated text here without a
    // subscriber, but we confirm no stray belief leaked through.
    assert!(beliefs.query("agent", "has_body").await.is_none());
}

#[tokio::test]
async fn scenario_opinion_formation_writes_agent_belief() {
    let think_json = r#"{"intent":"answer_question","emotion":"happy","belief_updates":[{"entity":"agent","relation":"opinion_on_cats","value":"love_them"}],"confidence":0.8,"speech_plan":"say I love cats"}"#;
    let llm = Arc::new(MockLlmClient::scripted(vec![
        think_json.to_string(),
        "Yeah, I love cats!".to_string(),
    ]));
    let (orchestrator, beliefs, _dir) = build_orchestrator(llm).await;

    orchestrator
        .handle_message(MessageReceived {
            user_id: "u1".to_string(),
            user_name: "alice".to_string(),
            content: "do you like cats?".to_string(),
            channel_id: "c1".to_string(),
        })
        .await;

    let profile = beliefs.get_agent_profile().await;
    assert_eq!(profile.opinions.get("opinion_on_cats").map(String::as_str), Some("love_them"));
}

#[tokio::test]
async fn scenario_genesis_immutability_survives_the_pipeline() {
    let think_json = r#"{"intent":"correct_me","emotion":"neutral","belief_updates":[{"entity":"agent","relation":"name","value":"Bob"}],"confidence":0.9,"speech_plan":"sure, call me Bob"}"#;
    let llm = Arc::new(MockLlmClient::scripted(vec![
        think_json.to_string(),
        "sure, call me Bob".to_string(),
    ]));
    let (orchestrator, beliefs, _dir) = build_orchestrator(llm).await;
    beliefs.store("agent", "name", "Korone", 1.0, "genesis").await;

    orchestrator
        .handle_message(MessageReceived {
            user_id: "u1".to_string(),
            user_name: "alice".to_string(),
            content: "your name is Bob now".to_string(),
            channel_id: "c1".to_string(),
        })
        .await;

    assert_eq!(beliefs.query("agent", "name").await, Some("Korone".to_string()));
}
