//! Cognitive Orchestrator (§4.9): sequences Think → Speak → Validate,
//! updates every store, and publishes the resulting events. Holds
//! references to Memory, Emotion, Beliefs, BDI, the LLM client, and the
//! hibernation gate; none of them hold a reference back (§9).

use std::sync::Arc;
use std::time::Instant;

use autonomy_core::event_bus::EventBus;
use autonomy_core::events::{
    AutonomousMessageSent, Event, EventPayload, MessageReceived, ResponseGenerated,
};
use autonomy_core::message::{Message, Role};
use autonomy_core::traits::{HibernationGate, LlmClient, LlmMessage};
use autonomy_limbic::{BdiEngine, EmotionService};
use autonomy_memory::{BeliefStore, HierarchicalMemory};
use tokio::sync::Mutex;

use crate::emotion_table::emotion_to_delta;
use crate::sentiment::infer_emotion;
use crate::think_speak::{think, speak, ThinkOutput};
use crate::validator::{auto_correct, validate, Severity};

const SAFE_PLACEHOLDER: &str = "sorry, i had a confusing thought there";
const MAX_VALIDATION_ATTEMPTS: u32 = 3;

pub struct OrchestratorConfig {
    pub think_system_prompt: String,
    pub speak_system_prompt: String,
    pub persona_anchor: String,
    pub speak_temperature: f32,
    pub speak_max_tokens: u32,
    pub stop_tokens: Vec<String>,
    pub think_max_tokens: u32,
    pub semantic_search_limit: usize,
}

pub struct Orchestrator {
    events: Arc<EventBus>,
    memory: Arc<HierarchicalMemory>,
    beliefs: Arc<BeliefStore>,
    emotion: Arc<EmotionService>,
    bdi: Arc<BdiEngine>,
    llm: Arc<dyn LlmClient>,
    gate: Arc<dyn HibernationGate>,
    config: OrchestratorConfig,
    last_pipeline_ms: Mutex<Option<u64>>,
}

impl Orchestrator {
    pub fn new(
        events: Arc<EventBus>,
        memory: Arc<HierarchicalMemory>,
        beliefs: Arc<BeliefStore>,
        emotion: Arc<EmotionService>,
        bdi: Arc<BdiEngine>,
        llm: Arc<dyn LlmClient>,
        gate: Arc<dyn HibernationGate>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            events,
            memory,
            beliefs,
            emotion,
            bdi,
            llm,
            gate,
            config,
            last_pipeline_ms: Mutex::new(None),
        }
    }

    /// Handle an inbound `MessageReceived` (§4.9 steps 1-11).
    pub async fn handle_message(&self, msg: MessageReceived) {
        self.run_pipeline(&msg.content, Some(msg.channel_id.clone()), false).await;
    }

    /// Handle a `ProactiveImpulse` from the BDI engine: input is a
    /// synthetic `"[AUTONOMOUS] Trigger: <reason>"` string; hibernating
    /// suppresses the whole pipeline instead of waking for it.
    pub async fn handle_impulse(&self, trigger_reason: &str) {
        if self.gate.is_hibernating().await {
            return;
        }
        let input = format!("[AUTONOMOUS] Trigger: {trigger_reason}");
        self.run_pipeline(&input, None, true).await;
    }

    async fn run_pipeline(&self, input: &str, channel_id: Option<String>, is_autonomous: bool) {
        let start = Instant::now();

        // Step 1: wake gate.
        if self.gate.is_hibernating().await {
            self.gate.wake().await;
        }
        self.gate.pause_monitoring().await;

        // Step 2: willpower gate.
        let (allowed, reason) = self.bdi.check_willpower(0.0).await;
        if !allowed {
            self.events
                .publish(Event::new(EventPayload::ResponseGenerated(ResponseGenerated {
                    content: reason,
                    context_used: Vec::new(),
                    generation_time_ms: start.elapsed().as_millis() as u64,
                })))
                .await;
            self.gate.resume_monitoring().await;
            return;
        }

        // Steps 3-5: gather context, beliefs, needs.
        let context = self.memory.get_context(input, self.config.semantic_search_limit).await;
        let modifiers = self.emotion.get_contextual_modifiers().await;
        let user_beliefs = self.beliefs.get_all("user").await;
        let agent_profile = self.beliefs.get_agent_profile().await;
        let needs = self.bdi.get_need_state().await;

        let think_input = format!(
            "{input}\n\n[user beliefs: {user_beliefs:?}]\n[agent profile: {agent_profile:?}]\n[needs: {needs:?}]\n[mood: {modifiers:?}]"
        );

        // Step 6: cognitive loop, up to 3 attempts.
        let (think_output, speech) = self.cognitive_loop(&think_input, input, &context.working).await;

        // Step 7: emotion update.
        let emotion_label = if think_output.emotion.is_empty() || think_output.emotion == "neutral" {
            infer_emotion(input)
        } else {
            think_output.emotion.as_str()
        };
        let delta = emotion_to_delta(emotion_label);
        self.emotion.update_state(delta, &think_output.intent).await;

        // Step 8: belief writes, before memory writes (§5 ordering).
        for update in &think_output.belief_updates {
            self.beliefs
                .store(&update.entity, &update.relation, &update.value, think_output.confidence, "inference")
                .await;
        }

        // Step 9: memory writes.
        self.memory.add_message(Message::new(Role::User, input.to_string())).await;
        self.memory.add_message(Message::new(Role::Assistant, speech.clone())).await;

        // Step 10: need satisfaction.
        self.bdi.update_need("social", -0.3).await;
        if speech.contains('?') {
            self.bdi.update_need("curiosity", -0.1).await;
        }
        for (name, delta) in &think_output.needs_update {
            self.bdi.update_need(name, *delta).await;
        }

        // Step 11: resume monitoring, publish the result.
        self.gate.resume_monitoring().await;

        let elapsed_ms = start.elapsed().as_millis() as u64;
        *self.last_pipeline_ms.lock().await = Some(elapsed_ms);

        self.events
            .publish(Event::new(EventPayload::ResponseGenerated(ResponseGenerated {
                content: speech.clone(),
                context_used: context.semantic.clone(),
                generation_time_ms: elapsed_ms,
            })))
            .await;

        if is_autonomous {
            self.events
                .publish(Event::new(EventPayload::AutonomousMessageSent(AutonomousMessageSent {
                    content: speech,
                    channel_id: channel_id.unwrap_or_default(),
                })))
                .await;
        }
    }

    async fn cognitive_loop(
        &self,
        think_input: &str,
        raw_input: &str,
        working_memory: &[Message],
    ) -> (ThinkOutput, String) {
        let history: Vec<LlmMessage> = working_memory
            .iter()
            .rev()
            .take(6)
            .rev()
            .map(|m| match m.role {
                Role::User => LlmMessage::user(m.content.clone()),
                Role::Assistant => LlmMessage::assistant(m.content.clone()),
                Role::System => LlmMessage::system(m.content.clone()),
            })
            .collect();

        for _attempt in 0..MAX_VALIDATION_ATTEMPTS {
            let think_output = think(
                self.llm.as_ref(),
                &self.config.think_system_prompt,
                think_input,
                self.config.think_max_tokens,
            )
            .await;

            let speak_prompt = format!(
                "{}\n[INTERNAL STATE] Mood: {} / Goal: {} / Instruction: do not mention internal state",
                self.config.speak_system_prompt, think_output.emotion, think_output.speech_plan
            );

            let speech = speak(
                self.llm.as_ref(),
                &speak_prompt,
                &history,
                raw_input,
                &self.config.persona_anchor,
                self.config.speak_temperature,
                self.config.speak_max_tokens,
                &self.config.stop_tokens,
            )
            .await;

            let result = validate(&think_output, &speech, &self.beliefs).await;
            if result.approved {
                return (think_output, speech);
            }

            if result.severity != Severity::Critical {
                if let Some(corrected) = auto_correct(&speech) {
                    return (think_output, corrected);
                }
            } else {
                tracing::error!(violations = ?result.violations, "validator short-circuited to safe placeholder");
                return (think_output, SAFE_PLACEHOLDER.to_string());
            }
        }

        (ThinkOutput::error_fallback(), SAFE_PLACEHOLDER.to_string())
    }

    /// Health check (SPEC_FULL §4): store reachability + last-pipeline
    /// latency + hibernation state, polled by operational tooling.
    pub async fn health_check(&self) -> HealthStatus {
        let llm_ok = self.llm.health_check().await;
        let belief_summary = self.beliefs.summary().await;
        HealthStatus {
            llm_reachable: llm_ok,
            belief_count: belief_summary.total,
            last_pipeline_ms: *self.last_pipeline_ms.lock().await,
            hibernating: self.gate.is_hibernating().await,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub llm_reachable: bool,
    pub belief_count: u64,
    pub last_pipeline_ms: Option<u64>,
    pub hibernating: bool,
}
