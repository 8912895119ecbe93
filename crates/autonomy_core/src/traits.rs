//! Abstract contracts for external collaborators (§6). These are
//! interface-only: the concrete transport adapter, LLM endpoint, hardware
//! monitor and activity sensor are out of scope for the core.

use async_trait::async_trait;

use crate::events::ActivityKind;

/// A single chat message in an LLM-facing conversation, tagged with a role.
#[derive(Debug, Clone)]
pub struct LlmMessage {
    pub role: &'static str,
    pub content: String,
}

impl LlmMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// `generate(messages, temperature, max_tokens, stop_tokens?, json_mode?) -> string`.
///
/// Implementations must honor `stop_tokens` if supplied, raise on timeout
/// or non-2xx, expose `unload()` to free model memory, and expose
/// `health_check()`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(
        &self,
        messages: &[LlmMessage],
        temperature: f32,
        max_tokens: u32,
        stop_tokens: Option<&[String]>,
        json_mode: bool,
    ) -> anyhow::Result<String>;

    /// Free model memory / unload weights. No-op for remote providers.
    async fn unload(&self) -> anyhow::Result<()>;

    async fn health_check(&self) -> bool;
}

/// `sample() -> {gpu_util, vram_mb, cpu_util, blacklist_hit?}`.
/// Implementations must not block longer than the poll interval.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSample {
    pub gpu_util: f32,
    pub vram_mb: f32,
    pub cpu_util: f32,
    pub blacklist_hit: bool,
}

#[async_trait]
pub trait ResourceProbe: Send + Sync {
    async fn sample(&self) -> anyhow::Result<ResourceSample>;
}

/// `get_context() -> string`, plus emission of `UserActivityChanged`.
#[async_trait]
pub trait ActivitySensor: Send + Sync {
    async fn get_context(&self) -> String;
    async fn current_activity(&self) -> ActivityKind;
}

/// Inbound: the adapter calls the orchestrator's `handle_message`.
/// Outbound: the adapter subscribes to `ResponseGenerated` and
/// `AutonomousMessageSent`, running each `content` through the Speech
/// Governor before delivery.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_chunk(&self, channel_id: &str, text: &str) -> anyhow::Result<()>;
}

/// Narrow seam between the Cognitive Orchestrator and the Resource Gater
/// (§4.9 step 1, §4.11, §5's hibernation coupling), so the two can live in
/// separate crates without either depending on the other's concrete type.
/// The orchestrator wakes the gate before a pipeline and pauses it for the
/// pipeline's duration so resource thresholds can't flip state mid-inference.
#[async_trait]
pub trait HibernationGate: Send + Sync {
    async fn is_hibernating(&self) -> bool;
    async fn wake(&self);
    async fn pause_monitoring(&self);
    async fn resume_monitoring(&self);
}
