//! # System 1: Emotion Service and BDI Engine
//!
//! Fast, non-deliberative state regulation that runs independently of the
//! Cognitive Core's LLM calls: the PAD emotional vector with inertia and a
//! grudge latch (`emotion`), time-decaying metabolic needs and intention
//! formation (`bdi`), and the deterministic circadian model both consult
//! (`circadian`). Both `EmotionService` and `BdiEngine` are driven by a
//! background `tokio` task on a `heartbeat` interval; they own their state
//! and communicate upward only through the `autonomy_core` event bus.

pub mod bdi;
pub mod circadian;
pub mod emotion;
pub mod heartbeat;

pub use bdi::{BdiEngine, Intention};
pub use emotion::EmotionService;
pub use heartbeat::HeartbeatConfig;
