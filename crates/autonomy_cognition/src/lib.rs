//! # Cognitive Core, Reality Validator, Cognitive Orchestrator
//!
//! The bicameral Think → Speak pipeline (`think_speak`), the pure-function
//! Reality Validator (`validator`), the emotion-label → PAD-delta table and
//! sentiment fallback consulted at orchestrator step 7 (`emotion_table`,
//! `sentiment`), the pipeline itself (`orchestrator`), and two
//! `LlmClient` implementations (`llm_http`, `llm_mock`).

pub mod emotion_table;
pub mod llm_http;
pub mod llm_mock;
pub mod orchestrator;
pub mod retry;
pub mod sentiment;
pub mod think_speak;
pub mod validator;

pub use llm_http::HttpLlmClient;
pub use llm_mock::MockLlmClient;
pub use orchestrator::{HealthStatus, Orchestrator, OrchestratorConfig};
pub use think_speak::{parse_think_output, BeliefUpdate, ThinkOutput};
pub use validator::{validate, ValidationResult};
