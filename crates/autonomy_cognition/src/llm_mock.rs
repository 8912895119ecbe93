//! Mock `LlmClient` for tests and offline development: a canned-response
//! queue standing in for a real model endpoint.

use std::collections::VecDeque;

use async_trait::async_trait;
use autonomy_core::traits::{LlmClient, LlmMessage};
use tokio::sync::Mutex;

/// Either a single canned response repeated for every call, or a fixed
/// script consumed one response per call (useful for exercising the
/// Think/Speak two-call sequence in orchestrator tests).
enum Responses {
    Repeating(String),
    Scripted(VecDeque<String>),
}

pub struct MockLlmClient {
    responses: Mutex<Responses>,
    calls: Mutex<u32>,
}

impl MockLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(Responses::Repeating(response.into())),
            calls: Mutex::new(0),
        }
    }

    /// `responses[0]` answers the first `generate()` call, `responses[1]`
    /// the second, and so on; the last entry repeats once exhausted.
    pub fn scripted(responses: Vec<impl Into<String>>) -> Self {
        Self {
            responses: Mutex::new(Responses::Scripted(responses.into_iter().map(Into::into).collect())),
            calls: Mutex::new(0),
        }
    }

    pub async fn call_count(&self) -> u32 {
        *self.calls.lock().await
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(
        &self,
        _messages: &[LlmMessage],
        _temperature: f32,
        _max_tokens: u32,
        _stop_tokens: Option<&[String]>,
        _json_mode: bool,
    ) -> anyhow::Result<String> {
        let mut calls = self.calls.lock().await;
        *calls += 1;
        let mut responses = self.responses.lock().await;
        match &mut *responses {
            Responses::Repeating(text) => Ok(text.clone()),
            Responses::Scripted(queue) => {
                if queue.len() > 1 {
                    Ok(queue.pop_front().unwrap_or_default())
                } else {
                    Ok(queue.front().cloned().unwrap_or_default())
                }
            }
        }
    }

    async fn unload(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
