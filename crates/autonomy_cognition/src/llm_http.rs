//! `HttpLlmClient`: a generic OpenAI-compatible chat-completions client
//! implementing `autonomy_core::traits::LlmClient`, with exponential
//! backoff retry (§5) over a plain chat-message request/response shape.

use std::time::Duration;

use async_trait::async_trait;
use autonomy_core::traits::{LlmClient, LlmMessage};
use serde_json::{json, Value};

use crate::retry::{with_retry, RetryConfig};

pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    retry_config: RetryConfig,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout_s: u64, retries: u32) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_s))
            .build()?;
        let api_key = std::env::var("AUTONOMY_LLM_API_KEY").ok();
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            retry_config: RetryConfig {
                max_attempts: retries.max(1),
                ..RetryConfig::default()
            },
        })
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(
        &self,
        messages: &[LlmMessage],
        temperature: f32,
        max_tokens: u32,
        stop_tokens: Option<&[String]>,
        json_mode: bool,
    ) -> anyhow::Result<String> {
        let payload_messages: Vec<Value> = messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut payload = json!({
            "model": self.model,
            "messages": payload_messages,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if let Some(stops) = stop_tokens {
            if !stops.is_empty() {
                payload["stop"] = json!(stops);
            }
        }
        if json_mode {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        let url = format!("{}/chat/completions", self.base_url);
        let response = with_retry(&self.retry_config, "llm", || {
            let mut req = self.client.post(&url).json(&payload);
            if let Some(key) = &self.api_key {
                req = req.header("Authorization", format!("Bearer {key}"));
            }
            async move { Ok(req.send().await?) }
        })
        .await?;

        let body: Value = response.json().await?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("LLM response missing choices[0].message.content"))?;
        Ok(content.to_string())
    }

    async fn unload(&self) -> anyhow::Result<()> {
        let url = format!("{}/unload", self.base_url);
        match self.client.post(&url).send().await {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "LLM endpoint has no /unload hook, treating as no-op");
                Ok(())
            }
        }
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/models", self.base_url);
        matches!(self.client.get(&url).send().await, Ok(resp) if resp.status().is_success())
    }
}
