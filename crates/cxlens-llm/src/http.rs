//! Live completion over the Anthropic Messages and OpenAI Chat Completions
//! HTTP APIs.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use tokio::runtime::{Handle, Runtime};
use serde::Deserialize;
use serde_json::json;

use cxlens_core::types::{Completion, CompletionRequest, Provenance, Provider};

use crate::{Attempt, CompletionStrategy};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicBlock>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

/// One live provider. Declines when it has no API key.
///
/// Calls block on a current-thread runtime owned by the provider, built on
/// first use and reused afterwards. Inside another tokio runtime the call
/// is driven from a scoped worker thread.
pub struct HttpProvider {
    provider: Provider,
    api_key: Option<String>,
    model: String,
    endpoint: String,
    timeout: Duration,
    runtime: OnceLock<std::io::Result<Runtime>>,
}

impl HttpProvider {
    pub fn new(provider: Provider, api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            endpoint: default_endpoint(provider).to_string(),
            timeout,
            runtime: OnceLock::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn call(&self, api_key: &str, request: &CompletionRequest) -> Result<String> {
        let runtime = self
            .runtime
            .get_or_init(|| tokio::runtime::Builder::new_current_thread().enable_all().build())
            .as_ref()
            .map_err(|e| anyhow!("failed to start HTTP runtime: {}", e))?;
        if Handle::try_current().is_err() {
            return runtime.block_on(self.send(api_key, request));
        }
        // block_on panics on a thread that is already driving a runtime.
        std::thread::scope(|scope| scope.spawn(|| runtime.block_on(self.send(api_key, request))).join())
            .map_err(|_| anyhow!("HTTP worker thread panicked"))?
    }

    async fn send(&self, api_key: &str, request: &CompletionRequest) -> Result<String> {
        let client = Client::builder().timeout(self.timeout).build()?;
        let builder = match self.provider {
            Provider::Anthropic => client
                .post(&self.endpoint)
                .header("x-api-key", api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&json!({
                    "model": self.model,
                    "max_tokens": request.max_tokens,
                    "temperature": request.temperature,
                    "system": request.system,
                    "messages": [{"role": "user", "content": request.prompt}],
                })),
            Provider::OpenAi => client.post(&self.endpoint).bearer_auth(api_key).json(&json!({
                "model": self.model,
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
                "messages": [
                    {"role": "system", "content": request.system},
                    {"role": "user", "content": request.prompt},
                ],
            })),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let preview: String = body.chars().take(300).collect();
            return Err(anyhow!("HTTP {}: {}", status, preview));
        }

        let text = match self.provider {
            Provider::Anthropic => serde_json::from_str::<AnthropicResponse>(&body)?
                .content
                .into_iter()
                .next()
                .map(|block| block.text),
            Provider::OpenAi => serde_json::from_str::<OpenAiResponse>(&body)?
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        };
        text.map(|t| t.trim().to_string()).ok_or_else(|| anyhow!("response contained no text"))
    }
}

impl CompletionStrategy for HttpProvider {
    fn mode(&self) -> Option<Provenance> {
        self.api_key.as_ref().map(|_| Provenance::Live(self.provider))
    }

    fn attempt(&self, request: &CompletionRequest) -> Attempt {
        let Some(api_key) = self.api_key.as_deref() else {
            return Attempt::Declined;
        };
        match self.call(api_key, request) {
            Ok(text) => Attempt::Completed(Completion { text, provenance: Provenance::Live(self.provider) }),
            Err(e) => {
                tracing::warn!(provider = self.provider.tag(), model = %self.model, error = %e, "Completion failed");
                Attempt::Completed(Completion {
                    text: format!("[{} error — {}]", self.provider.display_name(), e),
                    provenance: Provenance::Failed(self.provider),
                })
            }
        }
    }
}

impl Drop for HttpProvider {
    fn drop(&mut self) {
        // Dropping a runtime from within an async context panics.
        if let Some(Ok(runtime)) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

pub fn default_endpoint(provider: Provider) -> &'static str {
    match provider {
        Provider::Anthropic => "https://api.anthropic.com/v1/messages",
        Provider::OpenAi => "https://api.openai.com/v1/chat/completions",
    }
}
