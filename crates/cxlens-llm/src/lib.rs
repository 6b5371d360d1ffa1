//! cxlens-llm
//!
//! Text completion for the qualitative answer path. Live providers are tried
//! in order (Anthropic, then OpenAI) and the deterministic [`OfflineFallback`]
//! closes the chain, so a request always resolves to a `Completion`.
//!
//! Set `APP_OFFLINE_LLM=1` (or `llm.force_offline = true`) to skip live
//! providers even when `ANTHROPIC_API_KEY` / `OPENAI_API_KEY` are present.

pub mod http;
pub mod offline;

use std::time::Duration;

use cxlens_core::config::LlmSettings;
use cxlens_core::traits::Completer;
use cxlens_core::types::{Completion, CompletionRequest, Provenance, Provider};

pub use http::HttpProvider;
pub use offline::OfflineFallback;

pub const ANTHROPIC_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
pub const OFFLINE_VAR: &str = "APP_OFFLINE_LLM";

/// Outcome of offering a request to one strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// The strategy handled the request, successfully or not.
    Completed(Completion),
    /// The strategy is not usable right now; try the next one.
    Declined,
}

pub trait CompletionStrategy: Send + Sync {
    /// Provenance this strategy would produce if asked now, `None` if it
    /// would decline.
    fn mode(&self) -> Option<Provenance>;
    fn attempt(&self, request: &CompletionRequest) -> Attempt;
}

pub fn offline_forced() -> bool {
    std::env::var(OFFLINE_VAR)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

pub struct CompletionChain {
    strategies: Vec<Box<dyn CompletionStrategy>>,
    fallback: OfflineFallback,
    max_tokens: u32,
}

impl CompletionChain {
    pub fn new(strategies: Vec<Box<dyn CompletionStrategy>>, max_tokens: u32) -> Self {
        Self { strategies, fallback: OfflineFallback::new(), max_tokens }
    }

    /// Only the offline fallback.
    pub fn offline(max_tokens: u32) -> Self {
        Self::new(Vec::new(), max_tokens)
    }

    /// Anthropic then OpenAI, keyed from the environment.
    pub fn from_settings(settings: &LlmSettings) -> Self {
        if settings.force_offline || offline_forced() {
            tracing::info!("Offline completion forced; live providers disabled");
            return Self::offline(settings.max_tokens);
        }
        let timeout = Duration::from_secs(settings.timeout_secs);
        let strategies: Vec<Box<dyn CompletionStrategy>> = vec![
            Box::new(HttpProvider::new(
                Provider::Anthropic,
                env_key(ANTHROPIC_KEY_VAR),
                settings.anthropic_model.clone(),
                timeout,
            )),
            Box::new(HttpProvider::new(Provider::OpenAi, env_key(OPENAI_KEY_VAR), settings.openai_model.clone(), timeout)),
        ];
        Self::new(strategies, settings.max_tokens)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

impl Completer for CompletionChain {
    fn complete(&self, request: &CompletionRequest) -> Completion {
        let request = request.clone().with_max_tokens(request.max_tokens.min(self.max_tokens));
        for strategy in &self.strategies {
            if let Attempt::Completed(completion) = strategy.attempt(&request) {
                return completion;
            }
        }
        self.fallback.complete(&request)
    }

    fn mode(&self) -> Provenance {
        self.strategies.iter().find_map(|s| s.mode()).unwrap_or(Provenance::Offline)
    }
}
