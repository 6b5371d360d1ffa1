use std::sync::{Arc, Mutex};
use std::time::Duration;

use cxlens_core::config::LlmSettings;
use cxlens_core::traits::Completer;
use cxlens_core::types::{Completion, CompletionRequest, Provenance, Provider};
use cxlens_llm::{Attempt, CompletionChain, CompletionStrategy, HttpProvider, OfflineFallback};

/// Records the requests it sees and answers with a fixed outcome.
struct Scripted {
    outcome: Option<Completion>,
    seen: Arc<Mutex<Vec<u32>>>,
}

impl CompletionStrategy for Scripted {
    fn mode(&self) -> Option<Provenance> {
        self.outcome.as_ref().map(|c| c.provenance)
    }

    fn attempt(&self, request: &CompletionRequest) -> Attempt {
        self.seen.lock().unwrap().push(request.max_tokens);
        match &self.outcome {
            Some(c) => Attempt::Completed(c.clone()),
            None => Attempt::Declined,
        }
    }
}

fn scripted(outcome: Option<Completion>) -> (Box<dyn CompletionStrategy>, Arc<Mutex<Vec<u32>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    (Box::new(Scripted { outcome, seen: seen.clone() }), seen)
}

const PROMPT: &str = "Question: why?\n\nRelevant complaint examples (3 retrieved):\n\
- \"my card was declined twice at the grocery store\"\n\
- \"overdraft fee charged even though I had funds\"\n\
- \"short one\"\n\
- \"the mobile app logs me out every few minutes and I lose my work\"\n\
\nProvide a concise analysis";

#[test]
fn offline_echoes_long_bullets() {
    let completion = OfflineFallback::new().complete(&CompletionRequest::new(PROMPT));
    assert_eq!(completion.provenance, Provenance::Offline);
    assert_eq!(completion.provenance.tag(), "no-key");

    let text = completion.text;
    assert!(text.starts_with("Based on the retrieved complaint examples"));
    assert!(text.contains("  • my card was declined twice at the grocery store\n"));
    assert!(text.contains("  • overdraft fee charged even though I had funds\n"));
    assert!(text.contains("  • the mobile app logs me out every few minutes and I lose my work\n"));
    assert!(!text.contains("short one"), "lines of 15 characters or fewer are skipped");
    assert_eq!(text.matches("  • ").count(), 3);
    assert!(text.contains("24-hour SLA target"));
    assert!(text.ends_with("AI-generated analysis)_"));
}

#[test]
fn offline_truncates_and_caps_bullets() {
    let long = "x".repeat(300);
    let prompt: String = (0..6).map(|i| format!("- \"{i}{long}\"\n")).collect();
    let bullets = OfflineFallback::bullets(&prompt);
    assert_eq!(bullets.len(), 4);

    let text = OfflineFallback::new().summarize(&prompt);
    for line in text.lines().filter(|l| l.starts_with("  • ")) {
        assert_eq!(line.trim_start_matches("  • ").chars().count(), 120);
    }
}

#[test]
fn offline_without_bullets_uses_template() {
    let text = OfflineFallback::new().summarize("Question: what is happening?");
    assert!(text.starts_with("The selected complaints share themes"));
    assert!(text.contains("20% week-over-week"));
    assert_eq!(text, OfflineFallback::new().summarize("Question: what is happening?"));
}

#[test]
fn chain_skips_declining_strategies_and_stops_at_first_completion() {
    let (declines, declined_seen) = scripted(None);
    let live = Completion { text: "live answer".to_string(), provenance: Provenance::Live(Provider::OpenAi) };
    let (answers, answered_seen) = scripted(Some(live.clone()));
    let (never, never_seen) = scripted(Some(Completion {
        text: "unused".to_string(),
        provenance: Provenance::Live(Provider::Anthropic),
    }));

    let chain = CompletionChain::new(vec![declines, answers, never], 400);
    assert_eq!(chain.mode(), Provenance::Live(Provider::OpenAi));
    assert_eq!(chain.complete(&CompletionRequest::new("hi")), live);
    assert_eq!(declined_seen.lock().unwrap().len(), 1);
    assert_eq!(answered_seen.lock().unwrap().len(), 1);
    assert!(never_seen.lock().unwrap().is_empty());
}

#[test]
fn failed_provider_does_not_fall_through() {
    let failed = Completion {
        text: "[Anthropic error — boom]".to_string(),
        provenance: Provenance::Failed(Provider::Anthropic),
    };
    let (first, _) = scripted(Some(failed.clone()));
    let chain = CompletionChain::new(vec![first], 400);
    let result = chain.complete(&CompletionRequest::new(PROMPT));
    assert_eq!(result, failed);
    assert_eq!(result.provenance.tag(), "anthropic-error");
}

#[test]
fn chain_clamps_max_tokens() {
    let (declines, seen) = scripted(None);
    let chain = CompletionChain::new(vec![declines], 150);
    chain.complete(&CompletionRequest::new("hi").with_max_tokens(4000));
    chain.complete(&CompletionRequest::new("hi").with_max_tokens(100));
    assert_eq!(*seen.lock().unwrap(), vec![150, 100]);
}

#[test]
fn all_declined_resolves_offline() {
    let (a, _) = scripted(None);
    let (b, _) = scripted(None);
    let chain = CompletionChain::new(vec![a, b], 400);
    assert_eq!(chain.mode(), Provenance::Offline);
    let completion = chain.complete(&CompletionRequest::new(PROMPT));
    assert_eq!(completion.provenance, Provenance::Offline);
    assert_eq!(completion.text, OfflineFallback::new().summarize(PROMPT));
}

#[test]
fn forced_offline_settings_disable_live_providers() {
    let settings = LlmSettings { force_offline: true, ..LlmSettings::default() };
    let chain = CompletionChain::from_settings(&settings);
    assert_eq!(chain.mode(), Provenance::Offline);
    assert_eq!(chain.max_tokens(), 400);
}

#[test]
fn provider_without_key_declines() {
    let provider = HttpProvider::new(Provider::Anthropic, None, "claude-3-haiku-20240307", Duration::from_secs(1));
    assert_eq!(provider.mode(), None);
    assert_eq!(provider.attempt(&CompletionRequest::new("hi")), Attempt::Declined);

    let blank = HttpProvider::new(Provider::OpenAi, Some("  ".to_string()), "gpt-3.5-turbo", Duration::from_secs(1));
    assert_eq!(blank.mode(), None);
}

#[test]
fn unreachable_provider_reports_inline_error() {
    let provider = HttpProvider::new(Provider::OpenAi, Some("sk-test".to_string()), "gpt-3.5-turbo", Duration::from_secs(2))
        .with_endpoint("http://127.0.0.1:9/v1/chat/completions");
    assert_eq!(provider.mode(), Some(Provenance::Live(Provider::OpenAi)));
    // Second call reuses the runtime built by the first.
    for _ in 0..2 {
        match provider.attempt(&CompletionRequest::new("hi")) {
            Attempt::Completed(c) => {
                assert_eq!(c.provenance, Provenance::Failed(Provider::OpenAi));
                assert!(c.text.starts_with("[OpenAI error — "));
                assert!(c.text.ends_with(']'));
            }
            Attempt::Declined => panic!("provider with a key must not decline"),
        }
    }
}

#[tokio::test]
async fn provider_called_inside_async_runtime_reports_inline_error() {
    let provider = HttpProvider::new(Provider::Anthropic, Some("sk-test".to_string()), "claude-3-haiku-20240307", Duration::from_secs(2))
        .with_endpoint("http://127.0.0.1:9/v1/messages");
    match provider.attempt(&CompletionRequest::new("hi")) {
        Attempt::Completed(c) => {
            assert_eq!(c.provenance, Provenance::Failed(Provider::Anthropic));
            assert!(c.text.starts_with("[Anthropic error — "));
            assert!(!c.text.contains("panicked"));
        }
        Attempt::Declined => panic!("provider with a key must not decline"),
    }
    // Dropping the provider here must not panic either.
    drop(provider);
}

#[tokio::test]
async fn provider_is_usable_from_a_blocking_task() {
    let provider = HttpProvider::new(Provider::OpenAi, Some("sk-test".to_string()), "gpt-3.5-turbo", Duration::from_secs(2))
        .with_endpoint("http://127.0.0.1:9/v1/chat/completions");
    let attempt = tokio::task::spawn_blocking(move || provider.attempt(&CompletionRequest::new("hi")))
        .await
        .unwrap();
    match attempt {
        Attempt::Completed(c) => {
            assert_eq!(c.provenance, Provenance::Failed(Provider::OpenAi));
            assert!(c.text.starts_with("[OpenAI error — "));
        }
        Attempt::Declined => panic!("provider with a key must not decline"),
    }
}
