//! Deterministic stand-in used when no live provider answers.
//!
//! Echoes the bulleted example lines found in the prompt under a fixed lead
//! sentence and recommendation. Makes no external calls.

use cxlens_core::traits::Completer;
use cxlens_core::types::{Completion, CompletionRequest, Provenance};

const MIN_BULLET_CHARS: usize = 15;
const MAX_BULLETS: usize = 4;
const BULLET_CHARS: usize = 120;

const LEAD: &str = "Based on the retrieved complaint examples, customers are experiencing the following issues:";
const RECOMMENDATION: &str = "Recommendation: Prioritise root-cause investigation for the most-frequent pain point \
     and set up a dedicated fast-resolution queue with a 24-hour SLA target.";
const GENERIC: &str = "The selected complaints share themes around service quality, technical reliability, \
     and billing transparency. Recommend monitoring complaint volume weekly and escalating any theme that \
     grows more than 20% week-over-week.";
const NO_KEY_NOTE: &str =
    "_(NO-KEY MODE — set OPENAI_API_KEY or ANTHROPIC_API_KEY for AI-generated analysis)_";

#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFallback;

impl OfflineFallback {
    pub fn new() -> Self {
        Self
    }

    /// Lines of `prompt` that start with `-` or `"`, unwrapped, longer than
    /// 15 characters, at most four.
    pub fn bullets(prompt: &str) -> Vec<String> {
        prompt
            .lines()
            .map(str::trim)
            .filter(|line| line.starts_with('-') || line.starts_with('"'))
            .map(|line| line.trim_start_matches('-').trim().trim_matches('"').trim().to_string())
            .filter(|line| line.chars().count() > MIN_BULLET_CHARS)
            .take(MAX_BULLETS)
            .collect()
    }

    pub fn summarize(&self, prompt: &str) -> String {
        let bullets = Self::bullets(prompt);
        if bullets.is_empty() {
            return format!("{GENERIC}\n\n{NO_KEY_NOTE}");
        }
        let lines: Vec<String> =
            bullets.iter().map(|b| format!("  • {}", b.chars().take(BULLET_CHARS).collect::<String>())).collect();
        format!("{LEAD}\n{}\n\n{RECOMMENDATION}\n\n{NO_KEY_NOTE}", lines.join("\n"))
    }
}

impl Completer for OfflineFallback {
    fn complete(&self, request: &CompletionRequest) -> Completion {
        Completion { text: self.summarize(&request.prompt), provenance: Provenance::Offline }
    }

    fn mode(&self) -> Provenance {
        Provenance::Offline
    }
}
