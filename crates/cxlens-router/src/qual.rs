//! Retrieval of matching complaints plus a completion-backed summary.

use std::collections::HashSet;
use std::sync::Arc;

use regex::Regex;

use cxlens_core::error::Result;
use cxlens_core::report::format_thousands;
use cxlens_core::traits::Completer;
use cxlens_core::types::{ComplaintRecord, CompletionRequest, Dataset, Provenance, QualAnswer, ThemeRecord};

/// Examples sent to the completer.
pub const MAX_EXAMPLES: usize = 8;
/// Examples returned with the answer.
pub const SHOWN_EXAMPLES: usize = 3;
const PROMPT_EXAMPLE_CHARS: usize = 200;

const QUERY_STOP_WORDS: &[&str] = &[
    "what", "show", "give", "tell", "about", "with", "from", "that", "have", "more", "some", "many", "which", "this",
    "they", "their", "customers", "complaints", "issues",
];

pub const NO_MATCHES: &str = "No relevant complaints found for this query.";

/// Complaints selected for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieval {
    /// Display texts, at most [`MAX_EXAMPLES`].
    pub examples: Vec<String>,
    /// Rows that survived narrowing and keyword matching.
    pub matched: usize,
}

impl Retrieval {
    pub fn describe(&self) -> String {
        format!(
            "{} matching complaints retrieved (showing top {})",
            format_thousands(self.matched),
            self.examples.len().min(MAX_EXAMPLES)
        )
    }
}

pub struct QualHandler<C>
where
    C: Completer,
{
    dataset: Arc<Dataset>,
    themes: Arc<Vec<ThemeRecord>>,
    completer: C,
    non_word: Regex,
    stop_words: HashSet<&'static str>,
}

impl<C> QualHandler<C>
where
    C: Completer,
{
    pub fn new(dataset: Arc<Dataset>, themes: Arc<Vec<ThemeRecord>>, completer: C) -> Result<Self> {
        Ok(Self {
            dataset,
            themes,
            completer,
            non_word: Regex::new(r"\W+")?,
            stop_words: QUERY_STOP_WORDS.iter().copied().collect(),
        })
    }

    pub fn completer(&self) -> &C {
        &self.completer
    }

    /// First theme (table order) whose label shares a word with the question.
    pub fn matching_theme(&self, question: &str) -> Option<&ThemeRecord> {
        let q = question.to_lowercase();
        let words: HashSet<&str> = q.split_whitespace().collect();
        self.themes.iter().find(|theme| {
            let label = theme.label.to_lowercase();
            label.split_whitespace().any(|w| words.contains(w))
        })
    }

    /// Question words longer than three characters, minus generic filler.
    pub fn keywords(&self, question: &str) -> Vec<String> {
        self.non_word
            .split(&question.to_lowercase())
            .filter(|w| w.chars().count() > 3 && !self.stop_words.contains(w))
            .map(str::to_string)
            .collect()
    }

    pub fn retrieve(&self, question: &str) -> Retrieval {
        let pool: Vec<&ComplaintRecord> = match self.matching_theme(question) {
            Some(theme) => {
                tracing::debug!(theme_id = theme.theme_id, label = %theme.label, "Narrowed to theme");
                self.dataset.records.iter().filter(|r| r.theme_id == Some(theme.theme_id)).collect()
            }
            None => self.dataset.records.iter().collect(),
        };

        let keywords = self.keywords(question);
        let hits: Vec<&ComplaintRecord> = pool
            .iter()
            .copied()
            .filter(|r| {
                let text = r.text_clean.to_lowercase();
                keywords.iter().any(|k| text.contains(k.as_str()))
            })
            .collect();
        let matched = if keywords.is_empty() || hits.is_empty() { pool } else { hits };

        Retrieval {
            examples: matched.iter().take(MAX_EXAMPLES).map(|r| r.display_text().to_string()).collect(),
            matched: matched.len(),
        }
    }

    pub fn build_prompt(question: &str, examples: &[String]) -> String {
        let bullets: Vec<String> = examples
            .iter()
            .map(|e| format!("- \"{}\"", e.chars().take(PROMPT_EXAMPLE_CHARS).collect::<String>()))
            .collect();
        format!(
            "A customer experience analyst is reviewing customer complaints.\n\n\
             Question: {question}\n\n\
             Relevant complaint examples ({} retrieved):\n\
             {}\n\n\
             Provide a concise analysis (3–5 sentences) that:\n\
             1. Identifies the core pain points\n\
             2. Notes any patterns (urgency, frequency, channel, severity)\n\
             3. Suggests one concrete, actionable recommendation\n",
            examples.len(),
            bullets.join("\n")
        )
    }

    pub fn handle(&self, question: &str) -> QualAnswer {
        let retrieval = self.retrieve(question);
        let confidence = retrieval.describe();
        if retrieval.examples.is_empty() {
            return QualAnswer {
                answer: NO_MATCHES.to_string(),
                examples: Vec::new(),
                confidence,
                llm_mode: Provenance::Offline,
            };
        }

        let prompt = Self::build_prompt(question, &retrieval.examples);
        let completion = self.completer.complete(&CompletionRequest::new(prompt));
        QualAnswer {
            answer: completion.text,
            examples: retrieval.examples.into_iter().take(SHOWN_EXAMPLES).collect(),
            confidence,
            llm_mode: completion.provenance,
        }
    }
}
