//! Stop words and the analyzer that turns a document into TF-IDF terms.

use std::collections::HashSet;

use regex::Regex;

use cxlens_core::error::Result;

/// English function words plus filler that shows up in almost every
/// complaint and carries no theme signal.
pub const STOP_WORDS: &[&str] = &[
	"i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours", "yourself", "yourselves",
	"he", "him", "his", "himself", "she", "her", "hers", "herself", "it", "its", "itself", "they", "them", "their",
	"theirs", "themselves", "what", "which", "who", "whom", "this", "that", "these", "those", "am", "is", "are",
	"was", "were", "be", "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
	"the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by", "for", "with", "about",
	"against", "between", "into", "through", "during", "before", "after", "above", "below", "to", "from", "up",
	"down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once", "here", "there", "when",
	"where", "why", "how", "all", "both", "each", "few", "more", "most", "other", "some", "such", "no", "nor",
	"not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will", "just", "don", "should",
	"now", "ve", "ll", "re", "also", "get", "got", "would", "could",
	// CX filler
	"complaint", "complaints", "please", "like", "one", "even", "still", "since", "us", "every", "use", "used",
	"using", "want", "need", "told", "said", "tell", "say", "know", "go", "going", "come", "back", "make", "made",
	"take", "taken", "time", "times", "day", "days", "week", "weeks", "month", "months", "year", "years", "two",
	"three", "four", "five", "tried", "trying", "keep", "kept",
];

/// Lowercases, splits on runs of two or more word characters, drops stop
/// words and emits unigrams followed by bigrams of the surviving tokens.
pub struct TermAnalyzer {
	token: Regex,
	stop_words: HashSet<&'static str>,
}

impl TermAnalyzer {
	pub fn new() -> Result<Self> {
		Ok(Self { token: Regex::new(r"\b\w\w+\b")?, stop_words: STOP_WORDS.iter().copied().collect() })
	}

	pub fn is_stop_word(&self, word: &str) -> bool {
		self.stop_words.contains(word)
	}

	pub fn tokens(&self, text: &str) -> Vec<String> {
		let lower = text.to_lowercase();
		self.token
			.find_iter(&lower)
			.map(|m| m.as_str())
			.filter(|t| !self.is_stop_word(t))
			.map(str::to_string)
			.collect()
	}

	pub fn terms(&self, text: &str) -> Vec<String> {
		let tokens = self.tokens(text);
		let bigrams: Vec<String> = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1])).collect();
		let mut terms = tokens;
		terms.extend(bigrams);
		terms
	}
}
