use regex::Regex;

use cxlens_core::error::Result;
use cxlens_core::types::Intent;

const QUANT_PATTERNS: &[&str] = &[
    r"\bhow many\b",
    r"\bhow much\b",
    r"\btotal\b",
    r"\bcount\b",
    r"\bnumber of\b",
    r"\bpercentage\b",
    r"\bpercent\b",
    r"\brate\b",
    r"\bfrequency\b",
    r"\bdistribution\b",
    r"\bbreakdown\b",
    r"\btrend\b",
    r"\btop \d*\s*theme",
    r"\bmost common\b",
    r"\blargest\b",
    r"\bhighest\b",
    r"\blowest\b",
    r"\baverage\b",
    r"\bmean\b",
    r"\bmedian\b",
    r"\bby channel\b",
    r"\bby month\b",
    r"\bby week\b",
    r"\bby product\b",
    r"\bby severity\b",
    r"\bwhich channel\b",
    r"\bwhich product\b",
    r"\bover time\b",
    r"\btime series\b",
];

const QUAL_PATTERNS: &[&str] = &[
    r"\bwhy\b",
    r"\bwhat are customers saying\b",
    r"\bdescribe\b",
    r"\bsummarise\b",
    r"\bsummarize\b",
    r"\bexamples\b",
    r"\bshow me examples\b",
    r"\bwhat kind of\b",
    r"\bexplain\b",
    r"\bissues with\b",
    r"\bcomplaints about\b",
    r"\bfeelings\b",
    r"\bsentiment\b",
    r"\bpain point\b",
    r"\bwhat is wrong\b",
    r"\bwhat do customers\b",
    r"\bwhat are the main\b",
];

/// Words that tip a tied score towards a quantitative reading.
const TIE_BREAK: &str = r"(?i)\b(how|many|count|total|top|which|show)\b";

/// Stateless quantitative/qualitative classifier over fixed pattern lists.
///
/// Each pattern counts at most once per question; the list with strictly
/// more hits wins and ties go to the tie-break word check.
pub struct IntentClassifier {
    quant: Vec<Regex>,
    qual: Vec<Regex>,
    tie_break: Regex,
}

fn compile(patterns: &[&str]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| Ok(Regex::new(&format!("(?i){p}"))?)).collect()
}

impl IntentClassifier {
    pub fn new() -> Result<Self> {
        Ok(Self { quant: compile(QUANT_PATTERNS)?, qual: compile(QUAL_PATTERNS)?, tie_break: Regex::new(TIE_BREAK)? })
    }

    /// Number of distinct (quantitative, qualitative) patterns found in `question`.
    pub fn scores(&self, question: &str) -> (usize, usize) {
        let hits = |set: &[Regex]| set.iter().filter(|re| re.is_match(question)).count();
        (hits(&self.quant), hits(&self.qual))
    }

    pub fn classify(&self, question: &str) -> Intent {
        let (quant, qual) = self.scores(question);
        if quant > qual {
            Intent::Quant
        } else if qual > quant {
            Intent::Qual
        } else if self.tie_break.is_match(question) {
            Intent::Quant
        } else {
            Intent::Qual
        }
    }
}
