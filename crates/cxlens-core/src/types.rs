//! Domain types used by the theme engine, the query router and the CLI.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::table::Table;

pub type ThemeId = usize;

pub const TEXT_CLEAN_COLUMN: &str = "text_clean";
pub const RAW_TEXT_COLUMN: &str = "complaint_text";
pub const THEME_ID_COLUMN: &str = "theme_id";

/// One cleaned complaint row, identified by its position in the dataset.
///
/// `text_clean` is the normalized text the theme engine works on. The
/// remaining fields are optional columns; empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComplaintRecord {
    pub text_clean: String,
    pub raw_text: Option<String>,
    pub date: Option<String>,
    pub channel: Option<String>,
    pub severity: Option<String>,
    pub product: Option<String>,
    pub theme_id: Option<ThemeId>,
}

impl ComplaintRecord {
    pub fn new(text_clean: impl Into<String>) -> Self {
        Self { text_clean: text_clean.into(), ..Self::default() }
    }

    /// Text shown to people: the original wording when the dataset kept it.
    pub fn display_text(&self) -> &str {
        self.raw_text.as_deref().unwrap_or(&self.text_clean)
    }

    pub fn category(&self, field: CategoryField) -> Option<&str> {
        match field {
            CategoryField::Channel => self.channel.as_deref(),
            CategoryField::Severity => self.severity.as_deref(),
            CategoryField::Product => self.product.as_deref(),
        }
    }
}

/// Categorical columns that can be broken down by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryField {
    Channel,
    Severity,
    Product,
}

/// The column a dataset uses for product information, in lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductField {
    ProductCategory,
    Product,
    Category,
}

impl ProductField {
    pub const LOOKUP_ORDER: [ProductField; 3] =
        [ProductField::ProductCategory, ProductField::Product, ProductField::Category];

    pub fn column(self) -> &'static str {
        match self {
            ProductField::ProductCategory => "product_category",
            ProductField::Product => "product",
            ProductField::Category => "category",
        }
    }

    /// Column name with underscores replaced by spaces, e.g. "product category".
    pub fn label(self) -> String {
        self.column().replace('_', " ")
    }
}

/// Which optional columns a dataset carries. Computed once from the headers
/// so that handlers branch on flags instead of looking up columns per query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaCapabilities {
    pub raw_text: bool,
    pub date: bool,
    pub channel: bool,
    pub severity: bool,
    pub product: Option<ProductField>,
}

impl SchemaCapabilities {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let has = |name: &str| headers.iter().any(|h| h.as_ref() == name);
        Self {
            raw_text: has(RAW_TEXT_COLUMN),
            date: has("date"),
            channel: has("channel"),
            severity: has("severity"),
            product: ProductField::LOOKUP_ORDER.into_iter().find(|f| has(f.column())),
        }
    }

    pub fn has(&self, field: CategoryField) -> bool {
        match field {
            CategoryField::Channel => self.channel,
            CategoryField::Severity => self.severity,
            CategoryField::Product => self.product.is_some(),
        }
    }
}

/// The cleaned dataset snapshot handed to the theme engine and the router.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<ComplaintRecord>,
    pub schema: SchemaCapabilities,
}

impl Dataset {
    pub fn new(records: Vec<ComplaintRecord>, schema: SchemaCapabilities) -> Self {
        Self { records, schema }
    }

    /// Build typed records from a cleaned table. `text_clean` is required;
    /// an unparsable `theme_id` cell is treated as unassigned.
    pub fn from_table(table: &Table) -> Result<Self> {
        let text_idx = table
            .column_index(TEXT_CLEAN_COLUMN)
            .ok_or_else(|| Error::NotFound(format!("column '{TEXT_CLEAN_COLUMN}' in cleaned dataset")))?;
        let schema = SchemaCapabilities::from_headers(&table.headers);
        let raw_idx = table.column_index(RAW_TEXT_COLUMN);
        let date_idx = table.column_index("date");
        let channel_idx = table.column_index("channel");
        let severity_idx = table.column_index("severity");
        let product_idx = schema.product.and_then(|f| table.column_index(f.column()));
        let theme_idx = table.column_index(THEME_ID_COLUMN);

        fn optional(row: &[String], idx: Option<usize>) -> Option<String> {
            idx.and_then(|i| row.get(i))
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let records = table
            .rows
            .iter()
            .map(|row| ComplaintRecord {
                text_clean: row.get(text_idx).cloned().unwrap_or_default(),
                raw_text: optional(row, raw_idx),
                date: optional(row, date_idx),
                channel: optional(row, channel_idx),
                severity: optional(row, severity_idx),
                product: optional(row, product_idx),
                theme_id: optional(row, theme_idx).and_then(|v| v.parse().ok()),
            })
            .collect();
        Ok(Self { records, schema })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.text_clean.as_str()).collect()
    }

    /// Store one theme id per record, in record order.
    pub fn assign_themes(&mut self, assignments: &[ThemeId]) -> Result<()> {
        if assignments.len() != self.records.len() {
            return Err(Error::InvalidConfig(format!(
                "{} theme assignments for {} records",
                assignments.len(),
                self.records.len()
            )));
        }
        for (record, &theme_id) in self.records.iter_mut().zip(assignments) {
            record.theme_id = Some(theme_id);
        }
        Ok(())
    }

    /// Count values of a categorical column, most frequent first. Ties keep
    /// first-seen order; records without a value are skipped.
    pub fn breakdown(&self, field: CategoryField) -> Vec<CategoryCount> {
        let mut counts: Vec<CategoryCount> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();
        for value in self.records.iter().filter_map(|r| r.category(field)) {
            match positions.get(value) {
                Some(&pos) => counts[pos].count += 1,
                None => {
                    positions.insert(value, counts.len());
                    counts.push(CategoryCount { value: value.to_string(), count: 1 });
                }
            }
        }
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts
    }
}

/// One surfaced theme: a labeled cluster of complaints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeRecord {
    pub theme_id: ThemeId,
    pub label: String,
    pub count: usize,
    /// Highest centroid weight first.
    pub top_keywords: Vec<String>,
    /// Up to three member texts in dataset order.
    pub example_texts: Vec<String>,
}

impl ThemeRecord {
    pub fn summary(&self) -> ThemeSummary {
        ThemeSummary { theme_id: self.theme_id, label: self.label.clone(), count: self.count }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeSummary {
    pub theme_id: ThemeId,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodCount {
    pub period: String,
    pub count: usize,
}

/// Classified purpose of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Quant,
    Qual,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Quant => "quant",
            Intent::Qual => "qual",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live text-completion backends, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl Provider {
    pub fn tag(self) -> &'static str {
        match self {
            Provider::Anthropic => "anthropic",
            Provider::OpenAi => "openai",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Anthropic => "Anthropic",
            Provider::OpenAi => "OpenAI",
        }
    }
}

/// Which mechanism produced a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Offline,
    Live(Provider),
    Failed(Provider),
}

impl Provenance {
    pub fn tag(self) -> String {
        match self {
            Provenance::Offline => "no-key".to_string(),
            Provenance::Live(p) => p.tag().to_string(),
            Provenance::Failed(p) => format!("{}-error", p.tag()),
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag())
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a concise, data-driven customer experience analyst.";

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tokens: 400,
            temperature: 0.3,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub provenance: Provenance,
}

/// Structured payload of a quantitative answer. Serializes without a tag;
/// `Empty` becomes `{}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Total { total_complaints: usize },
    Themes(Vec<ThemeSummary>),
    Breakdown(Vec<CategoryCount>),
    Trend(Vec<PeriodCount>),
    Summary { total: usize },
    Empty {},
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty {})
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantAnswer {
    pub answer: String,
    pub data: Payload,
    pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualAnswer {
    pub answer: String,
    pub examples: Vec<String>,
    pub confidence: String,
    pub llm_mode: Provenance,
}

/// Answer to one question, tagged with the path that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "query_type", rename_all = "lowercase")]
pub enum QueryResult {
    Quantitative(QuantAnswer),
    Qualitative(QualAnswer),
}

impl QueryResult {
    pub fn query_type(&self) -> &'static str {
        match self {
            QueryResult::Quantitative(_) => "quantitative",
            QueryResult::Qualitative(_) => "qualitative",
        }
    }

    pub fn answer(&self) -> &str {
        match self {
            QueryResult::Quantitative(a) => &a.answer,
            QueryResult::Qualitative(a) => &a.answer,
        }
    }

    pub fn data(&self) -> Option<&Payload> {
        match self {
            QueryResult::Quantitative(a) => Some(&a.data),
            QueryResult::Qualitative(_) => None,
        }
    }

    pub fn examples(&self) -> &[String] {
        match self {
            QueryResult::Quantitative(_) => &[],
            QueryResult::Qualitative(a) => &a.examples,
        }
    }

    pub fn confidence(&self) -> &str {
        match self {
            QueryResult::Quantitative(a) => &a.confidence,
            QueryResult::Qualitative(a) => &a.confidence,
        }
    }

    pub fn llm_mode(&self) -> Option<Provenance> {
        match self {
            QueryResult::Quantitative(_) => None,
            QueryResult::Qualitative(a) => Some(a.llm_mode),
        }
    }
}
