use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::table::Table;
use crate::types::TEXT_CLEAN_COLUMN;

/// Column names likely to hold complaint text, best first.
pub const TEXT_COLUMN_CANDIDATES: &[&str] = &[
    "complaint_text",
    "complaint",
    "text",
    "description",
    "message",
    "body",
    "content",
    "notes",
    "comments",
    "feedback",
    "issue",
    "details",
    "narrative",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub drop_duplicates: bool,
    pub min_text_length: usize,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self { drop_duplicates: true, min_text_length: 10 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningMetrics {
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_retained_pct: f64,
    pub dropped_all_null_rows: usize,
    pub dropped_null_text: usize,
    pub dropped_duplicates: usize,
    pub dropped_short_text: usize,
    pub text_col: String,
}

/// Lowercases and strips URLs, e-mail addresses and stray symbols.
pub struct TextNormalizer {
    url: Regex,
    email: Regex,
    special: Regex,
    whitespace: Regex,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            url: Regex::new(r"(?i)https?://\S+|www\.\S+")?,
            email: Regex::new(r"(?i)\S+@\S+\.\S+")?,
            special: Regex::new(r"[^\w\s.,!?'\-]")?,
            whitespace: Regex::new(r"\s+")?,
        })
    }

    pub fn normalize(&self, text: &str) -> String {
        let text = text.to_lowercase();
        let text = self.url.replace_all(&text, " ");
        let text = self.email.replace_all(&text, " ");
        let text = self.special.replace_all(&text, " ");
        let text = self.whitespace.replace_all(&text, " ");
        text.trim().to_string()
    }
}

pub struct DataProcessor {
    cleaning_config: CleaningConfig,
    normalizer: TextNormalizer,
}

impl DataProcessor {
    pub fn new(cleaning_config: CleaningConfig) -> Result<Self> {
        Ok(Self { cleaning_config, normalizer: TextNormalizer::new()? })
    }

    /// Clean a raw complaints table and append a `text_clean` column.
    ///
    /// Steps, in order: drop fully empty rows, drop rows with empty text,
    /// drop duplicate texts (first kept), normalize, drop texts shorter than
    /// `min_text_length` characters after normalization.
    pub fn process(&self, table: &Table, text_col: Option<&str>) -> Result<(Table, CleaningMetrics)> {
        let text_col = match text_col {
            Some(col) if table.column_index(col).is_some() => col.to_string(),
            Some(col) => return Err(Error::NotFound(format!("text column '{}'", col))),
            None => detect_text_column(table)?,
        };
        let text_idx = table
            .column_index(&text_col)
            .ok_or_else(|| Error::NotFound(format!("text column '{}'", text_col)))?;
        let mut metrics = CleaningMetrics { rows_in: table.len(), text_col: text_col.clone(), ..Default::default() };

        let rows: Vec<&Vec<String>> = table.rows.iter().filter(|row| row.iter().any(|c| !c.trim().is_empty())).collect();
        metrics.dropped_all_null_rows = table.len() - rows.len();

        let before = rows.len();
        let rows: Vec<&Vec<String>> = rows.into_iter().filter(|row| !row[text_idx].trim().is_empty()).collect();
        metrics.dropped_null_text = before - rows.len();

        let rows = if self.cleaning_config.drop_duplicates {
            let before = rows.len();
            let mut seen: HashSet<&str> = HashSet::new();
            let deduped: Vec<&Vec<String>> = rows.into_iter().filter(|row| seen.insert(row[text_idx].as_str())).collect();
            metrics.dropped_duplicates = before - deduped.len();
            deduped
        } else {
            rows
        };

        let before = rows.len();
        let mut cleaned = Table { headers: table.headers.clone(), rows: Vec::with_capacity(rows.len()) };
        let mut clean_texts = Vec::with_capacity(rows.len());
        for row in rows {
            let clean = self.normalizer.normalize(&row[text_idx]);
            if clean.chars().count() < self.cleaning_config.min_text_length {
                continue;
            }
            cleaned.rows.push(row.clone());
            clean_texts.push(clean);
        }
        metrics.dropped_short_text = before - cleaned.len();
        cleaned.set_column(TEXT_CLEAN_COLUMN, clean_texts)?;

        metrics.rows_out = cleaned.len();
        metrics.rows_retained_pct = if metrics.rows_in > 0 {
            round1(metrics.rows_out as f64 / metrics.rows_in as f64 * 100.0)
        } else {
            0.0
        };

        tracing::info!(
            rows_in = metrics.rows_in,
            rows_out = metrics.rows_out,
            retained_pct = metrics.rows_retained_pct,
            duplicates = metrics.dropped_duplicates,
            null_text = metrics.dropped_null_text,
            too_short = metrics.dropped_short_text,
            "Cleaning complete"
        );
        Ok((cleaned, metrics))
    }
}

/// Pick the column holding complaint text.
///
/// Known names win (case-insensitive, ranked). Otherwise the non-numeric
/// column with the longest average non-empty value is used.
pub fn detect_text_column(table: &Table) -> Result<String> {
    for candidate in TEXT_COLUMN_CANDIDATES {
        if let Some(header) = table.headers.iter().find(|h| h.to_lowercase() == *candidate) {
            tracing::debug!(column = %header, "Auto-detected text column by name");
            return Ok(header.clone());
        }
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, _) in table.headers.iter().enumerate() {
        let values: Vec<&str> = table.rows.iter().map(|r| r[idx].trim()).filter(|v| !v.is_empty()).collect();
        if values.is_empty() || values.iter().all(|v| v.parse::<f64>().is_ok()) {
            continue;
        }
        let avg = values.iter().map(|v| v.chars().count()).sum::<usize>() as f64 / values.len() as f64;
        if best.map_or(true, |(_, best_avg)| avg > best_avg) {
            best = Some((idx, avg));
        }
    }

    match best {
        Some((idx, avg)) => {
            let column = table.headers[idx].clone();
            tracing::warn!(
                column = %column,
                avg_chars = avg.round(),
                "Text column not found by name; falling back to the longest string column. Pass --text-col to override."
            );
            Ok(column)
        }
        None => Err(Error::NotFound(
            "no string/text column in the CSV; pass --text-col <column_name> explicitly".to_string(),
        )),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
