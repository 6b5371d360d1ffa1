//! Writes the analysis outputs and reads the theme table back.
//!
//! One run produces `cleaned_complaints.csv`, `themes.csv`, `summary.md` and
//! `metrics.json` in the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::data_processor::CleaningMetrics;
use crate::dates::parse_date;
use crate::error::{Error, Result};
use crate::table::Table;
use crate::types::{CategoryField, Dataset, ThemeId, ThemeRecord, ThemeSummary, THEME_ID_COLUMN};

pub const CLEANED_CSV: &str = "cleaned_complaints.csv";
pub const THEMES_CSV: &str = "themes.csv";
pub const SUMMARY_MD: &str = "summary.md";
pub const METRICS_JSON: &str = "metrics.json";

const KEYWORD_SEPARATOR: &str = ", ";
const EXAMPLE_SEPARATOR: &str = " | ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub cleaned_csv: PathBuf,
    pub themes_csv: PathBuf,
    pub summary_md: PathBuf,
    pub metrics_json: PathBuf,
}

impl ReportPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cleaned_csv: dir.join(CLEANED_CSV),
            themes_csv: dir.join(THEMES_CSV),
            summary_md: dir.join(SUMMARY_MD),
            metrics_json: dir.join(METRICS_JSON),
        }
    }

    /// Name/path pairs in write order, for printing.
    pub fn entries(&self) -> [(&'static str, &Path); 4] {
        [
            ("cleaned_csv", self.cleaned_csv.as_path()),
            ("themes_csv", self.themes_csv.as_path()),
            ("summary_md", self.summary_md.as_path()),
            ("metrics_json", self.metrics_json.as_path()),
        ]
    }
}

/// On-disk row of `themes.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeRow {
    pub theme_id: ThemeId,
    pub label: String,
    pub count: usize,
    pub top_keywords: String,
    pub example_texts: String,
}

impl From<&ThemeRecord> for ThemeRow {
    fn from(theme: &ThemeRecord) -> Self {
        Self {
            theme_id: theme.theme_id,
            label: theme.label.clone(),
            count: theme.count,
            top_keywords: theme.top_keywords.join(KEYWORD_SEPARATOR),
            example_texts: theme.example_texts.join(EXAMPLE_SEPARATOR),
        }
    }
}

impl From<ThemeRow> for ThemeRecord {
    fn from(row: ThemeRow) -> Self {
        Self {
            theme_id: row.theme_id,
            label: row.label,
            count: row.count,
            top_keywords: split_joined(&row.top_keywords, KEYWORD_SEPARATOR),
            example_texts: split_joined(&row.example_texts, EXAMPLE_SEPARATOR),
        }
    }
}

fn split_joined(value: &str, separator: &str) -> Vec<String> {
    if value.trim().is_empty() {
        return Vec::new();
    }
    value.split(separator).map(str::to_string).collect()
}

#[derive(Serialize)]
struct MetricsFile<'a> {
    generated_at: String,
    cleaning: &'a CleaningMetrics,
    themes: Vec<ThemeSummary>,
}

pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn paths(&self) -> ReportPaths {
        ReportPaths::in_dir(&self.output_dir)
    }

    /// Persist every output of one run. `assignments` holds one theme id per
    /// cleaned row; `themes` is written in the order given.
    pub fn write(
        &self,
        cleaned: &Table,
        assignments: &[ThemeId],
        themes: &[ThemeRecord],
        metrics: &CleaningMetrics,
    ) -> Result<ReportPaths> {
        fs::create_dir_all(&self.output_dir)?;
        let paths = self.paths();

        let mut with_themes = cleaned.clone();
        with_themes.set_column(THEME_ID_COLUMN, assignments.iter().map(ToString::to_string).collect())?;
        with_themes.write_csv(&paths.cleaned_csv)?;
        tracing::info!(path = %paths.cleaned_csv.display(), "Saved");

        let mut wtr = csv::Writer::from_path(&paths.themes_csv)?;
        for theme in themes {
            wtr.serialize(ThemeRow::from(theme))?;
        }
        wtr.flush()?;
        tracing::info!(path = %paths.themes_csv.display(), "Saved");

        let dataset = Dataset::from_table(&with_themes)?;
        fs::write(&paths.summary_md, render_summary(&dataset, themes, metrics))?;
        tracing::info!(path = %paths.summary_md.display(), "Saved");

        let metrics_file = MetricsFile {
            generated_at: Utc::now().to_rfc3339(),
            cleaning: metrics,
            themes: themes.iter().map(ThemeRecord::summary).collect(),
        };
        fs::write(&paths.metrics_json, serde_json::to_string_pretty(&metrics_file)?)?;
        tracing::info!(path = %paths.metrics_json.display(), "Saved");

        Ok(paths)
    }
}

/// Read `themes.csv` back, preserving file order.
pub fn load_themes(path: &Path) -> Result<Vec<ThemeRecord>> {
    if !path.exists() {
        return Err(Error::NotFound(format!("themes file {}", path.display())));
    }
    let mut rdr = csv::Reader::from_path(path)?;
    rdr.deserialize::<ThemeRow>()
        .map(|row| row.map(ThemeRecord::from).map_err(Error::from))
        .collect()
}

/// `1234567` -> `1,234,567`.
pub fn format_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_summary(dataset: &Dataset, themes: &[ThemeRecord], metrics: &CleaningMetrics) -> String {
    let mut lines: Vec<String> = vec![
        "# Customer Complaints Analysis: Summary Report".to_string(),
        format!("\n_Generated: {}_\n", Utc::now().format("%Y-%m-%d %H:%M UTC")),
        "---\n".to_string(),
        "## Dataset Overview\n".to_string(),
        "| Metric | Value |".to_string(),
        "|--------|-------|".to_string(),
        format!("| Raw rows ingested | {} |", format_thousands(metrics.rows_in)),
        format!("| Rows after cleaning | {} |", format_thousands(metrics.rows_out)),
        format!("| Retention rate | {}% |", metrics.rows_retained_pct),
        format!("| Duplicates removed | {} |", format_thousands(metrics.dropped_duplicates)),
        format!("| Null / empty text removed | {} |", format_thousands(metrics.dropped_null_text)),
        format!("| Too-short text removed | {} |", format_thousands(metrics.dropped_short_text)),
        format!("| Text column used | `{}` |", metrics.text_col),
        String::new(),
    ];

    if dataset.schema.date {
        let dates: Vec<_> = dataset.records.iter().filter_map(|r| r.date.as_deref().and_then(parse_date)).collect();
        if let (Some(min), Some(max)) = (dates.iter().min(), dates.iter().max()) {
            lines.push(format!("| Date range | {min} -> {max} |"));
            lines.push(String::new());
        }
    }

    let total = dataset.len().max(1) as f64;
    let mut breakdown_table = |heading: String, first_col: &str, field: CategoryField| {
        lines.push(format!("### Complaints by {heading}\n"));
        lines.push(format!("| {first_col} | Count | Share |"));
        lines.push(format!("|{}|-------|-------|", "-".repeat(first_col.len() + 2)));
        for entry in dataset.breakdown(field) {
            let pct = entry.count as f64 / total * 100.0;
            lines.push(format!("| {} | {} | {:.1}% |", entry.value, entry.count, pct));
        }
        lines.push(String::new());
    };
    if dataset.schema.channel {
        breakdown_table("Channel".to_string(), "Channel", CategoryField::Channel);
    }
    if let Some(product) = dataset.schema.product {
        breakdown_table(title_case(&product.label()), "Category", CategoryField::Product);
    }

    lines.extend([
        "---\n".to_string(),
        "## Top Recurring Themes\n".to_string(),
        "| Rank | Theme | Complaints | Top Keywords |".to_string(),
        "|------|-------|-----------|--------------|".to_string(),
    ]);
    for (rank, theme) in themes.iter().enumerate() {
        let preview = theme.top_keywords.iter().take(5).cloned().collect::<Vec<_>>().join(KEYWORD_SEPARATOR);
        lines.push(format!("| {} | **{}** | {} | {} |", rank + 1, theme.label, theme.count, preview));
    }

    lines.extend([String::new(), "---\n".to_string(), "## Theme Details\n".to_string()]);
    for theme in themes {
        lines.push(format!("### Theme {}: {} ({} complaints)\n", theme.theme_id, theme.label, theme.count));
        lines.push(format!("**Keywords:** {}\n", theme.top_keywords.join(KEYWORD_SEPARATOR)));
        lines.push("**Example complaints:**\n".to_string());
        for (i, example) in theme.example_texts.iter().enumerate() {
            lines.push(format!("> {}. {}", i + 1, example));
        }
        lines.push(String::new());
    }

    lines.push("---\n".to_string());
    lines.push("_Report generated by `cxlens analyze`_".to_string());
    lines.join("\n")
}
