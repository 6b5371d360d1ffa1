//! Aggregate answers computed straight from the dataset snapshot.

use std::collections::BTreeMap;
use std::sync::Arc;

use regex::Regex;

use cxlens_core::dates::{month_period, parse_date, week_period};
use cxlens_core::error::Result;
use cxlens_core::report::format_thousands;
use cxlens_core::types::{CategoryCount, CategoryField, Dataset, Payload, PeriodCount, QuantAnswer, ThemeRecord};

/// Aggregation a quantitative question resolves to, in matching priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantQuery {
    Count,
    TopThemes,
    AllThemes,
    Channel,
    Trend { weekly: bool },
    Severity,
    Product,
    Summary,
}

const NOT_AVAILABLE: &str = "N/A";

pub struct QuantHandler {
    dataset: Arc<Dataset>,
    themes: Arc<Vec<ThemeRecord>>,
    rules: Vec<(Regex, QuantQuery)>,
}

impl QuantHandler {
    pub fn new(dataset: Arc<Dataset>, themes: Arc<Vec<ThemeRecord>>) -> Result<Self> {
        let rules = vec![
            (Regex::new(r"\bhow many\b|\btotal\b|\bcount\b|\bnumber of\b")?, QuantQuery::Count),
            (
                Regex::new(r"\btop theme|\bbiggest theme|\bmost common theme|\blargest theme\b")?,
                QuantQuery::TopThemes,
            ),
            (Regex::new(r"\btheme|\bcluster|\btopic|\bsegment\b")?, QuantQuery::AllThemes),
            (Regex::new(r"\bchannel|\bemail|\bphone|\bchat|\bsocial\b")?, QuantQuery::Channel),
            (Regex::new(r"\btrend|\bmonth|\bweek|\bover time|\btime series\b")?, QuantQuery::Trend { weekly: false }),
            (Regex::new(r"\bseverity|\bhigh|\bcritical|\burgent|\blow\b")?, QuantQuery::Severity),
            (Regex::new(r"\bproduct|\bcategory|\bmortgage|\bloan|\bcredit card\b")?, QuantQuery::Product),
        ];
        Ok(Self { dataset, themes, rules })
    }

    pub fn route(&self, question: &str) -> QuantQuery {
        let q = question.to_lowercase();
        match self.rules.iter().find(|(re, _)| re.is_match(&q)).map(|(_, query)| *query) {
            Some(QuantQuery::Trend { .. }) => QuantQuery::Trend { weekly: q.contains("week") },
            Some(query) => query,
            None => QuantQuery::Summary,
        }
    }

    pub fn handle(&self, question: &str) -> QuantAnswer {
        let query = self.route(question);
        tracing::debug!(?query, "Quantitative query");
        match query {
            QuantQuery::Count => self.count(&question.to_lowercase()),
            QuantQuery::TopThemes | QuantQuery::AllThemes => self.themes(),
            QuantQuery::Channel => self.breakdown(CategoryField::Channel),
            QuantQuery::Trend { weekly } => self.trend(weekly),
            QuantQuery::Severity => self.breakdown(CategoryField::Severity),
            QuantQuery::Product => self.breakdown(CategoryField::Product),
            QuantQuery::Summary => self.summary(),
        }
    }

    fn total(&self) -> usize {
        self.dataset.len()
    }

    fn pct(&self, n: usize) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            n as f64 / self.total() as f64 * 100.0
        }
    }

    fn top_channel(&self) -> Option<CategoryCount> {
        if !self.dataset.schema.channel {
            return None;
        }
        self.dataset.breakdown(CategoryField::Channel).into_iter().next()
    }

    fn count(&self, q: &str) -> QuantAnswer {
        // "how many ... by channel" on a dataset without that column
        let asked_for = [CategoryField::Channel, CategoryField::Severity, CategoryField::Product]
            .into_iter()
            .find(|&field| mentions(q, field) && !self.dataset.schema.has(field));
        if let Some(field) = asked_for {
            return missing_column(field);
        }

        let total = self.total();
        let mut extras = Vec::new();
        if q.contains("theme") {
            if let Some(top) = self.themes.first() {
                extras.push(format!(
                    "The largest theme is **{}** ({} complaints, {:.1}% of total).",
                    top.label,
                    format_thousands(top.count),
                    self.pct(top.count)
                ));
            }
        }
        if let Some(channel) = self.top_channel() {
            extras.push(format!(
                "Top channel: **{}** ({} complaints).",
                channel.value,
                format_thousands(channel.count)
            ));
        }

        let mut answer = format!("There are **{}** complaints in the dataset.", format_thousands(total));
        if !extras.is_empty() {
            answer.push_str("\n\n");
            answer.push_str(&extras.join("\n"));
        }
        QuantAnswer {
            answer,
            data: Payload::Total { total_complaints: total },
            confidence: format!("Based on all {} rows", format_thousands(total)),
        }
    }

    fn themes(&self) -> QuantAnswer {
        let rows: Vec<String> = self
            .themes
            .iter()
            .enumerate()
            .map(|(i, t)| {
                format!(
                    "  {}. **{}** — {} complaints ({:.1}%)",
                    i + 1,
                    t.label,
                    format_thousands(t.count),
                    self.pct(t.count)
                )
            })
            .collect();
        QuantAnswer {
            answer: format!("**Top complaint themes (by volume):**\n{}", rows.join("\n")),
            data: Payload::Themes(self.themes.iter().map(ThemeRecord::summary).collect()),
            confidence: format!(
                "Based on {} complaints across {} themes",
                format_thousands(self.total()),
                self.themes.len()
            ),
        }
    }

    fn breakdown(&self, field: CategoryField) -> QuantAnswer {
        let schema = &self.dataset.schema;
        if !schema.has(field) {
            return missing_column(field);
        }
        let heading = match (field, schema.product) {
            (CategoryField::Channel, _) => "channel".to_string(),
            (CategoryField::Severity, _) => "severity".to_string(),
            (CategoryField::Product, Some(product)) => product.label(),
            (CategoryField::Product, None) => "product".to_string(),
        };

        let counts = self.dataset.breakdown(field);
        let rows: Vec<String> = counts
            .iter()
            .map(|c| format!("  - **{}**: {} ({:.1}%)", c.value, format_thousands(c.count), self.pct(c.count)))
            .collect();
        QuantAnswer {
            answer: format!("**Complaints by {}:**\n{}", heading, rows.join("\n")),
            data: Payload::Breakdown(counts),
            confidence: format!("Based on {} complaints", format_thousands(self.total())),
        }
    }

    fn trend(&self, weekly: bool) -> QuantAnswer {
        if !self.dataset.schema.date {
            return unavailable("`date` column not found — trend analysis unavailable.");
        }
        let bucket = |date| if weekly { week_period(date) } else { month_period(date) };
        let mut periods: BTreeMap<String, usize> = BTreeMap::new();
        for date in self.dataset.records.iter().filter_map(|r| r.date.as_deref().and_then(parse_date)) {
            *periods.entry(bucket(date)).or_insert(0) += 1;
        }
        if periods.is_empty() {
            return unavailable("No parsable dates in the `date` column — trend analysis unavailable.");
        }

        let label = if weekly { "weekly" } else { "monthly" };
        let trend: Vec<PeriodCount> = periods.into_iter().map(|(period, count)| PeriodCount { period, count }).collect();
        let rows: Vec<String> =
            trend.iter().map(|p| format!("  - **{}**: {}", p.period, format_thousands(p.count))).collect();
        QuantAnswer {
            answer: format!("**Complaint trend ({}):**\n{}", label, rows.join("\n")),
            confidence: format!(
                "Based on {} complaints across {} {} periods",
                format_thousands(self.total()),
                trend.len(),
                label
            ),
            data: Payload::Trend(trend),
        }
    }

    fn summary(&self) -> QuantAnswer {
        let total = self.total();
        let mut lines = vec![format!("**Dataset summary:** {} complaints loaded.", format_thousands(total))];
        if let Some(top) = self.themes.first() {
            lines.push(format!("Top theme: **{}** ({} complaints).", top.label, format_thousands(top.count)));
        }
        if let Some(channel) = self.top_channel() {
            lines.push(format!("Top channel: **{}** ({}).", channel.value, format_thousands(channel.count)));
        }
        if self.dataset.schema.severity {
            let high = self.dataset.records.iter().filter(|r| r.severity.as_deref() == Some("high")).count();
            lines.push(format!(
                "High-severity complaints: **{}** ({:.1}%).",
                format_thousands(high),
                self.pct(high)
            ));
        }
        QuantAnswer {
            answer: lines.join("\n"),
            data: Payload::Summary { total },
            confidence: format!("Based on {} rows", format_thousands(total)),
        }
    }
}

fn unavailable(answer: &str) -> QuantAnswer {
    QuantAnswer { answer: answer.to_string(), data: Payload::Empty {}, confidence: NOT_AVAILABLE.to_string() }
}

fn missing_column(field: CategoryField) -> QuantAnswer {
    unavailable(match field {
        CategoryField::Channel => "`channel` column not found in the dataset.",
        CategoryField::Severity => "`severity` column not found in the dataset.",
        CategoryField::Product => "Product/category column not found in the dataset.",
    })
}

fn mentions(q: &str, field: CategoryField) -> bool {
    match field {
        CategoryField::Channel => q.contains("channel"),
        CategoryField::Severity => q.contains("severity"),
        CategoryField::Product => q.contains("product") || q.contains("category"),
    }
}
