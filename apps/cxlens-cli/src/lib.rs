//! cxlens-cli
//!
//! Glue shared by the `cxlens` and `cxlens-chat` binaries: the analysis
//! pipeline, router loading, terminal rendering and the chat loop.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};

use cxlens_core::config::{resolve_with_base, LlmSettings, Settings};
use cxlens_core::data_processor::{CleaningMetrics, DataProcessor};
use cxlens_core::report::{format_thousands, load_themes, ReportPaths, ReportWriter, CLEANED_CSV, THEMES_CSV};
use cxlens_core::table::Table;
use cxlens_core::traits::Completer;
use cxlens_core::types::{Dataset, Provenance, QueryResult};
use cxlens_llm::CompletionChain;
use cxlens_router::Router;
use cxlens_themes::{ThemeExtraction, ThemeExtractor};

pub const SHOWN_EXAMPLES: usize = 2;
pub const EXAMPLE_CHARS: usize = 130;

pub const WELCOME: &str = "\
╔══════════════════════════════════════════════════════════════╗
║              cxlens: complaint analysis chat                 ║
╚══════════════════════════════════════════════════════════════╝

Ask any question about customer complaints and press Enter.
Commands: :quit  :help  :examples  :mode
";

pub const HELP: &str = "\
─────────────────────────────────────────────────────────────
EXAMPLE QUESTIONS
─────────────────────────────────────────────────────────────
Quantitative (counts, distributions, trends):
  1.  How many complaints are there in total?
  2.  What are the top complaint themes?
  3.  How many complaints came through the phone channel?
  4.  Show me the monthly complaint trend
  5.  What percentage of complaints are high severity?
  6.  Which product category has the most complaints?

Qualitative (analysis of content and root causes):
  7.  Why are customers frustrated with the mobile app?
  8.  Summarise complaints about billing and fees
  9.  What are customers saying about customer service?
  10. Describe the main issues with account access
  11. Show me examples of transaction problems
  12. What is wrong with the loan application process?
─────────────────────────────────────────────────────────────
";

/// Install the global subscriber. `RUST_LOG` wins over the default level.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// A path from the settings, expanded and made absolute against the working directory.
pub fn settings_path(value: &str) -> PathBuf {
    resolve_with_base(&std::env::current_dir().unwrap_or_default(), value)
}

/// Default locations of the analysis outputs the router reads.
pub fn default_outputs(settings: &Settings) -> (PathBuf, PathBuf) {
    let dir = settings_path(&settings.data.output_dir);
    (dir.join(CLEANED_CSV), dir.join(THEMES_CSV))
}

/// Everything one `analyze` run produced.
#[derive(Debug)]
pub struct Analysis {
    pub metrics: CleaningMetrics,
    pub extraction: ThemeExtraction,
    pub paths: ReportPaths,
}

/// Load, clean, extract themes and write the four report files.
pub fn analyze(input: &Path, output_dir: &Path, settings: &Settings, show_progress: bool) -> anyhow::Result<Analysis> {
    tracing::info!(path = %input.display(), "Loading complaints");
    let raw = Table::read_csv(input).with_context(|| format!("reading {}", input.display()))?;
    tracing::info!(rows = raw.len(), columns = raw.headers.len(), "Loaded");

    let processor = DataProcessor::new(settings.cleaning.clone())?;
    let (cleaned, metrics) = processor.process(&raw, settings.data.text_col.as_deref())?;
    let dataset = Dataset::from_table(&cleaned)?;

    let spinner = if show_progress { ProgressBar::new_spinner() } else { ProgressBar::hidden() };
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.set_message(format!("Extracting {} themes from {} complaints", settings.themes.n_themes, dataset.len()));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let extraction = ThemeExtractor::new(settings.themes.clone()).extract(&dataset.texts());
    spinner.finish_and_clear();
    let extraction = extraction.context("theme extraction failed")?;

    tracing::info!(dir = %output_dir.display(), "Writing outputs");
    let paths = ReportWriter::new(output_dir).write(&cleaned, &extraction.assignments, &extraction.themes, &metrics)?;
    Ok(Analysis { metrics, extraction, paths })
}

/// Console summary printed after `analyze`.
pub fn render_analysis(analysis: &Analysis) -> String {
    let divider = "=".repeat(62);
    let m = &analysis.metrics;
    let mut lines = vec![
        format!("\n{divider}"),
        "  Analysis complete".to_string(),
        divider.clone(),
        format!("  Input rows      : {:>6}", format_thousands(m.rows_in)),
        format!("  After cleaning  : {:>6}  ({}% retained)", format_thousands(m.rows_out), m.rows_retained_pct),
        format!("  Themes found    : {:>6}", analysis.extraction.effective_k),
        String::new(),
        "  Top themes:".to_string(),
    ];
    for theme in analysis.extraction.themes.iter().take(5) {
        lines.push(format!("    [{}] {:<35}  n={}", theme.theme_id, theme.label, theme.count));
    }
    lines.push(String::new());
    lines.push("  Output files:".to_string());
    for (name, path) in analysis.paths.entries() {
        lines.push(format!("    {:<20} -> {}", name, path.display()));
    }
    lines.push(format!("{divider}\n"));
    lines.join("\n")
}

/// Build a router over previously written analysis outputs.
pub fn load_router(cleaned: &Path, themes: &Path, llm: &LlmSettings) -> anyhow::Result<Router<CompletionChain>> {
    let table = Table::read_csv(cleaned).with_context(|| format!("reading {}", cleaned.display()))?;
    let dataset = Dataset::from_table(&table)?;
    let themes = load_themes(themes).with_context(|| format!("reading {}", themes.display()))?;
    Ok(Router::new(dataset, themes, CompletionChain::from_settings(llm))?)
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}…", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Terminal form of one answer.
pub fn render(result: &QueryResult) -> String {
    let mut lines = vec![format!("\n[{}]", result.query_type().to_uppercase()), result.answer().to_string()];

    if !result.examples().is_empty() {
        lines.push("\nTop retrieved examples:".to_string());
        for example in result.examples().iter().take(SHOWN_EXAMPLES) {
            lines.push(format!("  • {}", truncate(example, EXAMPLE_CHARS)));
        }
    }

    let mut footer = Vec::new();
    if !result.confidence().is_empty() {
        footer.push(format!("Confidence: {}", result.confidence()));
    }
    if let Some(mode) = result.llm_mode() {
        footer.push(format!("Mode: {mode}"));
    }
    if !footer.is_empty() {
        lines.push(format!("\n{}", footer.join(" | ")));
    }

    lines.push(String::new());
    lines.join("\n")
}

pub fn mode_banner(mode: Provenance) -> String {
    match mode {
        Provenance::Offline => "  ⚠  NO-KEY MODE  —  No API key found. Answers use rule-based summaries.\n     \
             To enable AI analysis: export OPENAI_API_KEY=... or ANTHROPIC_API_KEY=...\n"
            .to_string(),
        mode => format!("  ✓  LLM mode: {mode}\n"),
    }
}

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Skip,
    Quit,
    Help,
    Mode,
    Ask(String),
}

impl ChatCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => ChatCommand::Skip,
            ":quit" | ":exit" | "quit" | "exit" => ChatCommand::Quit,
            ":help" | "help" | ":examples" | "examples" => ChatCommand::Help,
            ":mode" => ChatCommand::Mode,
            question => ChatCommand::Ask(question.to_string()),
        }
    }
}

/// Read questions from `input` until a quit command or end of input.
pub fn run_chat<C, R, W>(router: &Router<C>, input: R, out: &mut W) -> std::io::Result<()>
where
    C: Completer,
    R: BufRead,
    W: Write,
{
    writeln!(out, "{WELCOME}")?;
    writeln!(out, "{}", mode_banner(router.completion_mode()))?;

    let mut lines = input.lines();
    loop {
        write!(out, "You: ")?;
        out.flush()?;
        let Some(line) = lines.next().transpose()? else {
            writeln!(out, "\nGoodbye!")?;
            return Ok(());
        };
        match ChatCommand::parse(&line) {
            ChatCommand::Skip => {}
            ChatCommand::Quit => {
                writeln!(out, "Goodbye!")?;
                return Ok(());
            }
            ChatCommand::Help => writeln!(out, "{HELP}")?,
            ChatCommand::Mode => writeln!(out, "  Current mode: {}\n", router.completion_mode())?,
            ChatCommand::Ask(question) => writeln!(out, "{}", render(&router.answer(&question)))?,
        }
    }
}
