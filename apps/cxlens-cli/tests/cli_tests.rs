use std::io::Cursor;
use std::path::PathBuf;

use cxlens_cli::{analyze, load_router, mode_banner, render, render_analysis, run_chat, ChatCommand, HELP};
use cxlens_core::config::{LlmSettings, Settings};
use cxlens_core::table::Table;
use cxlens_core::types::{Dataset, Provenance, Provider, QualAnswer, QueryResult, TEXT_CLEAN_COLUMN};
use cxlens_llm::OfflineFallback;
use cxlens_router::Router;

fn sample_csv() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/sample_complaints.csv")
}

fn settings(n_themes: usize) -> Settings {
    let mut settings = Settings::default();
    settings.themes.n_themes = n_themes;
    settings.llm = LlmSettings { force_offline: true, ..LlmSettings::default() };
    settings
}

#[test]
fn analyze_sample_data_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    let analysis = analyze(&sample_csv(), dir.path(), &settings(4), false).unwrap();

    let m = &analysis.metrics;
    assert_eq!(m.rows_in, 125);
    assert_eq!(m.rows_out, 121);
    assert_eq!(m.dropped_all_null_rows, 1);
    assert_eq!(m.dropped_null_text, 1);
    assert_eq!(m.dropped_duplicates, 1);
    assert_eq!(m.dropped_short_text, 1);
    assert_eq!(m.text_col, "complaint_text");

    let themes = &analysis.extraction.themes;
    assert_eq!(themes.len(), 4);
    assert_eq!(themes.iter().map(|t| t.count).sum::<usize>(), 121);
    assert!(themes.windows(2).all(|w| w[0].count >= w[1].count), "themes sorted by size");
    for (_, path) in analysis.paths.entries() {
        assert!(path.exists(), "missing {}", path.display());
    }

    let summary = render_analysis(&analysis);
    assert!(summary.contains("  Input rows      :    125"));
    assert!(summary.contains("  After cleaning  :    121  (96.8% retained)"));
    assert!(summary.contains("  Themes found    :      4"));
    assert!(summary.contains(&format!("[{}] {}", themes[0].theme_id, themes[0].label)));
}

#[test]
fn analyze_rejects_unknown_text_column() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = settings(3);
    settings.data.text_col = Some("narrative_text".to_string());
    let err = analyze(&sample_csv(), dir.path(), &settings, false).unwrap_err();
    assert!(err.to_string().contains("narrative_text"), "unexpected error: {err}");
}

#[test]
fn router_answers_from_written_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let settings = settings(4);
    let analysis = analyze(&sample_csv(), dir.path(), &settings, false).unwrap();
    let router = load_router(&analysis.paths.cleaned_csv, &analysis.paths.themes_csv, &settings.llm).unwrap();
    assert_eq!(router.dataset().len(), 121);
    assert_eq!(router.themes(), analysis.extraction.themes.as_slice());
    assert_eq!(router.completion_mode(), Provenance::Offline);

    let text = render(&router.answer("How many complaints are there in total?"));
    assert!(text.starts_with("\n[QUANTITATIVE]\nThere are **121** complaints in the dataset."));
    assert!(text.contains("\nConfidence: Based on all 121 rows"));
    assert!(!text.contains("Mode:"));

    let text = render(&router.answer("Why are customers frustrated with the mobile app?"));
    assert!(text.starts_with("\n[QUALITATIVE]\n"));
    assert!(text.contains("\nTop retrieved examples:\n  • "));
    assert!(text.contains(" | Mode: no-key"));
}

#[test]
fn missing_outputs_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_router(&dir.path().join("cleaned_complaints.csv"), &dir.path().join("themes.csv"), &LlmSettings::default())
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("cleaned_complaints.csv"));
}

#[test]
fn render_caps_and_truncates_examples() {
    let long = "a".repeat(200);
    let result = QueryResult::Qualitative(QualAnswer {
        answer: "Customers are unhappy.".to_string(),
        examples: vec![long, "short example".to_string(), "never shown".to_string()],
        confidence: "3 matching complaints retrieved (showing top 3)".to_string(),
        llm_mode: Provenance::Failed(Provider::Anthropic),
    });
    let text = render(&result);
    assert!(text.contains(&format!("  • {}…\n", "a".repeat(130))));
    assert!(text.contains("  • short example\n"));
    assert!(!text.contains("never shown"));
    assert!(text.ends_with("\nConfidence: 3 matching complaints retrieved (showing top 3) | Mode: anthropic-error\n"));
}

#[test]
fn chat_commands() {
    assert_eq!(ChatCommand::parse("   "), ChatCommand::Skip);
    for quit in [":quit", ":exit", "quit", "exit"] {
        assert_eq!(ChatCommand::parse(quit), ChatCommand::Quit);
    }
    for help in [":help", "help", ":examples", "examples"] {
        assert_eq!(ChatCommand::parse(help), ChatCommand::Help);
    }
    assert_eq!(ChatCommand::parse(":mode"), ChatCommand::Mode);
    assert_eq!(ChatCommand::parse("  why so slow?  "), ChatCommand::Ask("why so slow?".to_string()));
}

fn small_router() -> Router<OfflineFallback> {
    let mut t = Table::new([TEXT_CLEAN_COLUMN, "theme_id"]);
    t.push_row(["my card was declined at the store", "0"]);
    t.push_row(["overdraft fee charged twice this month", "0"]);
    Router::new(Dataset::from_table(&t).unwrap(), Vec::new(), OfflineFallback::new()).unwrap()
}

#[test]
fn chat_loop_session() {
    let input = Cursor::new("\n:help\nHow many complaints are there in total?\n:mode\n:quit\nnever read\n");
    let mut out = Vec::new();
    run_chat(&small_router(), input, &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();

    assert!(out.contains("Commands: :quit  :help  :examples  :mode"));
    assert!(out.contains("NO-KEY MODE"));
    assert!(out.contains(HELP));
    assert!(out.contains("[QUANTITATIVE]\nThere are **2** complaints in the dataset."));
    assert!(out.contains("  Current mode: no-key\n"));
    assert!(out.ends_with("You: Goodbye!\n"));
}

#[test]
fn chat_loop_ends_on_eof() {
    let mut out = Vec::new();
    run_chat(&small_router(), Cursor::new(""), &mut out).unwrap();
    assert!(String::from_utf8(out).unwrap().ends_with("You: \nGoodbye!\n"));
}

#[test]
fn live_mode_banner() {
    assert_eq!(mode_banner(Provenance::Live(Provider::OpenAi)), "  ✓  LLM mode: openai\n");
    assert!(mode_banner(Provenance::Offline).contains("export OPENAI_API_KEY=..."));
}
