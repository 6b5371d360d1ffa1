use std::sync::{Arc, Mutex};

use cxlens_core::table::Table;
use cxlens_core::traits::Completer;
use cxlens_core::types::{
    CategoryCount, Completion, CompletionRequest, Dataset, Intent, Payload, PeriodCount, Provenance, Provider,
    QueryResult, ThemeRecord, TEXT_CLEAN_COLUMN,
};
use cxlens_llm::OfflineFallback;
use cxlens_router::qual::NO_MATCHES;
use cxlens_router::{IntentClassifier, QualHandler, QuantHandler, QuantQuery, Router};

fn dataset() -> Dataset {
    let mut t = Table::new([
        "complaint_id",
        "date",
        "channel",
        "severity",
        "product_category",
        "complaint_text",
        TEXT_CLEAN_COLUMN,
        "theme_id",
    ]);
    let rows = [
        ("2024-01-05", "Phone", "high", "Credit Card", "My card was declined at the store", "1"),
        ("2024-01-12", "Email", "low", "Checking", "Overdraft fee charged twice", "0"),
        ("2024-01-20", "Phone", "high", "Checking", "Mobile app crashes at login", "2"),
        ("2024-02-02", "Chat", "medium", "Credit Card", "Card declined online again", "1"),
        ("2024-02-15", "Phone", "high", "Checking", "App login keeps failing", "2"),
        ("not-a-date", "Email", "low", "Mortgage", "Late fee on my mortgage payment", "0"),
        ("2024-03-01", "Phone", "medium", "Checking", "The app froze during transfer", "2"),
    ];
    for (i, (date, channel, severity, product, text, theme)) in rows.into_iter().enumerate() {
        let id = (i + 1).to_string();
        let clean = text.to_lowercase();
        t.push_row([id.as_str(), date, channel, severity, product, text, clean.as_str(), theme]);
    }
    Dataset::from_table(&t).unwrap()
}

fn themes() -> Vec<ThemeRecord> {
    let theme = |theme_id, label: &str, count| ThemeRecord {
        theme_id,
        label: label.to_string(),
        count,
        top_keywords: Vec::new(),
        example_texts: Vec::new(),
    };
    vec![
        theme(2, "App & Login Issues", 3),
        theme(0, "Billing & Fee Disputes", 2),
        theme(1, "Card & Payment Method Issues", 2),
    ]
}

fn bare_dataset() -> Dataset {
    let mut t = Table::new([TEXT_CLEAN_COLUMN, "theme_id"]);
    t.push_row(["card declined at the store", "0"]);
    t.push_row(["fee charged twice this month", "0"]);
    Dataset::from_table(&t).unwrap()
}

fn quant(ds: Dataset) -> QuantHandler {
    QuantHandler::new(Arc::new(ds), Arc::new(themes())).unwrap()
}

#[derive(Default)]
struct Recorder {
    prompts: Mutex<Vec<String>>,
}

impl Completer for Recorder {
    fn complete(&self, request: &CompletionRequest) -> Completion {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Completion { text: "live analysis".to_string(), provenance: Provenance::Live(Provider::Anthropic) }
    }

    fn mode(&self) -> Provenance {
        Provenance::Live(Provider::Anthropic)
    }
}

#[test]
fn classifier_scenarios() {
    let c = IntentClassifier::new().unwrap();
    assert_eq!(c.classify("How many complaints are there in total?"), Intent::Quant);
    assert_eq!(c.classify("Why are customers frustrated with the mobile app?"), Intent::Qual);
    assert_eq!(c.classify("Which channel has the most complaints?"), Intent::Quant);
    assert_eq!(c.classify("What percentage of complaints are high severity?"), Intent::Quant);
    assert_eq!(c.classify("Show me examples of transaction problems"), Intent::Qual);
    assert_eq!(c.classify("Summarise complaints about billing and fees"), Intent::Qual);
}

#[test]
fn classifier_ties_use_signal_words() {
    let c = IntentClassifier::new().unwrap();
    assert_eq!(c.scores("Tell me something"), (0, 0));
    assert_eq!(c.classify("Tell me something"), Intent::Qual);
    assert_eq!(c.classify("Show the data"), Intent::Quant);
    assert_eq!(c.scores("WHICH CHANNEL IS BUSIEST"), (1, 0));
}

#[test]
fn classifier_counts_each_pattern_once() {
    let c = IntentClassifier::new().unwrap();
    let q = "why why why, how much?";
    assert_eq!(c.scores(q), (1, 1));
    assert_eq!(c.classify(q), Intent::Quant);
    assert_eq!(c.classify(q), c.classify(q));
}

#[test]
fn quant_routing_order() {
    let h = quant(dataset());
    assert_eq!(h.route("How many themes are there?"), QuantQuery::Count);
    assert_eq!(h.route("What are the top themes?"), QuantQuery::TopThemes);
    assert_eq!(h.route("List every topic"), QuantQuery::AllThemes);
    assert_eq!(h.route("Split by phone and email"), QuantQuery::Channel);
    assert_eq!(h.route("Show me the monthly complaint trend"), QuantQuery::Trend { weekly: false });
    assert_eq!(h.route("Weekly trend please"), QuantQuery::Trend { weekly: true });
    assert_eq!(h.route("Which are critical?"), QuantQuery::Severity);
    assert_eq!(h.route("Breakdown by product"), QuantQuery::Product);
    assert_eq!(h.route("Give me an overview"), QuantQuery::Summary);
}

#[test]
fn count_answer() {
    let a = quant(dataset()).handle("How many complaints are there in total?");
    assert_eq!(a.answer, "There are **7** complaints in the dataset.\n\nTop channel: **Phone** (4 complaints).");
    assert_eq!(a.data, Payload::Total { total_complaints: 7 });
    assert_eq!(a.confidence, "Based on all 7 rows");

    let a = quant(dataset()).handle("how many complaints in the biggest theme?");
    assert!(a.answer.contains("The largest theme is **App & Login Issues** (3 complaints, 42.9% of total)."));
}

#[test]
fn top_themes_answer() {
    let a = quant(dataset()).handle("What are the top themes?");
    assert!(a.answer.starts_with("**Top complaint themes (by volume):**\n"));
    assert!(a.answer.contains("  1. **App & Login Issues** — 3 complaints (42.9%)"));
    assert!(a.answer.contains("  3. **Card & Payment Method Issues** — 2 complaints (28.6%)"));
    match a.data {
        Payload::Themes(rows) => {
            assert_eq!(rows.len(), 3);
            assert_eq!(rows[0].theme_id, 2);
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert_eq!(a.confidence, "Based on 7 complaints across 3 themes");
}

#[test]
fn channel_severity_and_product_breakdowns() {
    let h = quant(dataset());
    let a = h.handle("Which channel do people use?");
    assert_eq!(
        a.answer,
        "**Complaints by channel:**\n  - **Phone**: 4 (57.1%)\n  - **Email**: 2 (28.6%)\n  - **Chat**: 1 (14.3%)"
    );
    assert_eq!(a.confidence, "Based on 7 complaints");

    let a = h.handle("What is the severity split?");
    let expected = vec![
        CategoryCount { value: "high".to_string(), count: 3 },
        CategoryCount { value: "low".to_string(), count: 2 },
        CategoryCount { value: "medium".to_string(), count: 2 },
    ];
    assert_eq!(a.data, Payload::Breakdown(expected));

    let a = h.handle("Breakdown by product");
    assert!(a.answer.starts_with("**Complaints by product category:**\n  - **Checking**: 4 (57.1%)"));
}

#[test]
fn trend_groups_by_month_or_week_and_skips_bad_dates() {
    let h = quant(dataset());
    let a = h.handle("Show me the monthly complaint trend");
    let expected = vec![
        PeriodCount { period: "2024-01".to_string(), count: 3 },
        PeriodCount { period: "2024-02".to_string(), count: 2 },
        PeriodCount { period: "2024-03".to_string(), count: 1 },
    ];
    assert_eq!(a.data, Payload::Trend(expected));
    assert!(a.answer.starts_with("**Complaint trend (monthly):**\n  - **2024-01**: 3"));
    assert_eq!(a.confidence, "Based on 7 complaints across 3 monthly periods");

    let a = h.handle("complaints per week over time");
    match a.data {
        Payload::Trend(periods) => {
            assert_eq!(periods.len(), 6);
            assert_eq!(periods[0].period, "2024-01-01/2024-01-07");
        }
        other => panic!("unexpected payload {:?}", other),
    }
}

#[test]
fn general_summary() {
    let a = quant(dataset()).handle("Give me an overview");
    assert_eq!(
        a.answer,
        "**Dataset summary:** 7 complaints loaded.\n\
         Top theme: **App & Login Issues** (3 complaints).\n\
         Top channel: **Phone** (4).\n\
         High-severity complaints: **3** (42.9%)."
    );
    assert_eq!(a.data, Payload::Summary { total: 7 });
    assert_eq!(a.confidence, "Based on 7 rows");
}

#[test]
fn missing_columns_degrade_to_not_found() {
    let h = quant(bare_dataset());
    for q in ["how many complaints by channel", "Which channel is worst?", "severity split", "by product", "monthly trend"] {
        let a = h.handle(q);
        assert!(a.answer.contains("not found"), "{q}: {}", a.answer);
        assert!(a.data.is_empty());
        assert_eq!(a.confidence, "N/A");
    }
    let a = h.handle("How many complaints are there?");
    assert_eq!(a.answer, "There are **2** complaints in the dataset.");
}

#[test]
fn unparsable_dates_never_fail() {
    let mut t = Table::new([TEXT_CLEAN_COLUMN, "date"]);
    t.push_row(["card declined at the store", "soon"]);
    let h = QuantHandler::new(Arc::new(Dataset::from_table(&t).unwrap()), Arc::new(Vec::new())).unwrap();
    let a = h.handle("monthly trend");
    assert!(a.data.is_empty());
    assert!(a.answer.contains("trend analysis unavailable"));
}

#[test]
fn qual_keyword_retrieval_and_prompt() {
    let h = QualHandler::new(Arc::new(dataset()), Arc::new(themes()), Recorder::default()).unwrap();
    let q = "Why are customers frustrated with the mobile app?";
    assert_eq!(h.keywords(q), vec!["frustrated", "mobile"]);

    let a = h.handle(q);
    assert_eq!(a.answer, "live analysis");
    assert_eq!(a.examples, vec!["Mobile app crashes at login"]);
    assert_eq!(a.confidence, "1 matching complaints retrieved (showing top 1)");
    assert_eq!(a.llm_mode, Provenance::Live(Provider::Anthropic));

    let prompts = h.completer().prompts.lock().unwrap();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Question: Why are customers frustrated with the mobile app?"));
    assert!(prompts[0].contains("Relevant complaint examples (1 retrieved):\n- \"Mobile app crashes at login\""));
    assert!(prompts[0].contains("3. Suggests one concrete, actionable recommendation"));
}

#[test]
fn qual_narrows_to_matching_theme() {
    let h = QualHandler::new(Arc::new(dataset()), Arc::new(themes()), Recorder::default()).unwrap();
    assert_eq!(h.matching_theme("Summarise billing complaints").map(|t| t.theme_id), Some(0));
    let r = h.retrieve("Summarise billing complaints");
    assert_eq!(r.examples, vec!["Overdraft fee charged twice", "Late fee on my mortgage payment"]);
    assert_eq!(r.matched, 2);
}

#[test]
fn qual_falls_back_to_whole_pool_without_hits() {
    let h = QualHandler::new(Arc::new(dataset()), Arc::new(themes()), Recorder::default()).unwrap();
    let a = h.handle("What do people think of zelle?");
    assert_eq!(a.examples.len(), 3);
    assert_eq!(a.examples[0], "My card was declined at the store");
    assert_eq!(a.confidence, "7 matching complaints retrieved (showing top 7)");
}

#[test]
fn qual_empty_pool_skips_completion() {
    let table = vec![ThemeRecord {
        theme_id: 9,
        label: "Fraud Alerts".to_string(),
        count: 0,
        top_keywords: Vec::new(),
        example_texts: Vec::new(),
    }];
    let h = QualHandler::new(Arc::new(dataset()), Arc::new(table), Recorder::default()).unwrap();
    let a = h.handle("tell me about fraud");
    assert_eq!(a.answer, NO_MATCHES);
    assert!(a.examples.is_empty());
    assert_eq!(a.llm_mode, Provenance::Offline);
    assert!(h.completer().prompts.lock().unwrap().is_empty());
}

#[test]
fn router_dispatches_and_serializes() {
    let router = Router::new(dataset(), themes(), OfflineFallback::new()).unwrap();
    assert_eq!(router.completion_mode(), Provenance::Offline);

    let result = router.answer("How many complaints are there in total?");
    assert_eq!(result.query_type(), "quantitative");
    assert_eq!(result.data(), Some(&Payload::Total { total_complaints: 7 }));
    assert!(result.examples().is_empty());
    assert_eq!(result.llm_mode(), None);

    let result = router.answer("Why are customers frustrated with the mobile app?");
    assert_eq!(result.query_type(), "qualitative");
    assert!(result.answer().starts_with("Based on the retrieved complaint examples"));
    assert!(result.answer().contains("  • Mobile app crashes at login"));
    assert_eq!(result.llm_mode().map(|m| m.tag()), Some("no-key".to_string()));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["query_type"], "qualitative");
    assert_eq!(json["llm_mode"], "no-key");

    let bare = Router::new(bare_dataset(), Vec::new(), OfflineFallback::new()).unwrap();
    let result = bare.answer("Which channel has the most complaints?");
    assert!(matches!(result, QueryResult::Quantitative(_)));
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["data"], serde_json::json!({}));
    assert_eq!(json["confidence"], "N/A");
}
