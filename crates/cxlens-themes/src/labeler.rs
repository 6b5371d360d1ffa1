use std::collections::HashSet;

/// Ordered (keywords, label) table. The first rule sharing a keyword with a
/// cluster's top terms names the cluster.
pub const DEFAULT_RULES: &[(&[&str], &str)] = &[
    (
        &[
            "app", "mobile", "login", "crash", "password", "screen", "error", "loading", "authentication",
            "fingerprint", "face", "update", "ios", "android",
        ],
        "App & Login Issues",
    ),
    (
        &[
            "charge", "fee", "charged", "overdraft", "statement", "billing", "refund", "maintenance", "annual",
            "late", "penalty", "balance transfer",
        ],
        "Billing & Fee Disputes",
    ),
    (
        &[
            "transaction", "payment", "declined", "transfer", "unauthorized", "fraud", "purchase", "debit", "atm",
            "withdrawal", "deposit", "wire",
        ],
        "Transaction Problems",
    ),
    (
        &[
            "account", "locked", "access", "blocked", "frozen", "verification", "reset", "security", "flag",
            "suspended", "recover",
        ],
        "Account Access Issues",
    ),
    (
        &[
            "service", "representative", "staff", "wait", "hold", "support", "agent", "call", "phone", "transferred",
            "rude", "unhelpful", "callback",
        ],
        "Customer Service Quality",
    ),
    (
        &["loan", "mortgage", "interest", "rate", "application", "approval", "personal", "refinance", "payoff", "equity"],
        "Loan & Mortgage Issues",
    ),
    (
        &["card", "chip", "tap", "contactless", "apple", "google", "pay", "pin", "credit", "limit"],
        "Card & Payment Method Issues",
    ),
];

/// Number of leading keywords considered when matching rules.
pub const LABEL_WINDOW: usize = 8;

#[derive(Debug, Clone)]
pub struct LabelRule {
    pub keywords: HashSet<String>,
    pub label: String,
}

impl LabelRule {
    pub fn new<S: Into<String>>(keywords: impl IntoIterator<Item = S>, label: impl Into<String>) -> Self {
        Self { keywords: keywords.into_iter().map(Into::into).collect(), label: label.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ThemeLabeler {
    rules: Vec<LabelRule>,
}

impl Default for ThemeLabeler {
    fn default() -> Self {
        Self::with_rules(DEFAULT_RULES.iter().map(|(kw, label)| LabelRule::new(kw.iter().copied(), *label)).collect())
    }
}

impl ThemeLabeler {
    pub fn with_rules(rules: Vec<LabelRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[LabelRule] {
        &self.rules
    }

    /// Label a cluster from its keywords, highest weight first. Falls back to
    /// the two leading keywords, title-cased and joined with " & ".
    pub fn label<S: AsRef<str>>(&self, top_keywords: &[S]) -> String {
        let window: HashSet<&str> = top_keywords.iter().take(LABEL_WINDOW).map(AsRef::as_ref).collect();
        if let Some(rule) = self.rules.iter().find(|r| r.keywords.iter().any(|k| window.contains(k.as_str()))) {
            return rule.label.clone();
        }
        top_keywords.iter().take(2).map(|k| title_case(k.as_ref())).collect::<Vec<_>>().join(" & ")
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}
