//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_THEMES__N_THEMES=8`). Every
//! setting has a default, so a missing config file is not an error.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::data_processor::CleaningConfig;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    /// Wrap an already-assembled figment (tests, embedding callers).
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The full typed settings tree, validated.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub cleaning: CleaningConfig,
    pub themes: ThemeSettings,
    pub llm: LlmSettings,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        let t = &self.themes;
        if t.n_themes == 0 {
            anyhow::bail!("themes.n_themes must be at least 1");
        }
        if t.max_features == 0 || t.min_df == 0 {
            anyhow::bail!("themes.max_features and themes.min_df must be at least 1");
        }
        if t.n_init == 0 || t.max_iter == 0 {
            anyhow::bail!("themes.n_init and themes.max_iter must be at least 1");
        }
        if self.llm.max_tokens == 0 {
            anyhow::bail!("llm.max_tokens must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Raw complaints CSV fed to `analyze`.
    pub input_csv: String,
    /// Directory for cleaned data, themes and reports.
    pub output_dir: String,
    /// Complaint text column; auto-detected when unset.
    pub text_col: Option<String>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            input_csv: "data/sample_complaints.csv".to_string(),
            output_dir: "out".to_string(),
            text_col: None,
        }
    }
}

/// Knobs of one theme extraction run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeSettings {
    pub n_themes: usize,
    pub seed: u64,
    pub n_top_keywords: usize,
    /// Vocabulary cap.
    pub max_features: usize,
    /// Minimum number of documents a term must appear in.
    pub min_df: usize,
    /// k-means restarts; the lowest-inertia run wins.
    pub n_init: usize,
    pub max_iter: usize,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self { n_themes: 5, seed: 42, n_top_keywords: 10, max_features: 3000, min_df: 2, n_init: 10, max_iter: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Upper bound on completion length, applied to every live request.
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub anthropic_model: String,
    pub openai_model: String,
    /// Skip live providers even when API keys are present.
    pub force_offline: bool,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            max_tokens: 400,
            timeout_secs: 60,
            anthropic_model: "claude-3-haiku-20240307".to_string(),
            openai_model: "gpt-3.5-turbo".to_string(),
            force_offline: false,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
