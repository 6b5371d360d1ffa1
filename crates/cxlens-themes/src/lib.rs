//! cxlens-themes
//!
//! Groups cleaned complaint texts into labeled themes: TF-IDF weighting
//! (`vectorizer`), seeded k-means (`kmeans`) and rule-based naming
//! (`labeler`), composed by [`ThemeExtractor`].

pub mod kmeans;
pub mod labeler;
pub mod stopwords;
pub mod vectorizer;

use cxlens_core::config::ThemeSettings;
use cxlens_core::error::Result;
use cxlens_core::types::{ThemeId, ThemeRecord};

pub use kmeans::{Clustering, KMeans};
pub use labeler::{LabelRule, ThemeLabeler};
pub use vectorizer::{FeatureMatrix, TfidfVectorizer};

/// Examples kept per theme.
pub const MAX_EXAMPLES: usize = 3;

/// Result of one extraction run.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeExtraction {
    /// One record per cluster, largest first.
    pub themes: Vec<ThemeRecord>,
    /// Theme id per input document, in input order.
    pub assignments: Vec<ThemeId>,
    /// Cluster count actually used, after any reduction for small inputs.
    pub effective_k: usize,
    pub vocabulary_size: usize,
}

/// Cluster count to use for `n_docs` documents when `requested` were asked for.
pub fn effective_k(n_docs: usize, requested: usize) -> usize {
    if n_docs < requested {
        (n_docs / 2).max(2)
    } else {
        requested
    }
}

pub struct ThemeExtractor {
    settings: ThemeSettings,
    labeler: ThemeLabeler,
}

impl ThemeExtractor {
    pub fn new(settings: ThemeSettings) -> Self {
        Self { settings, labeler: ThemeLabeler::default() }
    }

    /// Replace the default banking rules with a custom labeler.
    pub fn with_labeler(mut self, labeler: ThemeLabeler) -> Self {
        self.labeler = labeler;
        self
    }

    pub fn extract<S: AsRef<str>>(&self, texts: &[S]) -> Result<ThemeExtraction> {
        let k = effective_k(texts.len(), self.settings.n_themes);
        if k != self.settings.n_themes {
            tracing::warn!(
                documents = texts.len(),
                requested = self.settings.n_themes,
                using = k,
                "Fewer documents than requested themes; reducing theme count"
            );
        }

        let vectorizer = TfidfVectorizer::new(self.settings.max_features, self.settings.min_df)?;
        let matrix = vectorizer.fit_transform(texts)?;
        let clustering = KMeans::new(k)
            .with_seed(self.settings.seed)
            .with_n_init(self.settings.n_init)
            .with_max_iter(self.settings.max_iter)
            .fit(&matrix)?;

        let mut themes: Vec<ThemeRecord> = (0..k)
            .map(|theme_id| {
                let members: Vec<usize> =
                    (0..texts.len()).filter(|&i| clustering.labels[i] == theme_id).collect();
                let top_keywords = top_terms(&matrix, &clustering.centroids[theme_id], self.settings.n_top_keywords);
                ThemeRecord {
                    theme_id,
                    label: self.labeler.label(&top_keywords),
                    count: members.len(),
                    example_texts: members.iter().take(MAX_EXAMPLES).map(|&i| texts[i].as_ref().to_string()).collect(),
                    top_keywords,
                }
            })
            .collect();
        themes.sort_by(|a, b| b.count.cmp(&a.count));

        if let Some(top) = themes.first() {
            tracing::info!(themes = k, top_label = %top.label, top_count = top.count, "Extracted themes");
        }
        Ok(ThemeExtraction {
            themes,
            assignments: clustering.labels,
            effective_k: k,
            vocabulary_size: matrix.n_features(),
        })
    }
}

/// The `n` highest-weighted terms of a centroid, ties by column order.
pub fn top_terms(matrix: &FeatureMatrix, centroid: &[f64], n: usize) -> Vec<String> {
    let mut order: Vec<usize> = (0..centroid.len()).collect();
    order.sort_by(|&a, &b| centroid[b].total_cmp(&centroid[a]));
    order.into_iter().take(n).map(|j| matrix.vocabulary[j].clone()).collect()
}
