//! TF-IDF over unigrams and bigrams.
//!
//! Weights use sublinear term frequency `1 + ln(tf)` and smoothed inverse
//! document frequency `ln((1 + n) / (1 + df)) + 1`; every non-empty row is
//! L2-normalized.

use std::collections::{BTreeMap, HashMap};

use cxlens_core::error::{Error, Result};

use crate::stopwords::TermAnalyzer;

/// One document as parallel index/weight vectors, indices ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRow {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseRow {
    pub fn squared_norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum()
    }

    pub fn to_dense(&self, dim: usize) -> Vec<f64> {
        let mut dense = vec![0.0; dim];
        for (&i, &v) in self.indices.iter().zip(&self.values) {
            dense[i] = v;
        }
        dense
    }
}

/// N x V document-term matrix with its vocabulary.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    /// Terms in alphabetical order; column `j` is `vocabulary[j]`.
    pub vocabulary: Vec<String>,
    pub idf: Vec<f64>,
    pub rows: Vec<SparseRow>,
}

impl FeatureMatrix {
    pub fn n_docs(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }
}

pub struct TfidfVectorizer {
    analyzer: TermAnalyzer,
    max_features: usize,
    min_df: usize,
}

impl TfidfVectorizer {
    pub fn new(max_features: usize, min_df: usize) -> Result<Self> {
        if max_features == 0 {
            return Err(Error::InvalidConfig("max_features must be at least 1".to_string()));
        }
        Ok(Self { analyzer: TermAnalyzer::new()?, max_features, min_df: min_df.max(1) })
    }

    /// Learn the vocabulary of `docs` and weight every document against it.
    ///
    /// Terms seen in fewer than `min_df` documents are dropped. When more
    /// than `max_features` remain, the most frequent across the corpus are
    /// kept (ties alphabetical). An empty vocabulary is an error.
    pub fn fit_transform<S: AsRef<str>>(&self, docs: &[S]) -> Result<FeatureMatrix> {
        let counts: Vec<HashMap<String, usize>> = docs
            .iter()
            .map(|doc| {
                let mut tf = HashMap::new();
                for term in self.analyzer.terms(doc.as_ref()) {
                    *tf.entry(term).or_insert(0) += 1;
                }
                tf
            })
            .collect();

        // term -> (document frequency, corpus frequency)
        let mut stats: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for tf in &counts {
            for (term, &n) in tf {
                let entry = stats.entry(term.as_str()).or_insert((0, 0));
                entry.0 += 1;
                entry.1 += n;
            }
        }

        let mut kept: Vec<(&str, usize, usize)> = stats
            .into_iter()
            .filter(|(_, (df, _))| *df >= self.min_df)
            .map(|(term, (df, total))| (term, df, total))
            .collect();
        if kept.is_empty() {
            return Err(Error::EmptyVocabulary { documents: docs.len() });
        }
        if kept.len() > self.max_features {
            // Stable sort keeps alphabetical order among equal frequencies.
            kept.sort_by(|a, b| b.2.cmp(&a.2));
            kept.truncate(self.max_features);
            kept.sort_by(|a, b| a.0.cmp(b.0));
        }

        let n = docs.len() as f64;
        let vocabulary: Vec<String> = kept.iter().map(|(t, _, _)| (*t).to_string()).collect();
        let idf: Vec<f64> = kept.iter().map(|(_, df, _)| ((1.0 + n) / (1.0 + *df as f64)).ln() + 1.0).collect();
        let index: HashMap<&str, usize> = vocabulary.iter().enumerate().map(|(i, t)| (t.as_str(), i)).collect();

        let rows = counts.iter().map(|tf| weigh(tf, &index, &idf)).collect();
        tracing::info!(documents = docs.len(), vocabulary = vocabulary.len(), "TF-IDF matrix built");
        Ok(FeatureMatrix { vocabulary, idf, rows })
    }
}

fn weigh(tf: &HashMap<String, usize>, index: &HashMap<&str, usize>, idf: &[f64]) -> SparseRow {
    let mut entries: Vec<(usize, f64)> = tf
        .iter()
        .filter_map(|(term, &n)| {
            index.get(term.as_str()).map(|&j| (j, (1.0 + (n as f64).ln()) * idf[j]))
        })
        .collect();
    entries.sort_by_key(|(j, _)| *j);

    let norm = entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in &mut entries {
            *w /= norm;
        }
    }
    let (indices, values) = entries.into_iter().unzip();
    SparseRow { indices, values }
}
