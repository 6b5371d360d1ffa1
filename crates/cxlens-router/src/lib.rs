//! cxlens-router
//!
//! Answers free-text questions about a complaints dataset. Each question is
//! classified as quantitative or qualitative and handed to the aggregation
//! handler or the retrieval-and-summary handler.

pub mod intent;
pub mod qual;
pub mod quant;

use std::sync::Arc;

use cxlens_core::error::Result;
use cxlens_core::traits::Completer;
use cxlens_core::types::{Dataset, Intent, Provenance, QueryResult, ThemeRecord};

pub use intent::IntentClassifier;
pub use qual::{QualHandler, Retrieval};
pub use quant::{QuantHandler, QuantQuery};

/// Owns both handlers for one dataset snapshot. The dataset and theme table
/// are shared read-only between them for the router's lifetime.
pub struct Router<C>
where
    C: Completer,
{
    classifier: IntentClassifier,
    quant: QuantHandler,
    qual: QualHandler<C>,
    dataset: Arc<Dataset>,
    themes: Arc<Vec<ThemeRecord>>,
}

impl<C> Router<C>
where
    C: Completer,
{
    pub fn new(dataset: Dataset, themes: Vec<ThemeRecord>, completer: C) -> Result<Self> {
        let dataset = Arc::new(dataset);
        let themes = Arc::new(themes);
        Ok(Self {
            classifier: IntentClassifier::new()?,
            quant: QuantHandler::new(dataset.clone(), themes.clone())?,
            qual: QualHandler::new(dataset.clone(), themes.clone(), completer)?,
            dataset,
            themes,
        })
    }

    pub fn classify(&self, question: &str) -> Intent {
        self.classifier.classify(question)
    }

    pub fn answer(&self, question: &str) -> QueryResult {
        let intent = self.classify(question);
        tracing::debug!(%intent, question, "Routing question");
        match intent {
            Intent::Quant => QueryResult::Quantitative(self.quant.handle(question)),
            Intent::Qual => QueryResult::Qualitative(self.qual.handle(question)),
        }
    }

    /// Provenance a qualitative answer would carry right now.
    pub fn completion_mode(&self) -> Provenance {
        self.qual.completer().mode()
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn themes(&self) -> &[ThemeRecord] {
        &self.themes
    }
}
