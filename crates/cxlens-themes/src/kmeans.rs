//! Seeded k-means over TF-IDF rows, delegated to `linfa-clustering`.
//!
//! Rows are densified into an `ndarray::Array2` and fitted with k-means++
//! initialisation and `n_init` restarts drawn from one `StdRng` seeded
//! once, so a given (matrix, k, seed) always produces the same labels.

use linfa::traits::{Fit, Predict};
use linfa::DatasetBase;
use linfa_clustering::KMeans as LinfaKMeans;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use cxlens_core::error::{Error, Result};

use crate::vectorizer::FeatureMatrix;

#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// Cluster id per document, in document order.
    pub labels: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances of documents to their centroid.
    pub inertia: f64,
}

impl Clustering {
    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    seed: u64,
    n_init: usize,
    max_iter: usize,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self { k, seed: 42, n_init: 10, max_iter: 300 }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn fit(&self, matrix: &FeatureMatrix) -> Result<Clustering> {
        let n = matrix.n_docs();
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidConfig(format!("cannot form {} clusters from {} documents", self.k, n)));
        }
        if self.n_init == 0 || self.max_iter == 0 {
            return Err(Error::InvalidConfig("n_init and max_iter must be at least 1".to_string()));
        }

        let records = dense(matrix);
        let dataset = DatasetBase::from(records.clone());
        let model = LinfaKMeans::params_with_rng(self.k, StdRng::seed_from_u64(self.seed))
            .n_runs(self.n_init)
            .max_n_iterations(self.max_iter as u64)
            .fit(&dataset)
            .map_err(|e| Error::InvalidConfig(format!("k-means fit failed: {}", e)))?;

        let labels: Array1<usize> = model.predict(&records);
        let inertia = model.inertia();
        tracing::debug!(k = self.k, n_init = self.n_init, inertia, "k-means fitted");
        Ok(Clustering {
            labels: labels.to_vec(),
            centroids: model.centroids().outer_iter().map(|c| c.to_vec()).collect(),
            inertia,
        })
    }
}

/// N x V dense copy of the sparse rows.
fn dense(matrix: &FeatureMatrix) -> Array2<f64> {
    let dim = matrix.n_features();
    let mut data = Array2::zeros((matrix.n_docs(), dim));
    for (mut out, row) in data.outer_iter_mut().zip(&matrix.rows) {
        out.assign(&Array1::from(row.to_dense(dim)));
    }
    data
}
