//! Persisted parameters of a Gaussian mixture model.

use serde::{Deserialize, Serialize};

/// Serializable snapshot of a mixture model's parameters.
///
/// Only the weights, means and covariances are stored (row-major); every derived
/// quantity (inverses, log-determinants, regularized copies) is recomputed on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GmmState {
    pub n_components: usize,
    pub dimension: usize,
    /// `[K]`
    pub weights: Vec<f64>,
    /// `[K, D]`
    pub mu: Vec<f64>,
    /// `[K, D, D]`
    pub cov: Vec<f64>,
}
