//! Options, results and data sources for Gaussian mixture estimation.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

/// A source of data batches for EM.
///
/// Each batch is a `[B, D]` tensor of points; labels carried alongside are ignored.
pub trait BatchSource<R: Runtime> {
    fn batches(&self) -> impl Iterator<Item = &Tensor<R>>;
}

impl<R: Runtime, L> BatchSource<R> for [(Tensor<R>, L)] {
    fn batches(&self) -> impl Iterator<Item = &Tensor<R>> {
        self.iter().map(|(points, _)| points)
    }
}

impl<R: Runtime, L> BatchSource<R> for Vec<(Tensor<R>, L)> {
    fn batches(&self) -> impl Iterator<Item = &Tensor<R>> {
        self.iter().map(|(points, _)| points)
    }
}

impl<R: Runtime> BatchSource<R> for [Tensor<R>] {
    fn batches(&self) -> impl Iterator<Item = &Tensor<R>> {
        self.iter()
    }
}

/// Options for [`GaussianMixtureModel::fit`](crate::mixture::GaussianMixtureModel::fit).
#[derive(Debug, Clone)]
pub struct GmmFitOptions {
    /// Number of EM passes over the data
    pub max_iters: usize,
    /// Stop once the objective decreases by less than this; `None` runs all passes
    pub stopping_criterion: Option<f64>,
    /// Seed the means from the first batch
    pub data_init: bool,
    /// Added to the diagonal of every estimated covariance
    pub cov_regularization: f64,
    /// Emit an `info` event per EM pass
    pub verbose: bool,
}

impl Default for GmmFitOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            stopping_criterion: None,
            data_init: true,
            cov_regularization: 1e-5,
            verbose: false,
        }
    }
}

/// Outcome of an EM run.
#[derive(Debug, Clone)]
pub struct GmmFitResult {
    /// Mean negative log-likelihood of the data, one entry per EM pass
    pub objectives: Vec<f64>,
    pub iterations: usize,
    /// Whether the stopping criterion fired
    pub converged: bool,
}
