//! Fixed-step gradient descent.

use numr::runtime::Runtime;

use crate::DType;
use crate::error::OptimResult;
use crate::optim::operand::Operand;

/// Step size of gradient descent.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSize {
    /// One step for every batch element
    Scalar(f64),
    /// One step per batch element; the length must equal the batch size
    PerBatch(Vec<f64>),
}

impl Default for StepSize {
    fn default() -> Self {
        StepSize::Scalar(1.0)
    }
}

impl From<f64> for StepSize {
    fn from(step: f64) -> Self {
        StepSize::Scalar(step)
    }
}

impl From<Vec<f64>> for StepSize {
    fn from(steps: Vec<f64>) -> Self {
        StepSize::PerBatch(steps)
    }
}

/// Options for gradient descent.
#[derive(Debug, Clone)]
pub struct GradientDescentOptions {
    pub step_size: StepSize,
    pub max_iter: usize,
    /// Residual threshold handed to the convergence monitor
    pub tol: f64,
}

impl Default for GradientDescentOptions {
    fn default() -> Self {
        Self {
            step_size: StepSize::default(),
            max_iter: 100,
            tol: 1e-5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradientDescentResult<R: Runtime> {
    pub x: Operand<R>,
    pub iterations: usize,
    pub converged: bool,
}

/// Gradient descent driven by a gradient callable.
pub trait GradientDescentAlgorithms<R: Runtime<DType = DType>> {
    /// Iterate `x ← x − step_size · grad_f(x)`, with one step per batch element for
    /// [`StepSize::PerBatch`], until the relative change of `x` drops
    /// below `tol` or `max_iter` is reached.
    fn gradient_descent<G>(
        &self,
        grad_f: G,
        x: &Operand<R>,
        options: &GradientDescentOptions,
    ) -> OptimResult<GradientDescentResult<R>>
    where
        G: Fn(&Operand<R>) -> OptimResult<Operand<R>>;
}
