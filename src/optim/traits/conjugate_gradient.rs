//! Batched conjugate gradient for linear systems `A x = b`.
//!
//! `A` is supplied as a callable on operands and is assumed self-adjoint positive
//! definite (not checked). Every batch element is solved independently, but the
//! iteration only stops once all of them meet the tolerance.

use numr::runtime::Runtime;

use crate::DType;
use crate::error::OptimResult;
use crate::optim::operand::Operand;

/// Options for the conjugate gradient solver.
#[derive(Debug, Clone)]
pub struct ConjugateGradientOptions {
    /// Maximum number of iterations
    pub max_iter: usize,
    /// Stop when every batch element has `|r·r| < tol²`
    pub tol: f64,
    /// Stabilizer added to the step-size denominators
    pub eps: f64,
}

impl Default for ConjugateGradientOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-5,
            eps: 1e-8,
        }
    }
}

/// Result of a conjugate gradient solve.
#[derive(Debug, Clone)]
pub struct ConjugateGradientResult<R: Runtime> {
    /// Approximate solution, same structure as `b`
    pub x: Operand<R>,
    /// Number of iterations performed
    pub iterations: usize,
    /// Whether every batch element met the tolerance
    pub converged: bool,
    /// Final squared residual norm per batch element
    pub residual_sq: Vec<f64>,
}

/// Batched conjugate gradient solver.
pub trait ConjugateGradientAlgorithms<R: Runtime<DType = DType>> {
    /// Solve `A x = b` starting from `x = 0`.
    ///
    /// Running out of iterations is not an error; check `converged` on the result.
    fn conjugate_gradient<A>(
        &self,
        a: A,
        b: &Operand<R>,
        options: &ConjugateGradientOptions,
    ) -> OptimResult<ConjugateGradientResult<R>>
    where
        A: Fn(&Operand<R>) -> OptimResult<Operand<R>>;
}
