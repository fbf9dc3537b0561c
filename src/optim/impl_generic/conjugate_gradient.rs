//! Batched conjugate gradient.

use numr::runtime::Runtime;
use numr::tensor::Tensor;
use tracing::{debug, warn};

use crate::DType;
use crate::error::OptimResult;
use crate::optim::client::OptimClient;
use crate::optim::operand::{Operand, host_values};
use crate::optim::traits::conjugate_gradient::{
    ConjugateGradientOptions, ConjugateGradientResult,
};

/// Solve `A x = b` for every batch element of `b`.
///
/// Step sizes are computed per batch element; the loop ends once every element has
/// `|r·r| < tol²`.
pub fn conjugate_gradient_impl<R, C, A>(
    client: &C,
    a: A,
    b: &Operand<R>,
    options: &ConjugateGradientOptions,
) -> OptimResult<ConjugateGradientResult<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
    A: Fn(&Operand<R>) -> OptimResult<Operand<R>>,
{
    let tol_sq = options.tol * options.tol;

    let mut x = b.zeros_like();
    let mut r = b.sub(client, &a(&x)?)?;
    let mut p = r.clone();
    let mut rsold = r.batch_dot(client, &r)?;
    let mut residual_sq = abs_values(client, &rsold)?;

    for iter in 0..options.max_iter {
        let ap = a(&p)?;
        let denom = client.add_scalar(&p.batch_dot(client, &ap)?, options.eps)?;
        let alpha = client.div(&rsold, &denom)?;

        x = x.add(client, &p.batch_scale(client, &alpha)?)?;
        r = r.sub(client, &ap.batch_scale(client, &alpha)?)?;

        let rsnew = r.batch_dot(client, &r)?;
        residual_sq = abs_values(client, &rsnew)?;
        debug!(
            iteration = iter,
            max_residual_sq = residual_sq.iter().cloned().fold(0.0, f64::max),
            "conjugate gradient step"
        );

        if residual_sq.iter().all(|&rs| rs < tol_sq) {
            return Ok(ConjugateGradientResult {
                x,
                iterations: iter + 1,
                converged: true,
                residual_sq,
            });
        }

        let beta = client.div(&rsnew, &client.add_scalar(&rsold, options.eps)?)?;
        p = r.add(client, &p.batch_scale(client, &beta)?)?;
        rsold = rsnew;
    }

    warn!(
        max_iter = options.max_iter,
        tol = options.tol,
        "conjugate gradient reached max_iter without converging"
    );
    Ok(ConjugateGradientResult {
        x,
        iterations: options.max_iter,
        converged: false,
        residual_sq,
    })
}

fn abs_values<R, C>(client: &C, t: &Tensor<R>) -> OptimResult<Vec<f64>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    Ok(host_values(client, t)?.into_iter().map(f64::abs).collect())
}
