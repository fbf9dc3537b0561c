//! Fixed-step gradient descent.

use numr::runtime::Runtime;
use tracing::debug;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::host::from_host;
use crate::optim::client::OptimClient;
use crate::optim::operand::Operand;
use crate::optim::traits::convergence::{ConvergenceCriterion, ConvergenceOptions};
use crate::optim::traits::gradient_descent::{
    GradientDescentOptions, GradientDescentResult, StepSize,
};

use super::convergence::check_conv_impl;

pub fn gradient_descent_impl<R, C, G>(
    client: &C,
    grad_f: G,
    x0: &Operand<R>,
    options: &GradientDescentOptions,
) -> OptimResult<GradientDescentResult<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
    G: Fn(&Operand<R>) -> OptimResult<Operand<R>>,
{
    let conv = ConvergenceOptions {
        criterion: ConvergenceCriterion::Residual,
        threshold: options.tol,
        verbose: false,
    };

    let (scalar_step, per_batch) = match &options.step_size {
        StepSize::Scalar(step) => (*step, None),
        StepSize::PerBatch(steps) => {
            let batch = x0.batch_size();
            if steps.len() != batch {
                return Err(OptimError::shape_mismatch(
                    "gradient descent step sizes",
                    [batch],
                    [steps.len()],
                ));
            }
            let coeffs = from_host(client, steps, &[batch], x0.dtype(), x0.device())?;
            (1.0, Some(coeffs))
        }
    };

    let mut x = x0.clone();
    for iter in 0..options.max_iter {
        let x_prev = x;
        let grad = grad_f(&x_prev)?;
        let step = match &per_batch {
            Some(coeffs) => grad.batch_scale(client, coeffs)?,
            None => grad.scale(client, scalar_step)?,
        };
        x = x_prev.sub(client, &step)?;
        debug!(iteration = iter, "gradient descent step");

        if check_conv_impl(client, &x_prev, &x, iter, &conv)? {
            return Ok(GradientDescentResult {
                x,
                iterations: iter + 1,
                converged: true,
            });
        }
    }

    Ok(GradientDescentResult {
        x,
        iterations: options.max_iter,
        converged: false,
    })
}
