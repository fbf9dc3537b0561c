//! Generic convergence monitor.

use numr::runtime::Runtime;
use tracing::info;

use crate::DType;
use crate::error::OptimResult;
use crate::optim::client::OptimClient;
use crate::optim::operand::Operand;
use crate::optim::traits::convergence::{ConvergenceCriterion, ConvergenceOptions, ConvergenceView};

/// Added to the reference norm so that a zero iterate does not divide by zero.
pub const RELATIVE_CHANGE_EPS: f64 = 1e-6;

/// `‖prev − cur‖ / (‖cur‖ + 1e-6)` over every element of every component.
pub fn relative_change<R, C>(client: &C, prev: &Operand<R>, cur: &Operand<R>) -> OptimResult<f64>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    let diff = prev.sub(client, cur)?;
    Ok(diff.norm(client)? / (cur.norm(client)? + RELATIVE_CHANGE_EPS))
}

pub fn check_conv_impl<R, C, X>(
    client: &C,
    x_prev: &X,
    x: &X,
    it: usize,
    options: &ConvergenceOptions,
) -> OptimResult<bool>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
    X: ConvergenceView<R>,
{
    let criterion = match options.criterion {
        ConvergenceCriterion::Residual => {
            relative_change(client, &x_prev.residual_view(), &x.residual_view())?
        }
        ConvergenceCriterion::Cost => {
            let prev = Operand::Tensor(x_prev.cost_view()?);
            let cur = Operand::Tensor(x.cost_view()?);
            relative_change(client, &prev, &cur)?
        }
    };

    let converged = criterion < options.threshold;
    if converged && options.verbose {
        info!(
            iteration = it,
            criterion = %options.criterion,
            value = criterion,
            threshold = options.threshold,
            "iterations converged"
        );
    }
    Ok(converged)
}
