//! Fixed-point driver with optional Anderson acceleration.

use numr::runtime::Runtime;
use tracing::debug;

use crate::DType;
use crate::error::OptimResult;
use crate::optim::client::OptimClient;
use crate::optim::operand::Operand;
use crate::optim::traits::fixed_point::{FixedPointIterator, FixedPointOptions, FixedPointResult};

use super::anderson::{anderson_acceleration_step_impl, init_anderson_acceleration_impl};
use super::convergence::check_conv_impl;

pub fn fixed_point_impl<R, C, I>(
    client: &C,
    iterator: &I,
    x0: &Operand<R>,
    ctx: &I::Context,
    options: &FixedPointOptions,
) -> OptimResult<FixedPointResult<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
    I: FixedPointIterator<R>,
{
    let mut x = iterator.record(x0.clone(), ctx)?;
    let mut anderson = match &options.anderson {
        Some(opts) => Some((
            opts,
            init_anderson_acceleration_impl(client, &x.iterate, opts.history_size)?,
        )),
        None => None,
    };

    for it in 0..options.max_iter {
        let tx = iterator.iterate(&x, ctx)?;
        let x_new = match anderson.as_mut() {
            Some((opts, state)) => {
                anderson_acceleration_step_impl(client, iterator, it, &x, &tx, state, *opts, ctx)?
            }
            None => tx,
        };
        debug!(iteration = it, "fixed-point step");

        let converged =
            options.early_stop && check_conv_impl(client, &x, &x_new, it, &options.convergence)?;
        x = x_new;
        if converged {
            return Ok(FixedPointResult {
                record: x,
                iterations: it + 1,
                converged: true,
            });
        }
    }

    Ok(FixedPointResult {
        record: x,
        iterations: options.max_iter,
        converged: false,
    })
}
