//! Anderson acceleration of fixed-point iterations.
//!
//! Anderson (type II) mixing keeps the last `history_size` iterates `x_i` and their images
//! `T(x_i)` and extrapolates the next iterate as the affine combination of the images
//! minimizing the residual norm:
//!
//! ```text
//! min ‖Σ p_i (T(x_i) − x_i)‖²   subject to Σ p_i = 1
//! ```
//!
//! The constrained least-squares problem is solved through its bordered KKT system
//! `H p = q`, batch element by batch element.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::OptimResult;
use crate::optim::operand::{IterateRecord, Operand};
use crate::optim::traits::fixed_point::FixedPointIterator;

/// Options for an Anderson acceleration step.
#[derive(Debug, Clone)]
pub struct AndersonOptions {
    /// Number of past iterates kept
    pub history_size: usize,
    /// Mixing parameter: 1 uses only the images `T(x_i)`
    pub beta: f64,
    /// Tikhonov term added to the Gram matrix
    pub eps: f64,
}

impl Default for AndersonOptions {
    fn default() -> Self {
        Self {
            history_size: 5,
            beta: 1.0,
            eps: 1e-4,
        }
    }
}

/// Mutable history of an Anderson-accelerated run.
///
/// Created by [`AndersonAlgorithms::init_anderson_acceleration`] and updated in place by
/// every step.
#[derive(Debug, Clone)]
pub struct AndersonState<R: Runtime> {
    pub(crate) history_size: usize,
    /// `[B, history_size, N]`
    pub(crate) x_hist: Tensor<R>,
    /// `[B, history_size, N]`
    pub(crate) t_hist: Tensor<R>,
    /// `[B, history_size + 1, history_size + 1]`
    pub(crate) h: Tensor<R>,
    /// `[B, history_size + 1, 1]`
    pub(crate) q: Tensor<R>,
    /// Shape of the (packed) iterate
    pub(crate) packed_shape: Vec<usize>,
    /// Component shapes when the iterate is a tensor list
    pub(crate) list_shapes: Option<Vec<Vec<usize>>>,
}

impl<R: Runtime> AndersonState<R> {
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    pub fn x_hist(&self) -> &Tensor<R> {
        &self.x_hist
    }

    pub fn t_hist(&self) -> &Tensor<R> {
        &self.t_hist
    }

    pub fn h(&self) -> &Tensor<R> {
        &self.h
    }

    pub fn q(&self) -> &Tensor<R> {
        &self.q
    }
}

/// Anderson acceleration.
pub trait AndersonAlgorithms<R: Runtime<DType = DType>> {
    /// Allocate the history for iterates shaped like `x`.
    ///
    /// Tensor-list iterates are packed into a block image first.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `history_size` is zero.
    fn init_anderson_acceleration(
        &self,
        x: &Operand<R>,
        history_size: usize,
    ) -> OptimResult<AndersonState<R>>;

    /// One accelerated step: record `(x_prev, T(x_prev))` in the history and return the
    /// extrapolated record.
    ///
    /// # Errors
    ///
    /// `SingularSystem` when the bordered system cannot be solved, `InvalidParameter`
    /// when `options.history_size` disagrees with the state.
    #[allow(clippy::too_many_arguments)]
    fn anderson_acceleration_step<I: FixedPointIterator<R>>(
        &self,
        iterator: &I,
        it: usize,
        x_prev: &IterateRecord<R>,
        tx_prev: &IterateRecord<R>,
        state: &mut AndersonState<R>,
        options: &AndersonOptions,
        ctx: &I::Context,
    ) -> OptimResult<IterateRecord<R>>;
}
