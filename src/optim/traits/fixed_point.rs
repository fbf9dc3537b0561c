//! Fixed-point iterations `X_{k+1} = T(X_k)` on iterate records.
//!
//! The map `T` is supplied through [`FixedPointIterator`]; the driver only sequences
//! calls to it, optionally wraps each step with Anderson acceleration and watches
//! convergence.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::optim::operand::{IterateRecord, Operand};
use crate::optim::traits::anderson::AndersonOptions;
use crate::optim::traits::convergence::ConvergenceOptions;

/// A fixed-point map on iterate records.
///
/// `Context` bundles whatever the map needs besides the iterate: data-fidelity term,
/// prior, step parameters, measurements.
pub trait FixedPointIterator<R: Runtime<DType = DType>> {
    type Context;

    /// Apply the map `T` to a record.
    fn iterate(&self, x: &IterateRecord<R>, ctx: &Self::Context) -> OptimResult<IterateRecord<R>>;

    /// Derive the estimate from an iterate. Identity unless the iterate lives in a
    /// different space than the estimate (e.g. a dual variable).
    fn estimate_from_iterate(
        &self,
        x: &Operand<R>,
        _ctx: &Self::Context,
    ) -> OptimResult<Operand<R>> {
        Ok(x.clone())
    }

    /// Whether [`cost`](Self::cost) is available.
    fn has_cost(&self) -> bool {
        false
    }

    /// Cost of an estimate; a scalar or one value per batch element.
    fn cost(&self, _estimate: &Operand<R>, _ctx: &Self::Context) -> OptimResult<Tensor<R>> {
        Err(OptimError::NotImplemented {
            feature: "cost for this fixed-point iterator".to_string(),
        })
    }

    /// Build a full record (estimate and, when available, cost) from an iterate.
    fn record(&self, x: Operand<R>, ctx: &Self::Context) -> OptimResult<IterateRecord<R>> {
        let estimate = self.estimate_from_iterate(&x, ctx)?;
        let cost = if self.has_cost() {
            Some(self.cost(&estimate, ctx)?)
        } else {
            None
        };
        Ok(IterateRecord::new(x, estimate, cost))
    }
}

/// Options for the fixed-point driver.
#[derive(Debug, Clone)]
pub struct FixedPointOptions {
    pub max_iter: usize,
    /// Stop as soon as the convergence monitor fires
    pub early_stop: bool,
    pub convergence: ConvergenceOptions,
    /// Anderson acceleration, disabled when `None`
    pub anderson: Option<AndersonOptions>,
}

impl Default for FixedPointOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            early_stop: true,
            convergence: ConvergenceOptions::default(),
            anderson: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FixedPointResult<R: Runtime> {
    /// Last record produced
    pub record: IterateRecord<R>,
    pub iterations: usize,
    pub converged: bool,
}

/// Fixed-point driver.
pub trait FixedPointAlgorithms<R: Runtime<DType = DType>> {
    /// Run `X ← T(X)` from `x0` for at most `max_iter` steps.
    fn fixed_point<I: FixedPointIterator<R>>(
        &self,
        iterator: &I,
        x0: &Operand<R>,
        ctx: &I::Context,
        options: &FixedPointOptions,
    ) -> OptimResult<FixedPointResult<R>>;
}
