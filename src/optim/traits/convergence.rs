//! Convergence monitoring for iterative algorithms.
//!
//! A monitor compares two consecutive iterates (or their costs) through the relative
//! change `‖prev − cur‖ / (‖cur‖ + 1e-6)` and reports convergence when it falls below a
//! threshold.

use std::fmt;
use std::str::FromStr;

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::optim::operand::{IterateRecord, Operand};

/// Quantity compared between consecutive iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConvergenceCriterion {
    /// Relative change of the iterate (first estimate component for records).
    #[default]
    Residual,
    /// Relative change of the cost.
    Cost,
}

impl FromStr for ConvergenceCriterion {
    type Err = OptimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "residual" => Ok(Self::Residual),
            "cost" => Ok(Self::Cost),
            other => Err(OptimError::UnsupportedCriterion {
                criterion: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ConvergenceCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Residual => write!(f, "residual"),
            Self::Cost => write!(f, "cost"),
        }
    }
}

/// Options for the convergence monitor.
#[derive(Debug, Clone)]
pub struct ConvergenceOptions {
    pub criterion: ConvergenceCriterion,
    /// Convergence is reported when the criterion is strictly below this value.
    pub threshold: f64,
    /// Emit an `info` event when convergence is detected.
    pub verbose: bool,
}

impl Default for ConvergenceOptions {
    fn default() -> Self {
        Self {
            criterion: ConvergenceCriterion::Residual,
            threshold: 1e-5,
            verbose: false,
        }
    }
}

/// Something the convergence monitor can compare across iterations.
///
/// Raw arrays only carry a residual view; iterate records also expose their cost.
pub trait ConvergenceView<R: Runtime<DType = DType>> {
    /// Operand compared in `residual` mode.
    fn residual_view(&self) -> Operand<R>;

    /// Cost compared in `cost` mode.
    fn cost_view(&self) -> OptimResult<Tensor<R>>;
}

impl<R: Runtime<DType = DType>> ConvergenceView<R> for Tensor<R> {
    fn residual_view(&self) -> Operand<R> {
        Operand::Tensor(self.clone())
    }

    fn cost_view(&self) -> OptimResult<Tensor<R>> {
        Err(OptimError::invalid_parameter(
            "criterion",
            "cost criterion requires iterate records carrying a cost",
        ))
    }
}

impl<R: Runtime<DType = DType>> ConvergenceView<R> for Operand<R> {
    fn residual_view(&self) -> Operand<R> {
        self.clone()
    }

    fn cost_view(&self) -> OptimResult<Tensor<R>> {
        Err(OptimError::invalid_parameter(
            "criterion",
            "cost criterion requires iterate records carrying a cost",
        ))
    }
}

impl<R: Runtime<DType = DType>> ConvergenceView<R> for IterateRecord<R> {
    fn residual_view(&self) -> Operand<R> {
        Operand::Tensor(self.estimate.first().clone())
    }

    fn cost_view(&self) -> OptimResult<Tensor<R>> {
        self.cost.clone().ok_or_else(|| {
            OptimError::invalid_parameter("criterion", "iterate record carries no cost")
        })
    }
}

/// Convergence monitor.
pub trait ConvergenceAlgorithms<R: Runtime<DType = DType>> {
    /// Compare `x_prev` and `x` at iteration `it` and report whether the run converged.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the cost criterion is requested on inputs without a cost.
    fn check_conv<X: ConvergenceView<R>>(
        &self,
        x_prev: &X,
        x: &X,
        it: usize,
        options: &ConvergenceOptions,
    ) -> OptimResult<bool>;
}
