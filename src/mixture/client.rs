//! Client trait bounds for the mixture model.

use numr::ops::{
    IndexingOps, LinalgOps, MatmulOps, RandomOps, ReduceOps, ScalarOps, ShapeOps, StatisticalOps,
    TensorOps, TypeConversionOps, UnaryOps, UtilityOps,
};
use numr::runtime::{Runtime, RuntimeClient};

use crate::DType;

/// Trait bounds needed for the Gaussian mixture model.
pub trait MixtureClient<R: Runtime<DType = DType>>:
    IndexingOps<R>
    + ReduceOps<R>
    + ScalarOps<R>
    + TensorOps<R>
    + TypeConversionOps<R>
    + UnaryOps<R>
    + RandomOps<R>
    + ShapeOps<R>
    + UtilityOps<R>
    + MatmulOps<R>
    + LinalgOps<R>
    + StatisticalOps<R>
    + RuntimeClient<R>
{
}

impl<R, C> MixtureClient<R> for C
where
    R: Runtime<DType = DType>,
    C: IndexingOps<R>
        + ReduceOps<R>
        + ScalarOps<R>
        + TensorOps<R>
        + TypeConversionOps<R>
        + UnaryOps<R>
        + RandomOps<R>
        + ShapeOps<R>
        + UtilityOps<R>
        + MatmulOps<R>
        + LinalgOps<R>
        + StatisticalOps<R>
        + RuntimeClient<R>,
{
}
