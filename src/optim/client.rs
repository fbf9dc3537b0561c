//! Client trait bounds shared by the iterative solvers.

use numr::algorithm::linalg::LinearAlgebraAlgorithms;
use numr::ops::{
    ComplexOps, MatmulOps, RandomOps, ReduceOps, ScalarOps, ShapeOps, TensorOps,
    TypeConversionOps, UnaryOps, UtilityOps,
};
use numr::runtime::{Runtime, RuntimeClient};

use crate::DType;

/// Trait bounds needed by the optimization routines.
pub trait OptimClient<R: Runtime<DType = DType>>:
    TensorOps<R>
    + ScalarOps<R>
    + ReduceOps<R>
    + UnaryOps<R>
    + ShapeOps<R>
    + MatmulOps<R>
    + UtilityOps<R>
    + ComplexOps<R>
    + TypeConversionOps<R>
    + RandomOps<R>
    + LinearAlgebraAlgorithms<R>
    + RuntimeClient<R>
{
}

impl<R, C> OptimClient<R> for C
where
    R: Runtime<DType = DType>,
    C: TensorOps<R>
        + ScalarOps<R>
        + ReduceOps<R>
        + UnaryOps<R>
        + ShapeOps<R>
        + MatmulOps<R>
        + UtilityOps<R>
        + ComplexOps<R>
        + TypeConversionOps<R>
        + RandomOps<R>
        + LinearAlgebraAlgorithms<R>
        + RuntimeClient<R>,
{
}
