//! Packing of differently-sized images into one block-diagonal image.
//!
//! Images `x_i` of shape `[B, C, H_i, W_i]` are placed on the diagonal of a single
//! `[B, C, ΣH_i, ΣW_i]` image, zero elsewhere, so that a list of iterates can go through
//! batched linear algebra as one tensor.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::OptimResult;

/// Block-image pack / unpack.
pub trait BlockImageAlgorithms<R: Runtime<DType = DType>> {
    /// Pack `xs` into a block-diagonal image.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for an empty input, `ShapeMismatch` for non-4-D inputs or
    /// differing batch / channel sizes.
    fn create_block_image(&self, xs: &[Tensor<R>]) -> OptimResult<Tensor<R>>;

    /// Slice the diagonal blocks of `x` back into tensors of the given shapes.
    ///
    /// Exact inverse of [`create_block_image`](Self::create_block_image).
    fn tuple_from_block_image(
        &self,
        x: &Tensor<R>,
        shapes: &[Vec<usize>],
    ) -> OptimResult<Vec<Tensor<R>>>;
}
