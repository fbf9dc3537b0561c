//! CPU implementation of block-image packing.

use numr::runtime::cpu::{CpuClient, CpuRuntime};
use numr::tensor::Tensor;

use crate::error::OptimResult;
use crate::optim::impl_generic::block_image::{
    create_block_image_impl, tuple_from_block_image_impl,
};
use crate::optim::traits::block_image::BlockImageAlgorithms;

impl BlockImageAlgorithms<CpuRuntime> for CpuClient {
    fn create_block_image(&self, xs: &[Tensor<CpuRuntime>]) -> OptimResult<Tensor<CpuRuntime>> {
        create_block_image_impl(self, xs)
    }

    fn tuple_from_block_image(
        &self,
        x: &Tensor<CpuRuntime>,
        shapes: &[Vec<usize>],
    ) -> OptimResult<Vec<Tensor<CpuRuntime>>> {
        tuple_from_block_image_impl(x, shapes)
    }
}
