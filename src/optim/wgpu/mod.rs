//! WebGPU implementations of the optimization primitives.

use numr::runtime::wgpu::{WgpuClient, WgpuRuntime};
use numr::tensor::Tensor;

use crate::error::OptimResult;
use crate::optim::impl_generic::{
    anderson_acceleration_step_impl, check_conv_impl, conjugate_gradient_impl,
    create_block_image_impl, fixed_point_impl, gradient_descent_impl,
    init_anderson_acceleration_impl, tuple_from_block_image_impl,
};
use crate::optim::operand::{IterateRecord, Operand};
use crate::optim::traits::{
    AndersonAlgorithms, AndersonOptions, AndersonState, BlockImageAlgorithms,
    ConjugateGradientAlgorithms, ConjugateGradientOptions, ConjugateGradientResult,
    ConvergenceAlgorithms, ConvergenceOptions, ConvergenceView, FixedPointAlgorithms,
    FixedPointIterator, FixedPointOptions, FixedPointResult, GradientDescentAlgorithms,
    GradientDescentOptions, GradientDescentResult,
};

impl ConvergenceAlgorithms<WgpuRuntime> for WgpuClient {
    fn check_conv<X: ConvergenceView<WgpuRuntime>>(
        &self,
        x_prev: &X,
        x: &X,
        it: usize,
        options: &ConvergenceOptions,
    ) -> OptimResult<bool> {
        check_conv_impl(self, x_prev, x, it, options)
    }
}

impl ConjugateGradientAlgorithms<WgpuRuntime> for WgpuClient {
    fn conjugate_gradient<A>(
        &self,
        a: A,
        b: &Operand<WgpuRuntime>,
        options: &ConjugateGradientOptions,
    ) -> OptimResult<ConjugateGradientResult<WgpuRuntime>>
    where
        A: Fn(&Operand<WgpuRuntime>) -> OptimResult<Operand<WgpuRuntime>>,
    {
        conjugate_gradient_impl(self, a, b, options)
    }
}

impl GradientDescentAlgorithms<WgpuRuntime> for WgpuClient {
    fn gradient_descent<G>(
        &self,
        grad_f: G,
        x: &Operand<WgpuRuntime>,
        options: &GradientDescentOptions,
    ) -> OptimResult<GradientDescentResult<WgpuRuntime>>
    where
        G: Fn(&Operand<WgpuRuntime>) -> OptimResult<Operand<WgpuRuntime>>,
    {
        gradient_descent_impl(self, grad_f, x, options)
    }
}

impl BlockImageAlgorithms<WgpuRuntime> for WgpuClient {
    fn create_block_image(&self, xs: &[Tensor<WgpuRuntime>]) -> OptimResult<Tensor<WgpuRuntime>> {
        create_block_image_impl(self, xs)
    }

    fn tuple_from_block_image(
        &self,
        x: &Tensor<WgpuRuntime>,
        shapes: &[Vec<usize>],
    ) -> OptimResult<Vec<Tensor<WgpuRuntime>>> {
        tuple_from_block_image_impl(x, shapes)
    }
}

impl AndersonAlgorithms<WgpuRuntime> for WgpuClient {
    fn init_anderson_acceleration(
        &self,
        x: &Operand<WgpuRuntime>,
        history_size: usize,
    ) -> OptimResult<AndersonState<WgpuRuntime>> {
        init_anderson_acceleration_impl(self, x, history_size)
    }

    fn anderson_acceleration_step<I: FixedPointIterator<WgpuRuntime>>(
        &self,
        iterator: &I,
        it: usize,
        x_prev: &IterateRecord<WgpuRuntime>,
        tx_prev: &IterateRecord<WgpuRuntime>,
        state: &mut AndersonState<WgpuRuntime>,
        options: &AndersonOptions,
        ctx: &I::Context,
    ) -> OptimResult<IterateRecord<WgpuRuntime>> {
        anderson_acceleration_step_impl(self, iterator, it, x_prev, tx_prev, state, options, ctx)
    }
}

impl FixedPointAlgorithms<WgpuRuntime> for WgpuClient {
    fn fixed_point<I: FixedPointIterator<WgpuRuntime>>(
        &self,
        iterator: &I,
        x0: &Operand<WgpuRuntime>,
        ctx: &I::Context,
        options: &FixedPointOptions,
    ) -> OptimResult<FixedPointResult<WgpuRuntime>> {
        fixed_point_impl(self, iterator, x0, ctx, options)
    }
}
