//! CUDA implementations of the optimization primitives.

use numr::runtime::cuda::{CudaClient, CudaRuntime};
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

impl ConvergenceAlgorithms<CudaRuntime> for CudaClient {
    fn check_conv<X: ConvergenceView<CudaRuntime>>(
        &self,
        x_prev: &X,
        x: &X,
        it: usize,
        options: &ConvergenceOptions,
    ) -> OptimResult<bool> {
        check_conv_impl(self, x_prev, x, it, options)
    }
}

impl ConjugateGradientAlgorithms<CudaRuntime> for CudaClient {
    fn conjugate_gradient<A>(
        &self,
        a: A,
        b: &Operand<CudaRuntime>,
        options: &ConjugateGradientOptions,
    ) -> OptimResult<ConjugateGradientResult<CudaRuntime>>
    where
        A: Fn(&Operand<CudaRuntime>) -> OptimResult<Operand<CudaRuntime>>,
    {
        conjugate_gradient_impl(self, a, b, options)
    }
}

impl GradientDescentAlgorithms<CudaRuntime> for CudaClient {
    fn gradient_descent<G>(
        &self,
        grad_f: G,
        x: &Operand<CudaRuntime>,
        options: &GradientDescentOptions,
    ) -> OptimResult<GradientDescentResult<CudaRuntime>>
    where
        G: Fn(&Operand<CudaRuntime>) -> OptimResult<Operand<CudaRuntime>>,
    {
        gradient_descent_impl(self, grad_f, x, options)
    }
}

impl BlockImageAlgorithms<CudaRuntime> for CudaClient {
    fn create_block_image(&self, xs: &[Tensor<CudaRuntime>]) -> OptimResult<Tensor<CudaRuntime>> {
        create_block_image_impl(self, xs)
    }

    fn tuple_from_block_image(
        &self,
        x: &Tensor<CudaRuntime>,
        shapes: &[Vec<usize>],
    ) -> OptimResult<Vec<Tensor<CudaRuntime>>> {
        tuple_from_block_image_impl(x, shapes)
    }
}

impl AndersonAlgorithms<CudaRuntime> for CudaClient {
    fn init_anderson_acceleration(
        &self,
        x: &Operand<CudaRuntime>,
        history_size: usize,
    ) -> OptimResult<AndersonState<CudaRuntime>> {
        init_anderson_acceleration_impl(self, x, history_size)
    }

    fn anderson_acceleration_step<I: FixedPointIterator<CudaRuntime>>(
        &self,
        iterator: &I,
        it: usize,
        x_prev: &IterateRecord<CudaRuntime>,
        tx_prev: &IterateRecord<CudaRuntime>,
        state: &mut AndersonState<CudaRuntime>,
        options: &AndersonOptions,
        ctx: &I::Context,
    ) -> OptimResult<IterateRecord<CudaRuntime>> {
        anderson_acceleration_step_impl(self, iterator, it, x_prev, tx_prev, state, options, ctx)
    }
}

impl FixedPointAlgorithms<CudaRuntime> for CudaClient {
    fn fixed_point<I: FixedPointIterator<CudaRuntime>>(
        &self,
        iterator: &I,
        x0: &Operand<CudaRuntime>,
        ctx: &I::Context,
        options: &FixedPointOptions,
    ) -> OptimResult<FixedPointResult<CudaRuntime>> {
        fixed_point_impl(self, iterator, x0, ctx, options)
    }
}
