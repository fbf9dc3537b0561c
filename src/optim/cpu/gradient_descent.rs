//! CPU implementation of gradient descent.

use numr::runtime::cpu::{CpuClient, CpuRuntime};

use crate::error::OptimResult;
use crate::optim::impl_generic::gradient_descent::gradient_descent_impl;
use crate::optim::operand::Operand;
use crate::optim::traits::gradient_descent::{
    GradientDescentAlgorithms, GradientDescentOptions, GradientDescentResult,
};

impl GradientDescentAlgorithms<CpuRuntime> for CpuClient {
    fn gradient_descent<G>(
        &self,
        grad_f: G,
        x: &Operand<CpuRuntime>,
        options: &GradientDescentOptions,
    ) -> OptimResult<GradientDescentResult<CpuRuntime>>
    where
        G: Fn(&Operand<CpuRuntime>) -> OptimResult<Operand<CpuRuntime>>,
    {
        gradient_descent_impl(self, grad_f, x, options)
    }
}
