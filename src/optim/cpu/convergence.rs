//! CPU implementation of the convergence monitor.

use numr::runtime::cpu::{CpuClient, CpuRuntime};

use crate::error::OptimResult;
use crate::optim::impl_generic::convergence::check_conv_impl;
use crate::optim::traits::convergence::{ConvergenceAlgorithms, ConvergenceOptions, ConvergenceView};

impl ConvergenceAlgorithms<CpuRuntime> for CpuClient {
    fn check_conv<X: ConvergenceView<CpuRuntime>>(
        &self,
        x_prev: &X,
        x: &X,
        it: usize,
        options: &ConvergenceOptions,
    ) -> OptimResult<bool> {
        check_conv_impl(self, x_prev, x, it, options)
    }
}
