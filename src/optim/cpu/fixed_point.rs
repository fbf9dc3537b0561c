//! CPU implementation of the fixed-point driver.

use numr::runtime::cpu::{CpuClient, CpuRuntime};

use crate::error::OptimResult;
use crate::optim::impl_generic::fixed_point::fixed_point_impl;
use crate::optim::operand::Operand;
use crate::optim::traits::fixed_point::{
    FixedPointAlgorithms, FixedPointIterator, FixedPointOptions, FixedPointResult,
};

impl FixedPointAlgorithms<CpuRuntime> for CpuClient {
    fn fixed_point<I: FixedPointIterator<CpuRuntime>>(
        &self,
        iterator: &I,
        x0: &Operand<CpuRuntime>,
        ctx: &I::Context,
        options: &FixedPointOptions,
    ) -> OptimResult<FixedPointResult<CpuRuntime>> {
        fixed_point_impl(self, iterator, x0, ctx, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::operand::IterateRecord;
    use crate::optim::traits::anderson::AndersonOptions;
    use crate::optim::traits::convergence::{ConvergenceCriterion, ConvergenceOptions};
    use numr::ops::{ReduceOps, ScalarOps, TensorOps};
    use numr::runtime::cpu::CpuDevice;
    use numr::tensor::Tensor;

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    /// Gradient step on f(x) = ½‖x − target‖² with step 0.25; cost is f.
    struct QuadraticStep {
        target: Tensor<CpuRuntime>,
    }

    impl FixedPointIterator<CpuRuntime> for QuadraticStep {
        type Context = CpuClient;

        fn iterate(
            &self,
            x: &IterateRecord<CpuRuntime>,
            client: &CpuClient,
        ) -> OptimResult<IterateRecord<CpuRuntime>> {
            let cur = x.iterate.first();
            let grad = client.sub(cur, &self.target)?;
            let next = client.sub(cur, &client.mul_scalar(&grad, 0.25)?)?;
            self.record(Operand::from(next), client)
        }

        fn has_cost(&self) -> bool {
            true
        }

        fn cost(
            &self,
            estimate: &Operand<CpuRuntime>,
            client: &CpuClient,
        ) -> OptimResult<Tensor<CpuRuntime>> {
            let diff = client.sub(estimate.first(), &self.target)?;
            let sq = client.mul(&diff, &diff)?;
            let total = client.sum(&sq, &[1], false)?;
            Ok(client.mul_scalar(&total, 0.5)?)
        }
    }

    fn problem(device: &CpuDevice) -> (QuadraticStep, Operand<CpuRuntime>) {
        let target = Tensor::<CpuRuntime>::from_slice(&[3.0f64, -1.0, 2.0], &[1, 3], device);
        let x0 = Tensor::<CpuRuntime>::zeros(&[1, 3], crate::DType::F64, device);
        (QuadraticStep { target }, Operand::from(x0))
    }

    #[test]
    fn test_plain_iteration_converges() {
        let (device, client) = setup();
        let (iterator, x0) = problem(&device);

        let options = FixedPointOptions {
            max_iter: 200,
            convergence: ConvergenceOptions {
                threshold: 1e-8,
                ..Default::default()
            },
            ..Default::default()
        };
        let result = client.fixed_point(&iterator, &x0, &client, &options).unwrap();

        assert!(result.converged);
        assert!(result.record.cost.is_some());
        let x: Vec<f64> = result.record.estimate.first().to_vec();
        assert!((x[0] - 3.0).abs() < 1e-6);
        assert!((x[1] + 1.0).abs() < 1e-6);
        assert!((x[2] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_anderson_needs_fewer_iterations() {
        let (device, client) = setup();
        let (iterator, x0) = problem(&device);

        let plain = FixedPointOptions {
            max_iter: 200,
            convergence: ConvergenceOptions {
                threshold: 1e-8,
                ..Default::default()
            },
            ..Default::default()
        };
        let accelerated = FixedPointOptions {
            anderson: Some(AndersonOptions {
                eps: 1e-10,
                ..Default::default()
            }),
            ..plain.clone()
        };

        let slow = client.fixed_point(&iterator, &x0, &client, &plain).unwrap();
        let fast = client.fixed_point(&iterator, &x0, &client, &accelerated).unwrap();

        assert!(fast.converged);
        assert!(fast.iterations < slow.iterations);
        let x: Vec<f64> = fast.record.iterate.first().to_vec();
        assert!((x[0] - 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_cost_criterion_and_no_early_stop() {
        let (device, client) = setup();
        let (iterator, x0) = problem(&device);

        let options = FixedPointOptions {
            max_iter: 7,
            early_stop: false,
            convergence: ConvergenceOptions {
                criterion: ConvergenceCriterion::Cost,
                threshold: 1e-3,
                verbose: false,
            },
            anderson: None,
        };
        let result = client.fixed_point(&iterator, &x0, &client, &options).unwrap();

        assert!(!result.converged);
        assert_eq!(result.iterations, 7);
    }
}
