//! CPU implementation of the batched conjugate gradient solver.

use numr::runtime::cpu::{CpuClient, CpuRuntime};

use crate::error::OptimResult;
use crate::optim::impl_generic::conjugate_gradient::conjugate_gradient_impl;
use crate::optim::operand::Operand;
use crate::optim::traits::conjugate_gradient::{
    ConjugateGradientAlgorithms, ConjugateGradientOptions, ConjugateGradientResult,
};

impl ConjugateGradientAlgorithms<CpuRuntime> for CpuClient {
    fn conjugate_gradient<A>(
        &self,
        a: A,
        b: &Operand<CpuRuntime>,
        options: &ConjugateGradientOptions,
    ) -> OptimResult<ConjugateGradientResult<CpuRuntime>>
    where
        A: Fn(&Operand<CpuRuntime>) -> OptimResult<Operand<CpuRuntime>>,
    {
        conjugate_gradient_impl(self, a, b, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::operand::TensorList;
    use numr::ops::TensorOps;
    use numr::runtime::cpu::CpuDevice;
    use numr::tensor::Tensor;

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    fn options() -> ConjugateGradientOptions {
        ConjugateGradientOptions {
            tol: 1e-6,
            ..Default::default()
        }
    }

    #[test]
    fn test_diagonal_system() {
        let (device, client) = setup();
        let diag = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &[1, 3], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0, 1.0], &[1, 3], &device);

        let result = client
            .conjugate_gradient(
                |x| Ok(Operand::from(client.mul(x.first(), &diag)?)),
                &Operand::from(b),
                &options(),
            )
            .unwrap();

        assert!(result.converged);
        assert!(result.iterations <= 3);
        let x: Vec<f64> = result.x.first().to_vec();
        assert!((x[0] - 1.0).abs() < 1e-6);
        assert!((x[1] - 0.5).abs() < 1e-6);
        assert!((x[2] - 1.0 / 3.0).abs() < 1e-6);
        assert!(result.residual_sq[0] < 1e-12);
    }

    #[test]
    fn test_batched_system() {
        let (device, client) = setup();
        let diag = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &[1, 3], &device);
        #[rustfmt::skip]
        let b = Tensor::<CpuRuntime>::from_slice(&[
            1.0f64, 1.0, 1.0,
            2.0, 4.0, 6.0,
        ], &[2, 3], &device);

        let result = client
            .conjugate_gradient(
                |x| Ok(Operand::from(client.mul(x.first(), &diag)?)),
                &Operand::from(b),
                &options(),
            )
            .unwrap();

        assert!(result.converged);
        assert_eq!(result.residual_sq.len(), 2);
        let x: Vec<f64> = result.x.first().to_vec();
        let expected = [1.0, 0.5, 1.0 / 3.0, 2.0, 2.0, 2.0];
        for (xi, ei) in x.iter().zip(expected.iter()) {
            assert!((xi - ei).abs() < 1e-6, "got {}, expected {}", xi, ei);
        }
    }

    #[test]
    fn test_tensor_list_system() {
        let (device, client) = setup();
        // diag(1, 2, 3) split over two components.
        let d1 = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[1, 2], &device);
        let d2 = Tensor::<CpuRuntime>::from_slice(&[3.0f64], &[1, 1], &device);
        let b1 = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0], &[1, 2], &device);
        let b2 = Tensor::<CpuRuntime>::from_slice(&[1.0f64], &[1, 1], &device);
        let b = Operand::from(TensorList::new(vec![b1, b2]).unwrap());

        let result = client
            .conjugate_gradient(
                |x| {
                    let parts = x.components();
                    let y1 = client.mul(&parts[0], &d1)?;
                    let y2 = client.mul(&parts[1], &d2)?;
                    Ok(Operand::from(TensorList::new(vec![y1, y2])?))
                },
                &b,
                &options(),
            )
            .unwrap();

        assert!(result.converged);
        assert!(result.x.is_list());
        let x1: Vec<f64> = result.x.components()[0].to_vec();
        let x2: Vec<f64> = result.x.components()[1].to_vec();
        assert!((x1[0] - 1.0).abs() < 1e-6);
        assert!((x1[1] - 0.5).abs() < 1e-6);
        assert!((x2[0] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_max_iter_exhausted_is_not_an_error() {
        let (device, client) = setup();
        let diag = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &[1, 3], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0, 1.0], &[1, 3], &device);

        let result = client
            .conjugate_gradient(
                |x| Ok(Operand::from(client.mul(x.first(), &diag)?)),
                &Operand::from(b),
                &ConjugateGradientOptions {
                    max_iter: 1,
                    tol: 1e-10,
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.residual_sq[0] > 1e-20);
    }
}
