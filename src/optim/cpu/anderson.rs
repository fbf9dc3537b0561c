//! CPU implementation of Anderson acceleration.

use numr::runtime::cpu::{CpuClient, CpuRuntime};

use crate::error::OptimResult;
use crate::optim::impl_generic::anderson::{
    anderson_acceleration_step_impl, init_anderson_acceleration_impl,
};
use crate::optim::operand::{IterateRecord, Operand};
use crate::optim::traits::anderson::{AndersonAlgorithms, AndersonOptions, AndersonState};
use crate::optim::traits::fixed_point::FixedPointIterator;

impl AndersonAlgorithms<CpuRuntime> for CpuClient {
    fn init_anderson_acceleration(
        &self,
        x: &Operand<CpuRuntime>,
        history_size: usize,
    ) -> OptimResult<AndersonState<CpuRuntime>> {
        init_anderson_acceleration_impl(self, x, history_size)
    }

    fn anderson_acceleration_step<I: FixedPointIterator<CpuRuntime>>(
        &self,
        iterator: &I,
        it: usize,
        x_prev: &IterateRecord<CpuRuntime>,
        tx_prev: &IterateRecord<CpuRuntime>,
        state: &mut AndersonState<CpuRuntime>,
        options: &AndersonOptions,
        ctx: &I::Context,
    ) -> OptimResult<IterateRecord<CpuRuntime>> {
        anderson_acceleration_step_impl(self, iterator, it, x_prev, tx_prev, state, options, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OptimError;
    use crate::optim::operand::TensorList;
    use numr::ops::ScalarOps;
    use numr::runtime::cpu::CpuDevice;
    use numr::tensor::Tensor;

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    /// T(x) = 0.5·x + 1 applied to every component; fixed point at 2.
    struct Contraction;

    impl FixedPointIterator<CpuRuntime> for Contraction {
        type Context = CpuClient;

        fn iterate(
            &self,
            x: &IterateRecord<CpuRuntime>,
            client: &CpuClient,
        ) -> OptimResult<IterateRecord<CpuRuntime>> {
            let mut mapped = x
                .iterate
                .components()
                .iter()
                .map(|t| Ok(client.add_scalar(&client.mul_scalar(t, 0.5)?, 1.0)?))
                .collect::<OptimResult<Vec<_>>>()?;
            let next = if x.iterate.is_list() {
                Operand::from(TensorList::new(mapped)?)
            } else {
                Operand::from(mapped.remove(0))
            };
            self.record(next, client)
        }
    }

    fn options(history_size: usize) -> AndersonOptions {
        AndersonOptions {
            history_size,
            ..Default::default()
        }
    }

    #[test]
    fn test_init_layout() {
        let (device, client) = setup();
        let x = Operand::from(Tensor::<CpuRuntime>::zeros(&[2, 3], crate::DType::F64, &device));

        let state = client.init_anderson_acceleration(&x, 2).unwrap();
        assert_eq!(state.history_size(), 2);
        assert_eq!(state.x_hist().shape(), &[2, 2, 3]);
        assert_eq!(state.t_hist().shape(), &[2, 2, 3]);
        assert_eq!(state.h().shape(), &[2, 3, 3]);
        assert_eq!(state.q().shape(), &[2, 3, 1]);

        let h: Vec<f64> = state.h().to_vec();
        #[rustfmt::skip]
        let expected = [
            0.0, 1.0, 1.0,
            1.0, 0.0, 0.0,
            1.0, 0.0, 0.0,
        ];
        assert_eq!(&h[..9], &expected);
        assert_eq!(&h[9..], &expected);
        assert_eq!(state.q().to_vec::<f64>(), vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_history_rejected() {
        let (device, client) = setup();
        let x = Operand::from(Tensor::<CpuRuntime>::zeros(&[1, 3], crate::DType::F64, &device));
        let err = client.init_anderson_acceleration(&x, 0).unwrap_err();
        assert!(matches!(err, OptimError::InvalidParameter { .. }));
    }

    #[test]
    fn test_history_one_matches_plain_iteration() {
        let (device, client) = setup();
        let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 4.0, -1.0], &[1, 3], &device);
        let mut x = Contraction.record(Operand::from(x0.clone()), &client).unwrap();
        let mut plain = x.clone();
        let mut state = client.init_anderson_acceleration(&x.iterate, 1).unwrap();

        for it in 0..4 {
            let tx = Contraction.iterate(&x, &client).unwrap();
            x = client
                .anderson_acceleration_step(&Contraction, it, &x, &tx, &mut state, &options(1), &client)
                .unwrap();
            plain = Contraction.iterate(&plain, &client).unwrap();

            let a: Vec<f64> = x.iterate.first().to_vec();
            let p: Vec<f64> = plain.iterate.first().to_vec();
            for (ai, pi) in a.iter().zip(p.iter()) {
                assert!((ai - pi).abs() < 1e-10, "step {}: {} vs {}", it, ai, pi);
            }
        }
    }

    #[test]
    fn test_accelerates_linear_map() {
        let (device, client) = setup();
        let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 10.0, -6.0, 3.0], &[2, 2], &device);
        let mut x = Contraction.record(Operand::from(x0), &client).unwrap();
        let mut state = client.init_anderson_acceleration(&x.iterate, 3).unwrap();

        for it in 0..3 {
            let tx = Contraction.iterate(&x, &client).unwrap();
            x = client
                .anderson_acceleration_step(&Contraction, it, &x, &tx, &mut state, &options(3), &client)
                .unwrap();
        }

        // Plain iteration would still be ~0.25·|x0 − 2| away after three steps.
        let v: Vec<f64> = x.iterate.first().to_vec();
        for vi in v {
            assert!((vi - 2.0).abs() < 1e-2, "got {}", vi);
        }
    }

    #[test]
    fn test_tensor_list_iterate_keeps_structure() {
        let (device, client) = setup();
        let a = Tensor::<CpuRuntime>::from_slice(&[0.0f64; 4], &[1, 1, 2, 2], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[8.0f64], &[1, 1, 1, 1], &device);
        let list = Operand::from(TensorList::new(vec![a, b]).unwrap());

        let mut x = Contraction.record(list, &client).unwrap();
        let mut state = client.init_anderson_acceleration(&x.iterate, 2).unwrap();
        assert_eq!(state.x_hist().shape(), &[1, 2, 9]);

        for it in 0..2 {
            let tx = Contraction.iterate(&x, &client).unwrap();
            x = client
                .anderson_acceleration_step(&Contraction, it, &x, &tx, &mut state, &options(2), &client)
                .unwrap();
        }

        assert!(x.iterate.is_list());
        let parts = x.iterate.components();
        assert_eq!(parts[0].shape(), &[1, 1, 2, 2]);
        assert_eq!(parts[1].shape(), &[1, 1, 1, 1]);
    }

    #[test]
    fn test_history_size_mismatch() {
        let (device, client) = setup();
        let x0 = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[1, 2], &device);
        let x = Contraction.record(Operand::from(x0), &client).unwrap();
        let tx = Contraction.iterate(&x, &client).unwrap();
        let mut state = client.init_anderson_acceleration(&x.iterate, 2).unwrap();

        let err = client
            .anderson_acceleration_step(&Contraction, 0, &x, &tx, &mut state, &options(5), &client)
            .unwrap_err();
        assert!(matches!(err, OptimError::InvalidParameter { .. }));
    }

    #[test]
    fn test_damped_mixing() {
        let (device, client) = setup();
        let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 4.0, -1.0], &[1, 3], &device);
        let mut x = Contraction.record(Operand::from(x0), &client).unwrap();
        let mut state = client.init_anderson_acceleration(&x.iterate, 2).unwrap();
        let opts = AndersonOptions {
            history_size: 2,
            beta: 0.5,
            eps: 1e-10,
        };

        // One stored pair: p = [1], so x = 0.5·T(x0) + 0.5·x0.
        let tx = Contraction.iterate(&x, &client).unwrap();
        x = client
            .anderson_acceleration_step(&Contraction, 0, &x, &tx, &mut state, &opts, &client)
            .unwrap();
        let v: Vec<f64> = x.iterate.first().to_vec();
        let expected = [0.5, 3.5, -0.25];
        for (got, want) in v.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12, "got {} want {}", got, want);
        }

        // The two residuals are parallel, so the mixed point is the fixed point 2.
        let tx = Contraction.iterate(&x, &client).unwrap();
        x = client
            .anderson_acceleration_step(&Contraction, 1, &x, &tx, &mut state, &opts, &client)
            .unwrap();
        for vi in x.iterate.first().to_vec::<f64>() {
            assert!((vi - 2.0).abs() < 1e-6, "got {}", vi);
        }
    }

    #[test]
    fn test_degenerate_history_is_singular() {
        let (device, client) = setup();
        // Already at the fixed point: every residual is zero.
        let x0 = Tensor::<CpuRuntime>::from_slice(&[2.0f64, 2.0], &[1, 2], &device);
        let x = Contraction.record(Operand::from(x0), &client).unwrap();
        let tx = Contraction.iterate(&x, &client).unwrap();
        let mut state = client.init_anderson_acceleration(&x.iterate, 2).unwrap();
        let opts = AndersonOptions {
            history_size: 2,
            eps: 0.0,
            ..Default::default()
        };

        client
            .anderson_acceleration_step(&Contraction, 0, &x, &tx, &mut state, &opts, &client)
            .unwrap();
        let err = client
            .anderson_acceleration_step(&Contraction, 1, &x, &tx, &mut state, &opts, &client)
            .unwrap_err();
        assert!(matches!(err, OptimError::SingularSystem { .. }), "got {:?}", err);
    }

    #[test]
    fn test_history_wraps_around() {
        let (device, client) = setup();
        let x0 = Tensor::<CpuRuntime>::from_slice(&[0.0f64, 10.0, -6.0, 3.0], &[1, 4], &device);
        let mut x = Contraction.record(Operand::from(x0), &client).unwrap();
        let mut state = client.init_anderson_acceleration(&x.iterate, 2).unwrap();
        let mut inputs = Vec::new();

        for it in 0..5 {
            inputs.push(x.iterate.first().to_vec::<f64>());
            let tx = Contraction.iterate(&x, &client).unwrap();
            x = client
                .anderson_acceleration_step(&Contraction, it, &x, &tx, &mut state, &options(2), &client)
                .unwrap();
        }

        // Slot 0 was last written at it = 4, slot 1 at it = 3.
        let hist: Vec<f64> = state.x_hist().to_vec();
        assert_eq!(&hist[..4], inputs[4].as_slice());
        assert_eq!(&hist[4..], inputs[3].as_slice());

        for vi in x.iterate.first().to_vec::<f64>() {
            assert!((vi - 2.0).abs() < 1e-3, "got {}", vi);
        }
    }
}
