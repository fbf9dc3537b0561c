//! Color to grayscale projection.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::host::from_host;
use crate::optim::client::OptimClient;

use super::LinearOperator;

/// Rec. 601 luma coefficients, rescaled to sum to one.
const REC601: [f64; 3] = [0.4472 * 0.66851, 0.8781 * 0.66851, 0.1706 * 0.66851];

const SRF_SUM_RTOL: f64 = 1e-4;

/// Spectral response used to mix channels into one.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SpectralResponse {
    #[default]
    Rec601,
    /// Equal weight `1 / C` for every channel
    Average,
    /// Explicit per-channel weights; missing trailing channels get zero weight
    Custom(Vec<f64>),
    /// Trainable response (not supported)
    Learned,
}

/// Maps `[B, C, H, W]` images to `[B, 1, H, W]` by a weighted channel sum.
#[derive(Debug, Clone)]
pub struct Decolorize {
    srf: Vec<f64>,
}

impl Default for Decolorize {
    /// RGB input with the Rec. 601 response.
    fn default() -> Self {
        Self {
            srf: REC601.to_vec(),
        }
    }
}

impl Decolorize {
    /// # Errors
    ///
    /// - `NotImplemented` for [`SpectralResponse::Learned`]
    /// - `InvalidParameter` when the response has more weights than `channels` or its
    ///   weights do not sum to one
    pub fn new(channels: usize, response: SpectralResponse) -> OptimResult<Self> {
        if channels == 0 {
            return Err(OptimError::invalid_parameter("channels", "must be at least 1"));
        }
        let mut srf = match response {
            SpectralResponse::Rec601 => REC601.to_vec(),
            SpectralResponse::Average => vec![1.0 / channels as f64; channels],
            SpectralResponse::Custom(weights) => weights,
            SpectralResponse::Learned => {
                return Err(OptimError::NotImplemented {
                    feature: "learned spectral response".to_string(),
                });
            }
        };

        if srf.len() > channels {
            return Err(OptimError::invalid_parameter(
                "srf",
                format!("{} weights given for {} channels", srf.len(), channels),
            ));
        }
        srf.resize(channels, 0.0);

        let total: f64 = srf.iter().sum();
        if (total - 1.0).abs() > SRF_SUM_RTOL {
            return Err(OptimError::invalid_parameter(
                "srf",
                format!("weights sum to {}, expected 1", total),
            ));
        }
        Ok(Self { srf })
    }

    pub fn channels(&self) -> usize {
        self.srf.len()
    }

    /// Per-channel weights.
    pub fn srf(&self) -> &[f64] {
        &self.srf
    }

    /// Weights as a `[1, C, 1, 1]` tensor broadcast to `shape`.
    fn weights<R, C>(&self, client: &C, shape: &[usize], dtype: DType, device: &R::Device) -> OptimResult<Tensor<R>>
    where
        R: Runtime<DType = DType>,
        C: OptimClient<R>,
    {
        let w = from_host(client, &self.srf, &[1, self.srf.len(), 1, 1], dtype, device)?;
        Ok(w.broadcast_to(shape)?)
    }
}

impl<R: Runtime<DType = DType>> LinearOperator<R> for Decolorize {
    fn a<C: OptimClient<R>>(&self, client: &C, x: &Tensor<R>) -> OptimResult<Tensor<R>> {
        if x.ndim() != 4 || x.shape()[1] != self.channels() {
            return Err(OptimError::shape_mismatch(
                "decolorize input",
                format!("[B, {}, H, W]", self.channels()),
                x.shape(),
            ));
        }
        let w = self.weights(client, x.shape(), x.dtype(), x.device())?;
        Ok(client.sum(&client.mul(x, &w)?, &[1], true)?)
    }

    fn a_adjoint<C: OptimClient<R>>(&self, client: &C, y: &Tensor<R>) -> OptimResult<Tensor<R>> {
        if y.ndim() != 4 || y.shape()[1] != 1 {
            return Err(OptimError::shape_mismatch(
                "decolorize adjoint input",
                "[B, 1, H, W]",
                y.shape(),
            ));
        }
        let shape = [y.shape()[0], self.channels(), y.shape()[2], y.shape()[3]];
        let w = self.weights(client, &shape, y.dtype(), y.device())?;
        Ok(client.mul(&y.broadcast_to(&shape)?, &w)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::traits::ConjugateGradientOptions;
    use numr::ops::RandomOps;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_constant_image_stays_constant() {
        let (device, client) = setup();
        let op = Decolorize::default();
        let x = Tensor::<CpuRuntime>::ones(&[1, 3, 3, 3], DType::F64, &device);

        let y = op.a(&client, &x).unwrap();
        assert_eq!(y.shape(), &[1, 1, 3, 3]);
        for v in y.to_vec::<f64>() {
            assert!((v - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_average_response() {
        let (device, client) = setup();
        let op = Decolorize::new(2, SpectralResponse::Average).unwrap();
        assert_eq!(op.srf(), &[0.5, 0.5]);

        // Channel 0 = [1, 2], channel 1 = [3, 4].
        let x = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[1, 2, 1, 2], &device);
        let y: Vec<f64> = op.a(&client, &x).unwrap().to_vec();
        assert_eq!(y, vec![2.0, 3.0]);

        let back = op.a_adjoint(&client, &op.a(&client, &x).unwrap()).unwrap();
        assert_eq!(back.shape(), &[1, 2, 1, 2]);
        assert_eq!(back.to_vec::<f64>(), vec![1.0, 1.5, 1.0, 1.5]);
    }

    #[test]
    fn test_custom_response_validation() {
        let padded = Decolorize::new(3, SpectralResponse::Custom(vec![0.5, 0.5])).unwrap();
        assert_eq!(padded.srf(), &[0.5, 0.5, 0.0]);

        let too_long = Decolorize::new(2, SpectralResponse::Custom(vec![0.2, 0.3, 0.5]));
        assert!(matches!(too_long, Err(OptimError::InvalidParameter { .. })));

        let bad_sum = Decolorize::new(3, SpectralResponse::Custom(vec![0.3, 0.3, 0.3]));
        assert!(matches!(bad_sum, Err(OptimError::InvalidParameter { .. })));

        let learned = Decolorize::new(3, SpectralResponse::Learned);
        assert!(matches!(learned, Err(OptimError::NotImplemented { .. })));

        // Rec. 601 needs at least three channels.
        assert!(Decolorize::new(2, SpectralResponse::Rec601).is_err());
        assert_eq!(Decolorize::new(4, SpectralResponse::Rec601).unwrap().srf()[3], 0.0);
    }

    #[test]
    fn test_channel_mismatch() {
        let (device, client) = setup();
        let op = Decolorize::default();

        let x = Tensor::<CpuRuntime>::ones(&[1, 4, 2, 2], DType::F64, &device);
        assert!(matches!(
            op.a(&client, &x).unwrap_err(),
            OptimError::ShapeMismatch { .. }
        ));

        let y = Tensor::<CpuRuntime>::ones(&[1, 3, 2, 2], DType::F64, &device);
        assert!(matches!(
            op.a_adjoint(&client, &y).unwrap_err(),
            OptimError::ShapeMismatch { .. }
        ));
    }

    #[test]
    fn test_adjointness() {
        let (_device, client) = setup();
        let op = Decolorize::default();
        let x = client.randn(&[2, 3, 4, 4], DType::F64).unwrap();

        let gap = op.adjointness_test(&client, &x).unwrap();
        assert!(gap.abs() < 1e-10, "adjointness gap {}", gap);
    }

    #[test]
    fn test_a_dagger_reproduces_measurement() {
        let (device, client) = setup();
        let op = Decolorize::default();
        let x = Tensor::<CpuRuntime>::from_slice(
            &[
                0.2f64, 0.4, 0.6, 0.8, // R
                0.1, 0.3, 0.5, 0.7, // G
                0.9, 0.6, 0.3, 0.0, // B
            ],
            &[1, 3, 2, 2],
            &device,
        );
        let y = op.a(&client, &x).unwrap();

        let x_dag = op
            .a_dagger(&client, &y, &ConjugateGradientOptions::default())
            .unwrap();
        assert_eq!(x_dag.shape(), &[1, 3, 2, 2]);

        let y_back: Vec<f64> = op.a(&client, &x_dag).unwrap().to_vec();
        for (got, want) in y_back.iter().zip(y.to_vec::<f64>().iter()) {
            assert!((got - want).abs() < 1e-6);
        }
    }
}
