//! invr - Batched iterative solvers for imaging inverse problems
//!
//! invr provides the numerical core of iterative reconstruction: convergence monitoring,
//! batched linear solves, fixed-point iterations with Anderson acceleration, Gaussian
//! mixture priors and simple linear forward operators. Built on numr's tensor
//! primitives, it works across all backends (CPU, CUDA, WebGPU).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       invr                              │
//! │    (optim, mixture models, linear operators)            │
//! └──────────────────────────┬──────────────────────────────┘
//!                            │ uses
//! ┌──────────────────────────▼──────────────────────────────┐
//! │                       numr                              │
//! │     (tensors, matmul, linalg, reductions, random)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`optim`] - Convergence checks, conjugate gradient, gradient descent, block images,
//!   Anderson acceleration and a fixed-point driver, all over batched [`optim::Operand`]s
//! - [`mixture`] - Gaussian mixture model with batched EM
//! - [`physics`] - Linear forward operators (pseudo-inverse, adjointness test, Decolorize)
//!
//! # Feature Flags
//!
//! | Feature | Description | Dependencies |
//! |---------|-------------|--------------|
//! | `cuda`  | Enable CUDA GPU acceleration | CUDA 12.x, numr/cuda |
//! | `wgpu`  | Enable WebGPU cross-platform GPU | numr/wgpu |
//!
//! ## Backend Limitations
//!
//! - **WebGPU**: Only supports F32 precision (no F64)
//! - **CUDA**: Requires CUDA 12.x toolkit installed
//!
//! # Example
//!
//! ```ignore
//! use invr::optim::{ConjugateGradientAlgorithms, ConjugateGradientOptions, Operand};
//! use numr::ops::TensorOps;
//! use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};
//! use numr::tensor::Tensor;
//!
//! let device = CpuDevice::new();
//! let client = CpuClient::new(device.clone());
//!
//! // Solve diag(1, 2, 3) x = 1
//! let diag = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &[1, 3], &device);
//! let b = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0, 1.0], &[1, 3], &device);
//! let result = client
//!     .conjugate_gradient(
//!         |x| Ok(Operand::from(client.mul(x.first(), &diag)?)),
//!         &Operand::from(b),
//!         &ConjugateGradientOptions::default(),
//!     )
//!     .unwrap();
//! ```

pub mod error;
mod host;
pub mod mixture;
pub mod optim;
pub mod physics;

// Re-export main types for convenience
pub use error::{OptimError, OptimResult};
pub use mixture::{BatchSource, GaussianMixtureModel, GmmFitOptions, GmmFitResult, GmmState};
pub use optim::{
    AndersonAlgorithms, AndersonOptions, BlockImageAlgorithms, ConjugateGradientAlgorithms,
    ConjugateGradientOptions, ConvergenceAlgorithms, ConvergenceCriterion, ConvergenceOptions,
    FixedPointAlgorithms, FixedPointIterator, FixedPointOptions, GradientDescentAlgorithms,
    GradientDescentOptions, IterateRecord, Operand, StepSize, TensorList,
};
pub use physics::{Decolorize, LinearOperator, SpectralResponse};

// Re-export numr types that users will commonly need
pub use numr::dtype::DType;
pub use numr::runtime::{Runtime, RuntimeClient};
pub use numr::tensor::Tensor;
