//! Batched iterative optimization primitives.
//!
//! - [`ConvergenceAlgorithms::check_conv`]: relative-change convergence monitor
//! - [`ConjugateGradientAlgorithms::conjugate_gradient`]: batched CG for SPD systems
//! - [`GradientDescentAlgorithms::gradient_descent`]: fixed-step gradient descent
//! - [`BlockImageAlgorithms`]: pack / unpack image lists as block-diagonal images
//! - [`AndersonAlgorithms`]: Anderson acceleration of fixed-point maps
//! - [`FixedPointAlgorithms::fixed_point`]: fixed-point driver tying the above together
//!
//! All routines operate on [`Operand`]s, so a list of differently-shaped tensors can
//! be used wherever a single batched tensor is accepted.

pub mod client;
mod cpu;
#[cfg(feature = "cuda")]
mod cuda;
pub mod impl_generic;
pub mod operand;
pub mod traits;
#[cfg(feature = "wgpu")]
mod wgpu;

pub use client::OptimClient;
pub use operand::{IterateRecord, Operand, TensorList};
pub use traits::{
    AndersonAlgorithms, AndersonOptions, AndersonState, BlockImageAlgorithms,
    ConjugateGradientAlgorithms, ConjugateGradientOptions, ConjugateGradientResult,
    ConvergenceAlgorithms, ConvergenceCriterion, ConvergenceOptions, ConvergenceView,
    FixedPointAlgorithms, FixedPointIterator, FixedPointOptions, FixedPointResult,
    GradientDescentAlgorithms, GradientDescentOptions, GradientDescentResult, StepSize,
};
