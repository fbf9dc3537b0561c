//! Trait definitions and option / result types for the optimization primitives.

pub mod anderson;
pub mod block_image;
pub mod conjugate_gradient;
pub mod convergence;
pub mod fixed_point;
pub mod gradient_descent;

pub use anderson::{AndersonAlgorithms, AndersonOptions, AndersonState};
pub use block_image::BlockImageAlgorithms;
pub use conjugate_gradient::{
    ConjugateGradientAlgorithms, ConjugateGradientOptions, ConjugateGradientResult,
};
pub use convergence::{
    ConvergenceAlgorithms, ConvergenceCriterion, ConvergenceOptions, ConvergenceView,
};
pub use fixed_point::{
    FixedPointAlgorithms, FixedPointIterator, FixedPointOptions, FixedPointResult,
};
pub use gradient_descent::{
    GradientDescentAlgorithms, GradientDescentOptions, GradientDescentResult, StepSize,
};
