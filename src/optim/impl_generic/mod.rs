//! Generic implementations of the optimization primitives.
//!
//! These implementations work across all Runtime backends using tensor operations.

pub mod anderson;
pub mod block_image;
pub mod conjugate_gradient;
pub mod convergence;
pub mod fixed_point;
pub mod gradient_descent;

pub use anderson::{anderson_acceleration_step_impl, init_anderson_acceleration_impl};
pub use block_image::{create_block_image_impl, tuple_from_block_image_impl};
pub use conjugate_gradient::conjugate_gradient_impl;
pub use convergence::{RELATIVE_CHANGE_EPS, check_conv_impl, relative_change};
pub use fixed_point::fixed_point_impl;
pub use gradient_descent::gradient_descent_impl;
