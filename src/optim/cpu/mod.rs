//! CPU implementations of the optimization primitives.

mod anderson;
mod block_image;
mod conjugate_gradient;
mod convergence;
mod fixed_point;
mod gradient_descent;
