//! Option / result types and the data-source trait for the mixture model.

pub mod gmm;

pub use gmm::{BatchSource, GmmFitOptions, GmmFitResult};
