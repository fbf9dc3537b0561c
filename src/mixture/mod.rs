//! Gaussian mixture models.
//!
//! [`GaussianMixtureModel`] holds full-covariance components with cached inverses and
//! log-determinants, evaluates (negative) log-likelihoods, classifies points and
//! estimates its parameters by batched expectation-maximization over any
//! [`BatchSource`].

pub mod client;
mod gmm;
pub mod impl_generic;
mod state;
pub mod traits;

pub use client::MixtureClient;
pub use gmm::GaussianMixtureModel;
pub use traits::{BatchSource, GmmFitOptions, GmmFitResult};
pub use state::GmmState;
