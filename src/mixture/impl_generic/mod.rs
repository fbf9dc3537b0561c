//! Generic implementations of the mixture-model math.
//!
//! These implementations work across all Runtime backends using tensor operations.

pub mod gmm;

pub use gmm::{
    ComponentParams, EmUpdate, MIN_COMPONENT_MASS, component_log_likelihoods_impl,
    covariance_caches_impl, em_step_impl, identity_stack_impl, logsumexp_rows_impl,
    prepare_points_impl, seed_means_impl, weighted_log_likelihoods_impl,
};
