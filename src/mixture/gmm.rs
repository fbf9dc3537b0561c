//! Gaussian mixture model with full covariances and batched EM estimation.
//!
//! The model keeps the inverse and log-determinant of every covariance next to the
//! covariance itself. All three only change together, through [`set_cov`], so
//! likelihood evaluations never invert a matrix. A setter that fails leaves the model
//! untouched.
//!
//! [`set_cov`]: GaussianMixtureModel::set_cov

use numr::runtime::Runtime;
use numr::tensor::Tensor;
use tracing::{debug, info};

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::host::{from_host, to_host};
use crate::mixture::client::MixtureClient;
use crate::mixture::impl_generic::{
    ComponentParams, component_log_likelihoods_impl, covariance_caches_impl, em_step_impl,
    identity_stack_impl, logsumexp_rows_impl, prepare_points_impl, seed_means_impl,
    weighted_log_likelihoods_impl,
};
use crate::mixture::state::GmmState;
use crate::mixture::traits::{BatchSource, GmmFitOptions, GmmFitResult};

/// Initial objective, so that the first EM step never triggers the stopping rule.
const INITIAL_OBJECTIVE: f64 = 1e100;

/// Covariances shifted by `reg · I`, with their inverses and log-determinants.
#[derive(Debug, Clone)]
struct RegularizedCovariance<R: Runtime> {
    reg: f64,
    cov: Tensor<R>,
    cov_inv: Tensor<R>,
    logdet: Tensor<R>,
}

/// Gaussian mixture model `p(x) = Σ_k w_k N(x; μ_k, Σ_k)`.
#[derive(Debug, Clone)]
pub struct GaussianMixtureModel<R: Runtime> {
    n_components: usize,
    dimension: usize,
    /// `[K]`, non-negative, sums to one
    weights: Tensor<R>,
    /// `[K, D]`
    mu: Tensor<R>,
    /// `[K, D, D]`
    cov: Tensor<R>,
    /// `[K, D, D]`
    cov_inv: Tensor<R>,
    /// `[K]`
    logdet_cov: Tensor<R>,
    regularized: Option<RegularizedCovariance<R>>,
}

impl<R: Runtime<DType = DType>> GaussianMixtureModel<R> {
    /// Model with uniform weights, zero means and covariances `0.1·I`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `n_components` or `dimension` is zero.
    pub fn new<C: MixtureClient<R>>(
        client: &C,
        n_components: usize,
        dimension: usize,
        dtype: DType,
        device: &R::Device,
    ) -> OptimResult<Self> {
        if n_components == 0 {
            return Err(OptimError::invalid_parameter(
                "n_components",
                "must be at least 1",
            ));
        }
        if dimension == 0 {
            return Err(OptimError::invalid_parameter("dimension", "must be at least 1"));
        }

        let (k, d) = (n_components, dimension);
        let cov = client.mul_scalar(&identity_stack_impl(client, k, d, dtype, device)?, 0.1)?;
        let (cov_inv, logdet_cov) = covariance_caches_impl(client, &cov)?;

        Ok(Self {
            n_components,
            dimension,
            weights: Tensor::<R>::full_scalar(&[k], dtype, 1.0 / k as f64, device),
            mu: Tensor::<R>::zeros(&[k, d], dtype, device),
            cov,
            cov_inv,
            logdet_cov,
            regularized: None,
        })
    }

    pub fn n_components(&self) -> usize {
        self.n_components
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn dtype(&self) -> DType {
        self.mu.dtype()
    }

    pub fn device(&self) -> &R::Device {
        self.mu.device()
    }

    /// Mixture weights `[K]`.
    pub fn weights(&self) -> Tensor<R> {
        self.weights.clone()
    }

    /// Means `[K, D]`.
    pub fn mu(&self) -> Tensor<R> {
        self.mu.clone()
    }

    /// Covariances `[K, D, D]`.
    pub fn cov(&self) -> Tensor<R> {
        self.cov.clone()
    }

    pub fn cov_inv(&self) -> Tensor<R> {
        self.cov_inv.clone()
    }

    /// Log-determinants of the covariances `[K]`.
    pub fn logdet_cov(&self) -> Tensor<R> {
        self.logdet_cov.clone()
    }

    /// Regularization set through [`set_cov_reg`](Self::set_cov_reg), if any.
    pub fn covariance_regularization(&self) -> Option<f64> {
        self.regularized.as_ref().map(|r| r.reg)
    }

    fn regularized(&self) -> OptimResult<&RegularizedCovariance<R>> {
        self.regularized.as_ref().ok_or_else(|| {
            OptimError::invalid_parameter(
                "covariance_regularization",
                "no covariance regularization has been set",
            )
        })
    }

    /// Regularized covariances `Σ_k + reg·I`.
    pub fn cov_reg(&self) -> OptimResult<Tensor<R>> {
        Ok(self.regularized()?.cov.clone())
    }

    pub fn cov_inv_reg(&self) -> OptimResult<Tensor<R>> {
        Ok(self.regularized()?.cov_inv.clone())
    }

    pub fn logdet_cov_reg(&self) -> OptimResult<Tensor<R>> {
        Ok(self.regularized()?.logdet.clone())
    }

    fn params(&self) -> ComponentParams<'_, R> {
        ComponentParams {
            weights: &self.weights,
            mu: &self.mu,
            cov_inv: &self.cov_inv,
            logdet: &self.logdet_cov,
        }
    }

    fn regularized_params(&self) -> OptimResult<ComponentParams<'_, R>> {
        let reg = self.regularized()?;
        Ok(ComponentParams {
            weights: &self.weights,
            mu: &self.mu,
            cov_inv: &reg.cov_inv,
            logdet: &reg.logdet,
        })
    }

    /// Set the means; they carry no derived state.
    pub fn set_mu(&mut self, mu: Tensor<R>) -> OptimResult<()> {
        if mu.shape() != [self.n_components, self.dimension] {
            return Err(OptimError::shape_mismatch(
                "set_mu",
                [self.n_components, self.dimension],
                mu.shape(),
            ));
        }
        self.mu = mu;
        Ok(())
    }

    /// `w / Σw`, after checking that `w` is `[K]` with non-negative entries and a
    /// positive sum.
    fn normalized_weights<C: MixtureClient<R>>(&self, client: &C, w: &Tensor<R>) -> OptimResult<Tensor<R>> {
        if w.shape() != [self.n_components] {
            return Err(OptimError::shape_mismatch(
                "set_weights",
                [self.n_components],
                w.shape(),
            ));
        }
        let values = to_host(client, w)?;
        if let Some(j) = values.iter().position(|v| v.is_nan()) {
            return Err(OptimError::InvalidWeights {
                message: format!("entry {} is NaN", j),
            });
        }
        if let Some(neg) = values.iter().find(|&&v| v < 0.0) {
            return Err(OptimError::InvalidWeights {
                message: format!("entry {} is negative", neg),
            });
        }
        let total: f64 = values.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(OptimError::InvalidWeights {
                message: format!("weights sum to {}", total),
            });
        }
        Ok(client.div_scalar(w, total)?)
    }

    /// Set the weights to `w / Σw`.
    ///
    /// # Errors
    ///
    /// `InvalidWeights` on a negative or NaN entry or a non-positive sum,
    /// `ShapeMismatch` when `w` is not `[K]`.
    pub fn set_weights<C: MixtureClient<R>>(&mut self, client: &C, w: &Tensor<R>) -> OptimResult<()> {
        self.weights = self.normalized_weights(client, w)?;
        Ok(())
    }

    /// Every cache derived from `cov`, including the regularized one when set.
    fn derive_caches<C: MixtureClient<R>>(
        &self,
        client: &C,
        cov: &Tensor<R>,
    ) -> OptimResult<(Tensor<R>, Tensor<R>, Option<RegularizedCovariance<R>>)> {
        let (k, d) = (self.n_components, self.dimension);
        if cov.shape() != [k, d, d] {
            return Err(OptimError::shape_mismatch("set_cov", [k, d, d], cov.shape()));
        }
        let (cov_inv, logdet_cov) = covariance_caches_impl(client, cov)?;
        let regularized = match self.covariance_regularization() {
            Some(reg) => Some(self.regularize(client, cov, reg)?),
            None => None,
        };
        Ok((cov_inv, logdet_cov, regularized))
    }

    /// Set the covariances and refresh every derived quantity.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when `cov` is not `[K, D, D]`, `SingularSystem` when a covariance
    /// (or its regularized version) is singular. The model is unchanged on error.
    pub fn set_cov<C: MixtureClient<R>>(&mut self, client: &C, cov: Tensor<R>) -> OptimResult<()> {
        let (cov_inv, logdet_cov, regularized) = self.derive_caches(client, &cov)?;
        self.cov = cov;
        self.cov_inv = cov_inv;
        self.logdet_cov = logdet_cov;
        self.regularized = regularized;
        Ok(())
    }

    /// Set the regularization used by likelihood evaluations that ask for it.
    pub fn set_cov_reg<C: MixtureClient<R>>(&mut self, client: &C, reg: f64) -> OptimResult<()> {
        if !reg.is_finite() {
            return Err(OptimError::invalid_parameter("reg", "must be finite"));
        }
        self.regularized = Some(self.regularize(client, &self.cov, reg)?);
        Ok(())
    }

    fn regularize<C: MixtureClient<R>>(
        &self,
        client: &C,
        cov: &Tensor<R>,
        reg: f64,
    ) -> OptimResult<RegularizedCovariance<R>> {
        let eye = identity_stack_impl(client, self.n_components, self.dimension, self.dtype(), self.device())?;
        let cov = client.add(cov, &client.mul_scalar(&eye, reg)?)?;
        let (cov_inv, logdet) = covariance_caches_impl(client, &cov)?;
        Ok(RegularizedCovariance {
            reg,
            cov,
            cov_inv,
            logdet,
        })
    }

    fn prepare<C: MixtureClient<R>>(&self, client: &C, x: &Tensor<R>) -> OptimResult<Tensor<R>> {
        prepare_points_impl(client, x, self.dimension, self.dtype())
    }

    /// Log-density of every point under every component, `[B, K]`:
    /// `−½ logdet Σ_k − ½ (x−μ_k)ᵀ Σ_k⁻¹ (x−μ_k) − ½ D log 2π`.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when the regularized variant is requested before
    /// [`set_cov_reg`](Self::set_cov_reg).
    pub fn component_log_likelihoods<C: MixtureClient<R>>(
        &self,
        client: &C,
        x: &Tensor<R>,
        use_regularized: bool,
    ) -> OptimResult<Tensor<R>> {
        let params = if use_regularized {
            self.regularized_params()?
        } else {
            self.params()
        };
        component_log_likelihoods_impl(client, &self.prepare(client, x)?, params)
    }

    /// Negative log-likelihood of every point, `[B]`.
    pub fn forward<C: MixtureClient<R>>(&self, client: &C, x: &Tensor<R>) -> OptimResult<Tensor<R>> {
        let scores = weighted_log_likelihoods_impl(client, &self.prepare(client, x)?, self.params())?;
        let lse = logsumexp_rows_impl(client, &scores)?;
        let n = lse.shape()[0];
        Ok(client.neg(&lse.reshape(&[n])?)?)
    }

    /// Index of the most likely component for every point, `[B]` (`I64`).
    pub fn classify<C: MixtureClient<R>>(
        &self,
        client: &C,
        x: &Tensor<R>,
        use_regularized: bool,
    ) -> OptimResult<Tensor<R>> {
        let params = if use_regularized {
            self.regularized_params()?
        } else {
            self.params()
        };
        let scores = weighted_log_likelihoods_impl(client, &self.prepare(client, x)?, params)?;
        Ok(client.argmax(&scores, 1, false)?)
    }

    /// Batched expectation-maximization.
    ///
    /// Every pass accumulates responsibilities over all batches of `data`, then replaces
    /// the weights, means and covariances (regularized by
    /// `options.cov_regularization · I`). With `data_init`, the means are first seeded
    /// from the first batch.
    pub fn fit<C, S>(&mut self, client: &C, data: &S, options: &GmmFitOptions) -> OptimResult<GmmFitResult>
    where
        C: MixtureClient<R>,
        S: BatchSource<R> + ?Sized,
    {
        if options.data_init {
            let first = data
                .batches()
                .next()
                .ok_or_else(|| OptimError::invalid_parameter("data", "no batches"))?;
            self.mu = seed_means_impl(client, &self.prepare(client, first)?, self.n_components)?;
        }

        let eye = identity_stack_impl(client, self.n_components, self.dimension, self.dtype(), self.device())?;
        let reg_eye = client.mul_scalar(&eye, options.cov_regularization)?;

        let mut objective = INITIAL_OBJECTIVE;
        let mut objectives = Vec::with_capacity(options.max_iters);
        for step in 0..options.max_iters {
            let update = {
                let batches = data.batches().map(|b| self.prepare(client, b));
                em_step_impl(client, batches, self.params())?
            };
            self.set_weights(client, &update.weights)?;
            self.mu = update.mu;
            self.set_cov(client, client.add(&update.cov, &reg_eye)?)?;
            objectives.push(update.objective);

            debug!(step, objective = update.objective, "EM step");
            if options.verbose {
                info!("Step {}, Objective {:.4}", step + 1, update.objective);
            }

            if let Some(criterion) = options.stopping_criterion {
                if objective - update.objective < criterion {
                    if options.verbose {
                        info!(step, "EM stopping criterion reached");
                    }
                    return Ok(GmmFitResult {
                        objectives,
                        iterations: step + 1,
                        converged: true,
                    });
                }
            }
            objective = update.objective;
        }

        Ok(GmmFitResult {
            objectives,
            iterations: options.max_iters,
            converged: false,
        })
    }

    /// Snapshot of the weights, means and covariances.
    pub fn state_dict<C: MixtureClient<R>>(&self, client: &C) -> OptimResult<GmmState> {
        Ok(GmmState {
            n_components: self.n_components,
            dimension: self.dimension,
            weights: to_host(client, &self.weights)?,
            mu: to_host(client, &self.mu)?,
            cov: to_host(client, &self.cov)?,
        })
    }

    /// Restore parameters from a snapshot and recompute every derived quantity.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` when the snapshot sizes disagree with this model,
    /// `InvalidWeights` when the stored weights are invalid, `SingularSystem` when a
    /// stored covariance is singular. The model is unchanged on error.
    pub fn load_state_dict<C: MixtureClient<R>>(&mut self, client: &C, state: &GmmState) -> OptimResult<()> {
        let (k, d) = (self.n_components, self.dimension);
        if state.n_components != k || state.dimension != d {
            return Err(OptimError::shape_mismatch(
                "load_state_dict",
                [k, d],
                [state.n_components, state.dimension],
            ));
        }
        let sizes = [state.weights.len(), state.mu.len(), state.cov.len()];
        if sizes != [k, k * d, k * d * d] {
            return Err(OptimError::shape_mismatch(
                "load_state_dict buffers",
                [k, k * d, k * d * d],
                sizes,
            ));
        }

        let dtype = self.dtype();
        let device = self.device().clone();
        let weights = from_host(client, &state.weights, &[k], dtype, &device)?;
        let weights = self.normalized_weights(client, &weights)?;
        let mu = from_host(client, &state.mu, &[k, d], dtype, &device)?;
        let cov = from_host(client, &state.cov, &[k, d, d], dtype, &device)?;
        let (cov_inv, logdet_cov, regularized) = self.derive_caches(client, &cov)?;

        self.weights = weights;
        self.mu = mu;
        self.cov = cov;
        self.cov_inv = cov_inv;
        self.logdet_cov = logdet_cov;
        self.regularized = regularized;
        Ok(())
    }
}
