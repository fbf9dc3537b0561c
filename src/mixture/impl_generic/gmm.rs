//! Gaussian mixture model math: covariance caches, log-likelihoods, EM statistics.
//!
//! These functions are stateless; [`GaussianMixtureModel`](crate::mixture::GaussianMixtureModel)
//! owns the parameters and decides when caches are replaced.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::host::to_host;
use crate::mixture::client::MixtureClient;

/// Lower bound on accumulated responsibilities before normalizing.
pub const MIN_COMPONENT_MASS: f64 = 1e-5;

/// Borrowed component parameters used for likelihood evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ComponentParams<'a, R: Runtime> {
    /// `[K]`
    pub weights: &'a Tensor<R>,
    /// `[K, D]`
    pub mu: &'a Tensor<R>,
    /// `[K, D, D]`
    pub cov_inv: &'a Tensor<R>,
    /// `[K]`
    pub logdet: &'a Tensor<R>,
}

/// Sufficient statistics of one EM pass, already turned into new parameters.
#[derive(Debug, Clone)]
pub struct EmUpdate<R: Runtime> {
    /// `[K]`, normalized by the number of points
    pub weights: Tensor<R>,
    /// `[K, D]`
    pub mu: Tensor<R>,
    /// `[K, D, D]`, without regularization
    pub cov: Tensor<R>,
    /// Mean negative log-likelihood under the parameters the pass started from
    pub objective: f64,
}

/// Inverses `[K, D, D]` and log-determinants `[K]` of a stack of covariances.
///
/// Fails with `SingularSystem` when a covariance has a non-finite log-determinant.
pub fn covariance_caches_impl<R, C>(client: &C, cov: &Tensor<R>) -> OptimResult<(Tensor<R>, Tensor<R>)>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
{
    let k = cov.shape()[0];
    let d = cov.shape()[1];
    let blocks = (0..k)
        .map(|j| Ok(cov.narrow(0, j, 1)?.contiguous().reshape(&[d, d])?))
        .collect::<OptimResult<Vec<Tensor<R>>>>()?;

    let mut log_dets = Vec::with_capacity(k);
    for cov_j in &blocks {
        log_dets.push(client.slogdet(cov_j)?.logabsdet.unsqueeze(0)?);
    }
    let det_refs: Vec<&Tensor<R>> = log_dets.iter().collect();
    let logdet = client.cat(&det_refs, 0)?;
    if let Some(j) = to_host(client, &logdet)?.iter().position(|v| !v.is_finite()) {
        return Err(OptimError::SingularSystem {
            context: format!("covariance of component {} is singular", j),
        });
    }

    let mut inverses = Vec::with_capacity(k);
    for cov_j in &blocks {
        inverses.push(client.inverse(cov_j)?.unsqueeze(0)?);
    }
    let inv_refs: Vec<&Tensor<R>> = inverses.iter().collect();
    Ok((client.cat(&inv_refs, 0)?, logdet))
}

/// `[K, D, D]` stack of identity matrices.
pub fn identity_stack_impl<R, C>(
    client: &C,
    k: usize,
    d: usize,
    dtype: DType,
    device: &R::Device,
) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
{
    let eye = client.diagflat(&Tensor::<R>::ones(&[d], dtype, device))?;
    Ok(eye.unsqueeze(0)?.broadcast_to(&[k, d, d])?.contiguous())
}

/// Row-wise `log Σ exp` of a `[B, K]` tensor, as `[B, 1]`.
pub fn logsumexp_rows_impl<R, C>(client: &C, x: &Tensor<R>) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
{
    let max = client.max(x, &[1], true)?;
    let shifted = client.exp(&client.sub(x, &max)?)?;
    let sum = client.sum(&shifted, &[1], true)?;
    Ok(client.add(&client.log(&sum)?, &max)?)
}

/// Check that `x` is `[B, D]` and bring it to `dtype`.
pub fn prepare_points_impl<R, C>(client: &C, x: &Tensor<R>, d: usize, dtype: DType) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
{
    if x.ndim() != 2 || x.shape()[1] != d {
        return Err(OptimError::shape_mismatch(
            "mixture input",
            format!("[B, {}]", d),
            x.shape(),
        ));
    }
    if x.dtype() == dtype {
        Ok(x.clone())
    } else {
        Ok(client.cast(x, dtype)?)
    }
}

/// `−½ logdet Σ_k − ½ (x−μ_k)ᵀ Σ_k⁻¹ (x−μ_k) − ½ D log 2π` for every point and
/// component, `[B, K]`.
pub fn component_log_likelihoods_impl<R, C>(
    client: &C,
    x: &Tensor<R>,
    params: ComponentParams<'_, R>,
) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
{
    let (n, d) = (x.shape()[0], x.shape()[1]);
    let k = params.mu.shape()[0];
    let const_term = -0.5 * d as f64 * (2.0 * std::f64::consts::PI).ln();

    let mut columns = Vec::with_capacity(k);
    for j in 0..k {
        let mean_j = params.mu.narrow(0, j, 1)?;
        let diff = client.sub(x, &mean_j.broadcast_to(&[n, d])?)?;
        let inv_j = params.cov_inv.narrow(0, j, 1)?.contiguous().reshape(&[d, d])?;
        let tmp = client.matmul(&diff, &inv_j)?;
        let maha = client.sum(&client.mul(&tmp, &diff)?, &[1], false)?; // [n]

        let half_logdet = client.mul_scalar(&params.logdet.narrow(0, j, 1)?, 0.5)?; // [1]
        let ll = client.add_scalar(&client.mul_scalar(&maha, -0.5)?, const_term)?;
        let ll = client.sub(&ll, &half_logdet.broadcast_to(&[n])?)?;
        columns.push(ll.unsqueeze(1)?);
    }
    let refs: Vec<&Tensor<R>> = columns.iter().collect();
    Ok(client.cat(&refs, 1)?)
}

/// Component log-likelihoods plus log-weights, `[B, K]`.
pub fn weighted_log_likelihoods_impl<R, C>(
    client: &C,
    x: &Tensor<R>,
    params: ComponentParams<'_, R>,
) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
{
    let cll = component_log_likelihoods_impl(client, x, params)?;
    let log_w = client.log(params.weights)?.unsqueeze(0)?;
    Ok(client.add(&cll, &log_w.broadcast_to(cll.shape())?)?)
}

/// Initial means `[K, D]` from the leading rows of `first` (already `[B, D]`).
///
/// Missing rows are drawn as `randn · std + mean` of the observed rows; `std` is 1 with
/// fewer than two rows and `mean` is 0 with none.
pub fn seed_means_impl<R, C>(client: &C, first: &Tensor<R>, k: usize) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
{
    let d = first.shape()[1];
    let dtype = first.dtype();
    let device = first.device();
    let take = first.shape()[0].min(k);
    let observed = first.narrow(0, 0, take)?.contiguous();
    if take == k {
        return Ok(observed);
    }

    let mean = if take > 0 {
        client.mean(&observed, &[0], true)?
    } else {
        Tensor::<R>::zeros(&[1, d], dtype, device)
    };
    let std = if take > 1 {
        client.std(&observed, &[0], true, 1)?
    } else {
        Tensor::<R>::ones(&[1, d], dtype, device)
    };
    let rest = k - take;
    let noise = client.randn(&[rest, d], dtype)?;
    let fill = client.add(
        &client.mul(&noise, &std.broadcast_to(&[rest, d])?)?,
        &mean.broadcast_to(&[rest, d])?,
    )?;
    if take > 0 {
        Ok(client.cat(&[&observed, &fill], 0)?)
    } else {
        Ok(fill)
    }
}

/// One EM pass over prepared `[B, D]` batches.
///
/// Accumulates responsibilities, responsibility-weighted sums and second moments, then
/// returns `w = max(Σβ, 1e-5) / n`, `μ = Σβx / max(Σβ, 1e-5)` and
/// `Σ = Σβxxᵀ / max(Σβ, 1e-5) − μμᵀ`.
pub fn em_step_impl<R, C, I>(client: &C, batches: I, params: ComponentParams<'_, R>) -> OptimResult<EmUpdate<R>>
where
    R: Runtime<DType = DType>,
    C: MixtureClient<R>,
    I: IntoIterator<Item = OptimResult<Tensor<R>>>,
{
    let (k, d) = (params.mu.shape()[0], params.mu.shape()[1]);
    let dtype = params.mu.dtype();
    let device = params.mu.device();

    let mut weights_new = Tensor::<R>::zeros(&[k], dtype, device);
    let mut mu_new = Tensor::<R>::zeros(&[k, d], dtype, device);
    let mut c_new = Tensor::<R>::zeros(&[k, d, d], dtype, device);
    let mut objective = 0.0;
    let mut n = 0usize;

    for batch in batches {
        let x = batch?;
        let b = x.shape()[0];
        if b == 0 {
            continue;
        }
        n += b;

        let log_betas = weighted_log_likelihoods_impl(client, &x, params)?;
        let lse = logsumexp_rows_impl(client, &log_betas)?; // [b, 1]
        objective -= to_host(client, &client.sum(&lse, &[0, 1], false)?)?.iter().sum::<f64>();
        let betas = client.exp(&client.sub(&log_betas, &lse.broadcast_to(&[b, k])?)?)?;

        weights_new = client.add(&weights_new, &client.sum(&betas, &[0], false)?)?;
        let betas_t = betas.transpose(0, 1)?.contiguous(); // [k, b]
        mu_new = client.add(&mu_new, &client.matmul(&betas_t, &x)?)?;

        let mut second = Vec::with_capacity(k);
        for j in 0..k {
            let beta_j = betas.narrow(1, j, 1)?.broadcast_to(&[b, d])?;
            let weighted = client.mul(&x, &beta_j)?;
            let m_j = client.matmul(&weighted.transpose(0, 1)?.contiguous(), &x)?;
            second.push(m_j.unsqueeze(0)?);
        }
        let refs: Vec<&Tensor<R>> = second.iter().collect();
        c_new = client.add(&c_new, &client.cat(&refs, 0)?)?;
    }

    if n == 0 {
        return Err(OptimError::invalid_parameter("data", "no data points"));
    }

    let floor = Tensor::<R>::full_scalar(&[k], dtype, MIN_COMPONENT_MASS, device);
    let weights_new = client.maximum(&weights_new, &floor)?;
    let mu_new = client.div(&mu_new, &weights_new.unsqueeze(1)?.broadcast_to(&[k, d])?)?;

    let second = client.div(
        &c_new,
        &weights_new.reshape(&[k, 1, 1])?.broadcast_to(&[k, d, d])?,
    )?;
    let mut outer = Vec::with_capacity(k);
    for j in 0..k {
        let mu_j = mu_new.narrow(0, j, 1)?.contiguous(); // [1, d]
        let mu_jt = mu_j.transpose(0, 1)?.contiguous(); // [d, 1]
        outer.push(client.matmul(&mu_jt, &mu_j)?.unsqueeze(0)?);
    }
    let refs: Vec<&Tensor<R>> = outer.iter().collect();
    let cov_new = client.sub(&second, &client.cat(&refs, 0)?)?;

    Ok(EmUpdate {
        weights: client.div_scalar(&weights_new, n as f64)?,
        mu: mu_new,
        cov: cov_new,
        objective: objective / n as f64,
    })
}
