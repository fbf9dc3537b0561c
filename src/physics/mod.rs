//! Linear forward operators.
//!
//! A [`LinearOperator`] only has to provide `A` and `Aᵀ`; the pseudo-inverse and an
//! adjointness check come for free, built on the batched conjugate gradient solver.

mod decolorize;

pub use decolorize::{Decolorize, SpectralResponse};

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::optim::client::OptimClient;
use crate::optim::impl_generic::conjugate_gradient_impl;
use crate::optim::operand::{Operand, host_values};
use crate::optim::traits::ConjugateGradientOptions;

/// A linear map between batched tensors.
pub trait LinearOperator<R: Runtime<DType = DType>> {
    /// Forward map `A x`.
    fn a<C: OptimClient<R>>(&self, client: &C, x: &Tensor<R>) -> OptimResult<Tensor<R>>;

    /// Adjoint map `Aᵀ y`.
    fn a_adjoint<C: OptimClient<R>>(&self, client: &C, y: &Tensor<R>) -> OptimResult<Tensor<R>>;

    /// `A Aᵀ y`.
    fn a_a_adjoint<C: OptimClient<R>>(&self, client: &C, y: &Tensor<R>) -> OptimResult<Tensor<R>> {
        self.a(client, &self.a_adjoint(client, y)?)
    }

    /// Minimum-norm solution of `A x = y`: `Aᵀ z` with `A Aᵀ z = y` solved by conjugate
    /// gradient.
    fn a_dagger<C: OptimClient<R>>(
        &self,
        client: &C,
        y: &Tensor<R>,
        options: &ConjugateGradientOptions,
    ) -> OptimResult<Tensor<R>> {
        let normal = |z: &Operand<R>| -> OptimResult<Operand<R>> {
            let z = z.as_tensor().ok_or_else(|| {
                OptimError::invalid_parameter("z", "expected a single tensor operand")
            })?;
            Ok(Operand::Tensor(self.a_a_adjoint(client, z)?))
        };
        let solved = conjugate_gradient_impl(client, normal, &Operand::Tensor(y.clone()), options)?;
        self.a_adjoint(client, solved.x.first())
    }

    /// `⟨A x, u⟩ − ⟨x, Aᵀ u⟩` for a random `u`; close to zero when `a_adjoint` is the
    /// adjoint of `a`.
    fn adjointness_test<C: OptimClient<R>>(&self, client: &C, x: &Tensor<R>) -> OptimResult<f64> {
        let ax = self.a(client, x)?;
        let u = client.randn(ax.shape(), ax.dtype())?;
        let atu = self.a_adjoint(client, &u)?;

        let lhs = Operand::Tensor(ax).batch_dot(client, &Operand::Tensor(u))?;
        let rhs = Operand::Tensor(x.clone()).batch_dot(client, &Operand::Tensor(atu))?;
        let diff = client.sub(&lhs, &rhs)?;
        Ok(host_values(client, &diff)?.iter().sum())
    }
}
