//! Batched operands: a single tensor or an ordered list of tensors.
//!
//! Every operand has a leading batch axis. Arithmetic acts elementwise across the
//! list, reductions (dot products, norms) sum the per-component reductions, so an
//! iterative solver can treat a heterogeneous multi-resolution iterate exactly like a
//! single tensor.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::host::to_host;
use crate::optim::client::OptimClient;

/// Whether `dtype` holds complex values.
pub(crate) fn is_complex(dtype: DType) -> bool {
    matches!(dtype, DType::Complex64 | DType::Complex128)
}

/// Copy a (small) tensor to the host as `f64` values.
///
/// Complex tensors contribute their real part.
pub(crate) fn host_values<R, C>(client: &C, t: &Tensor<R>) -> OptimResult<Vec<f64>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    if is_complex(t.dtype()) {
        to_host(client, &client.real(t)?)
    } else {
        to_host(client, t)
    }
}

/// Sum every element of `t` into a one-element tensor.
fn sum_all<R, C>(client: &C, t: &Tensor<R>) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    let flat = t.contiguous().reshape(&[t.numel()])?;
    Ok(client.sum(&flat, &[0], false)?)
}

/// Batched inner product of two tensors: one value per batch element.
fn tensor_batch_dot<R, C>(client: &C, a: &Tensor<R>, b: &Tensor<R>) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    if a.shape() != b.shape() {
        return Err(OptimError::shape_mismatch("batch dot", a.shape(), b.shape()));
    }
    let a = if is_complex(a.dtype()) {
        client.conj(a)?
    } else {
        a.clone()
    };
    let prod = client.mul(&a, b)?;
    let batch = prod.shape().first().copied().unwrap_or(1).max(1);
    let per_batch = prod.numel() / batch;
    let flat = prod.contiguous().reshape(&[batch, per_batch])?;
    Ok(client.sum(&flat, &[1], false)?)
}

/// Ordered sequence of batched tensors treated as one composite iterate.
#[derive(Debug, Clone)]
pub struct TensorList<R: Runtime> {
    tensors: Vec<Tensor<R>>,
}

impl<R: Runtime<DType = DType>> TensorList<R> {
    /// Build a list; all components must share the leading batch size.
    pub fn new(tensors: Vec<Tensor<R>>) -> OptimResult<Self> {
        let Some(first) = tensors.first() else {
            return Err(OptimError::invalid_parameter(
                "tensors",
                "a tensor list needs at least one component",
            ));
        };
        if first.ndim() == 0 {
            return Err(OptimError::invalid_parameter(
                "tensors",
                "components need a leading batch axis",
            ));
        }
        let batch = first.shape()[0];
        for t in &tensors[1..] {
            if t.ndim() == 0 || t.shape()[0] != batch {
                return Err(OptimError::shape_mismatch(
                    "tensor list batch axis",
                    batch,
                    t.shape(),
                ));
            }
        }
        Ok(Self { tensors })
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    /// Always false for a constructed list.
    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Component tensors in order.
    pub fn tensors(&self) -> &[Tensor<R>] {
        &self.tensors
    }

    /// Shapes of the components in order.
    pub fn shapes(&self) -> Vec<Vec<usize>> {
        self.tensors.iter().map(|t| t.shape().to_vec()).collect()
    }

    pub fn into_tensors(self) -> Vec<Tensor<R>> {
        self.tensors
    }
}

/// A batched operand: either a single tensor or a [`TensorList`].
#[derive(Debug, Clone)]
pub enum Operand<R: Runtime> {
    /// Single batched tensor.
    Tensor(Tensor<R>),
    /// Heterogeneous list of batched tensors.
    List(TensorList<R>),
}

impl<R: Runtime> From<Tensor<R>> for Operand<R> {
    fn from(t: Tensor<R>) -> Self {
        Self::Tensor(t)
    }
}

impl<R: Runtime> From<TensorList<R>> for Operand<R> {
    fn from(list: TensorList<R>) -> Self {
        Self::List(list)
    }
}

impl<R: Runtime<DType = DType>> Operand<R> {
    /// Components as a slice (a single tensor is a one-element slice).
    pub fn components(&self) -> &[Tensor<R>] {
        match self {
            Self::Tensor(t) => std::slice::from_ref(t),
            Self::List(list) => list.tensors(),
        }
    }

    /// First component; the tensor itself for a single-tensor operand.
    pub fn first(&self) -> &Tensor<R> {
        &self.components()[0]
    }

    pub fn as_tensor(&self) -> Option<&Tensor<R>> {
        match self {
            Self::Tensor(t) => Some(t),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&TensorList<R>> {
        match self {
            Self::Tensor(_) => None,
            Self::List(list) => Some(list),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Leading batch size.
    pub fn batch_size(&self) -> usize {
        self.first().shape().first().copied().unwrap_or(1)
    }

    pub fn dtype(&self) -> DType {
        self.first().dtype()
    }

    pub fn device(&self) -> &R::Device {
        self.first().device()
    }

    /// Zero operand with the same structure, shapes and dtype.
    pub fn zeros_like(&self) -> Self {
        let zeros = |t: &Tensor<R>| Tensor::<R>::zeros(t.shape(), t.dtype(), t.device());
        match self {
            Self::Tensor(t) => Self::Tensor(zeros(t)),
            Self::List(list) => Self::List(TensorList {
                tensors: list.tensors().iter().map(zeros).collect(),
            }),
        }
    }

    /// Apply a binary tensor op componentwise.
    fn zip_with<F>(&self, other: &Self, context: &str, op: F) -> OptimResult<Self>
    where
        F: Fn(&Tensor<R>, &Tensor<R>) -> OptimResult<Tensor<R>>,
    {
        match (self, other) {
            (Self::Tensor(a), Self::Tensor(b)) => Ok(Self::Tensor(op(a, b)?)),
            (Self::List(a), Self::List(b)) => {
                if a.len() != b.len() {
                    return Err(OptimError::shape_mismatch(context, a.len(), b.len()));
                }
                let tensors = a
                    .tensors()
                    .iter()
                    .zip(b.tensors())
                    .map(|(x, y)| op(x, y))
                    .collect::<OptimResult<Vec<_>>>()?;
                Ok(Self::List(TensorList { tensors }))
            }
            _ => Err(OptimError::shape_mismatch(
                context,
                "operands of the same kind",
                "a tensor and a tensor list",
            )),
        }
    }

    /// Apply a unary tensor op componentwise.
    fn map<F>(&self, op: F) -> OptimResult<Self>
    where
        F: Fn(&Tensor<R>) -> OptimResult<Tensor<R>>,
    {
        match self {
            Self::Tensor(t) => Ok(Self::Tensor(op(t)?)),
            Self::List(list) => {
                let tensors = list
                    .tensors()
                    .iter()
                    .map(op)
                    .collect::<OptimResult<Vec<_>>>()?;
                Ok(Self::List(TensorList { tensors }))
            }
        }
    }

    pub fn add<C: OptimClient<R>>(&self, client: &C, other: &Self) -> OptimResult<Self> {
        self.zip_with(other, "operand add", |a, b| Ok(client.add(a, b)?))
    }

    pub fn sub<C: OptimClient<R>>(&self, client: &C, other: &Self) -> OptimResult<Self> {
        self.zip_with(other, "operand sub", |a, b| Ok(client.sub(a, b)?))
    }

    /// Elementwise product.
    pub fn mul<C: OptimClient<R>>(&self, client: &C, other: &Self) -> OptimResult<Self> {
        self.zip_with(other, "operand mul", |a, b| Ok(client.mul(a, b)?))
    }

    /// Multiply every element by `s`.
    pub fn scale<C: OptimClient<R>>(&self, client: &C, s: f64) -> OptimResult<Self> {
        self.map(|t| Ok(client.mul_scalar(t, s)?))
    }

    /// Multiply batch element `i` by `coeffs[i]`; `coeffs` has shape `[B]`.
    pub fn batch_scale<C: OptimClient<R>>(
        &self,
        client: &C,
        coeffs: &Tensor<R>,
    ) -> OptimResult<Self> {
        let batch = self.batch_size();
        if coeffs.shape() != [batch] {
            return Err(OptimError::shape_mismatch(
                "per-batch scale",
                [batch],
                coeffs.shape(),
            ));
        }
        self.map(|t| {
            let mut view = vec![1usize; t.ndim()];
            view[0] = batch;
            let c = coeffs.reshape(&view)?.broadcast_to(t.shape())?;
            Ok(client.mul(t, &c)?)
        })
    }

    /// Batched inner product `⟨self, other⟩`: one value per batch element (`[B]`).
    ///
    /// The left operand is conjugated for complex dtypes; list operands sum the
    /// per-component products.
    pub fn batch_dot<C: OptimClient<R>>(&self, client: &C, other: &Self) -> OptimResult<Tensor<R>> {
        let products = self.zip_with(other, "batch dot", |a, b| tensor_batch_dot(client, a, b))?;
        let mut parts = products.components().iter();
        let mut acc = parts.next().cloned().ok_or_else(|| {
            OptimError::invalid_parameter("operand", "empty operand in batch dot")
        })?;
        for part in parts {
            acc = client.add(&acc, part)?;
        }
        Ok(acc)
    }

    /// Squared Frobenius norm over every element of every component.
    pub fn squared_norm<C: OptimClient<R>>(&self, client: &C) -> OptimResult<f64> {
        let mut total = 0.0;
        for t in self.components() {
            let conj = if is_complex(t.dtype()) {
                client.conj(t)?
            } else {
                t.clone()
            };
            let sq = client.mul(&conj, t)?;
            total += host_values(client, &sum_all(client, &sq)?)?[0];
        }
        Ok(total)
    }

    /// Frobenius norm over every element of every component.
    pub fn norm<C: OptimClient<R>>(&self, client: &C) -> OptimResult<f64> {
        self.squared_norm(client).map(f64::sqrt)
    }
}

/// One step of an optimization run: iterate, derived estimate and optional cost.
#[derive(Debug, Clone)]
pub struct IterateRecord<R: Runtime> {
    /// Current iterate x.
    pub iterate: Operand<R>,
    /// Point derived from the iterate, used for cost evaluation and monitoring.
    pub estimate: Operand<R>,
    /// Scalar or per-batch cost, when the iterator defines one.
    pub cost: Option<Tensor<R>>,
}

impl<R: Runtime> IterateRecord<R> {
    pub fn new(iterate: Operand<R>, estimate: Operand<R>, cost: Option<Tensor<R>>) -> Self {
        Self {
            iterate,
            estimate,
            cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numr::runtime::cpu::{CpuClient, CpuDevice, CpuRuntime};

    fn setup() -> (CpuDevice, CpuClient) {
        let device = CpuDevice::new();
        let client = CpuClient::new(device.clone());
        (device, client)
    }

    #[test]
    fn test_batch_dot_tensor() {
        let (device, client) = setup();
        let a = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0, 2.0, 0.5], &[2, 2], &device);

        let dot = Operand::from(a)
            .batch_dot(&client, &Operand::from(b))
            .unwrap();
        assert_eq!(dot.shape(), &[2]);
        let d: Vec<f64> = dot.to_vec();
        assert!((d[0] - 3.0).abs() < 1e-12);
        assert!((d[1] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_batch_dot_list_sums_components() {
        let (device, client) = setup();
        let a1 = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[2, 1], &device);
        let a2 = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0, 1.0, 1.0], &[2, 2], &device);
        let list = Operand::from(TensorList::new(vec![a1, a2]).unwrap());

        let dot = list.batch_dot(&client, &list).unwrap();
        let d: Vec<f64> = dot.to_vec();
        // batch 0: 1 + 1 + 1, batch 1: 4 + 1 + 1
        assert!((d[0] - 3.0).abs() < 1e-12);
        assert!((d[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_list_length_mismatch() {
        let (device, client) = setup();
        let t = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[2, 1], &device);
        let short = Operand::from(TensorList::new(vec![t.clone()]).unwrap());
        let long = Operand::from(TensorList::new(vec![t.clone(), t]).unwrap());

        let err = short.add(&client, &long).unwrap_err();
        assert!(matches!(err, OptimError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_list_batch_axis_validated() {
        let (device, _client) = setup();
        let a = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0], &[2, 1], &device);
        let b = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 2.0, 3.0], &[3, 1], &device);
        assert!(TensorList::new(vec![a, b]).is_err());
        assert!(TensorList::<CpuRuntime>::new(vec![]).is_err());
    }

    #[test]
    fn test_batch_scale_and_norm() {
        let (device, client) = setup();
        let x = Tensor::<CpuRuntime>::from_slice(&[1.0f64, 1.0, 1.0, 1.0], &[2, 2], &device);
        let coeffs = Tensor::<CpuRuntime>::from_slice(&[2.0f64, 3.0], &[2], &device);

        let scaled = Operand::from(x).batch_scale(&client, &coeffs).unwrap();
        let v: Vec<f64> = scaled.first().to_vec();
        assert_eq!(v, vec![2.0, 2.0, 3.0, 3.0]);

        let norm = scaled.norm(&client).unwrap();
        assert!((norm - 26.0f64.sqrt()).abs() < 1e-12);
    }
}
