//! Small host <-> device transfers of real-valued tensors.

use numr::ops::TypeConversionOps;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::OptimResult;

/// Copy a real-valued tensor to the host as `f64` values.
pub(crate) fn to_host<R, C>(client: &C, t: &Tensor<R>) -> OptimResult<Vec<f64>>
where
    R: Runtime<DType = DType>,
    C: TypeConversionOps<R>,
{
    let t = t.contiguous();
    Ok(match t.dtype() {
        DType::F64 => t.to_vec::<f64>(),
        DType::F32 => t.to_vec::<f32>().into_iter().map(f64::from).collect(),
        _ => client.cast(&t, DType::F64)?.to_vec::<f64>(),
    })
}

/// Upload host `f64` values as a tensor of the requested dtype.
pub(crate) fn from_host<R, C>(
    client: &C,
    data: &[f64],
    shape: &[usize],
    dtype: DType,
    device: &R::Device,
) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: TypeConversionOps<R>,
{
    match dtype {
        DType::F64 => Ok(Tensor::<R>::from_slice(data, shape, device)),
        DType::F32 => {
            let narrowed: Vec<f32> = data.iter().map(|&v| v as f32).collect();
            Ok(Tensor::<R>::from_slice(&narrowed, shape, device))
        }
        _ => {
            let t = Tensor::<R>::from_slice(data, shape, device);
            Ok(client.cast(&t, dtype)?)
        }
    }
}
