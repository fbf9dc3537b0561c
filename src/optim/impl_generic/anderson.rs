//! Anderson acceleration on packed iterates.
//!
//! Iterates are flattened per batch element into rows of length `N`; tensor lists are
//! packed into a block image first and unpacked again after extrapolation.

use numr::algorithm::linalg::LinearAlgebraAlgorithms;
use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::host::from_host;
use crate::optim::client::OptimClient;
use crate::optim::operand::{IterateRecord, Operand, TensorList, host_values};
use crate::optim::traits::anderson::{AndersonOptions, AndersonState};
use crate::optim::traits::fixed_point::FixedPointIterator;

use super::block_image::{create_block_image_impl, tuple_from_block_image_impl};

/// Pack an operand into a single tensor, remembering list component shapes.
fn pack<R, C>(client: &C, x: &Operand<R>) -> OptimResult<(Tensor<R>, Option<Vec<Vec<usize>>>)>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    match x {
        Operand::Tensor(t) => Ok((t.clone(), None)),
        Operand::List(list) => Ok((
            create_block_image_impl(client, list.tensors())?,
            Some(list.shapes()),
        )),
    }
}

/// Replace `hist[:, slot]` with `row` (`[B, 1, N]`).
fn write_slot<R, C>(client: &C, hist: &Tensor<R>, row: &Tensor<R>, slot: usize) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    let len = hist.shape()[1];
    let mut pieces = Vec::with_capacity(3);
    if slot > 0 {
        pieces.push(hist.narrow(1, 0, slot)?);
    }
    pieces.push(row.clone());
    if slot + 1 < len {
        pieces.push(hist.narrow(1, slot + 1, len - slot - 1)?);
    }
    let refs: Vec<&Tensor<R>> = pieces.iter().collect();
    Ok(client.cat(&refs, 1)?)
}

/// Overwrite the leading `k × k` block of the square matrix `full` with `block`.
fn write_leading_block<R, C>(client: &C, full: &Tensor<R>, block: &Tensor<R>) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    let dim = full.shape()[0];
    let k = block.shape()[0];
    if k == dim {
        return Ok(block.clone());
    }
    let right = full.narrow(0, 0, k)?.narrow(1, k, dim - k)?;
    let top = client.cat(&[block, &right], 1)?;
    let bottom = full.narrow(0, k, dim - k)?;
    Ok(client.cat(&[&top, &bottom], 0)?)
}

pub fn init_anderson_acceleration_impl<R, C>(
    client: &C,
    x: &Operand<R>,
    history_size: usize,
) -> OptimResult<AndersonState<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    if history_size == 0 {
        return Err(OptimError::invalid_parameter(
            "history_size",
            "must be at least 1",
        ));
    }
    let (packed, list_shapes) = pack(client, x)?;
    if packed.ndim() == 0 {
        return Err(OptimError::shape_mismatch(
            "init_anderson_acceleration",
            "a leading batch axis",
            packed.shape(),
        ));
    }

    let batch = packed.shape()[0];
    let n = packed.numel() / batch.max(1);
    let dtype = packed.dtype();
    let device = packed.device();
    let dim = history_size + 1;

    // H = [[0, 1ᵀ], [1, 0]], q = e₀ for every batch element.
    let mut h_host = vec![0.0; batch * dim * dim];
    let mut q_host = vec![0.0; batch * dim];
    for b in 0..batch {
        let base = b * dim * dim;
        for j in 1..dim {
            h_host[base + j] = 1.0;
            h_host[base + j * dim] = 1.0;
        }
        q_host[b * dim] = 1.0;
    }

    Ok(AndersonState {
        history_size,
        x_hist: Tensor::<R>::zeros(&[batch, history_size, n], dtype, device),
        t_hist: Tensor::<R>::zeros(&[batch, history_size, n], dtype, device),
        h: from_host(client, &h_host, &[batch, dim, dim], dtype, device)?,
        q: from_host(client, &q_host, &[batch, dim, 1], dtype, device)?,
        packed_shape: packed.shape().to_vec(),
        list_shapes,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn anderson_acceleration_step_impl<R, C, I>(
    client: &C,
    iterator: &I,
    it: usize,
    x_prev: &IterateRecord<R>,
    tx_prev: &IterateRecord<R>,
    state: &mut AndersonState<R>,
    options: &AndersonOptions,
    ctx: &I::Context,
) -> OptimResult<IterateRecord<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
    I: FixedPointIterator<R>,
{
    if options.history_size != state.history_size {
        return Err(OptimError::invalid_parameter(
            "history_size",
            format!(
                "options ask for {} but the state was initialized with {}",
                options.history_size, state.history_size
            ),
        ));
    }

    let (x_packed, _) = pack(client, &x_prev.iterate)?;
    let (tx_packed, _) = pack(client, &tx_prev.iterate)?;
    for packed in [&x_packed, &tx_packed] {
        if packed.shape() != state.packed_shape.as_slice() {
            return Err(OptimError::shape_mismatch(
                "anderson_acceleration_step",
                &state.packed_shape,
                packed.shape(),
            ));
        }
    }

    let batch = state.packed_shape[0];
    let n = x_packed.numel() / batch.max(1);
    let dtype = x_packed.dtype();
    let device = x_packed.device();
    let hs = state.history_size;
    let dim = hs + 1;

    let slot = it % hs;
    let x_row = x_packed.contiguous().reshape(&[batch, 1, n])?;
    let tx_row = tx_packed.contiguous().reshape(&[batch, 1, n])?;
    state.x_hist = write_slot(client, &state.x_hist, &x_row, slot)?;
    state.t_hist = write_slot(client, &state.t_hist, &tx_row, slot)?;

    let m = (it + 1).min(hs);
    let x_m = state.x_hist.narrow(1, 0, m)?;
    let t_m = state.t_hist.narrow(1, 0, m)?;
    let g = client.sub(&t_m, &x_m)?;

    let reg = client.mul_scalar(&client.eye(m, None, dtype)?, options.eps)?;
    let corner = Tensor::<R>::zeros(&[1, 1], dtype, device);
    let ones_row = Tensor::<R>::ones(&[1, m], dtype, device);
    let ones_col = Tensor::<R>::ones(&[m, 1], dtype, device);
    let border = client.cat(&[&corner, &ones_row], 1)?;

    let mut h_blocks = Vec::with_capacity(batch);
    let mut x_rows = Vec::with_capacity(batch);
    for b in 0..batch {
        let g_b = g.narrow(0, b, 1)?.contiguous().reshape(&[m, n])?;
        let g_bt = g_b.transpose(0, 1)?.contiguous();
        let gram = client.add(&client.matmul(&g_b, &g_bt)?, &reg)?;

        let lower = client.cat(&[&ones_col, &gram], 1)?;
        let h_b = client.cat(&[&border, &lower], 0)?;
        let q_b = state
            .q
            .narrow(0, b, 1)?
            .narrow(1, 0, m + 1)?
            .contiguous()
            .reshape(&[m + 1, 1])?;

        let sol = LinearAlgebraAlgorithms::solve(client, &h_b, &q_b).map_err(|e| {
            OptimError::SingularSystem {
                context: format!("anderson step, batch element {}: {}", b, e),
            }
        })?;
        // Drop the Lagrange multiplier.
        let p = sol.narrow(0, 1, m)?.contiguous().reshape(&[1, m])?;
        if host_values(client, &p)?.iter().any(|v| !v.is_finite()) {
            return Err(OptimError::SingularSystem {
                context: format!("anderson step, batch element {}: non-finite weights", b),
            });
        }

        let t_b = t_m.narrow(0, b, 1)?.contiguous().reshape(&[m, n])?;
        let mut mixed = client.matmul(&p, &t_b)?;
        if options.beta != 1.0 {
            let x_b = x_m.narrow(0, b, 1)?.contiguous().reshape(&[m, n])?;
            let from_x = client.mul_scalar(&client.matmul(&p, &x_b)?, 1.0 - options.beta)?;
            mixed = client.add(&client.mul_scalar(&mixed, options.beta)?, &from_x)?;
        }
        x_rows.push(mixed);

        let h_full = state.h.narrow(0, b, 1)?.contiguous().reshape(&[dim, dim])?;
        h_blocks.push(write_leading_block(client, &h_full, &h_b)?);
    }

    let h_refs: Vec<&Tensor<R>> = h_blocks.iter().collect();
    state.h = client.stack(&h_refs, 0)?;

    let x_refs: Vec<&Tensor<R>> = x_rows.iter().collect();
    let x = client.cat(&x_refs, 0)?.reshape(&state.packed_shape)?;
    let x = match &state.list_shapes {
        Some(shapes) => {
            let parts = tuple_from_block_image_impl(&x, shapes)?;
            Operand::List(TensorList::new(parts)?)
        }
        None => Operand::Tensor(x),
    };

    iterator.record(x, ctx)
}
