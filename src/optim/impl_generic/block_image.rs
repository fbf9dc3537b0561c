//! Block-diagonal image packing.

use numr::runtime::Runtime;
use numr::tensor::Tensor;

use crate::DType;
use crate::error::{OptimError, OptimResult};
use crate::optim::client::OptimClient;

pub fn create_block_image_impl<R, C>(client: &C, xs: &[Tensor<R>]) -> OptimResult<Tensor<R>>
where
    R: Runtime<DType = DType>,
    C: OptimClient<R>,
{
    let Some(first) = xs.first() else {
        return Err(OptimError::invalid_parameter(
            "xs",
            "at least one image is required",
        ));
    };
    if first.ndim() != 4 {
        return Err(OptimError::shape_mismatch(
            "create_block_image",
            "[B, C, H, W]",
            first.shape(),
        ));
    }
    let (batch, channels) = (first.shape()[0], first.shape()[1]);
    for x in xs {
        if x.ndim() != 4 || x.shape()[0] != batch || x.shape()[1] != channels {
            return Err(OptimError::shape_mismatch(
                "create_block_image",
                [batch, channels],
                x.shape(),
            ));
        }
    }

    let dtype = first.dtype();
    let device = first.device();
    let total_w: usize = xs.iter().map(|x| x.shape()[3]).sum();

    // Each image becomes a horizontal strip [zeros | x_i | zeros] of full width.
    let mut rows = Vec::with_capacity(xs.len());
    let mut w_off = 0;
    for x in xs {
        let (h, w) = (x.shape()[2], x.shape()[3]);
        let after = total_w - w_off - w;

        let mut pieces = Vec::with_capacity(3);
        if w_off > 0 {
            pieces.push(Tensor::<R>::zeros(&[batch, channels, h, w_off], dtype, device));
        }
        pieces.push(x.clone());
        if after > 0 {
            pieces.push(Tensor::<R>::zeros(&[batch, channels, h, after], dtype, device));
        }

        let refs: Vec<&Tensor<R>> = pieces.iter().collect();
        rows.push(client.cat(&refs, 3)?);
        w_off += w;
    }

    let refs: Vec<&Tensor<R>> = rows.iter().collect();
    Ok(client.cat(&refs, 2)?)
}

pub fn tuple_from_block_image_impl<R>(
    x: &Tensor<R>,
    shapes: &[Vec<usize>],
) -> OptimResult<Vec<Tensor<R>>>
where
    R: Runtime<DType = DType>,
{
    if x.ndim() != 4 {
        return Err(OptimError::shape_mismatch(
            "tuple_from_block_image",
            "[B, C, H, W]",
            x.shape(),
        ));
    }
    let (batch, channels) = (x.shape()[0], x.shape()[1]);
    for shape in shapes {
        if shape.len() != 4 || shape[0] != batch || shape[1] != channels {
            return Err(OptimError::shape_mismatch(
                "tuple_from_block_image",
                [batch, channels],
                shape,
            ));
        }
    }
    let total_h: usize = shapes.iter().map(|s| s[2]).sum();
    let total_w: usize = shapes.iter().map(|s| s[3]).sum();
    if total_h > x.shape()[2] || total_w > x.shape()[3] {
        return Err(OptimError::shape_mismatch(
            "tuple_from_block_image",
            [batch, channels, total_h, total_w],
            x.shape(),
        ));
    }

    let mut out = Vec::with_capacity(shapes.len());
    let (mut h_off, mut w_off) = (0, 0);
    for shape in shapes {
        let (h, w) = (shape[2], shape[3]);
        let block = x.narrow(2, h_off, h)?.narrow(3, w_off, w)?.contiguous();
        out.push(block);
        h_off += h;
        w_off += w;
    }
    Ok(out)
}
