//! Kernels for the operations a [`Graph`](super::Graph) can hold.

use ndarray::{ArrayD, Axis, Ix4, IxDyn, Zip};

use super::{DataType, Tensor};
use crate::error::{Error, Result};

/// Convert `t` to `dst`.
///
/// Float to integer conversions truncate toward zero and saturate. Int32 to
/// uint8 keeps the low byte.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cast(t: &Tensor, dst: DataType) -> Tensor {
    match dst {
        DataType::Float => Tensor::Float(to_f32(t)),
        DataType::Int32 => Tensor::Int32(match t {
            Tensor::UInt8(a) => a.mapv(i32::from),
            Tensor::Float(a) => a.mapv(|v| v as i32),
            Tensor::Int32(a) => a.clone(),
        }),
        DataType::UInt8 => Tensor::UInt8(match t {
            Tensor::UInt8(a) => a.clone(),
            Tensor::Float(a) => a.mapv(|v| v as u8),
            Tensor::Int32(a) => a.mapv(|v| v as u8),
        }),
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f32(t: &Tensor) -> ArrayD<f32> {
    match t {
        Tensor::UInt8(a) => a.mapv(f32::from),
        Tensor::Float(a) => a.clone(),
        Tensor::Int32(a) => a.mapv(|v| v as f32),
    }
}

/// Insert a unit dimension at the position held by the scalar `dim` tensor.
///
/// Negative positions count from the end: `-1` appends a trailing axis.
pub fn expand_dims(input: &Tensor, dim: &Tensor) -> Result<Tensor> {
    let dim = dim.as_i32()?;
    let axis = match dim.len() {
        1 => dim.iter().next().copied().unwrap_or_default(),
        n => {
            return Err(Error::execution(format!(
                "ExpandDims expects a single axis, got {n} values"
            )))
        }
    };

    let rank = i64::try_from(input.rank()).map_err(|_| Error::execution("rank overflow"))?;
    let axis = i64::from(axis);
    if axis < -(rank + 1) || axis > rank {
        return Err(Error::execution(format!(
            "ExpandDims axis {axis} out of range for a rank {rank} tensor"
        )));
    }
    let position = if axis < 0 { axis + rank + 1 } else { axis };
    let position = usize::try_from(position).map_err(|_| Error::execution("negative axis"))?;

    Ok(match input {
        Tensor::UInt8(a) => Tensor::UInt8(a.clone().insert_axis(Axis(position))),
        Tensor::Float(a) => Tensor::Float(a.clone().insert_axis(Axis(position))),
        Tensor::Int32(a) => Tensor::Int32(a.clone().insert_axis(Axis(position))),
    })
}

/// Bilinear resize of `[batch, height, width, channels]` images.
///
/// Uses the legacy TensorFlow sampling grid (no corner alignment, no half
/// pixel centers). The result is always a float tensor.
#[allow(clippy::cast_precision_loss)]
pub fn resize_bilinear(images: &Tensor, size: &Tensor) -> Result<Tensor> {
    let size = size.as_i32()?;
    if size.shape() != [2] {
        return Err(Error::execution(format!(
            "ResizeBilinear size must have shape [2], got {:?}",
            size.shape()
        )));
    }
    let dims: Vec<usize> = size
        .iter()
        .map(|&v| usize::try_from(v).ok().filter(|&v| v > 0))
        .collect::<Option<_>>()
        .ok_or_else(|| {
            Error::execution(format!(
                "ResizeBilinear size must be positive, got {:?}",
                size.as_slice().unwrap_or_default()
            ))
        })?;
    let (out_h, out_w) = (dims[0], dims[1]);

    let input = to_f32(images)
        .into_dimensionality::<Ix4>()
        .map_err(|_| {
            Error::execution(format!(
                "ResizeBilinear expects a rank 4 [batch, height, width, channels] input, got {:?}",
                images.shape()
            ))
        })?;
    let (batch, in_h, in_w, channels) = input.dim();
    if in_h == 0 || in_w == 0 {
        return Err(Error::execution(format!(
            "ResizeBilinear cannot resample an empty {in_h}x{in_w} image"
        )));
    }

    let ys = interpolation_weights(in_h, out_h);
    let xs = interpolation_weights(in_w, out_w);

    let mut output = ndarray::Array4::<f32>::zeros((batch, out_h, out_w, channels));
    for b in 0..batch {
        for (y, wy) in ys.iter().enumerate() {
            for (x, wx) in xs.iter().enumerate() {
                for c in 0..channels {
                    let top_left = input[[b, wy.lower, wx.lower, c]];
                    let top_right = input[[b, wy.lower, wx.upper, c]];
                    let bottom_left = input[[b, wy.upper, wx.lower, c]];
                    let bottom_right = input[[b, wy.upper, wx.upper, c]];

                    let top = (top_right - top_left).mul_add(wx.lerp, top_left);
                    let bottom = (bottom_right - bottom_left).mul_add(wx.lerp, bottom_left);
                    output[[b, y, x, c]] = (bottom - top).mul_add(wy.lerp, top);
                }
            }
        }
    }

    Ok(Tensor::Float(output.into_dyn()))
}

struct Interpolation {
    lower: usize,
    upper: usize,
    lerp: f32,
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn interpolation_weights(in_size: usize, out_size: usize) -> Vec<Interpolation> {
    let scale = in_size as f32 / out_size as f32;
    (0..out_size)
        .map(|i| {
            let position = i as f32 * scale;
            // Safe: position is non-negative and below in_size
            let lower = (position.floor() as usize).min(in_size - 1);
            let upper = (lower + 1).min(in_size - 1);
            Interpolation {
                lower,
                upper,
                lerp: position - lower as f32,
            }
        })
        .collect()
}

/// Elementwise binary operation.
#[derive(Debug, Clone, Copy)]
pub enum Binary {
    Sub,
    Div,
}

/// Apply `op` with NumPy broadcasting. Both operands must share a type.
pub fn binary(op: Binary, x: &Tensor, y: &Tensor) -> Result<Tensor> {
    match (op, x, y) {
        (Binary::Sub, Tensor::Float(a), Tensor::Float(b)) => {
            broadcast_zip(a, b, |p, q| p - q).map(Tensor::Float)
        }
        (Binary::Div, Tensor::Float(a), Tensor::Float(b)) => {
            broadcast_zip(a, b, |p, q| p / q).map(Tensor::Float)
        }
        (Binary::Sub, Tensor::Int32(a), Tensor::Int32(b)) => {
            broadcast_zip(a, b, i32::wrapping_sub).map(Tensor::Int32)
        }
        (Binary::Div, Tensor::Int32(a), Tensor::Int32(b)) => {
            reject_zero_divisor(b.iter().any(|&v| v == 0))?;
            broadcast_zip(a, b, i32::wrapping_div).map(Tensor::Int32)
        }
        (Binary::Sub, Tensor::UInt8(a), Tensor::UInt8(b)) => {
            broadcast_zip(a, b, u8::wrapping_sub).map(Tensor::UInt8)
        }
        (Binary::Div, Tensor::UInt8(a), Tensor::UInt8(b)) => {
            reject_zero_divisor(b.iter().any(|&v| v == 0))?;
            broadcast_zip(a, b, u8::wrapping_div).map(Tensor::UInt8)
        }
        (op, x, y) => Err(Error::execution(format!(
            "{op:?} operands must share a type, got {} and {}",
            x.data_type(),
            y.data_type()
        ))),
    }
}

fn reject_zero_divisor(has_zero: bool) -> Result<()> {
    if has_zero {
        return Err(Error::execution("integer division by zero"));
    }
    Ok(())
}

fn broadcast_zip<T: Copy>(
    a: &ArrayD<T>,
    b: &ArrayD<T>,
    f: impl Fn(T, T) -> T,
) -> Result<ArrayD<T>> {
    let shape = IxDyn(&broadcast_shape(a.shape(), b.shape())?);
    let (Some(a), Some(b)) = (a.broadcast(shape.clone()), b.broadcast(shape)) else {
        return Err(Error::execution("broadcast failed"));
    };
    Ok(Zip::from(a).and(b).map_collect(|&p, &q| f(p, q)))
}

/// Result shape of broadcasting `a` against `b`.
pub fn broadcast_shape(a: &[usize], b: &[usize]) -> Result<Vec<usize>> {
    let rank = a.len().max(b.len());
    let dim = |shape: &[usize], i: usize| {
        let pad = rank - shape.len();
        if i < pad {
            1
        } else {
            shape[i - pad]
        }
    };

    (0..rank)
        .map(|i| match (dim(a, i), dim(b, i)) {
            (p, q) if p == q => Ok(p),
            (1, q) => Ok(q),
            (p, 1) => Ok(p),
            _ => Err(Error::ShapeMismatch {
                expected: format!("shape broadcastable with {a:?}"),
                actual: format!("{b:?}"),
            }),
        })
        .collect()
}
