//! Local gradient computations used by `GradFn::apply`.

use crate::array::NdArray;
use crate::error::Error;
use ndarray::{ArrayD, Axis, IxDyn, Slice};

/// Sums `grad` down to `target_shape`, undoing any broadcast done in the
/// forward pass.
///
/// Shapes are right-aligned: leading axes `grad` has in excess are summed
/// away first, then every axis where the target has size 1 is summed with
/// kept dimensions.
pub fn unbroadcast(grad: NdArray, target_shape: &[usize]) -> Result<NdArray, Error> {
    if grad.shape() == target_shape {
        return Ok(grad);
    }

    crate::debug_println!(
        "unbroadcast grad {:?} -> target {:?}",
        grad.shape(),
        target_shape
    );

    // A single-element target received a scalar broadcast: everything collapses.
    if target_shape.iter().product::<usize>() == 1 {
        return grad.sum(None, false)?.reshaped(target_shape);
    }

    let mut current = grad;
    while current.ndim() > target_shape.len() {
        current = current.sum(Some(0), false)?;
    }

    let pad_len = target_shape.len() - current.ndim();
    for (i, &target_dim) in target_shape.iter().enumerate().skip(pad_len) {
        let axis = i - pad_len;
        if target_dim == 1 && current.shape()[axis] != 1 {
            current = current.sum(Some(axis), true)?;
        }
    }

    if current.shape() != target_shape {
        if current.size() == target_shape.iter().product::<usize>() {
            return current.reshaped(target_shape);
        }
        return Err(Error::ShapeMismatch {
            expected: target_shape.to_vec(),
            actual: current.shape().to_vec(),
        });
    }
    Ok(current)
}

pub(crate) fn mul_backward(
    grad: &NdArray,
    factor: &NdArray,
    input_shape: &[usize],
) -> Result<NdArray, Error> {
    unbroadcast(grad.mul(factor)?, input_shape)
}

pub(crate) fn div_numerator_backward(
    grad: &NdArray,
    denominator: &NdArray,
    input_shape: &[usize],
) -> Result<NdArray, Error> {
    unbroadcast(grad.div(denominator)?, input_shape)
}

pub(crate) fn div_denominator_backward(
    grad: &NdArray,
    numerator: &NdArray,
    denominator: &NdArray,
    input_shape: &[usize],
) -> Result<NdArray, Error> {
    // -n / d^2
    let local = -&numerator.div(&denominator.mul(denominator)?)?;
    unbroadcast(grad.mul(&local)?, input_shape)
}

/// Spreads the reduced gradient back over every element that was summed.
pub(crate) fn sum_backward(
    grad: &NdArray,
    input_shape: &[usize],
    axis: Option<usize>,
) -> Result<NdArray, Error> {
    match axis {
        Some(axis) if input_shape.len() == 2 => {
            let mut kept_shape = input_shape.to_vec();
            kept_shape[axis] = 1;
            grad.reshaped(&kept_shape)?.broadcast_to(input_shape)
        }
        _ => {
            if grad.size() != 1 {
                return Err(Error::ShapeMismatch {
                    expected: vec![1],
                    actual: grad.shape().to_vec(),
                });
            }
            Ok(NdArray::full(input_shape, grad.as_slice()[0]))
        }
    }
}

/// Promotes a rank-1 left operand to a row vector.
fn as_row_matrix(array: &NdArray) -> Result<NdArray, Error> {
    if array.ndim() == 1 {
        array.reshaped(&[1, array.size()])
    } else {
        Ok(array.clone())
    }
}

/// Promotes a rank-1 right operand to a column vector.
fn as_column_matrix(array: &NdArray) -> Result<NdArray, Error> {
    if array.ndim() == 1 {
        array.reshaped(&[array.size(), 1])
    } else {
        Ok(array.clone())
    }
}

/// dL/dA = dL/dC @ B^T
pub(crate) fn matmul_left_backward(
    grad: &NdArray,
    right: &NdArray,
    input_shape: &[usize],
) -> Result<NdArray, Error> {
    let right_2d = as_column_matrix(right)?;
    let rows = if input_shape.len() == 1 { 1 } else { input_shape[0] };
    let grad_2d = grad.reshaped(&[rows, right_2d.shape()[1]])?;
    grad_2d
        .matmul(&right_2d.transpose()?)?
        .reshaped(input_shape)
}

/// dL/dB = A^T @ dL/dC
pub(crate) fn matmul_right_backward(
    grad: &NdArray,
    left: &NdArray,
    input_shape: &[usize],
) -> Result<NdArray, Error> {
    let left_2d = as_row_matrix(left)?;
    let cols = if input_shape.len() == 1 { 1 } else { input_shape[1] };
    let grad_2d = grad.reshaped(&[left_2d.shape()[0], cols])?;
    left_2d
        .transpose()?
        .matmul(&grad_2d)?
        .reshaped(input_shape)
}

/// Scatters the sliced rows back to their original positions, zero elsewhere.
pub(crate) fn slice_backward(
    grad: &NdArray,
    input_shape: &[usize],
    start: usize,
    end: usize,
) -> Result<NdArray, Error> {
    let mut sliced_shape = input_shape.to_vec();
    sliced_shape[0] = end - start;
    if grad.shape() != sliced_shape.as_slice() {
        return Err(Error::ShapeMismatch {
            expected: sliced_shape,
            actual: grad.shape().to_vec(),
        });
    }
    let mut grad_input = ArrayD::<f32>::zeros(IxDyn(input_shape));
    grad_input
        .slice_axis_mut(Axis(0), Slice::from(start..end))
        .assign(grad.get_data());
    Ok(NdArray::new(grad_input))
}
