//! Shape algebra shared by arrays and the gradient functions.

use crate::error::Error;

/// Returns true when two shapes are compatible under numpy broadcasting rules.
///
/// Dimensions are compared from the trailing axis backward; each aligned pair
/// must be equal or contain a 1. The shorter shape is treated as if it were
/// left-padded with 1s.
pub fn is_broadcastable(a: &[usize], b: &[usize]) -> bool {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .all(|(&a_dim, &b_dim)| a_dim == b_dim || a_dim == 1 || b_dim == 1)
}

/// Compute the broadcasted shape for two shapes, following numpy broadcasting rules.
pub fn broadcast_shapes(a: &[usize], b: &[usize]) -> Result<Vec<usize>, Error> {
    let ndim = std::cmp::max(a.len(), b.len());
    let mut result = Vec::with_capacity(ndim);
    for i in 0..ndim {
        let a_dim = if i >= ndim - a.len() {
            a[i - (ndim - a.len())]
        } else {
            1
        };
        let b_dim = if i >= ndim - b.len() {
            b[i - (ndim - b.len())]
        } else {
            1
        };
        if a_dim == b_dim || a_dim == 1 || b_dim == 1 {
            result.push(std::cmp::max(a_dim, b_dim));
        } else {
            return Err(Error::IncompatibleShapes {
                op: "broadcast".to_string(),
                shape_a: a.to_vec(),
                shape_b: b.to_vec(),
            });
        }
    }
    Ok(result)
}

/// Row-major strides: the last axis has stride 1, each preceding axis the
/// product of every dimension to its right.
pub fn strides_for(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut step = 1;
    for (axis, &dim) in shape.iter().enumerate().rev() {
        strides[axis] = step;
        step *= dim;
    }
    strides
}
