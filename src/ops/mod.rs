//! Differentiable operations on [`Tensor`]s.
//!
//! Every operation computes its forward value with the [`NdArray`] kernels and,
//! when at least one operand tracks gradient, records one [`Dependency`] per
//! tracked operand. Untracked operands never receive an edge.

pub mod backward;

use crate::array::NdArray;
use crate::error::Error;
use crate::graph::{Dependency, GradFn};
use crate::tensor::Tensor;

/// Wraps a forward result and its edges into a new node. The node tracks
/// gradient exactly when it has at least one dependency.
fn build_output(op_name: &str, value: NdArray, dependencies: Vec<Dependency>) -> Tensor {
    crate::debug_println!(
        "{} -> shape {:?}, {} dependencies",
        op_name,
        value.shape(),
        dependencies.len()
    );
    let requires_grad = !dependencies.is_empty();
    Tensor::with_dependencies(value, requires_grad, dependencies)
}

/// Element-wise addition with broadcasting.
pub fn add(a: &Tensor, b: &Tensor) -> Result<Tensor, Error> {
    let (a_value, b_value) = (a.data().clone(), b.data().clone());
    let value = a_value.add(&b_value)?;

    let mut dependencies = Vec::new();
    if a.requires_grad() {
        dependencies.push(Dependency::new(
            a.clone(),
            GradFn::Identity {
                input_shape: a_value.shape().to_vec(),
            },
        ));
    }
    if b.requires_grad() {
        dependencies.push(Dependency::new(
            b.clone(),
            GradFn::Identity {
                input_shape: b_value.shape().to_vec(),
            },
        ));
    }
    Ok(build_output("add", value, dependencies))
}

/// Element-wise subtraction with broadcasting.
pub fn sub(a: &Tensor, b: &Tensor) -> Result<Tensor, Error> {
    let (a_value, b_value) = (a.data().clone(), b.data().clone());
    let value = a_value.sub(&b_value)?;

    let mut dependencies = Vec::new();
    if a.requires_grad() {
        dependencies.push(Dependency::new(
            a.clone(),
            GradFn::Identity {
                input_shape: a_value.shape().to_vec(),
            },
        ));
    }
    if b.requires_grad() {
        dependencies.push(Dependency::new(
            b.clone(),
            GradFn::Negate {
                input_shape: b_value.shape().to_vec(),
            },
        ));
    }
    Ok(build_output("sub", value, dependencies))
}

/// Element-wise multiplication with broadcasting.
pub fn mul(a: &Tensor, b: &Tensor) -> Result<Tensor, Error> {
    let (a_value, b_value) = (a.data().clone(), b.data().clone());
    let value = a_value.mul(&b_value)?;

    let mut dependencies = Vec::new();
    if a.requires_grad() {
        dependencies.push(Dependency::new(
            a.clone(),
            GradFn::MulBy {
                factor: b_value.clone(),
                input_shape: a_value.shape().to_vec(),
            },
        ));
    }
    if b.requires_grad() {
        let input_shape = b_value.shape().to_vec();
        dependencies.push(Dependency::new(
            b.clone(),
            GradFn::MulBy {
                factor: a_value,
                input_shape,
            },
        ));
    }
    Ok(build_output("mul", value, dependencies))
}

/// Element-wise true division with broadcasting.
pub fn div(a: &Tensor, b: &Tensor) -> Result<Tensor, Error> {
    let (a_value, b_value) = (a.data().clone(), b.data().clone());
    let value = a_value.div(&b_value)?;

    let mut dependencies = Vec::new();
    if a.requires_grad() {
        dependencies.push(Dependency::new(
            a.clone(),
            GradFn::DivNumerator {
                denominator: b_value.clone(),
                input_shape: a_value.shape().to_vec(),
            },
        ));
    }
    if b.requires_grad() {
        let input_shape = b_value.shape().to_vec();
        dependencies.push(Dependency::new(
            b.clone(),
            GradFn::DivDenominator {
                numerator: a_value,
                denominator: b_value,
                input_shape,
            },
        ));
    }
    Ok(build_output("div", value, dependencies))
}

pub fn neg(x: &Tensor) -> Tensor {
    let x_value = x.data().clone();
    let value = -&x_value;
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        dependencies.push(Dependency::new(
            x.clone(),
            GradFn::Negate {
                input_shape: x_value.shape().to_vec(),
            },
        ));
    }
    build_output("neg", value, dependencies)
}

/// Sums all elements (`axis = None`) or along one axis of a rank <= 2 tensor.
///
/// # Errors
/// * `InvalidAxis` if `axis >= rank`
/// * `UnsupportedRank` for an axis sum on a tensor of rank > 2
pub fn sum(x: &Tensor, axis: Option<usize>, keep_dims: bool) -> Result<Tensor, Error> {
    let input_shape = x.shape();
    let value = x.data().sum(axis, keep_dims)?;
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        dependencies.push(Dependency::new(x.clone(), GradFn::Sum { input_shape, axis }));
    }
    Ok(build_output("sum", value, dependencies))
}

/// Matrix product of two rank-1 or rank-2 tensors.
///
/// A rank-1 left operand acts as a row vector and a rank-1 right operand as a
/// column vector; the promoted dimension does not appear in the result.
///
/// # Examples
/// ```
/// use ndgrad::{ops, Tensor};
///
/// let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2], true).unwrap();
/// let b = Tensor::from_vec(vec![10.0, 20.0], &[2, 1], true).unwrap();
/// let c = ops::matmul(&a, &b).unwrap();
/// assert_eq!(c.shape(), vec![3, 1]);
/// assert_eq!(c.value().to_vec(), vec![50.0, 110.0, 170.0]);
/// ```
pub fn matmul(a: &Tensor, b: &Tensor) -> Result<Tensor, Error> {
    let (a_value, b_value) = (a.data().clone(), b.data().clone());
    let value = a_value.matmul(&b_value)?;

    let mut dependencies = Vec::new();
    if a.requires_grad() {
        dependencies.push(Dependency::new(
            a.clone(),
            GradFn::MatmulLeft {
                right: b_value.clone(),
                input_shape: a_value.shape().to_vec(),
            },
        ));
    }
    if b.requires_grad() {
        let input_shape = b_value.shape().to_vec();
        dependencies.push(Dependency::new(
            b.clone(),
            GradFn::MatmulRight {
                left: a_value,
                input_shape,
            },
        ));
    }
    Ok(build_output("matmul", value, dependencies))
}

/// Natural logarithm.
pub fn log(x: &Tensor) -> Tensor {
    let input = x.data().clone();
    let value = input.ln();
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        dependencies.push(Dependency::new(x.clone(), GradFn::Log { input }));
    }
    build_output("log", value, dependencies)
}

pub fn exp(x: &Tensor) -> Tensor {
    let value = x.data().exp();
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        dependencies.push(Dependency::new(
            x.clone(),
            GradFn::Exp {
                output: value.clone(),
            },
        ));
    }
    build_output("exp", value, dependencies)
}

pub fn tanh(x: &Tensor) -> Tensor {
    let value = x.data().tanh();
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        dependencies.push(Dependency::new(
            x.clone(),
            GradFn::Tanh {
                output: value.clone(),
            },
        ));
    }
    build_output("tanh", value, dependencies)
}

pub fn sigmoid(x: &Tensor) -> Tensor {
    let value = x.data().sigmoid();
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        dependencies.push(Dependency::new(
            x.clone(),
            GradFn::Sigmoid {
                output: value.clone(),
            },
        ));
    }
    build_output("sigmoid", value, dependencies)
}

/// `x` where `x >= 0`, `slope * x` elsewhere.
pub fn leaky_relu(x: &Tensor, slope: f32) -> Tensor {
    let input = x.data().clone();
    let value = input.leaky_relu(slope);
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        dependencies.push(Dependency::new(
            x.clone(),
            GradFn::LeakyRelu { input, slope },
        ));
    }
    build_output("leaky_relu", value, dependencies)
}

/// Rows `[start, end)` along axis 0. `end` is clamped to the leading dimension.
///
/// # Errors
/// * `UnsupportedRank` for tensors of rank 0 or rank > 2
/// * `InvalidSlice` if `start` lies past the leading dimension or `end <= start`
pub fn slice(x: &Tensor, start: usize, end: usize) -> Result<Tensor, Error> {
    let input_shape = x.shape();
    let value = x.data().slice(start, end)?;
    let mut dependencies = Vec::new();
    if x.requires_grad() {
        // Record the clamped end so the scatter matches the rows actually taken.
        let end = start + value.shape()[0];
        dependencies.push(Dependency::new(
            x.clone(),
            GradFn::Slice {
                input_shape,
                start,
                end,
            },
        ));
    }
    Ok(build_output("slice", value, dependencies))
}

pub fn add_scalar(x: &Tensor, scalar: f32) -> Result<Tensor, Error> {
    add(x, &Tensor::scalar(scalar, false))
}

pub fn sub_scalar(x: &Tensor, scalar: f32) -> Result<Tensor, Error> {
    sub(x, &Tensor::scalar(scalar, false))
}

/// `scalar - x`.
pub fn rsub_scalar(scalar: f32, x: &Tensor) -> Result<Tensor, Error> {
    sub(&Tensor::scalar(scalar, false), x)
}

pub fn mul_scalar(x: &Tensor, scalar: f32) -> Result<Tensor, Error> {
    mul(x, &Tensor::scalar(scalar, false))
}

pub fn div_scalar(x: &Tensor, scalar: f32) -> Result<Tensor, Error> {
    div(x, &Tensor::scalar(scalar, false))
}
