use crate::array::NdArray;
use crate::error::Error;
use crate::ops::backward;
use crate::tensor::Tensor;

use std::fmt;

/// Record of how one parent contributed to a node, holding exactly the
/// forward values its local gradient needs.
///
/// Every elementwise variant carries the parent's `input_shape` so the
/// gradient can be summed back down through any broadcast.
#[derive(Debug, Clone, PartialEq)]
pub enum GradFn {
    /// d/dx = 1 (addition, left side of subtraction).
    Identity { input_shape: Vec<usize> },
    /// d/dx = -1 (negation, right side of subtraction).
    Negate { input_shape: Vec<usize> },
    /// d/dx = factor (multiplication: each side receives the other operand).
    MulBy {
        factor: NdArray,
        input_shape: Vec<usize>,
    },
    /// d/dx of x / d = 1 / d.
    DivNumerator {
        denominator: NdArray,
        input_shape: Vec<usize>,
    },
    /// d/dd of n / d = -n / d^2.
    DivDenominator {
        numerator: NdArray,
        denominator: NdArray,
        input_shape: Vec<usize>,
    },
    Sum {
        input_shape: Vec<usize>,
        axis: Option<usize>,
    },
    /// Left operand of a matrix product: grad @ right^T.
    MatmulLeft {
        right: NdArray,
        input_shape: Vec<usize>,
    },
    /// Right operand of a matrix product: left^T @ grad.
    MatmulRight {
        left: NdArray,
        input_shape: Vec<usize>,
    },
    Log { input: NdArray },
    Exp { output: NdArray },
    Tanh { output: NdArray },
    Sigmoid { output: NdArray },
    LeakyRelu { input: NdArray, slope: f32 },
    /// Rows `[start, end)` taken from an array of `input_shape`.
    Slice {
        input_shape: Vec<usize>,
        start: usize,
        end: usize,
    },
}

impl fmt::Display for GradFn {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GradFn::Identity { .. } => write!(f, "Identity"),
            GradFn::Negate { .. } => write!(f, "Negate"),
            GradFn::MulBy { .. } => write!(f, "MulBy"),
            GradFn::DivNumerator { .. } => write!(f, "DivNumerator"),
            GradFn::DivDenominator { .. } => write!(f, "DivDenominator"),
            GradFn::Sum { axis: None, .. } => write!(f, "Sum(global)"),
            GradFn::Sum {
                axis: Some(axis), ..
            } => write!(f, "Sum(axis={})", axis),
            GradFn::MatmulLeft { .. } => write!(f, "MatmulLeft"),
            GradFn::MatmulRight { .. } => write!(f, "MatmulRight"),
            GradFn::Log { .. } => write!(f, "Log"),
            GradFn::Exp { .. } => write!(f, "Exp"),
            GradFn::Tanh { .. } => write!(f, "Tanh"),
            GradFn::Sigmoid { .. } => write!(f, "Sigmoid"),
            GradFn::LeakyRelu { slope, .. } => write!(f, "LeakyRelu(slope={})", slope),
            GradFn::Slice { start, end, .. } => write!(f, "Slice({}..{})", start, end),
        }
    }
}

impl GradFn {
    /// Maps the gradient flowing into the child node to the gradient of the
    /// parent this record belongs to. The result always has the parent's shape.
    pub fn apply(&self, grad: &NdArray) -> Result<NdArray, Error> {
        match self {
            GradFn::Identity { input_shape } => backward::unbroadcast(grad.clone(), input_shape),
            GradFn::Negate { input_shape } => backward::unbroadcast(-grad, input_shape),
            GradFn::MulBy {
                factor,
                input_shape,
            } => backward::mul_backward(grad, factor, input_shape),
            GradFn::DivNumerator {
                denominator,
                input_shape,
            } => backward::div_numerator_backward(grad, denominator, input_shape),
            GradFn::DivDenominator {
                numerator,
                denominator,
                input_shape,
            } => backward::div_denominator_backward(grad, numerator, denominator, input_shape),
            GradFn::Sum { input_shape, axis } => backward::sum_backward(grad, input_shape, *axis),
            GradFn::MatmulLeft { right, input_shape } => {
                backward::matmul_left_backward(grad, right, input_shape)
            }
            GradFn::MatmulRight { left, input_shape } => {
                backward::matmul_right_backward(grad, left, input_shape)
            }
            GradFn::Log { input } => backward::unbroadcast(grad.div(input)?, input.shape()),
            GradFn::Exp { output } => backward::unbroadcast(grad.mul(output)?, output.shape()),
            GradFn::Tanh { output } => {
                let local = 1.0 - &output.mul(output)?;
                backward::unbroadcast(grad.mul(&local)?, output.shape())
            }
            GradFn::Sigmoid { output } => {
                let local = output.mul(&(1.0 - output))?;
                backward::unbroadcast(grad.mul(&local)?, output.shape())
            }
            GradFn::LeakyRelu { input, slope } => {
                let local = input.map(|x| if x >= 0.0 { 1.0 } else { *slope });
                backward::unbroadcast(grad.mul(&local)?, input.shape())
            }
            GradFn::Slice {
                input_shape,
                start,
                end,
            } => backward::slice_backward(grad, input_shape, *start, *end),
        }
    }
}

/// An edge of the computation graph: the parent node and the record used to
/// turn the child's gradient into the parent's.
#[derive(Clone)]
pub struct Dependency {
    pub parent: Tensor,
    pub grad_fn: GradFn,
}

impl Dependency {
    pub fn new(parent: Tensor, grad_fn: GradFn) -> Self {
        Self { parent, grad_fn }
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("parent", &self.parent.id())
            .field("grad_fn", &format_args!("{}", self.grad_fn))
            .finish()
    }
}
