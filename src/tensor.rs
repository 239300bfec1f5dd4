use crate::{
    array::NdArray,
    error::Error,
    graph::Dependency,
    ops,
};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::{
    cell::{Ref, RefCell},
    hash::{Hash, Hasher},
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

static TENSOR_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);

fn next_id() -> usize {
    TENSOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub struct TensorData {
    pub id: usize,
    pub value: NdArray,
    /// Accumulated gradient, same shape as `value`. `None` when the node does
    /// not track gradient or after the value was overwritten.
    pub grad: Option<NdArray>,
    pub requires_grad: bool,
    /// Edges to the nodes this one was computed from. Fixed at construction.
    pub dependencies: Vec<Dependency>,
}

/// A node of the computation graph: a value, an optional accumulated
/// gradient, and the edges recording how the value was computed.
///
/// Cloning a `Tensor` is cheap and yields a handle to the same node; the
/// value itself is only ever handed out as a copy.
///
/// # Examples
/// ```rust
/// use ndgrad::Tensor;
///
/// fn main() -> Result<(), ndgrad::Error> {
///     let x = Tensor::from_vec(vec![1.0, 2.0, 3.0], &[3], true)?;
///     let y = (&x * &x)?.sum(None, false)?;
///     y.backward(None)?;
///     assert_eq!(x.grad().unwrap().to_vec(), vec![2.0, 4.0, 6.0]);
///     Ok(())
/// }
/// ```
pub struct Tensor {
    pub(crate) inner: Rc<RefCell<TensorData>>,
}

impl Clone for Tensor {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Tensor {}

impl Hash for Tensor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl Tensor {
    /// Creates a leaf node. A tracking node starts with an all-zero gradient.
    pub fn new(value: NdArray, requires_grad: bool) -> Self {
        Self::with_dependencies(value, requires_grad, Vec::new())
    }

    /// Creates a node whose gradient flows into `dependencies` on backward.
    pub fn with_dependencies(
        value: NdArray,
        requires_grad: bool,
        dependencies: Vec<Dependency>,
    ) -> Self {
        let grad = requires_grad.then(|| NdArray::zeros_like(&value));
        Self {
            inner: Rc::new(RefCell::new(TensorData {
                id: next_id(),
                value,
                grad,
                requires_grad,
                dependencies,
            })),
        }
    }

    pub fn from_vec(data: Vec<f32>, shape: &[usize], requires_grad: bool) -> Result<Self, Error> {
        Ok(Self::new(NdArray::from_vec(data, shape)?, requires_grad))
    }

    pub fn zeros(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(NdArray::zeros(shape), requires_grad)
    }

    pub fn ones(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(NdArray::ones(shape), requires_grad)
    }

    pub fn full(shape: &[usize], value: f32, requires_grad: bool) -> Self {
        Self::new(NdArray::full(shape, value), requires_grad)
    }

    /// Values drawn uniformly from `[0, 1)`.
    pub fn random(shape: &[usize], requires_grad: bool) -> Self {
        Self::new(NdArray::random(shape), requires_grad)
    }

    pub fn scalar(value: f32, requires_grad: bool) -> Self {
        Self::new(NdArray::scalar(value), requires_grad)
    }

    /// Borrows the value for use inside the crate's operations.
    pub(crate) fn data(&self) -> Ref<'_, NdArray> {
        Ref::map(self.inner.borrow(), |inner| &inner.value)
    }

    /// Returns a copy of the value.
    pub fn value(&self) -> NdArray {
        self.inner.borrow().value.clone()
    }

    /// Replaces the value and discards any accumulated gradient.
    pub fn set_value(&self, value: NdArray) {
        let mut inner = self.inner.borrow_mut();
        inner.value = value;
        inner.grad = None;
    }

    pub fn shape(&self) -> Vec<usize> {
        self.inner.borrow().value.shape().to_vec()
    }

    pub fn size(&self) -> usize {
        self.inner.borrow().value.size()
    }

    pub fn ndim(&self) -> usize {
        self.inner.borrow().value.ndim()
    }

    pub fn requires_grad(&self) -> bool {
        self.inner.borrow().requires_grad
    }

    /// Returns a copy of the accumulated gradient, if any.
    pub fn grad(&self) -> Option<NdArray> {
        self.inner.borrow().grad.clone()
    }

    /// The accumulated gradient wrapped as an untracked tensor.
    pub fn gradient(&self) -> Option<Tensor> {
        self.grad().map(|grad| Tensor::new(grad, false))
    }

    /// Resets the gradient to zeros. Has no effect on nodes that do not track
    /// gradient.
    pub fn zero_grad(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.requires_grad {
            inner.grad = Some(NdArray::zeros_like(&inner.value));
        }
    }

    /// Number of recorded graph edges.
    pub fn num_dependencies(&self) -> usize {
        self.inner.borrow().dependencies.len()
    }

    /// Gets the unique identifier of this tensor.
    pub fn id(&self) -> usize {
        self.inner.borrow().id
    }

    /// Accumulates `gradient` into this node and propagates it to every
    /// ancestor that tracks gradient.
    ///
    /// `gradient` may be omitted only when the value holds a single element,
    /// in which case the seed is 1. A node reachable through several paths
    /// accumulates one contribution per path.
    ///
    /// # Errors
    /// * `RequiresGradError` if this node does not track gradient
    /// * `SeedGradientRequired` if no seed is given for a multi-element value
    /// * `NoGradientError` if a node on the way has no gradient slot
    /// * `ShapeMismatch` if a gradient does not have its node's shape
    ///
    /// On error, nodes visited before the failure keep the contributions
    /// already accumulated into them.
    pub fn backward(&self, gradient: Option<NdArray>) -> Result<(), Error> {
        if !self.requires_grad() {
            return Err(Error::RequiresGradError);
        }
        let seed = match gradient {
            Some(gradient) => gradient,
            None if self.size() == 1 => NdArray::full(&self.shape(), 1.0),
            None => {
                return Err(Error::SeedGradientRequired {
                    shape: self.shape(),
                })
            }
        };

        let mut stack = vec![(self.clone(), seed)];
        while let Some((node, incoming)) = stack.pop() {
            let dependencies = {
                let mut guard = node.inner.borrow_mut();
                let inner = &mut *guard;
                let incoming = Self::match_shape(incoming, inner.value.shape())?;
                let grad = inner.grad.as_mut().ok_or(Error::NoGradientError)?;
                *grad = grad.add(&incoming)?;
                crate::debug_println!(
                    "backward node {} grad shape {:?}, {} dependencies",
                    inner.id,
                    grad.shape(),
                    inner.dependencies.len()
                );
                inner
                    .dependencies
                    .iter()
                    .map(|dependency| {
                        dependency
                            .grad_fn
                            .apply(&incoming)
                            .map(|local| (dependency.parent.clone(), local))
                    })
                    .collect::<Result<Vec<_>, Error>>()?
            };
            // Reversed so the first dependency is visited first.
            stack.extend(dependencies.into_iter().rev());
        }
        Ok(())
    }

    /// Checks an incoming gradient against the node's shape. Only
    /// single-element gradients may differ in rank (`[1]` seeding `[1, 1]`).
    fn match_shape(gradient: NdArray, shape: &[usize]) -> Result<NdArray, Error> {
        if gradient.shape() == shape {
            Ok(gradient)
        } else if gradient.size() == 1 && shape.iter().product::<usize>() == 1 {
            gradient.reshaped(shape)
        } else {
            Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                actual: gradient.shape().to_vec(),
            })
        }
    }

    pub fn sum(&self, axis: Option<usize>, keep_dims: bool) -> Result<Tensor, Error> {
        ops::sum(self, axis, keep_dims)
    }

    pub fn matmul(&self, other: &Tensor) -> Result<Tensor, Error> {
        ops::matmul(self, other)
    }

    pub fn log(&self) -> Tensor {
        ops::log(self)
    }

    pub fn exp(&self) -> Tensor {
        ops::exp(self)
    }

    pub fn tanh(&self) -> Tensor {
        ops::tanh(self)
    }

    pub fn sigmoid(&self) -> Tensor {
        ops::sigmoid(self)
    }

    pub fn leaky_relu(&self, slope: f32) -> Tensor {
        ops::leaky_relu(self, slope)
    }

    pub fn slice(&self, start: usize, end: usize) -> Result<Tensor, Error> {
        ops::slice(self, start, end)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner.borrow(), f)
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        write!(
            f,
            "Tensor(id={}, requires_grad={}, {})",
            inner.id, inner.requires_grad, inner.value
        )
    }
}

macro_rules! impl_tensor_binary_op {
    ($trait:ident, $method:ident, $op_fn:path, $scalar_fn:path) => {
        impl<'b> $trait<&'b Tensor> for &Tensor {
            type Output = Result<Tensor, Error>;

            fn $method(self, rhs: &'b Tensor) -> Self::Output {
                $op_fn(self, rhs)
            }
        }

        impl $trait<f32> for &Tensor {
            type Output = Result<Tensor, Error>;

            fn $method(self, rhs: f32) -> Self::Output {
                $scalar_fn(self, rhs)
            }
        }
    };
}

impl_tensor_binary_op!(Add, add, ops::add, ops::add_scalar);
impl_tensor_binary_op!(Sub, sub, ops::sub, ops::sub_scalar);
impl_tensor_binary_op!(Mul, mul, ops::mul, ops::mul_scalar);
impl_tensor_binary_op!(Div, div, ops::div, ops::div_scalar);

impl Sub<&Tensor> for f32 {
    type Output = Result<Tensor, Error>;

    fn sub(self, rhs: &Tensor) -> Self::Output {
        ops::rsub_scalar(self, rhs)
    }
}

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Tensor {
        ops::neg(self)
    }
}
