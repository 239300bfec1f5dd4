use crate::error::Error;
use crate::util;

use ndarray::{Array1, ArrayD, Axis, Ix2, IxDyn, ShapeError, Slice, Zip};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Dense n-dimensional array of `f32` stored row-major in a single buffer.
///
/// Cloning always deep-copies the buffer, so two arrays never alias the same
/// storage.
#[derive(Clone, Debug, PartialEq)]
pub struct NdArray {
    pub(crate) data: ArrayD<f32>,
    strides: Vec<usize>,
}

impl NdArray {
    pub fn new(data: ArrayD<f32>) -> Self {
        // Views produced by transpose/slice may come back in a non-standard order.
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().into_owned()
        };
        let strides = util::strides_for(data.shape());
        Self { data, strides }
    }

    pub fn into_ndarray(self) -> ArrayD<f32> {
        self.data
    }

    /// Builds an array from flat row-major data. Fails when `data.len()`
    /// differs from the product of `shape`.
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Result<Self, Error> {
        let actual_len = data.len();
        let map_err = |_e: ShapeError| Error::ShapeMismatch {
            expected: shape.to_vec(),
            actual: vec![actual_len],
        };
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(map_err)?;
        Ok(Self::new(array))
    }

    /// One-dimensional array holding `data`.
    pub fn vector(data: Vec<f32>) -> Self {
        Self::new(Array1::from_vec(data).into_dyn())
    }

    /// Single-element array of shape `[1]`.
    pub fn scalar(value: f32) -> Self {
        Self::full(&[1], value)
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::new(ArrayD::zeros(IxDyn(shape)))
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::new(ArrayD::ones(IxDyn(shape)))
    }

    pub fn full(shape: &[usize], value: f32) -> Self {
        Self::new(ArrayD::from_elem(IxDyn(shape), value))
    }

    pub fn zeros_like(other: &NdArray) -> Self {
        Self::zeros(other.shape())
    }

    pub fn ones_like(other: &NdArray) -> Self {
        Self::ones(other.shape())
    }

    /// Values drawn uniformly from `[0, 1)`.
    pub fn random(shape: &[usize]) -> Self {
        let mut rng = rand::rng();
        let data = ArrayD::from_shape_simple_fn(IxDyn(shape), || rng.random::<f32>());
        Self::new(data)
    }

    /// Values drawn from N(mean, std_dev^2).
    pub fn random_normal(shape: &[usize], mean: f32, std_dev: f32) -> Result<Self, Error> {
        let dist = Normal::new(mean, std_dev).map_err(|e| {
            Error::InvalidOperation(format!(
                "Invalid normal distribution (mean={}, std_dev={}): {}",
                mean, std_dev, e
            ))
        })?;
        let mut rng = rand::rng();
        let data = ArrayD::from_shape_simple_fn(IxDyn(shape), || dist.sample(&mut rng));
        Ok(Self::new(data))
    }

    /// Evenly spaced values in `[start, end)`, as a one-dimensional array.
    pub fn arange(start: usize, end: usize, step: usize) -> Result<Self, Error> {
        if start > end {
            return Err(Error::InvalidOperation(format!(
                "arange start ({}) must not exceed end ({})",
                start, end
            )));
        }
        if step == 0 {
            return Err(Error::InvalidOperation(
                "arange step must be greater than zero".to_string(),
            ));
        }
        let data: Vec<f32> = (start..end).step_by(step).map(|v| v as f32).collect();
        Ok(Self::vector(data))
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Flat-index increment for advancing each axis by one.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the array contains no elements
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get_data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Row-major view of the elements.
    pub fn as_slice(&self) -> &[f32] {
        // Standard layout is enforced by `new`.
        self.data.as_slice().unwrap_or_default()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    pub fn into_raw_vec(self) -> Vec<f32> {
        self.data.into_raw_vec_and_offset().0
    }

    fn flat_index(&self, indices: &[usize]) -> Result<usize, Error> {
        if indices.len() != self.ndim() {
            return Err(Error::IndexRank {
                expected: self.ndim(),
                actual: indices.len(),
            });
        }
        let mut offset = 0;
        for ((&index, &dim), &stride) in indices.iter().zip(self.shape()).zip(&self.strides) {
            if index >= dim {
                return Err(Error::IndexOutOfBounds { index, size: dim });
            }
            offset += index * stride;
        }
        Ok(offset)
    }

    /// Reads the element at one coordinate per dimension.
    pub fn get(&self, indices: &[usize]) -> Result<f32, Error> {
        let offset = self.flat_index(indices)?;
        Ok(self.as_slice()[offset])
    }

    pub fn set(&mut self, indices: &[usize], value: f32) -> Result<(), Error> {
        let offset = self.flat_index(indices)?;
        self.data
            .as_slice_mut()
            .map(|slice| slice[offset] = value)
            .ok_or_else(|| Error::InvalidOperation("Array storage is not contiguous".to_string()))
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Randomly permutes the elements of the flat buffer in place.
    pub fn shuffle(&mut self) {
        if let Some(slice) = self.data.as_slice_mut() {
            slice.shuffle(&mut rand::rng());
        }
    }

    /// Reshapes the array without changing its data.
    /// The new shape must have the same total number of elements.
    pub fn reshape(&mut self, shape: &[usize]) -> Result<(), Error> {
        let old_size = self.data.len();
        let new_size = shape.iter().product::<usize>();
        if old_size != new_size {
            return Err(Error::ShapeMismatch {
                expected: shape.to_vec(),
                actual: self.data.shape().to_vec(),
            });
        }
        let new_data = ArrayD::from_shape_vec(IxDyn(shape), self.to_vec()).map_err(|_| {
            Error::ShapeMismatch {
                expected: shape.to_vec(),
                actual: self.data.shape().to_vec(),
            }
        })?;
        *self = Self::new(new_data);
        Ok(())
    }

    /// Returns a reshaped copy, leaving `self` untouched.
    pub fn reshaped(&self, shape: &[usize]) -> Result<Self, Error> {
        let mut copy = self.clone();
        copy.reshape(shape)?;
        Ok(copy)
    }

    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(f32) -> f32,
    {
        Self::new(self.data.mapv(f))
    }

    pub fn exp(&self) -> Self {
        self.map(f32::exp)
    }

    /// Natural logarithm.
    pub fn ln(&self) -> Self {
        self.map(f32::ln)
    }

    pub fn tanh(&self) -> Self {
        self.map(f32::tanh)
    }

    pub fn sigmoid(&self) -> Self {
        self.map(|x| 1.0 / (1.0 + (-x).exp()))
    }

    pub fn leaky_relu(&self, slope: f32) -> Self {
        self.map(|x| if x >= 0.0 { x } else { slope * x })
    }

    /// Materializes a broadcast of `self` into `shape` by replicating rows
    /// and/or columns. Only arrays of rank <= 2 are supported.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<NdArray, Error> {
        if self.shape() == shape {
            return Ok(self.clone());
        }
        let rank = self.ndim().max(shape.len());
        if rank > 2 {
            return Err(Error::UnsupportedRank {
                op: "broadcast".to_string(),
                rank,
            });
        }
        match self.data.broadcast(IxDyn(shape)) {
            Some(broadcasted_view) => Ok(NdArray::new(broadcasted_view.to_owned())),
            None => Err(Error::IncompatibleShapes {
                op: "broadcast".to_string(),
                shape_a: self.shape().to_vec(),
                shape_b: shape.to_vec(),
            }),
        }
    }

    /// Applies `op` elementwise between two arrays.
    ///
    /// Equal shapes are zipped directly, a single-element operand is applied
    /// against every element of the other, and broadcast-compatible shapes of
    /// rank <= 2 are materialized to the common shape first.
    pub fn apply_operation<F>(op_name: &str, a: &NdArray, b: &NdArray, op: F) -> Result<NdArray, Error>
    where
        F: Fn(f32, f32) -> f32,
    {
        if a.shape() == b.shape() {
            return Ok(Self::zip_with(&a.data, &b.data, op));
        }

        let a_is_scalar = a.size() == 1;
        let b_is_scalar = b.size() == 1;
        if a_is_scalar || b_is_scalar {
            // With two single-element operands keep the higher-rank shape.
            let scalar_is_a = if a_is_scalar && b_is_scalar {
                b.ndim() >= a.ndim()
            } else {
                a_is_scalar
            };
            return Ok(if scalar_is_a {
                let s = a.as_slice()[0];
                b.map(|x| op(s, x))
            } else {
                let s = b.as_slice()[0];
                a.map(|x| op(x, s))
            });
        }

        if util::is_broadcastable(a.shape(), b.shape()) {
            let rank = a.ndim().max(b.ndim());
            if rank > 2 {
                return Err(Error::UnsupportedRank {
                    op: op_name.to_string(),
                    rank,
                });
            }
            let target = util::broadcast_shapes(a.shape(), b.shape())?;
            let a_ext = a.broadcast_to(&target)?;
            let b_ext = b.broadcast_to(&target)?;
            return Ok(Self::zip_with(&a_ext.data, &b_ext.data, op));
        }

        Err(Error::IncompatibleShapes {
            op: op_name.to_string(),
            shape_a: a.shape().to_vec(),
            shape_b: b.shape().to_vec(),
        })
    }

    fn zip_with<F>(a: &ArrayD<f32>, b: &ArrayD<f32>, op: F) -> NdArray
    where
        F: Fn(f32, f32) -> f32,
    {
        NdArray::new(Zip::from(a).and(b).map_collect(|&x, &y| op(x, y)))
    }

    pub fn add(&self, other: &NdArray) -> Result<NdArray, Error> {
        Self::apply_operation("add", self, other, |a, b| a + b)
    }

    pub fn sub(&self, other: &NdArray) -> Result<NdArray, Error> {
        Self::apply_operation("sub", self, other, |a, b| a - b)
    }

    pub fn mul(&self, other: &NdArray) -> Result<NdArray, Error> {
        Self::apply_operation("mul", self, other, |a, b| a * b)
    }

    pub fn div(&self, other: &NdArray) -> Result<NdArray, Error> {
        Self::apply_operation("div", self, other, |a, b| a / b)
    }

    /// Sums every element (`axis = None`) or along one axis of a rank <= 2
    /// array. `keep_dims` retains reduced axes with size 1.
    pub fn sum(&self, axis: Option<usize>, keep_dims: bool) -> Result<NdArray, Error> {
        match axis {
            None => {
                let total = self.data.sum();
                if keep_dims {
                    Ok(Self::full(&vec![1; self.ndim().max(1)], total))
                } else {
                    Ok(Self::scalar(total))
                }
            }
            Some(axis) => {
                if axis >= self.ndim() {
                    return Err(Error::InvalidAxis {
                        axis,
                        ndim: self.ndim(),
                    });
                }
                match self.ndim() {
                    1 => Ok(Self::scalar(self.data.sum())),
                    2 => {
                        let reduced = self.data.sum_axis(Axis(axis));
                        if keep_dims {
                            Ok(Self::new(reduced.insert_axis(Axis(axis))))
                        } else {
                            Ok(Self::new(reduced))
                        }
                    }
                    rank => Err(Error::UnsupportedRank {
                        op: "sum along an axis".to_string(),
                        rank,
                    }),
                }
            }
        }
    }

    pub fn transpose(&self) -> Result<NdArray, Error> {
        match self.ndim() {
            1 => Ok(self.clone()),
            2 => Ok(Self::new(self.data.t().to_owned())),
            rank => Err(Error::UnsupportedRank {
                op: "transpose".to_string(),
                rank,
            }),
        }
    }

    /// Matrix product. Rank-1 operands are promoted to a row (left) or column
    /// (right) vector, and the added dimension is dropped from the result.
    pub fn matmul(&self, other: &NdArray) -> Result<NdArray, Error> {
        for operand in [self, other] {
            if !(1..=2).contains(&operand.ndim()) {
                return Err(Error::UnsupportedRank {
                    op: "matmul".to_string(),
                    rank: operand.ndim(),
                });
            }
        }
        let left_promoted = self.ndim() == 1;
        let right_promoted = other.ndim() == 1;
        let left = if left_promoted {
            self.reshaped(&[1, self.size()])?
        } else {
            self.clone()
        };
        let right = if right_promoted {
            other.reshaped(&[other.size(), 1])?
        } else {
            other.clone()
        };
        if left.shape()[1] != right.shape()[0] {
            return Err(Error::IncompatibleShapes {
                op: "matmul".to_string(),
                shape_a: self.shape().to_vec(),
                shape_b: other.shape().to_vec(),
            });
        }

        let (m, n) = (left.shape()[0], right.shape()[1]);
        let left_2d = left.data.into_dimensionality::<Ix2>().map_err(|e| {
            Error::InvalidOperation(format!("matmul left operand is not 2-D: {}", e))
        })?;
        let right_2d = right.data.into_dimensionality::<Ix2>().map_err(|e| {
            Error::InvalidOperation(format!("matmul right operand is not 2-D: {}", e))
        })?;
        let product = left_2d.dot(&right_2d).into_dyn();

        let mut out_shape = vec![m, n];
        if right_promoted {
            out_shape.remove(1);
        }
        if left_promoted {
            out_shape.remove(0);
        }
        if out_shape.is_empty() {
            out_shape.push(1);
        }
        Self::new(product).reshaped(&out_shape)
    }

    /// Rows `[start, end)` along axis 0 of a rank <= 2 array. `end` is clamped
    /// to the leading dimension.
    pub fn slice(&self, start: usize, end: usize) -> Result<NdArray, Error> {
        if self.ndim() == 0 || self.ndim() > 2 {
            return Err(Error::UnsupportedRank {
                op: "slice".to_string(),
                rank: self.ndim(),
            });
        }
        let len = self.shape()[0];
        if start > len || end <= start {
            return Err(Error::InvalidSlice { start, end, len });
        }
        let end = end.min(len);
        let view = self.data.slice_axis(Axis(0), Slice::from(start..end));
        Ok(Self::new(view.to_owned()))
    }

    /// Index of the largest value in each row. A rank-1 array is one row.
    pub fn argmax_rows(&self) -> Result<Vec<usize>, Error> {
        let rows = match self.ndim() {
            1 => self.reshaped(&[1, self.size()])?,
            2 => self.clone(),
            rank => {
                return Err(Error::UnsupportedRank {
                    op: "argmax_rows".to_string(),
                    rank,
                })
            }
        };
        Ok(rows
            .data
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |(best_i, best_v), (i, &v)| {
                        if v > best_v {
                            (i, v)
                        } else {
                            (best_i, best_v)
                        }
                    })
                    .0
            })
            .collect())
    }

    /// Renders a rank-2 array one row per line.
    pub fn format_matrix(&self) -> Result<String, Error> {
        if self.ndim() != 2 {
            return Err(Error::UnsupportedRank {
                op: "format_matrix".to_string(),
                rank: self.ndim(),
            });
        }
        let lines: Vec<String> = self
            .data
            .axis_iter(Axis(0))
            .map(|row| {
                row.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        Ok(lines.join("\n"))
    }
}

impl fmt::Display for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape: Vec<String> = self.shape().iter().map(|d| d.to_string()).collect();
        let data: Vec<String> = self.data.iter().map(|v| v.to_string()).collect();
        write!(
            f,
            "NdArray of shape ({}), data=[{}]",
            shape.join(", "),
            data.join(", ")
        )
    }
}

impl Neg for &NdArray {
    type Output = NdArray;

    fn neg(self) -> NdArray {
        self.map(|x| x * -1.0)
    }
}

macro_rules! impl_array_binary_op {
    ($trait:ident, $method:ident, $op:tt) => {
        impl<'b> $trait<&'b NdArray> for &NdArray {
            type Output = Result<NdArray, Error>;

            fn $method(self, rhs: &'b NdArray) -> Self::Output {
                NdArray::$method(self, rhs)
            }
        }

        impl $trait<f32> for &NdArray {
            type Output = NdArray;

            fn $method(self, rhs: f32) -> NdArray {
                self.map(|x| x $op rhs)
            }
        }

        impl $trait<&NdArray> for f32 {
            type Output = NdArray;

            fn $method(self, rhs: &NdArray) -> NdArray {
                rhs.map(|x| self $op x)
            }
        }
    };
}

impl_array_binary_op!(Add, add, +);
impl_array_binary_op!(Sub, sub, -);
impl_array_binary_op!(Mul, mul, *);
impl_array_binary_op!(Div, div, /);
