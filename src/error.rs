use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Incompatible shapes for operation {op}: {shape_a:?} and {shape_b:?}")]
    IncompatibleShapes {
        op: String,
        shape_a: Vec<usize>,
        shape_b: Vec<usize>,
    },

    #[error("Wrong number of indices: array has {expected} dimensions, got {actual} indices")]
    IndexRank { expected: usize, actual: usize },

    #[error("Index out of bounds: index {index}, size {size}")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("Operation {op} is not implemented for arrays of rank {rank}")]
    UnsupportedRank { op: String, rank: usize },

    #[error("Invalid axis {axis} for an array with {ndim} dimensions")]
    InvalidAxis { axis: usize, ndim: usize },

    #[error("Invalid slice [{start}, {end}) for a leading dimension of {len}")]
    InvalidSlice { start: usize, end: usize, len: usize },

    #[error("Operation requires tensor to require grad")]
    RequiresGradError,

    #[error("Tensor does not have a gradient")]
    NoGradientError,

    #[error("A seed gradient must be given to backward() for a non-scalar tensor of shape {shape:?}")]
    SeedGradientRequired { shape: Vec<usize> },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Gradient check error: analytical={analytical:?}, numerical={numerical:?}, max_rel_error={max_rel_error}, max_abs_error={max_abs_error}, at_index={at_index}")]
    GradientCheckError {
        analytical: Vec<f32>,
        numerical: Vec<f32>,
        max_rel_error: f32,
        max_abs_error: f32,
        at_index: usize,
    },
}
