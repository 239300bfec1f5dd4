//! Neural-network building blocks on top of [`Tensor`].

use crate::array::NdArray;
use crate::error::Error;
use crate::ops;
use crate::tensor::Tensor;
use std::fmt;
use std::ops::Deref;

/// A trainable tensor: always tracks gradient.
#[derive(Clone, Debug)]
pub struct Parameter(Tensor);

impl Parameter {
    /// Values drawn uniformly from `[0, 1)`.
    pub fn new(shape: &[usize]) -> Self {
        Self(Tensor::random(shape, true))
    }

    pub fn from_array(value: NdArray) -> Self {
        Self(Tensor::new(value, true))
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }
}

impl Deref for Parameter {
    type Target = Tensor;

    fn deref(&self) -> &Tensor {
        &self.0
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Parameter({})", self.0.value())
    }
}

/// Anything owning parameters. Implementors list their own parameters
/// followed by those of their sub-modules, in declaration order.
pub trait Module {
    fn parameters(&self) -> Vec<Parameter>;

    /// Resets the gradient of every parameter to zeros.
    fn zero_grad(&self) {
        for param in self.parameters() {
            param.zero_grad();
        }
    }
}

/// A stage of a network mapping one tensor to another.
pub trait Block: Module {
    fn forward(&self, input: &Tensor) -> Result<Tensor, Error>;

    /// Short human-readable description used when printing a [`Sequential`].
    fn describe(&self) -> String;
}

/// Fully connected layer: `input @ weights + biases`.
///
/// `weights` has shape `[input_size, output_size]` and `biases` shape
/// `[output_size]`, broadcast over the rows of the input.
#[derive(Debug, Clone)]
pub struct Linear {
    weights: Parameter,
    biases: Parameter,
}

impl Linear {
    pub fn new(input_size: usize, output_size: usize) -> Self {
        Self {
            weights: Parameter::new(&[input_size, output_size]),
            biases: Parameter::new(&[output_size]),
        }
    }

    /// Builds a layer from explicit values.
    ///
    /// # Errors
    /// * `UnsupportedRank` if `weights` is not rank 2
    /// * `ShapeMismatch` unless `biases` has shape `[weights.shape()[1]]`
    pub fn from_arrays(weights: NdArray, biases: NdArray) -> Result<Self, Error> {
        if weights.ndim() != 2 {
            return Err(Error::UnsupportedRank {
                op: "Linear weights".to_string(),
                rank: weights.ndim(),
            });
        }
        let output_size = weights.shape()[1];
        if biases.shape() != [output_size] {
            return Err(Error::ShapeMismatch {
                expected: vec![output_size],
                actual: biases.shape().to_vec(),
            });
        }
        Ok(Self {
            weights: Parameter::from_array(weights),
            biases: Parameter::from_array(biases),
        })
    }

    pub fn input_size(&self) -> usize {
        self.weights.shape()[0]
    }

    pub fn output_size(&self) -> usize {
        self.weights.shape()[1]
    }

    pub fn weights(&self) -> &Parameter {
        &self.weights
    }

    pub fn biases(&self) -> &Parameter {
        &self.biases
    }
}

impl Module for Linear {
    fn parameters(&self) -> Vec<Parameter> {
        vec![self.weights.clone(), self.biases.clone()]
    }
}

impl Block for Linear {
    fn forward(&self, input: &Tensor) -> Result<Tensor, Error> {
        let projected = ops::matmul(input, &self.weights)?;
        ops::add(&projected, &self.biases)
    }

    fn describe(&self) -> String {
        format!(
            "Linear (input size={}, output size={})",
            self.input_size(),
            self.output_size()
        )
    }
}

macro_rules! impl_activation {
    ($name:ident, $op:path, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Module for $name {
            fn parameters(&self) -> Vec<Parameter> {
                Vec::new()
            }
        }

        impl Block for $name {
            fn forward(&self, input: &Tensor) -> Result<Tensor, Error> {
                Ok($op(input))
            }

            fn describe(&self) -> String {
                stringify!($name).to_string()
            }
        }
    };
}

impl_activation!(Tanh, ops::tanh, "Element-wise hyperbolic tangent.");
impl_activation!(Sigmoid, ops::sigmoid, "Element-wise logistic function.");

/// Element-wise leaky ReLU with a configurable negative slope.
#[derive(Debug, Clone, Copy)]
pub struct LeakyRelu {
    pub slope: f32,
}

impl LeakyRelu {
    pub const DEFAULT_SLOPE: f32 = 0.01;

    pub fn new(slope: f32) -> Self {
        Self { slope }
    }
}

impl Default for LeakyRelu {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SLOPE)
    }
}

impl Module for LeakyRelu {
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }
}

impl Block for LeakyRelu {
    fn forward(&self, input: &Tensor) -> Result<Tensor, Error> {
        Ok(ops::leaky_relu(input, self.slope))
    }

    fn describe(&self) -> String {
        format!("LeakyRelu (slope={})", self.slope)
    }
}

/// Blocks applied one after another.
pub struct Sequential {
    blocks: Vec<Box<dyn Block>>,
}

impl Sequential {
    /// # Errors
    /// `InvalidOperation` when `blocks` is empty.
    pub fn new(blocks: Vec<Box<dyn Block>>) -> Result<Self, Error> {
        if blocks.is_empty() {
            return Err(Error::InvalidOperation(
                "Sequential needs at least one block".to_string(),
            ));
        }
        Ok(Self { blocks })
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Companion to [`Sequential::len`]. Always `false`, as `new` rejects an
    /// empty list.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Runs the network and returns the row-wise argmax of its output.
    pub fn predict_classes(&self, input: &Tensor) -> Result<Vec<usize>, Error> {
        let output = self.forward(input)?;
        output.value().argmax_rows()
    }
}

impl Module for Sequential {
    fn parameters(&self) -> Vec<Parameter> {
        self.blocks
            .iter()
            .flat_map(|block| block.parameters())
            .collect()
    }
}

impl Block for Sequential {
    fn forward(&self, input: &Tensor) -> Result<Tensor, Error> {
        let mut output = input.clone();
        for block in &self.blocks {
            output = block.forward(&output)?;
        }
        Ok(output)
    }

    fn describe(&self) -> String {
        format!("Sequential ({} blocks)", self.blocks.len())
    }
}

impl fmt::Display for Sequential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.blocks.iter().enumerate() {
            writeln!(f, "{} : {}", i, block.describe())?;
        }
        Ok(())
    }
}
