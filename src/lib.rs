//! A small reverse-mode automatic differentiation library over dense
//! n-dimensional arrays.
//!
//! - [`NdArray`]: row-major `f32` arrays with NumPy-style broadcasting
//! - [`Tensor`]: graph nodes recording how each value was computed
//! - [`nn`], [`loss`], [`optim`], [`data`]: thin layers built on top
//!
//! # Features
//! - `debug_logs` - Prints graph construction and backward traversal
//! - `cpu_openblas` - Uses OpenBLAS for matrix products
//!
//! # Example
//! ```rust
//! use ndgrad::Tensor;
//!
//! fn main() -> Result<(), ndgrad::Error> {
//!     let a = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3], true)?;
//!     let b = Tensor::from_vec(vec![10.0, 20.0, 30.0], &[3], true)?;
//!
//!     // `b` is broadcast over the rows of `a`
//!     let c = (&a + &b)?;
//!     let loss = c.sum(None, false)?;
//!     loss.backward(None)?;
//!
//!     assert_eq!(b.grad().unwrap().to_vec(), vec![2.0, 2.0, 2.0]);
//!     Ok(())
//! }
//! ```

// --- Central debug_println macro definition ---
/// Conditional logging macro. Prints if 'debug_logs' feature is enabled.
#[cfg(feature = "debug_logs")]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {
        ::std::println!("[DEBUG {}] {}", module_path!(), ::std::format_args!($($arg)*))
    };
}

/// Conditional logging macro (disabled version). Does nothing.
#[cfg(not(feature = "debug_logs"))]
#[macro_export]
macro_rules! debug_println {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "cpu_openblas")]
extern crate openblas_src;

pub mod array;
pub mod data;
pub mod error;
pub mod graph;
pub mod loss;
pub mod nn;
pub mod ops;
pub mod optim;
pub mod tensor;
mod tensor_debug_impl;
pub mod util;

pub mod test_utils;

pub use array::NdArray;
pub use data::DataLoader;
pub use error::Error;
pub use graph::{Dependency, GradFn};
pub use loss::{BinaryCrossEntropy, Loss, Mse};
pub use nn::{Block, LeakyRelu, Linear, Module, Parameter, Sequential, Sigmoid, Tanh};
pub use optim::{Optimizer, Sgd};
pub use tensor::Tensor;
