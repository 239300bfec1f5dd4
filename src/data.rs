use crate::{ops, Error, NdArray, Tensor};

/// Splits a pair of rank-2 tensors into `(x, y)` mini-batches along axis 0.
///
/// Batches hold `batch_size` rows, except possibly the last one. With
/// `shuffle` enabled the order of the batches changes on every pass; the
/// rows inside a batch stay contiguous.
#[derive(Debug, Clone)]
pub struct DataLoader {
    x: Tensor,
    y: Tensor,
    batch_size: usize,
    shuffle: bool,
    /// First row of every batch, in iteration order.
    start_indexes: NdArray,
}

impl DataLoader {
    /// # Errors
    /// * `UnsupportedRank` if either tensor is not rank 2
    /// * `ShapeMismatch` if the tensors differ in number of rows
    /// * `InvalidOperation` if `batch_size` is zero
    pub fn new(x: Tensor, y: Tensor, batch_size: usize, shuffle: bool) -> Result<Self, Error> {
        for tensor in [&x, &y] {
            if tensor.ndim() != 2 {
                return Err(Error::UnsupportedRank {
                    op: "DataLoader".to_string(),
                    rank: tensor.ndim(),
                });
            }
        }
        let (x_shape, y_shape) = (x.shape(), y.shape());
        if x_shape[0] != y_shape[0] {
            return Err(Error::ShapeMismatch {
                expected: vec![x_shape[0]],
                actual: vec![y_shape[0]],
            });
        }
        if batch_size == 0 {
            return Err(Error::InvalidOperation(
                "Batch size cannot be zero".to_string(),
            ));
        }

        let start_indexes = NdArray::arange(0, x_shape[0], batch_size)?;
        Ok(Self {
            x,
            y,
            batch_size,
            shuffle,
            start_indexes,
        })
    }

    pub fn num_batches(&self) -> usize {
        self.start_indexes.size()
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn x(&self) -> &Tensor {
        &self.x
    }

    pub fn y(&self) -> &Tensor {
        &self.y
    }

    /// Iterates over the batches once, reshuffling their order first when
    /// shuffling is enabled.
    pub fn iter(&mut self) -> Batches<'_> {
        if self.shuffle {
            self.start_indexes.shuffle();
        }
        Batches {
            loader: self,
            position: 0,
        }
    }
}

pub struct Batches<'a> {
    loader: &'a DataLoader,
    position: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<(Tensor, Tensor), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = *self.loader.start_indexes.as_slice().get(self.position)? as usize;
        self.position += 1;
        let end = start + self.loader.batch_size;
        crate::debug_println!("batch rows {}..{}", start, end);
        Some(
            ops::slice(&self.loader.x, start, end)
                .and_then(|x| Ok((x, ops::slice(&self.loader.y, start, end)?))),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.loader.start_indexes.size() - self.position;
        (remaining, Some(remaining))
    }
}
