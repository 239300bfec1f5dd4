use crate::tensor::TensorData;
use std::fmt;

impl fmt::Debug for TensorData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorData")
            .field("id", &self.id)
            .field("shape", &self.value.shape())
            .field("grad", &self.grad.as_ref().map(|g| g.shape().to_vec()))
            .field("requires_grad", &self.requires_grad)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}
