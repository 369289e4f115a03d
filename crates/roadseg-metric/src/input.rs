//! Input structures for the training-loop metrics.

use burn::{prelude::*, tensor::backend::Backend};
use derive_new::new;

/// Input of the patch and pixel metrics.
#[derive(new, Debug, Clone)]
pub struct PatchMetricInput<B: Backend> {
    /// Road probabilities with shape `[batch_size, channels, height, width]`.
    pub predictions: Tensor<B, 4>,
    /// Ground truth with shape `[batch_size, channels, height, width]`.
    pub targets: Tensor<B, 4>,
}
