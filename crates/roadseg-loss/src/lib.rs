//! # Road segmentation losses
//!
//! Losses for training segmentation networks towards the patch-level F1
//! score, implemented with the Burn framework.
//!
//! ## Losses
//!
//! - [`DiffPatchF1Loss`]: soft relaxation of the patch F1 metric
//! - [`MixedPatchF1Loss`]: `(1 - w) * base + w * patch_f1`
//! - [`BceLoss`]: binary cross-entropy on probabilities
//!
//! The hard patch decision is relaxed by a [`SoftThreshold`]; [`Surrogate`]
//! selects one of the built-in ones from configuration.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roadseg_loss::{MixedPatchF1LossConfig, SegmentationLoss};
//!
//! let criterion = MixedPatchF1LossConfig::new().init_bce();
//! let loss = criterion.loss(probabilities, masks);
//! ```

use burn::tensor::{backend::Backend, Tensor};

pub mod bce;
pub mod mixed;
pub mod patch_f1;
pub mod surrogate;

pub use bce::{BceLoss, BceLossConfig};
pub use mixed::{MixedPatchF1Loss, MixedPatchF1LossConfig};
pub use patch_f1::{DiffPatchF1Loss, DiffPatchF1LossConfig};
pub use surrogate::{PassThrough, RampThreshold, SigmoidThreshold, SoftThreshold, Surrogate};

/// A loss over `[batch_size, channels, height, width]` probability maps
/// reduced to a single value.
pub trait SegmentationLoss<B: Backend> {
    fn loss(&self, predictions: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1>;
}
