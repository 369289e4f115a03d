//! # Road segmentation metrics
//!
//! Pixel and patch level evaluation metrics for road segmentation, implemented
//! with the Burn framework.
//!
//! The official score tiles every map into 16×16 patches, labels a patch as
//! road when its mean exceeds 0.25 and computes F1 over all patch labels.
//!
//! ## Metrics
//!
//! - [`pixel_accuracy`]: agreement of rounded pixels
//! - [`pixel_f1`]: F1 over binarized pixels
//! - [`patch_accuracy`]: agreement of patch labels
//! - [`patch_f1`]: F1 over patch labels of binarized maps
//! - [`PatchEvaluator`]: pooled counts over many batches
//!
//! With the `train` feature the same quantities are available as Burn
//! training metrics: [`PatchF1Metric`], [`PatchAccuracyMetric`] and
//! [`PixelAccuracyMetric`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roadseg_metric::{patch_f1, PatchMetricConfig};
//!
//! let score = patch_f1(predictions, targets, &PatchMetricConfig::new())?;
//! ```

pub mod confusion;
pub mod evaluator;
pub mod functional;
pub mod input;

#[cfg(feature = "train")]
pub mod accuracy;
#[cfg(feature = "train")]
pub mod patch_f1;

pub use confusion::PatchConfusion;
pub use evaluator::{evaluate_batch, PatchEvaluator, PatchMetricsReport};
pub use functional::{
    patch_accuracy, patch_confusion, patch_f1, pixel_accuracy, pixel_confusion, pixel_f1,
    PatchMetricConfig,
};
pub use input::PatchMetricInput;

#[cfg(feature = "train")]
pub use accuracy::{PatchAccuracyMetric, PixelAccuracyMetric};
#[cfg(feature = "train")]
pub use patch_f1::PatchF1Metric;
