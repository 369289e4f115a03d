//! Functional pixel and patch metrics.
//!
//! All functions take `[batch_size, channels, height, width]` prediction and
//! target maps with values in `[0, 1]`.

use burn::{prelude::*, tensor::ElementConversion};
use roadseg_util::{patch_labels, PatchConfig, RoadSegError, RoadSegResult};

use crate::confusion::PatchConfusion;

/// Configuration of the patch metrics.
#[derive(Config, Debug)]
pub struct PatchMetricConfig {
    /// Patch grid used for aggregation.
    #[config(default = "PatchConfig::new()")]
    pub patch: PatchConfig,
    /// Pixel binarization threshold applied before the patch F1 aggregation.
    /// Defaults to the patch cutoff.
    #[config(default = "None")]
    pub pixel_threshold: Option<f64>,
}

impl PatchMetricConfig {
    /// Threshold at which pixels are binarized for the patch F1.
    pub fn binarize_threshold(&self) -> f64 {
        self.pixel_threshold.unwrap_or(self.patch.cutoff)
    }
}

/// Fraction of pixels whose rounded prediction equals the rounded target.
pub fn pixel_accuracy<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
) -> RoadSegResult<f64> {
    check_shapes(&predictions, &targets)?;
    Ok(predictions
        .round()
        .equal(targets.round())
        .float()
        .mean()
        .into_scalar()
        .elem::<f64>())
}

/// Confusion counts of pixels binarized with `>= threshold`.
pub fn pixel_confusion<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    threshold: f64,
) -> RoadSegResult<PatchConfusion> {
    check_shapes(&predictions, &targets)?;
    Ok(PatchConfusion::from_labels(
        predictions.greater_equal_elem(threshold),
        targets.greater_equal_elem(threshold),
    ))
}

/// Pixel-level F1 of maps binarized with `>= threshold`.
///
/// Without any positive pixel the score is 0.
pub fn pixel_f1<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    threshold: f64,
) -> RoadSegResult<f64> {
    Ok(pixel_confusion(predictions, targets, threshold)?.f1())
}

/// Fraction of patches whose predicted label equals the target label.
pub fn patch_accuracy<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    config: &PatchConfig,
) -> RoadSegResult<f64> {
    check_shapes(&predictions, &targets)?;
    let predicted = patch_labels(predictions, config)?;
    let actual = patch_labels(targets, config)?;

    Ok(predicted
        .equal(actual)
        .float()
        .mean()
        .into_scalar()
        .elem::<f64>())
}

/// Confusion counts of the patch labels of binarized maps.
pub fn patch_confusion<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    config: &PatchMetricConfig,
) -> RoadSegResult<PatchConfusion> {
    check_shapes(&predictions, &targets)?;
    let threshold = config.binarize_threshold();

    let predicted = patch_labels(
        predictions.greater_equal_elem(threshold).float(),
        &config.patch,
    )?;
    let actual = patch_labels(targets.greater_equal_elem(threshold).float(), &config.patch)?;

    Ok(PatchConfusion::from_labels(predicted, actual))
}

/// Patch-level F1 score, the competition metric.
///
/// Pixels are binarized at [`PatchMetricConfig::binarize_threshold`], both maps
/// are aggregated to patch labels and F1 is computed over the flattened grids.
/// Without any positive patch the score is 0.
pub fn patch_f1<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    config: &PatchMetricConfig,
) -> RoadSegResult<f64> {
    Ok(patch_confusion(predictions, targets, config)?.f1())
}

pub(crate) fn check_shapes<B: Backend, const D: usize>(
    predictions: &Tensor<B, D>,
    targets: &Tensor<B, D>,
) -> RoadSegResult<()> {
    let predictions = predictions.dims();
    let targets = targets.dims();
    if predictions != targets {
        return Err(RoadSegError::ShapeMismatch {
            predictions: predictions.to_vec(),
            targets: targets.to_vec(),
        });
    }
    Ok(())
}
