//! Scoring of predicted masks against ground truth on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use roadseg_metric::{PatchEvaluator, PatchMetricConfig, PatchMetricsReport};
use roadseg_util::{image::list_masks, image::load_mask, lift_map, RoadSegError};

/// Evaluation inputs.
#[derive(Debug, Clone)]
pub struct EvaluationConfig {
    /// Directory of predicted probability masks.
    pub predictions_dir: PathBuf,
    /// Directory of ground-truth masks with the same file names.
    pub groundtruth_dir: PathBuf,
}

impl EvaluationConfig {
    pub fn new(predictions_dir: impl Into<PathBuf>, groundtruth_dir: impl Into<PathBuf>) -> Self {
        Self {
            predictions_dir: predictions_dir.into(),
            groundtruth_dir: groundtruth_dir.into(),
        }
    }
}

/// Scores every predicted mask against the ground-truth mask of the same name.
///
/// Counts are pooled over all images before the scores are computed.
///
/// # Errors
///
/// Returns an error if a directory has no PNG masks, a prediction has no
/// ground truth, a mask cannot be decoded or a pair differs in size.
pub fn run_evaluation<B: Backend>(
    config: &EvaluationConfig,
    metric: &PatchMetricConfig,
    device: &B::Device,
) -> Result<PatchMetricsReport> {
    tracing::info!(
        predictions = %config.predictions_dir.display(),
        groundtruth = %config.groundtruth_dir.display(),
        "running evaluation",
    );

    let mut evaluator = PatchEvaluator::new(metric.clone());
    for prediction_path in list_masks(&config.predictions_dir)? {
        let target_path = counterpart(&prediction_path, &config.groundtruth_dir)?;

        let prediction = load_mask::<B, _>(&prediction_path, device)?;
        let target = load_mask::<B, _>(&target_path, device)?;
        evaluator
            .update(lift_map(prediction), lift_map(target))
            .with_context(|| format!("failed to score '{}'", prediction_path.display()))?;

        tracing::debug!(path = %prediction_path.display(), "image scored");
    }

    let report = evaluator.report();
    tracing::info!(
        images = report.num_images,
        pixel_accuracy = report.pixel_accuracy,
        pixel_f1 = report.pixel_f1,
        patch_accuracy = report.patch_accuracy,
        patch_f1 = report.patch_f1,
        "evaluation completed",
    );
    Ok(report)
}

/// Ground-truth file with the same name as `prediction`.
fn counterpart(prediction: &Path, groundtruth_dir: &Path) -> Result<PathBuf, RoadSegError> {
    let missing = || RoadSegError::MissingCounterpart {
        path: prediction.to_path_buf(),
    };
    let target = groundtruth_dir.join(prediction.file_name().ok_or_else(missing)?);
    if target.is_file() {
        Ok(target)
    } else {
        Err(missing())
    }
}
