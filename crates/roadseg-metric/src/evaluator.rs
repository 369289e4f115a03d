//! Accumulation of metrics over many batches.
//!
//! Averaging per-batch F1 scores is biased towards small batches, so the
//! evaluator keeps raw counts and only divides when a report is requested.

use burn::{
    prelude::*,
    tensor::{Bool, ElementConversion},
};
use roadseg_util::{patch_labels, RoadSegResult};
use serde::{Deserialize, Serialize};

use crate::{
    confusion::PatchConfusion,
    functional::{check_shapes, patch_confusion, pixel_confusion, PatchMetricConfig},
};

/// Summary of an evaluation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatchMetricsReport {
    /// Number of maps evaluated.
    pub num_images: usize,
    pub pixel_accuracy: f64,
    /// F1 over pixels binarized at the metric threshold.
    pub pixel_f1: f64,
    pub patch_accuracy: f64,
    pub patch_f1: f64,
    /// Confusion counts behind the patch F1.
    pub confusion: PatchConfusion,
}

/// Running pixel and patch counts.
#[derive(Debug, Clone)]
pub struct PatchEvaluator {
    config: PatchMetricConfig,
    num_images: usize,
    pixels_correct: u64,
    pixels_total: u64,
    patches_correct: u64,
    patches_total: u64,
    confusion: PatchConfusion,
    pixel_confusion: PatchConfusion,
}

impl PatchEvaluator {
    /// Creates an empty evaluator.
    pub fn new(config: PatchMetricConfig) -> Self {
        Self {
            config,
            num_images: 0,
            pixels_correct: 0,
            pixels_total: 0,
            patches_correct: 0,
            patches_total: 0,
            confusion: PatchConfusion::default(),
            pixel_confusion: PatchConfusion::default(),
        }
    }

    /// Adds a batch of `[batch_size, channels, height, width]` maps.
    pub fn update<B: Backend>(
        &mut self,
        predictions: Tensor<B, 4>,
        targets: Tensor<B, 4>,
    ) -> RoadSegResult<()> {
        check_shapes(&predictions, &targets)?;
        let [batch_size, ..] = predictions.dims();

        let confusion = patch_confusion(predictions.clone(), targets.clone(), &self.config)?;
        let pixels = pixel_confusion(
            predictions.clone(),
            targets.clone(),
            self.config.binarize_threshold(),
        )?;
        let predicted = patch_labels(predictions.clone(), &self.config.patch)?;
        let actual = patch_labels(targets.clone(), &self.config.patch)?;

        self.patches_total += predicted.shape().num_elements() as u64;
        self.patches_correct += count_true(predicted.equal(actual));
        self.pixels_total += predictions.shape().num_elements() as u64;
        self.pixels_correct += count_true(predictions.round().equal(targets.round()));
        self.confusion += confusion;
        self.pixel_confusion += pixels;
        self.num_images += batch_size;

        Ok(())
    }

    /// Metrics over everything seen so far.
    pub fn report(&self) -> PatchMetricsReport {
        PatchMetricsReport {
            num_images: self.num_images,
            pixel_accuracy: ratio(self.pixels_correct, self.pixels_total),
            pixel_f1: self.pixel_confusion.f1(),
            patch_accuracy: ratio(self.patches_correct, self.patches_total),
            patch_f1: self.confusion.f1(),
            confusion: self.confusion,
        }
    }

    /// Forgets all accumulated counts.
    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

/// All metrics of a single batch.
pub fn evaluate_batch<B: Backend>(
    predictions: Tensor<B, 4>,
    targets: Tensor<B, 4>,
    config: &PatchMetricConfig,
) -> RoadSegResult<PatchMetricsReport> {
    let mut evaluator = PatchEvaluator::new(config.clone());
    evaluator.update(predictions, targets)?;
    Ok(evaluator.report())
}

fn count_true<B: Backend, const D: usize>(mask: Tensor<B, D, Bool>) -> u64 {
    mask.int().sum().into_scalar().elem::<i64>() as u64
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use roadseg_util::PatchConfig;

    use super::*;
    use crate::{functional::patch_f1, tests::TestBackend};

    fn config() -> PatchMetricConfig {
        PatchMetricConfig::new().with_patch(PatchConfig::new().with_patch_size(2))
    }

    #[test]
    fn empty_evaluator_reports_zeros() {
        let report = PatchEvaluator::new(config()).report();
        assert_eq!(report.num_images, 0);
        assert_eq!(report.patch_f1, 0.0);
        assert_eq!(report.pixel_accuracy, 0.0);
        assert_eq!(report.pixel_f1, 0.0);
    }

    #[test]
    fn batches_pool_counts_before_dividing() {
        let device = Default::default();
        let road = Tensor::<TestBackend, 4>::ones([1, 1, 4, 4], &device);
        let background = Tensor::<TestBackend, 4>::zeros([1, 1, 4, 4], &device);

        let mut evaluator = PatchEvaluator::new(config());
        // Four true positive patches.
        evaluator.update(road.clone(), road.clone()).unwrap();
        // Four false negative patches.
        evaluator.update(background.clone(), road.clone()).unwrap();

        let report = evaluator.report();
        assert_eq!(report.num_images, 2);
        assert_eq!(report.confusion.true_positives, 4);
        assert_eq!(report.confusion.false_negatives, 4);
        assert!((report.patch_f1 - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.patch_accuracy - 0.5).abs() < 1e-12);
        assert!((report.pixel_accuracy - 0.5).abs() < 1e-12);
        // 16 of 32 road pixels found, no false alarms.
        assert!((report.pixel_f1 - 2.0 / 3.0).abs() < 1e-12);

        // The pooled score differs from the mean of per-batch scores.
        let first = patch_f1(road.clone(), road.clone(), &config()).unwrap();
        let second = patch_f1(background, road, &config()).unwrap();
        assert!(((first + second) / 2.0 - report.patch_f1).abs() > 0.1);
    }

    #[test]
    fn batch_report_matches_functional_metrics() {
        let device = Default::default();
        let predictions = Tensor::<TestBackend, 4>::from_data(
            burn::tensor::TensorData::from([[
                [[1.0, 1.0], [0.0, 0.0]],
                [[0.0, 0.0], [0.0, 0.0]],
            ]]),
            &device,
        )
        .reshape([1, 1, 4, 2]);
        let targets = Tensor::<TestBackend, 4>::ones([1, 1, 4, 2], &device);

        let report = evaluate_batch(predictions.clone(), targets.clone(), &config()).unwrap();
        assert_eq!(report.num_images, 1);
        assert_eq!(
            report.patch_f1,
            patch_f1(predictions.clone(), targets.clone(), &config()).unwrap()
        );
        assert_eq!(
            report.pixel_accuracy,
            crate::functional::pixel_accuracy(predictions.clone(), targets.clone()).unwrap()
        );
        assert_eq!(
            report.pixel_f1,
            crate::functional::pixel_f1(predictions, targets, 0.25).unwrap()
        );
    }

    #[test]
    fn reset_clears_counts() {
        let ones = Tensor::<TestBackend, 4>::ones([1, 1, 2, 2], &Default::default());
        let mut evaluator = PatchEvaluator::new(config());
        evaluator.update(ones.clone(), ones).unwrap();
        evaluator.reset();

        assert_eq!(evaluator.report().num_images, 0);
        assert_eq!(evaluator.report().confusion, PatchConfusion::default());
    }
}
