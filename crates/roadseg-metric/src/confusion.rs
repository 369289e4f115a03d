//! Confusion counts over boolean patch grids.

use core::ops::AddAssign;

use burn::{
    prelude::*,
    tensor::{Bool, ElementConversion},
};
use serde::{Deserialize, Serialize};

/// True/false positive/negative counts of a binary labelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchConfusion {
    pub true_positives: u64,
    pub false_positives: u64,
    pub false_negatives: u64,
    pub true_negatives: u64,
}

impl PatchConfusion {
    /// Counts agreement between predicted and target labels of equal shape.
    pub fn from_labels<B: Backend, const D: usize>(
        predictions: Tensor<B, D, Bool>,
        targets: Tensor<B, D, Bool>,
    ) -> Self {
        let total = predictions.shape().num_elements() as u64;

        let true_positives = count(predictions.clone().bool_and(targets.clone()));
        let predicted = count(predictions);
        let actual = count(targets);

        let false_positives = predicted - true_positives;
        let false_negatives = actual - true_positives;

        Self {
            true_positives,
            false_positives,
            false_negatives,
            true_negatives: total - true_positives - false_positives - false_negatives,
        }
    }

    /// Number of labelled items.
    pub const fn total(&self) -> u64 {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    /// `tp / (tp + fp)`, 0 without predicted positives.
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// `tp / (tp + fn)`, 0 without actual positives.
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// Harmonic mean of precision and recall, 0 when both vanish.
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        }
    }

    /// Fraction of items labelled correctly, 0 for an empty labelling.
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }
}

impl AddAssign for PatchConfusion {
    fn add_assign(&mut self, other: Self) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.true_negatives += other.true_negatives;
    }
}

fn count<B: Backend, const D: usize>(labels: Tensor<B, D, Bool>) -> u64 {
    labels.int().sum().into_scalar().elem::<i64>() as u64
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
