//! Configuration shared by evaluation, submission and training.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use burn::config::Config;
use roadseg_loss::MixedPatchF1LossConfig;
use roadseg_metric::PatchMetricConfig;

/// Top-level configuration, stored as JSON.
#[derive(Config, Debug)]
pub struct RoadSegConfig {
    /// Patch grid and thresholds of the metrics and the submission.
    #[config(default = "PatchMetricConfig::new()")]
    pub metric: PatchMetricConfig,

    /// Training objective.
    #[config(default = "MixedPatchF1LossConfig::new()")]
    pub loss: MixedPatchF1LossConfig,
}

impl RoadSegConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// patch configuration is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Self = serde_json::from_str(&config_str)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Saves this configuration to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let config_str = serde_json::to_string_pretty(self)?;
        fs::write(path, config_str)?;
        Ok(())
    }

    /// Checks the patch grid and the loss weight.
    pub fn validate(&self) -> Result<()> {
        self.metric.patch.validate()?;
        if !(0.0..=1.0).contains(&self.loss.weight) {
            anyhow::bail!("loss weight must lie in [0, 1], got {}", self.loss.weight);
        }
        if !self.loss_grid_matches_metric() {
            tracing::warn!(
                loss_size = self.loss.patch_f1.patch_size,
                loss_policy = ?self.loss.patch_f1.policy,
                metric_size = self.metric.patch.patch_size,
                metric_policy = ?self.metric.patch.policy,
                "loss and metric use different patch grids",
            );
        }
        Ok(())
    }

    /// Whether the loss tiles maps into the same patches the metric scores.
    pub fn loss_grid_matches_metric(&self) -> bool {
        self.loss.patch_f1.patch_size == self.metric.patch.patch_size
            && self.loss.patch_f1.policy == self.metric.patch.policy
    }
}

#[cfg(test)]
mod tests {
    use roadseg_loss::DiffPatchF1LossConfig;
    use roadseg_util::{PatchConfig, PatchSizePolicy};

    use super::*;

    fn scratch_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("roadseg-config-{name}-{}.json", std::process::id()))
    }

    #[test]
    fn defaults_match_competition_settings() {
        let config = RoadSegConfig::new();
        assert_eq!(config.metric.patch.patch_size, 16);
        assert_eq!(config.metric.patch.cutoff, 0.25);
        assert_eq!(config.loss.weight, 0.4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn saved_config_loads_back() {
        let path = scratch_file("save");
        let metric = PatchMetricConfig::new().with_patch(PatchConfig::new().with_patch_size(8));
        let config = RoadSegConfig::new().with_metric(metric);
        config.save(&path).unwrap();

        let loaded = RoadSegConfig::load(&path).unwrap();
        assert_eq!(loaded.metric.patch.patch_size, 8);
        assert_eq!(loaded.loss.weight, 0.4);

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn grid_comparison_includes_policy() {
        let mut config = RoadSegConfig::new();
        assert!(config.loss_grid_matches_metric());

        config.metric.patch.policy = PatchSizePolicy::ResolutionDependent(250);
        assert!(!config.loss_grid_matches_metric());

        config.loss.patch_f1 = DiffPatchF1LossConfig::from_patch_config(&config.metric.patch);
        assert!(config.loss_grid_matches_metric());
    }

    #[test]
    fn invalid_weight_is_rejected() {
        let path = scratch_file("weight");
        let mut config = RoadSegConfig::new();
        config.loss.weight = 2.0;
        config.save(&path).unwrap();

        assert!(RoadSegConfig::load(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }
}
