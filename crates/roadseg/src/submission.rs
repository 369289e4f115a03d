//! Submission files from predicted masks on disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use burn::tensor::backend::Backend;
use roadseg_util::{
    image::{list_masks, load_mask},
    image_id_from_path, lift_map, patch_labels, records_from_tensor, write_submission_file,
    PatchConfig, SubmissionRecord,
};

/// Submission inputs and output.
#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    /// Directory of predicted probability masks, one per test image.
    pub predictions_dir: PathBuf,
    /// CSV file to write.
    pub output_path: PathBuf,
}

impl SubmissionConfig {
    pub fn new(predictions_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            predictions_dir: predictions_dir.into(),
            output_path: output_path.into(),
        }
    }
}

/// Patch records of a single predicted mask.
///
/// # Errors
///
/// Returns an error if the file name carries no image id, the mask cannot be
/// decoded or it cannot be tiled by the patch grid.
pub fn mask_records<B: Backend>(
    path: &Path,
    patch: &PatchConfig,
    device: &B::Device,
) -> Result<Vec<SubmissionRecord>> {
    let image_id = image_id_from_path(path)?;
    let mask = load_mask::<B, _>(path, device)?;
    let [_, width] = mask.dims();
    let patch_size = patch.effective_patch_size(width);

    let labels = patch_labels(lift_map(mask), patch)?;
    let [_, _, rows, cols] = labels.dims();
    let records = records_from_tensor(image_id, labels.reshape([rows, cols]), patch_size)?;

    tracing::debug!(path = %path.display(), image_id, patches = records.len(), "mask labelled");
    Ok(records)
}

/// Labels every predicted mask and writes the submission CSV.
///
/// Masks are written in file-name order. Returns the number of data rows.
///
/// # Errors
///
/// Returns an error if the directory has no masks, a mask cannot be labelled
/// or the CSV cannot be written.
pub fn run_submission<B: Backend>(
    config: &SubmissionConfig,
    patch: &PatchConfig,
    device: &B::Device,
) -> Result<usize> {
    tracing::info!(
        predictions = %config.predictions_dir.display(),
        output = %config.output_path.display(),
        "creating submission",
    );

    let mut records = Vec::new();
    for path in list_masks(&config.predictions_dir)? {
        let mask = mask_records::<B>(&path, patch, device)
            .with_context(|| format!("failed to label '{}'", path.display()))?;
        records.extend(mask);
    }

    let rows = write_submission_file(&config.output_path, &records).with_context(|| {
        format!(
            "failed to write submission '{}'",
            config.output_path.display()
        )
    })?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use image::{GrayImage, Luma};
    use roadseg_util::PatchSizePolicy;

    use super::*;
    use crate::tests::TestBackend;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("roadseg-submit-{name}-{}", std::process::id()));
        fs::create_dir_all(dir.join("predictions")).unwrap();
        dir
    }

    /// 4x4 mask whose left half is road.
    fn save_left_road(path: &Path) {
        GrayImage::from_fn(4, 4, |x, _| if x < 2 { Luma([255]) } else { Luma([0]) })
            .save(path)
            .unwrap();
    }

    #[test]
    fn writes_rows_in_file_name_order() {
        let dir = scratch_dir("order");
        save_left_road(&dir.join("predictions/satimage_12.png"));
        save_left_road(&dir.join("predictions/satimage_1.png"));
        let output = dir.join("out/submission.csv");

        let patch = PatchConfig::new().with_patch_size(2);
        let rows = run_submission::<TestBackend>(
            &SubmissionConfig::new(dir.join("predictions"), &output),
            &patch,
            &Default::default(),
        )
        .unwrap();
        assert_eq!(rows, 8);

        let content = fs::read_to_string(&output).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,prediction");
        assert_eq!(
            &lines[1..5],
            &["001_0_0,1", "001_2_0,0", "001_0_2,1", "001_2_2,0"]
        );
        assert!(lines[5].starts_with("012_"));

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn reduced_patch_size_is_used_for_offsets() {
        let dir = scratch_dir("policy");
        let path = dir.join("predictions/test_3.png");
        save_left_road(&path);

        let patch = PatchConfig::new()
            .with_patch_size(4)
            .with_policy(PatchSizePolicy::ResolutionDependent(250));
        let records = mask_records::<TestBackend>(&path, &patch, &Default::default()).unwrap();

        let ids: Vec<String> = records.iter().map(SubmissionRecord::id).collect();
        assert_eq!(ids, vec!["003_0_0", "003_2_0", "003_0_2", "003_2_2"]);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn file_without_id_is_rejected() {
        let dir = scratch_dir("noid");
        let path = dir.join("predictions/mask.png");
        save_left_road(&path);

        let result = mask_records::<TestBackend>(&path, &PatchConfig::new(), &Default::default());
        assert!(result.is_err());

        fs::remove_dir_all(dir).unwrap();
    }
}
