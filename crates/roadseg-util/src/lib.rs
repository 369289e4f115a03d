//! Shared building blocks for road segmentation scoring.
//!
//! - [`patch`]: tiling of masks and probability maps into fixed-size patches
//!   and the mean-threshold patch labels used by the competition metric.
//! - [`submission`]: the patch-level CSV submission format.
//! - [`image`]: PNG mask loading.
//! - [`error`]: the shared error type.

pub mod error;
pub mod image;
pub mod patch;
pub mod submission;

pub use error::{RoadSegError, RoadSegResult};
pub use patch::{
    extract_patches, grid_rows, lift_map, patch_features, patch_label_vector, patch_labels,
    patch_means, PatchConfig, PatchSizePolicy,
};
pub use submission::{
    image_id_from_path, records_from_grid, records_from_tensor, write_submission_file,
    SubmissionRecord, SubmissionWriter,
};
