//! Road segmentation scoring and submission tooling.
//!
//! This crate ties the patch metrics, losses and submission format together
//! behind a single configuration and drives them from mask files on disk.

pub mod backend;
pub mod config;
pub mod evaluation;
pub mod submission;

pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
pub use config::RoadSegConfig;
pub use evaluation::{run_evaluation, EvaluationConfig};
pub use submission::{mask_records, run_submission, SubmissionConfig};

#[doc(inline)]
pub use roadseg_loss as loss;
#[doc(inline)]
pub use roadseg_metric as metric;
#[doc(inline)]
pub use roadseg_util as util;
