pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{DownloadJob, ItemProgress, Phase, ProgressState, RunOutcome, StatusUpdate};
