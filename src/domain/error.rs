use std::path::PathBuf;

use thiserror::Error;

use super::DownloadJob;

#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("{instructions}")]
    PrerequisiteMissing { instructions: String },

    #[error("Output directory {} is not usable: {reason}", path.display())]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("Download of {} ({}/{}) failed with {}", job.url, job.index, job.total, describe_exit(*exit_code))]
    JobFailed {
        job: DownloadJob,
        /// `None` when the process was ended by a signal
        exit_code: Option<i32>,
    },

    #[error("Unexpected error: {0}")]
    Fatal(String),
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}
