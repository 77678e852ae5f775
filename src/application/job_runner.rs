use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use futures::FutureExt;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::line_parser::{LineParser, ParseEvent};
use super::status::StatusSink;
use crate::domain::{AppError, DownloadJob, ProgressState, RunOutcome};
use crate::tool::{downloader_command, install_instructions, AvailabilityChecker, ToolConfig};

/// Longer lines are truncated.
const MAX_LINE_BYTES: usize = 64 * 1024;

/// Runs a batch of download jobs one after another.
pub struct JobRunner {
    config: ToolConfig,
    checker: AvailabilityChecker,
    output_dir: PathBuf,
}

enum JobEnd {
    Finished,
    Cancelled,
}

enum Next {
    Line(String),
    Eof,
    Cancelled,
}

impl JobRunner {
    pub fn new(config: ToolConfig, output_dir: impl Into<PathBuf>) -> Self {
        let checker = AvailabilityChecker::new(&config);
        Self {
            config,
            checker,
            output_dir: output_dir.into(),
        }
    }

    pub fn with_checker(mut self, checker: AvailabilityChecker) -> Self {
        self.checker = checker;
        self
    }

    /// Always ends in exactly one outcome, which is also pushed to `sink`
    /// as the final status update.
    pub async fn run(
        &self,
        jobs: &[DownloadJob],
        cancel: &CancellationToken,
        sink: &dyn StatusSink,
    ) -> RunOutcome {
        let mut progress = ProgressState::new(jobs.len());

        let result = AssertUnwindSafe(self.execute(jobs, cancel, sink, &mut progress))
            .catch_unwind()
            .await;
        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => RunOutcome::Failed(err),
            Err(panic) => RunOutcome::Failed(AppError::Fatal(panic_message(panic))),
        };

        match &outcome {
            RunOutcome::Completed => tracing::info!(jobs = jobs.len(), "all downloads completed"),
            RunOutcome::Cancelled => tracing::info!("run cancelled"),
            RunOutcome::Failed(err) => tracing::error!(error = %err, "run failed"),
        }

        progress.finish(&outcome);
        sink.on_status(&progress.status());
        outcome
    }

    async fn execute(
        &self,
        jobs: &[DownloadJob],
        cancel: &CancellationToken,
        sink: &dyn StatusSink,
        progress: &mut ProgressState,
    ) -> Result<RunOutcome, AppError> {
        progress.checking_prereqs();
        sink.on_status(&progress.status());

        if !self.checker.is_tool_available() {
            return Err(AppError::PrerequisiteMissing {
                instructions: install_instructions(self.checker.os()),
            });
        }
        validate_output_dir(&self.output_dir)?;

        if jobs.is_empty() {
            return Err(AppError::Fatal("no URLs to download".to_string()));
        }
        let parser = LineParser::new()
            .map_err(|e| AppError::Fatal(format!("invalid progress pattern: {}", e)))?;

        for job in jobs {
            if cancel.is_cancelled() {
                return Ok(RunOutcome::Cancelled);
            }

            progress.start_job(job);
            sink.on_status(&progress.status());
            tracing::info!(url = %job.url, index = job.index, total = job.total, "starting download");

            match self.run_job(job, &parser, cancel, sink, progress).await? {
                JobEnd::Finished => tracing::info!(url = %job.url, "download finished"),
                JobEnd::Cancelled => return Ok(RunOutcome::Cancelled),
            }
        }

        Ok(RunOutcome::Completed)
    }

    async fn run_job(
        &self,
        job: &DownloadJob,
        parser: &LineParser,
        cancel: &CancellationToken,
        sink: &dyn StatusSink,
        progress: &mut ProgressState,
    ) -> Result<JobEnd, AppError> {
        let mut child = downloader_command(&self.config, &job.url, &self.output_dir)
            .spawn()
            .map_err(|e| {
                AppError::Fatal(format!(
                    "failed to launch {}: {}",
                    self.config.downloader.display(),
                    e
                ))
            })?;
        let mut lines = merged_lines(&mut child)?;

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => Next::Cancelled,
                line = lines.recv() => line.map_or(Next::Eof, Next::Line),
            };

            let line = match next {
                Next::Line(line) => line,
                Next::Eof => break,
                Next::Cancelled => {
                    self.terminate(&mut child, sink, progress).await;
                    return Ok(JobEnd::Cancelled);
                }
            };

            tracing::debug!(target: "downloader", "{}", line);
            for event in parser.parse_line(&line, &mut progress.items) {
                match event {
                    ParseEvent::TotalItems(total) => tracing::debug!(total, "item count detected"),
                    ParseEvent::ItemName(name) => tracing::info!(item = %name, "processing item"),
                    ParseEvent::Percent(percent) => progress.set_item_percent(percent),
                    ParseEvent::ItemCompleted => {
                        tracing::debug!(completed = progress.items.completed_items, "item finished")
                    }
                }
            }
            sink.on_status(&progress.status());

            if cancel.is_cancelled() {
                self.terminate(&mut child, sink, progress).await;
                return Ok(JobEnd::Cancelled);
            }
        }

        let waited = tokio::select! {
            _ = cancel.cancelled() => None,
            status = child.wait() => Some(status),
        };
        let Some(status) = waited else {
            self.terminate(&mut child, sink, progress).await;
            return Ok(JobEnd::Cancelled);
        };
        let status = status
            .map_err(|e| AppError::Fatal(format!("failed to wait for downloader: {}", e)))?;

        if cancel.is_cancelled() {
            progress.cancelling();
            sink.on_status(&progress.status());
            return Ok(JobEnd::Cancelled);
        }
        if !status.success() {
            return Err(AppError::JobFailed {
                job: job.clone(),
                exit_code: status.code(),
            });
        }
        Ok(JobEnd::Finished)
    }

    /// Requests termination and waits a bounded time for the exit.
    async fn terminate(&self, child: &mut Child, sink: &dyn StatusSink, progress: &mut ProgressState) {
        progress.cancelling();
        sink.on_status(&progress.status());

        if let Err(err) = child.start_kill() {
            tracing::warn!(error = %err, "failed to signal downloader");
        }
        match tokio::time::timeout(self.config.kill_grace, child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "downloader terminated"),
            Ok(Err(err)) => tracing::warn!(error = %err, "failed to reap downloader"),
            Err(_) => tracing::warn!(
                grace = ?self.config.kill_grace,
                "downloader still running after kill request"
            ),
        }
    }
}

/// The output directory must exist and accept new files.
pub fn validate_output_dir(path: &Path) -> Result<(), AppError> {
    let invalid = |reason: String| AppError::InvalidDirectory {
        path: path.to_path_buf(),
        reason,
    };

    let metadata = std::fs::metadata(path).map_err(|e| invalid(e.to_string()))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    tempfile::NamedTempFile::new_in(path).map_err(|e| invalid(format!("not writable: {}", e)))?;
    Ok(())
}

/// stdout and stderr of `child` as one stream of lines.
fn merged_lines(child: &mut Child) -> Result<mpsc::UnboundedReceiver<String>, AppError> {
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| AppError::Fatal("downloader stdout unavailable".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| AppError::Fatal("downloader stderr unavailable".to_string()))?;

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(forward_lines(stdout, tx.clone()));
    tokio::spawn(forward_lines(stderr, tx));
    Ok(rx)
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        let chunk = match reader.fill_buf().await {
            Ok(chunk) => chunk,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read downloader output");
                break;
            }
        };
        if chunk.is_empty() {
            break;
        }

        // Progress redraws end with a bare carriage return, so either byte
        // closes a line.
        let consumed = chunk.len();
        for &byte in chunk {
            if byte == b'\r' || byte == b'\n' {
                if !send_line(&mut line, &tx) {
                    return;
                }
            } else if line.len() < MAX_LINE_BYTES {
                line.push(byte);
            }
        }
        reader.consume(consumed);
    }
    send_line(&mut line, &tx);
}

/// Sends the buffered line, if any. False once the receiver is gone.
fn send_line(line: &mut Vec<u8>, tx: &mpsc::UnboundedSender<String>) -> bool {
    let text = String::from_utf8_lossy(line).into_owned();
    line.clear();
    if text.trim().is_empty() {
        return true;
    }
    tx.send(text).is_ok()
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_string());
    format!("download worker panicked: {}", detail)
}
