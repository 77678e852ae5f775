use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::job_runner::JobRunner;
use super::status::StatusSink;
use crate::domain::{AppError, DownloadJob, ProgressState, RunOutcome};

const SHUTDOWN_POLL: Duration = Duration::from_millis(20);

/// A run executing on its own worker thread.
pub struct RunHandle {
    cancel: CancellationToken,
    thread: Option<JoinHandle<RunOutcome>>,
}

/// Starts `runner` on a dedicated thread so the caller stays responsive.
pub fn spawn_run(
    runner: JobRunner,
    jobs: Vec<DownloadJob>,
    sink: Box<dyn StatusSink>,
) -> Result<RunHandle, AppError> {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let thread = std::thread::Builder::new()
        .name("download-worker".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let outcome = RunOutcome::Failed(AppError::Fatal(format!(
                        "failed to start worker runtime: {}",
                        e
                    )));
                    let mut progress = ProgressState::new(jobs.len());
                    progress.finish(&outcome);
                    sink.on_status(&progress.status());
                    return outcome;
                }
            };
            runtime.block_on(runner.run(&jobs, &token, sink.as_ref()))
        })
        .map_err(|e| AppError::Fatal(format!("failed to start worker thread: {}", e)))?;

    Ok(RunHandle {
        cancel,
        thread: Some(thread),
    })
}

impl RunHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Blocks until the worker is done.
    #[cfg(test)]
    pub fn join(mut self) -> RunOutcome {
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(outcome)) => outcome,
            Some(Err(_)) => RunOutcome::Failed(AppError::Fatal("download worker panicked".to_string())),
            None => RunOutcome::Cancelled,
        }
    }

    /// Cancels and waits up to `timeout` for the worker to exit. Returns
    /// false if the worker was still running when the time ran out.
    pub fn shutdown(mut self, timeout: Duration) -> bool {
        self.cancel.cancel();
        let deadline = Instant::now() + timeout;

        while !self.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(?timeout, "download worker did not stop in time");
                return false;
            }
            std::thread::sleep(SHUTDOWN_POLL);
        }

        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        true
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::domain::{Phase, StatusUpdate};
    use crate::tool::ToolConfig;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn runner(script: &str, output: &std::path::Path) -> JobRunner {
        let config = ToolConfig {
            downloader: PathBuf::from("sh"),
            downloader_args: vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            converter: "sh".to_string(),
            converter_fallback: None,
            kill_grace: Duration::from_secs(2),
        };
        JobRunner::new(config, output)
    }

    fn collecting_sink() -> (Box<dyn StatusSink>, Arc<Mutex<Vec<StatusUpdate>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |update: &StatusUpdate| sink_seen.lock().unwrap().push(update.clone());
        (Box::new(sink), seen)
    }

    #[test]
    fn test_run_on_worker_thread() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, seen) = collecting_sink();
        let jobs = DownloadJob::batch(vec!["https://soundcloud.com/a".to_string()]);

        let handle = spawn_run(runner("echo '[download] 50.0% of 1MiB'", dir.path()), jobs, sink).unwrap();
        let outcome = handle.join();

        assert!(outcome.is_success(), "{outcome:?}");
        let seen = seen.lock().unwrap();
        assert_eq!(seen.last().map(|u| u.phase), Some(Phase::Completed));
    }

    #[test]
    fn test_shutdown_stops_a_busy_worker() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, seen) = collecting_sink();
        let jobs = DownloadJob::batch(vec!["https://soundcloud.com/a".to_string(), "https://soundcloud.com/b".to_string()]);

        let handle = spawn_run(runner("exec sleep 30", dir.path()), jobs, sink).unwrap();
        std::thread::sleep(Duration::from_millis(300));
        assert!(!handle.is_finished());

        let started = Instant::now();
        assert!(handle.shutdown(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(seen.lock().unwrap().last().map(|u| u.phase), Some(Phase::Cancelled));
    }
}
