use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use crate::application::{JobRunner, LogSink};
use crate::config::Settings;
use crate::domain::{DownloadJob, RunOutcome};
use crate::tool::{install_instructions, AvailabilityChecker};
use crate::utils::split_urls;

const EXIT_CANCELLED: u8 = 130;

/// Download playlists and profiles as MP3 through yt-dlp.
///
/// Without URLs the graphical window opens.
#[derive(Debug, Parser)]
#[command(name = "playlist-mp3-downloader", version, about)]
pub struct Cli {
    /// Directory the downloads are written to (headless mode)
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Playlist or profile URLs; comma separated lists are accepted too
    pub urls: Vec<String>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        !self.urls().is_empty()
    }

    pub fn urls(&self) -> Vec<String> {
        split_urls(&self.urls.join(","))
    }
}

/// Runs the batch without a window, reporting through the log.
pub fn run_headless(cli: &Cli, settings: &Settings) -> ExitCode {
    let config = settings.tool_config();
    let checker = AvailabilityChecker::new(&config);
    if !checker.is_tool_available() {
        eprintln!("{}", install_instructions(checker.os()));
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let jobs = DownloadJob::batch(cli.urls());
    let runner = JobRunner::new(config, cli.output.clone()).with_checker(checker);

    let outcome = runtime.block_on(async {
        let cancel = CancellationToken::new();
        let on_ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                on_ctrl_c.cancel();
            }
        });
        runner.run(&jobs, &cancel, &LogSink).await
    });

    exit_code(&outcome)
}

fn exit_code(outcome: &RunOutcome) -> ExitCode {
    match outcome {
        _ if outcome.is_success() => ExitCode::SUCCESS,
        RunOutcome::Cancelled => ExitCode::from(EXIT_CANCELLED),
        _ => ExitCode::FAILURE,
    }
}
