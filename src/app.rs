use crate::application::{spawn_run, ChannelSink, JobRunner, RunHandle};
use crate::config::Settings;
use crate::domain::{DownloadJob, StatusUpdate};
use crate::tool::{install_instructions, AvailabilityChecker};
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::split_urls;
use futures::StreamExt;
use iced::{window, Subscription, Task};
use std::path::PathBuf;

pub struct DownloadApp {
    view: DownloadView,
    settings: Settings,
    // Worker of the active run, if any
    run: Option<RunHandle>,
}

impl DownloadApp {
    pub fn new(settings: Settings) -> Self {
        let mut view = DownloadView::default();

        let checker = AvailabilityChecker::new(&settings.tool_config());
        if checker.is_tool_available() {
            view.status_message = "Enter playlist URLs and choose a folder".to_string();
        } else {
            tracing::warn!("audio converter not found");
            view.prerequisites_missing = true;
            view.status_message = install_instructions(checker.os());
        }

        Self {
            view,
            settings,
            run: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    FolderSelected(Option<PathBuf>),
    /// Pushed by the worker after every change
    Status(StatusUpdate),
    CloseRequested(window::Id),
}

pub fn run(settings: Settings) -> iced::Result {
    iced::application(move || DownloadApp::new(settings.clone()), update, view)
        .title("Playlist MP3 Downloader")
        .subscription(subscription)
        .window(window::Settings {
            exit_on_close_request: false,
            ..Default::default()
        })
        .run()
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::ChooseFolderPressed => {
                    return Task::perform(pick_output_dir(), Message::FolderSelected);
                }
                DownloadMessage::DownloadPressed => return start_download(app),
                DownloadMessage::CancelPressed => {
                    if let Some(run) = &app.run {
                        run.cancel();
                    }
                }
                DownloadMessage::UrlsChanged(_) => {}
            }
        }
        Message::FolderSelected(path_opt) => {
            // None means the dialog was dismissed
            if let Some(path) = path_opt {
                app.view.output_dir = Some(path);
            }
        }
        Message::Status(status) => {
            app.view.apply_status(&status);
            if status.phase.is_terminal() {
                app.run = None;
            }
        }
        Message::CloseRequested(id) => {
            if let Some(run) = app.run.take() {
                tracing::info!("window closing, stopping active download");
                run.shutdown(app.settings.shutdown_timeout());
            }
            return window::close(id);
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

pub fn subscription(_app: &DownloadApp) -> Subscription<Message> {
    window::close_requests().map(Message::CloseRequested)
}

fn start_download(app: &mut DownloadApp) -> Task<Message> {
    if app.run.is_some() || app.view.prerequisites_missing {
        return Task::none();
    }

    let urls = split_urls(&app.view.urls);
    if urls.is_empty() {
        app.view.status_message = "Please enter at least one URL.".to_string();
        return Task::none();
    }
    let Some(output_dir) = app.view.output_dir.clone() else {
        app.view.status_message = "Please select an output directory.".to_string();
        return Task::none();
    };

    let jobs = DownloadJob::batch(urls);
    let runner = JobRunner::new(app.settings.tool_config(), output_dir);
    let (tx, rx) = futures::channel::mpsc::unbounded();

    match spawn_run(runner, jobs, Box::new(ChannelSink::new(tx))) {
        Ok(handle) => {
            app.run = Some(handle);
            app.view.is_downloading = true;
            app.view.progress = 0.0;
            app.view.track_label.clear();
            Task::stream(rx.map(Message::Status))
        }
        Err(e) => {
            app.view.status_message = e.to_string();
            Task::none()
        }
    }
}

async fn pick_output_dir() -> Option<PathBuf> {
    rfd::AsyncFileDialog::new()
        .set_title("Choose Download Folder")
        .pick_folder()
        .await
        .map(|handle| handle.path().to_path_buf())
}
