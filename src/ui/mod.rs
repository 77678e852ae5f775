use std::path::PathBuf;

use iced::{
    widget::{button, column, progress_bar, row, text, text_input, Space},
    Element, Length,
};

use crate::domain::StatusUpdate;

/// Main view state
pub struct DownloadView {
    pub urls: String,
    pub output_dir: Option<PathBuf>,
    pub status_message: String,
    pub track_label: String,
    pub progress: f32,
    pub is_downloading: bool,
    pub prerequisites_missing: bool,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            urls: String::new(),
            output_dir: None,
            status_message: String::new(),
            track_label: String::new(),
            progress: 0.0,
            is_downloading: false,
            prerequisites_missing: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlsChanged(String),
    ChooseFolderPressed,
    DownloadPressed,
    CancelPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlsChanged(urls) => {
                self.urls = urls;
            }
            DownloadMessage::ChooseFolderPressed
            | DownloadMessage::DownloadPressed
            | DownloadMessage::CancelPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn apply_status(&mut self, update: &StatusUpdate) {
        self.status_message = update.label.clone();
        self.track_label = update.track_label.clone();
        self.progress = update.fraction;
        if update.phase.is_terminal() {
            self.is_downloading = false;
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let dir_label = self
            .output_dir
            .as_ref()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|| "No directory selected".to_string());

        let action = if self.is_downloading {
            button("Cancel").on_press(DownloadMessage::CancelPressed)
        } else {
            button("Download Playlists")
                .on_press_maybe((!self.prerequisites_missing).then_some(DownloadMessage::DownloadPressed))
        };

        column![
            text("Playlist MP3 Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Playlist/profile URLs (comma-separated):").size(16),
            text_input("https://soundcloud.com/...", &self.urls)
                .on_input(DownloadMessage::UrlsChanged)
                .padding(10),
            row![
                button("Choose Download Folder")
                    .on_press_maybe((!self.is_downloading).then_some(DownloadMessage::ChooseFolderPressed))
                    .padding([10, 20]),
                text(dir_label).size(14),
            ]
            .spacing(10),
            Space::new().height(Length::Fixed(10.0)),
            action.padding([10, 20]),
            text(&self.status_message).size(14),
            progress_bar(0.0..=1.0, self.progress),
            text(&self.track_label).size(14),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Phase;

    #[test]
    fn test_terminal_status_ends_download() {
        let mut view = DownloadView {
            is_downloading: true,
            ..DownloadView::default()
        };

        view.apply_status(&StatusUpdate {
            phase: Phase::Running,
            label: "Downloading: x (1/1)".to_string(),
            fraction: 0.4,
            track_label: "Track 0/3".to_string(),
        });
        assert!(view.is_downloading);
        assert_eq!(view.progress, 0.4);

        view.apply_status(&StatusUpdate {
            phase: Phase::Completed,
            label: "All downloads completed successfully!".to_string(),
            fraction: 1.0,
            track_label: String::new(),
        });
        assert!(!view.is_downloading);
        assert_eq!(view.status_message, "All downloads completed successfully!");
    }
}
