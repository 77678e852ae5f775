use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(playlist_title)s/%(playlist_index)s - %(title)s.%(ext)s";

/// Everything the checker and the runner need to know about external tools.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Program launched once per job
    pub downloader: PathBuf,
    /// Arguments placed before the job URL
    pub downloader_args: Vec<String>,
    /// Audio converter looked up on the search path
    pub converter: String,
    /// Windows-only location checked when the search path has no converter
    pub converter_fallback: Option<PathBuf>,
    /// How long to wait for a killed downloader to exit
    pub kill_grace: Duration,
}

impl ToolConfig {
    /// yt-dlp arguments for audio extraction with embedded metadata.
    pub fn yt_dlp_args(audio_format: &str, output_template: &str, embed_metadata: bool) -> Vec<String> {
        let mut args = vec![
            "-x".to_string(),
            "--audio-format".to_string(),
            audio_format.to_string(),
        ];
        if embed_metadata {
            args.push("--embed-metadata".to_string());
        }
        // One line per progress update instead of in-place redraws.
        args.push("--newline".to_string());
        args.push("-o".to_string());
        args.push(output_template.to_string());
        args
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            downloader: PathBuf::from("yt-dlp"),
            downloader_args: Self::yt_dlp_args("mp3", DEFAULT_OUTPUT_TEMPLATE, true),
            converter: "ffmpeg".to_string(),
            converter_fallback: Some(PathBuf::from(r"C:\ffmpeg\bin\ffmpeg.exe")),
            kill_grace: Duration::from_secs(3),
        }
    }
}
