use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::tool::models::DEFAULT_OUTPUT_TEMPLATE;
use crate::tool::ToolConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub downloader: PathBuf,
    pub converter: String,
    /// Empty disables the fallback
    pub converter_fallback: String,
    pub audio_format: String,
    pub output_template: String,
    pub embed_metadata: bool,
    pub kill_grace_ms: u64,
    pub shutdown_timeout_ms: u64,
    pub log_level: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::defaults()?
            // Config file (optional)
            .add_source(File::with_name("playlist-downloader").required(false))
            // Environment variables (e.g. PLAYLIST_DL_DOWNLOADER=/opt/bin/yt-dlp)
            .add_source(Environment::with_prefix("PLAYLIST_DL"))
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("downloader", "yt-dlp")?
            .set_default("converter", "ffmpeg")?
            .set_default("converter_fallback", r"C:\ffmpeg\bin\ffmpeg.exe")?
            .set_default("audio_format", "mp3")?
            .set_default("output_template", DEFAULT_OUTPUT_TEMPLATE)?
            .set_default("embed_metadata", true)?
            .set_default("kill_grace_ms", 3000)?
            .set_default("shutdown_timeout_ms", 3000)?
            .set_default("log_level", "info")
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn tool_config(&self) -> ToolConfig {
        let fallback = self.converter_fallback.trim();
        ToolConfig {
            downloader: self.downloader.clone(),
            downloader_args: ToolConfig::yt_dlp_args(
                &self.audio_format,
                &self.output_template,
                self.embed_metadata,
            ),
            converter: self.converter.clone(),
            converter_fallback: (!fallback.is_empty()).then(|| PathBuf::from(fallback)),
            kill_grace: Duration::from_millis(self.kill_grace_ms),
        }
    }
}
