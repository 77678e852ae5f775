use std::path::{Path, PathBuf};

use super::{OsFamily, ToolConfig};

/// Decides whether the audio converter can be found before a run starts.
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    converter: String,
    fallback: Option<PathBuf>,
    os: OsFamily,
}

impl AvailabilityChecker {
    pub fn new(config: &ToolConfig) -> Self {
        Self {
            converter: config.converter.clone(),
            fallback: config.converter_fallback.clone(),
            os: OsFamily::current(),
        }
    }

    pub fn with_os(mut self, os: OsFamily) -> Self {
        self.os = os;
        self
    }

    pub fn os(&self) -> OsFamily {
        self.os
    }

    /// Search path first, then the fixed fallback location on Windows.
    pub fn is_tool_available(&self) -> bool {
        if let Ok(path) = which::which(&self.converter) {
            tracing::debug!(path = %path.display(), "converter found on search path");
            return true;
        }

        if self.os != OsFamily::Windows {
            return false;
        }

        self.fallback.as_deref().is_some_and(Path::is_file)
    }
}
