#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    Windows,
    Other,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "linux") {
            OsFamily::Linux
        } else {
            OsFamily::Other
        }
    }
}

/// Human readable install guidance for FFmpeg and yt-dlp.
pub fn install_instructions(os: OsFamily) -> String {
    let steps = match os {
        OsFamily::Linux => {
            "Install the tools with your package manager, for example:\n\
             \n  sudo apt install ffmpeg\
             \n  python3 -m pip install -U yt-dlp"
        }
        OsFamily::Windows => {
            "Install the tools from a terminal:\n\
             \n  winget install Gyan.FFmpeg\
             \n  winget install yt-dlp.yt-dlp\
             \n\nor unpack an FFmpeg build so that C:\\ffmpeg\\bin\\ffmpeg.exe exists."
        }
        OsFamily::Other => {
            "Install the tools, for example with Homebrew:\n\
             \n  brew install ffmpeg yt-dlp"
        }
    };
    format!("FFmpeg is required to convert downloads to audio.\n{}", steps)
}
