use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use super::ToolConfig;

/// Downloader invocation for one URL, run inside the output directory.
pub fn downloader_command(config: &ToolConfig, url: &str, output_dir: &Path) -> Command {
    let mut cmd = Command::new(&config.downloader);
    cmd.args(&config.downloader_args)
        .arg(url)
        .current_dir(output_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW

    cmd
}
