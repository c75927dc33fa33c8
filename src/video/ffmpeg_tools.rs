use crate::core::AppConfig;
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

/// Locations of the ffmpeg and ffprobe binaries this session runs.
#[derive(Debug, Clone)]
pub struct FfmpegTools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl FfmpegTools {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_program(),
            ffprobe: config.ffprobe_program(),
        }
    }

    pub fn ffmpeg_command(&self) -> Command {
        hidden_command(&self.ffmpeg)
    }

    pub fn ffprobe_command(&self) -> Command {
        hidden_command(&self.ffprobe)
    }

    /// Run both tools with `-version`. Returns ffmpeg's banner line.
    pub fn verify(&self) -> Result<String> {
        let mut probe = self.ffprobe_command();
        probe.arg("-version");
        execute(probe, &self.ffprobe)?;

        let mut ffmpeg = self.ffmpeg_command();
        ffmpeg.arg("-version");
        let output = execute(ffmpeg, &self.ffmpeg)?;
        let banner = String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or("ffmpeg")
            .to_string();
        Ok(banner)
    }

    /// Run a short-lived command to completion, failing on a non-zero exit.
    pub fn run(&self, command: Command) -> Result<Output> {
        let program = PathBuf::from(command.get_program());
        execute(command, &program)
    }
}

fn execute(mut command: Command, program: &Path) -> Result<Output> {
    log::debug!("Executing {:?}", command);

    let output = command
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::anyhow!("{} not found. Please install FFmpeg.", program.display())
            } else {
                anyhow::anyhow!("Failed to run {}: {}", program.display(), e)
            }
        })?;

    if !output.status.success() {
        let error = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow::anyhow!("{} failed ({}): {}", program.display(), output.status, error.trim()));
    }

    Ok(output)
}

/// Command with stdin closed and, on Windows, no console window flashing up.
pub fn hidden_command(program: &Path) -> Command {
    let mut command = Command::new(program);
    command.stdin(Stdio::null());
    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NO_WINDOW: u32 = 0x0800_0000;
        command.creation_flags(CREATE_NO_WINDOW);
    }
    command
}
