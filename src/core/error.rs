use std::path::PathBuf;
use thiserror::Error;

/// Everything the UI can report back to the user.
///
/// Plumbing code (ffmpeg, ffprobe, filesystem) returns `anyhow::Result`; the
/// controller maps those failures into one of these variants before showing
/// them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrimError {
    #[error("Could not open {}: {reason}", path.display())]
    FileUnreadable { path: PathBuf, reason: String },

    #[error("Invalid time \"{0}\", expected HH:MM:SS")]
    InvalidFormat(String),

    #[error("Please load a video file first")]
    NoSourceLoaded,

    #[error("Invalid trim selection: {0}")]
    InvalidSelection(String),

    #[error("A trim is already running")]
    JobAlreadyRunning,

    #[error("Failed to trim video: {0}")]
    Encode(String),

    #[error("Trim cancelled")]
    Cancelled,
}

impl TrimError {
    pub fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        TrimError::FileUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
