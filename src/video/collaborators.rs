use crate::core::{MediaSource, TrimRequest};
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use thiserror::Error;

/// Reads duration, frame rate and dimensions of a video file.
pub trait MediaProber: Send + Sync {
    fn probe(&self, path: &Path) -> anyhow::Result<MediaSource>;
}

/// Decodes the frame nearest to a timestamp, scaled to fit the given box.
pub trait FrameDecoder: Send + Sync {
    fn frame_at(&self, path: &Path, seconds: f64, max_width: u32, max_height: u32) -> anyhow::Result<RgbaImage>;
}

/// Cuts `[start, end)` of the source into the destination.
///
/// Called from the trim worker thread, never from the UI thread. Progress
/// fractions are in [0, 1]. Implementations poll `cancel` between units of
/// work and return `EncodeError::Cancelled` once it is set. On any error the
/// destination must be left untouched.
pub trait Encoder: Send + Sync {
    fn trim(
        &self,
        request: &TrimRequest,
        on_progress: &mut dyn FnMut(f64),
        cancel: &AtomicBool,
    ) -> Result<PathBuf, EncodeError>;
}

/// Native open/save dialogs. Both return `None` when the user cancels.
pub trait FileDialogs {
    fn choose_open_path(&self, initial_dir: Option<&Path>) -> Option<PathBuf>;
    fn choose_save_path(&self, default_name: &str, initial_dir: Option<&Path>) -> Option<PathBuf>;
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cancelled")]
    Cancelled,

    #[error("{} was not found. Please install FFmpeg or set its path in the config file", .0.display())]
    ToolMissing(PathBuf),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
