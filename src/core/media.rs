use std::path::{Path, PathBuf};

/// Container extensions offered in the open dialog. Other files can still be
/// opened; the list is advisory.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v", "3gp"];

/// A probed, loaded video. Replaced wholesale when another file is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSource {
    pub path: PathBuf,
    pub duration: f64,
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
    pub video_codec: String,
    pub audio_codec: Option<String>,
    pub container: String,
}

impl MediaSource {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Suggested name for a trimmed copy, e.g. `holiday--trimmothy.mp4`.
    pub fn output_file_name(&self, suffix: &str) -> String {
        output_file_name(&self.path, suffix)
    }

    pub fn summary(&self) -> String {
        let audio = self.audio_codec.as_deref().unwrap_or("no audio");
        format!(
            "{}x{} @ {:.2} fps, {} / {}",
            self.width, self.height, self.frame_rate, self.video_codec, audio
        )
    }
}

pub fn output_file_name(input: &Path, suffix: &str) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string());
    match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    }
}

pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// ffmpeg picks the muxer from the extension, so a save path without one
/// borrows the source's.
pub fn with_source_extension(destination: PathBuf, source: &Path) -> PathBuf {
    if destination.extension().is_some() {
        return destination;
    }
    match source.extension() {
        Some(ext) => destination.with_extension(ext),
        None => destination,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            output_file_name(Path::new("/videos/holiday.mp4"), "--trimmothy"),
            "holiday--trimmothy.mp4"
        );
        assert_eq!(
            output_file_name(Path::new("clip.final.mkv"), "--cut"),
            "clip.final--cut.mkv"
        );
        assert_eq!(output_file_name(Path::new("raw"), "--trimmothy"), "raw--trimmothy");
    }

    #[test]
    fn test_video_extension_detection_is_case_insensitive() {
        assert!(is_video_file(Path::new("a.MP4")));
        assert!(is_video_file(Path::new("a.webm")));
        assert!(!is_video_file(Path::new("a.txt")));
        assert!(!is_video_file(Path::new("noext")));
    }

    #[test]
    fn test_destination_borrows_source_extension() {
        let source = Path::new("/in/movie.mov");
        assert_eq!(
            with_source_extension(PathBuf::from("/out/cut"), source),
            PathBuf::from("/out/cut.mov")
        );
        assert_eq!(
            with_source_extension(PathBuf::from("/out/cut.mp4"), source),
            PathBuf::from("/out/cut.mp4")
        );
    }
}
