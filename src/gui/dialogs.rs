use std::path::{Path, PathBuf};
use rfd::FileDialog;
use crate::core::VIDEO_EXTENSIONS;
use crate::video::FileDialogs;

/// Native dialogs. These block the UI thread while open, like any modal.
pub struct RfdDialogs;

impl FileDialogs for RfdDialogs {
    fn choose_open_path(&self, initial_dir: Option<&Path>) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title("Select Video File")
            .add_filter("Video files", VIDEO_EXTENSIONS)
            .add_filter("All files", &["*"]);
        if let Some(dir) = initial_dir.filter(|dir| dir.is_dir()) {
            dialog = dialog.set_directory(dir);
        }
        dialog.pick_file()
    }

    fn choose_save_path(&self, default_name: &str, initial_dir: Option<&Path>) -> Option<PathBuf> {
        let mut dialog = FileDialog::new()
            .set_title("Save Trimmed Video")
            .set_file_name(default_name)
            .add_filter("Video files", VIDEO_EXTENSIONS);
        if let Some(dir) = initial_dir.filter(|dir| dir.is_dir()) {
            dialog = dialog.set_directory(dir);
        }
        dialog.save_file()
    }
}
