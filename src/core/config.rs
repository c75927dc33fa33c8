use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Explicit ffmpeg binary; `None` means look it up on PATH.
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub last_open_directory: Option<PathBuf>,
    pub last_save_directory: Option<PathBuf>,
    /// Appended to the source stem when suggesting an output name.
    pub output_suffix: String,
    pub job_poll_interval_ms: u64,
    /// How often playback asks for a fresh preview frame.
    pub preview_interval_ms: u64,
    pub thumbnail_count: usize,
    pub preview_max_width: u32,
    pub preview_max_height: u32,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            last_open_directory: None,
            last_save_directory: None,
            output_suffix: "--trimmothy".to_string(),
            job_poll_interval_ms: 100,
            preview_interval_ms: 200,
            thumbnail_count: 10,
            preview_max_width: 640,
            preview_max_height: 400,
            thumbnail_width: 120,
            thumbnail_height: 80,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &std::path::Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e))?;

            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config.sanitized())
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), creating new one with defaults", e);
                    let new_config = Self::default();
                    new_config.save_to(config_path)
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    log::info!("Created new config file at {}", config_path.display());
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save_to(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trimmothy")
            .join("config.json")
    }

    /// Zero intervals would spin the UI loop; zero sizes would ask ffmpeg
    /// for empty frames.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.job_poll_interval_ms == 0 {
            log::warn!("job_poll_interval_ms must be positive, using {}", defaults.job_poll_interval_ms);
            self.job_poll_interval_ms = defaults.job_poll_interval_ms;
        }
        if self.preview_interval_ms == 0 {
            self.preview_interval_ms = defaults.preview_interval_ms;
        }
        if self.preview_max_width == 0 || self.preview_max_height == 0 {
            self.preview_max_width = defaults.preview_max_width;
            self.preview_max_height = defaults.preview_max_height;
        }
        if self.thumbnail_width == 0 || self.thumbnail_height == 0 {
            self.thumbnail_width = defaults.thumbnail_width;
            self.thumbnail_height = defaults.thumbnail_height;
        }
        self
    }

    pub fn ffmpeg_program(&self) -> PathBuf {
        self.ffmpeg_path.clone().unwrap_or_else(|| PathBuf::from("ffmpeg"))
    }

    pub fn ffprobe_program(&self) -> PathBuf {
        self.ffprobe_path.clone().unwrap_or_else(|| PathBuf::from("ffprobe"))
    }
}
