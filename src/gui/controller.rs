use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use image::RgbaImage;
use crate::core::{
    format_duration, format_time, is_video_file, parse_time_text, with_source_extension, AppConfig,
    JobId, JobStatus, MediaSource, Selection, TrimError, TrimJob, TrimRequest,
};
use crate::gui::playback::{Playback, PlaybackTick};
use crate::jobs::{JobEvent, TrimJobRunner};
use crate::video::{
    Encoder, FfmpegTools, FileDialogs, FrameDecoder, FrameKind, FrameLoader, MediaProber,
    ProbeLoader, VideoProcessor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message the front end shows in a modal window until dismissed.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// A decoded frame ready for display. `revision` changes whenever the image
/// does, so the front end knows when to upload a new texture.
#[derive(Debug, Clone)]
pub struct FrameView {
    pub seconds: f64,
    pub image: Arc<RgbaImage>,
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct ThumbnailSlot {
    pub seconds: f64,
    pub frame: Option<FrameView>,
    pub failed: bool,
}

/// Everything the window shows, and every action it can take.
///
/// Lives on the UI thread. Probing, frame decoding and trimming happen on
/// background workers whose results are picked up by `tick`.
pub struct UiController {
    config: AppConfig,
    config_path: Option<PathBuf>,
    prober: Arc<dyn MediaProber>,
    probe_loader: ProbeLoader,
    frame_loader: FrameLoader,
    runner: TrimJobRunner,

    source: Option<MediaSource>,
    selection: Option<Selection>,
    /// Edit buffers behind the start/end text fields.
    pub start_text: String,
    pub end_text: String,
    playback: Playback,

    pending_open: Option<u64>,
    wanted_preview: Option<f64>,
    preview: Option<FrameView>,
    thumbnails: Vec<ThumbnailSlot>,
    frame_revision: u64,

    current_job: Option<TrimJob>,
    last_job_poll: Option<Instant>,
    last_tick: Option<Instant>,

    notices: VecDeque<Notice>,
    status_message: String,
}

impl UiController {
    /// Controller backed by the ffmpeg/ffprobe binaries named in `config`.
    /// Directory choices are written back to the default config file.
    pub fn with_ffmpeg(config: AppConfig) -> anyhow::Result<Self> {
        let tools = FfmpegTools::from_config(&config);
        match tools.verify() {
            Ok(version) => log::info!("Using {}", version),
            Err(e) => log::warn!("FFmpeg check failed: {}", e),
        }

        let processor = Arc::new(VideoProcessor::new(tools));
        let mut controller = Self::new(config, processor.clone(), processor.clone(), processor)?;
        controller.config_path = Some(AppConfig::config_path());
        Ok(controller)
    }

    pub fn new(
        config: AppConfig,
        prober: Arc<dyn MediaProber>,
        decoder: Arc<dyn FrameDecoder>,
        encoder: Arc<dyn Encoder>,
    ) -> anyhow::Result<Self> {
        let probe_loader = ProbeLoader::new(prober.clone())?;
        let frame_loader = FrameLoader::new(decoder)?;
        let runner = TrimJobRunner::new(encoder, Some(prober.clone()));
        let playback = Playback::new(Duration::from_millis(config.preview_interval_ms));

        Ok(Self {
            config,
            config_path: None,
            prober,
            probe_loader,
            frame_loader,
            runner,
            source: None,
            selection: None,
            start_text: format_time(0.0),
            end_text: format_time(0.0),
            playback,
            pending_open: None,
            wanted_preview: None,
            preview: None,
            thumbnails: Vec::new(),
            frame_revision: 0,
            current_job: None,
            last_job_poll: None,
            last_tick: None,
            notices: VecDeque::new(),
            status_message: "Open a video to get started".to_string(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn cursor(&self) -> f64 {
        self.playback.cursor()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.pending_open.is_some()
    }

    pub fn preview_frame(&self) -> Option<&FrameView> {
        self.preview.as_ref()
    }

    pub fn thumbnails(&self) -> &[ThumbnailSlot] {
        &self.thumbnails
    }

    pub fn current_job(&self) -> Option<&TrimJob> {
        self.current_job.as_ref()
    }

    /// Export is disabled while a job runs.
    pub fn can_export(&self) -> bool {
        self.source.is_some() && self.current_job.is_none()
    }

    pub fn status(&self) -> &str {
        &self.status_message
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) -> Option<Notice> {
        self.notices.pop_front()
    }

    /// Everything that has to happen once per UI frame: drain background
    /// results, move the playback cursor and poll the running job when due.
    pub fn tick(&mut self, now: Instant) {
        self.poll_background();

        let elapsed = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or_default();
        self.last_tick = Some(now);
        self.advance_playback(elapsed);

        let poll_interval = Duration::from_millis(self.config.job_poll_interval_ms);
        let due = self
            .last_job_poll
            .map_or(true, |last| now.saturating_duration_since(last) >= poll_interval);
        if self.current_job.is_some() && due {
            self.last_job_poll = Some(now);
            self.poll_job_status();
        }
    }

    /// How soon the front end should wake up again without user input.
    pub fn repaint_interval(&self) -> Option<Duration> {
        if self.playback.is_playing() {
            Some(Duration::from_millis(self.config.preview_interval_ms.min(50)))
        } else if self.current_job.is_some() || self.pending_open.is_some() {
            Some(Duration::from_millis(self.config.job_poll_interval_ms))
        } else if self.thumbnails.iter().any(|slot| slot.frame.is_none() && !slot.failed) || self.preview_pending() {
            Some(Duration::from_millis(100))
        } else {
            None
        }
    }

    fn preview_pending(&self) -> bool {
        match (self.wanted_preview, &self.preview) {
            (Some(wanted), Some(shown)) => wanted != shown.seconds,
            (Some(_), None) => true,
            _ => false,
        }
    }

    // ---- opening --------------------------------------------------------

    /// Probe `path` and load it. Blocks on ffprobe, so the window uses
    /// `request_open`; this is for tests and headless callers.
    pub fn open_source(&mut self, path: &Path) -> Result<&MediaSource, TrimError> {
        let probed = check_openable(path).and_then(|_| {
            self.prober
                .probe(path)
                .map_err(|e| TrimError::unreadable(path, e))
        });
        self.apply_probe(path, probed)
    }

    /// Same as `open_source`, but the probe runs in the background and is
    /// applied by `poll_background`.
    pub fn request_open(&mut self, path: PathBuf) -> Result<(), TrimError> {
        if let Err(e) = check_openable(&path) {
            self.report_open_failure(&e);
            return Err(e);
        }
        if !is_video_file(&path) {
            log::warn!("{} does not look like a video file, trying anyway", path.display());
        }

        self.status_message = format!("Loading {}...", display_name(&path));
        self.pending_open = Some(self.probe_loader.request(path));
        Ok(())
    }

    /// Ask for a file and open it. Does nothing if the dialog is cancelled.
    pub fn open_with_dialog(&mut self, dialogs: &dyn FileDialogs) -> Result<(), TrimError> {
        let initial_dir = self.config.last_open_directory.clone();
        let Some(path) = dialogs.choose_open_path(initial_dir.as_deref()) else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            self.config.last_open_directory = Some(dir.to_path_buf());
            self.persist_config();
        }
        self.request_open(path)
    }

    fn apply_probe(
        &mut self,
        path: &Path,
        probed: Result<MediaSource, TrimError>,
    ) -> Result<&MediaSource, TrimError> {
        let source = probed.and_then(|source| {
            if source.duration.is_finite() && source.duration > 0.0 {
                Ok(source)
            } else {
                Err(TrimError::unreadable(path, "video has no playable duration"))
            }
        });

        match source {
            Ok(source) => {
                self.install_source(source);
                self.source.as_ref().ok_or(TrimError::NoSourceLoaded)
            }
            Err(e) => {
                self.report_open_failure(&e);
                Err(e)
            }
        }
    }

    fn install_source(&mut self, source: MediaSource) {
        log::info!(
            "Loaded {} ({:.2}s, {})",
            source.path.display(),
            source.duration,
            source.summary()
        );
        self.frame_loader.begin_generation();
        self.selection = Some(Selection::full(source.duration));
        self.playback.reset(source.duration);
        self.preview = None;
        self.wanted_preview = None;
        self.thumbnails.clear();
        self.status_message = format!(
            "Loaded {} ({}, {})",
            source.file_name(),
            format_duration(source.duration),
            source.summary()
        );
        self.source = Some(source);
        self.sync_selection_text();

        self.request_preview_frame(0.0);
        self.request_thumbnails();
    }

    fn report_open_failure(&mut self, error: &TrimError) {
        log::error!("{}", error);
        self.status_message = "Failed to load video".to_string();
        self.notices.push_back(Notice::new(
            NoticeLevel::Error,
            "Could not open video",
            error.to_string(),
        ));
    }

    // ---- selection ------------------------------------------------------

    pub fn set_selection_start(&mut self, t: f64) -> Result<(), TrimError> {
        let selection = self.selection.as_mut().ok_or(TrimError::NoSourceLoaded)?;
        selection.set_start(t)?;
        self.sync_selection_text();
        Ok(())
    }

    pub fn set_selection_end(&mut self, t: f64) -> Result<(), TrimError> {
        let selection = self.selection.as_mut().ok_or(TrimError::NoSourceLoaded)?;
        selection.set_end(t)?;
        self.sync_selection_text();
        Ok(())
    }

    /// Apply the start text field. On error the field is reset to the
    /// current value and the selection is left alone.
    pub fn commit_start_text(&mut self) -> Result<(), TrimError> {
        let Some(selection) = self.selection else {
            return Err(TrimError::NoSourceLoaded);
        };
        if self.start_text.trim() == format_time(selection.start()) {
            return Ok(());
        }
        let result = parse_time_text(&self.start_text).and_then(|t| self.set_selection_start(t));
        self.finish_text_commit(result)
    }

    pub fn commit_end_text(&mut self) -> Result<(), TrimError> {
        let Some(selection) = self.selection else {
            return Err(TrimError::NoSourceLoaded);
        };
        if self.end_text.trim() == format_time(selection.end()) {
            return Ok(());
        }
        let result = parse_time_text(&self.end_text).and_then(|t| self.set_selection_end(t));
        self.finish_text_commit(result)
    }

    fn finish_text_commit(&mut self, result: Result<(), TrimError>) -> Result<(), TrimError> {
        if let Err(e) = &result {
            log::debug!("Rejected time input: {}", e);
            self.status_message = e.to_string();
            self.sync_selection_text();
        }
        result
    }

    fn sync_selection_text(&mut self) {
        if let Some(selection) = self.selection {
            self.start_text = format_time(selection.start());
            self.end_text = format_time(selection.end());
        }
    }

    // ---- preview and playback -------------------------------------------

    /// Show the frame nearest `t`. Never touches the selection.
    pub fn request_preview_frame(&mut self, t: f64) {
        let Some(source) = &self.source else {
            return;
        };
        let seconds = frame_time(source, t);
        let path = source.path.clone();
        self.wanted_preview = Some(seconds);

        let cached = self.frame_loader.request(
            FrameKind::Preview,
            &path,
            seconds,
            self.config.preview_max_width,
            self.config.preview_max_height,
        );
        if let Some(image) = cached {
            self.preview = Some(self.frame_view(seconds, image));
        }
    }

    /// Move the cursor. Stops playback.
    pub fn seek(&mut self, t: f64) {
        if self.source.is_none() {
            return;
        }
        let cursor = self.playback.seek(t);
        self.request_preview_frame(cursor);
    }

    pub fn toggle_playback(&mut self) {
        if self.source.is_none() {
            self.status_message = TrimError::NoSourceLoaded.to_string();
            return;
        }
        self.playback.toggle();
        if self.playback.is_playing() {
            self.request_preview_frame(self.playback.cursor());
        }
    }

    /// Play the selected range once.
    pub fn preview_selection(&mut self) {
        let Some(selection) = self.selection else {
            self.status_message = TrimError::NoSourceLoaded.to_string();
            return;
        };
        self.playback.play_range(selection.start(), selection.end());
        self.request_preview_frame(self.playback.cursor());
    }

    pub fn advance_playback(&mut self, elapsed: Duration) {
        match self.playback.advance(elapsed) {
            PlaybackTick::Idle | PlaybackTick::Advanced { frame_due: false } => {}
            PlaybackTick::Advanced { frame_due: true } | PlaybackTick::Stopped => {
                self.request_preview_frame(self.playback.cursor());
            }
        }
    }

    /// Click on a thumbnail in the strip.
    pub fn select_thumbnail(&mut self, index: usize) {
        if let Some(seconds) = self.thumbnails.get(index).map(|slot| slot.seconds) {
            self.seek(seconds);
        }
    }

    fn request_thumbnails(&mut self) {
        let Some(source) = &self.source else {
            return;
        };
        let count = self.config.thumbnail_count;
        let path = source.path.clone();
        let times: Vec<f64> = (0..count)
            .map(|i| frame_time(source, source.duration * (i as f64 + 0.5) / count as f64))
            .collect();

        self.thumbnails = times
            .iter()
            .map(|&seconds| ThumbnailSlot {
                seconds,
                frame: None,
                failed: false,
            })
            .collect();

        for (index, seconds) in times.into_iter().enumerate() {
            let cached = self.frame_loader.request(
                FrameKind::Thumbnail(index),
                &path,
                seconds,
                self.config.thumbnail_width,
                self.config.thumbnail_height,
            );
            if let Some(image) = cached {
                let view = self.frame_view(seconds, image);
                self.thumbnails[index].frame = Some(view);
            }
        }
    }

    fn frame_view(&mut self, seconds: f64, image: Arc<RgbaImage>) -> FrameView {
        self.frame_revision += 1;
        FrameView {
            seconds,
            image,
            revision: self.frame_revision,
        }
    }

    /// Apply finished probes and decoded frames. Results that belong to a
    /// video that is no longer open are dropped.
    pub fn poll_background(&mut self) {
        for result in self.probe_loader.completed_results() {
            if self.pending_open != Some(result.request_id) {
                log::debug!("Dropping stale probe result for {:?}", result.file_path);
                continue;
            }
            self.pending_open = None;
            let probed = result
                .result
                .map_err(|reason| TrimError::unreadable(&result.file_path, reason));
            let _ = self.apply_probe(&result.file_path, probed);
        }

        for result in self.frame_loader.completed() {
            match result.kind {
                FrameKind::Preview => {
                    if self.wanted_preview != Some(result.seconds) {
                        continue;
                    }
                    match result.image {
                        Ok(image) => self.preview = Some(self.frame_view(result.seconds, image)),
                        Err(e) => {
                            log::warn!("No preview at {:.2}s: {}", result.seconds, e);
                            self.wanted_preview = None;
                            self.status_message =
                                format!("Could not show frame at {}", format_time(result.seconds));
                        }
                    }
                }
                FrameKind::Thumbnail(index) => {
                    let matches = self
                        .thumbnails
                        .get(index)
                        .map_or(false, |slot| slot.seconds == result.seconds);
                    if !matches {
                        continue;
                    }
                    match result.image {
                        Ok(image) => {
                            let view = self.frame_view(result.seconds, image);
                            self.thumbnails[index].frame = Some(view);
                        }
                        Err(_) => self.thumbnails[index].failed = true,
                    }
                }
            }
        }
    }

    // ---- export ---------------------------------------------------------

    /// Ask for a save path and start trimming the selection into it.
    ///
    /// `Ok(None)` means the user cancelled the dialog.
    pub fn submit_trim_job(&mut self, dialogs: &dyn FileDialogs) -> Result<Option<JobId>, TrimError> {
        let result = self.try_submit_trim_job(dialogs);
        if let Err(e) = &result {
            log::warn!("Cannot start trim: {}", e);
            self.status_message = e.to_string();
            if *e != TrimError::JobAlreadyRunning {
                self.notices
                    .push_back(Notice::new(NoticeLevel::Warning, "Cannot trim", e.to_string()));
            }
        }
        result
    }

    fn try_submit_trim_job(&mut self, dialogs: &dyn FileDialogs) -> Result<Option<JobId>, TrimError> {
        let source = self.source.as_ref().ok_or(TrimError::NoSourceLoaded)?;
        let selection = self.selection.ok_or(TrimError::NoSourceLoaded)?;
        if self.current_job.is_some() || self.runner.is_busy() {
            return Err(TrimError::JobAlreadyRunning);
        }
        selection.validate_for_export()?;

        let source_path = source.path.clone();
        let default_name = source.output_file_name(&self.config.output_suffix);
        let initial_dir = self
            .config
            .last_save_directory
            .clone()
            .or_else(|| source_path.parent().map(Path::to_path_buf));

        let Some(chosen) = dialogs.choose_save_path(&default_name, initial_dir.as_deref()) else {
            self.status_message = "Export cancelled".to_string();
            return Ok(None);
        };
        let destination = with_source_extension(chosen, &source_path);

        if let Some(dir) = destination.parent() {
            self.config.last_save_directory = Some(dir.to_path_buf());
            self.persist_config();
        }

        let mut job = TrimJob::new(TrimRequest {
            source: source_path,
            start: selection.start(),
            end: selection.end(),
            destination,
        });
        let id = self.runner.submit(&mut job)?;

        self.playback.pause();
        self.status_message = format!("Trimming to {}...", job.destination_name());
        self.current_job = Some(job);
        self.last_job_poll = None;
        Ok(Some(id))
    }

    /// Ask the running job to stop. Its final status arrives through
    /// `poll_job_status`.
    pub fn cancel_trim_job(&mut self) {
        if self.runner.cancel() {
            self.status_message = "Cancelling... Please wait".to_string();
        }
    }

    /// Apply pending job events. Once the job reaches a terminal status it
    /// is dropped and the outcome is reported.
    pub fn poll_job_status(&mut self) {
        for event in self.runner.poll() {
            let Some(job) = self.current_job.as_mut() else {
                log::warn!("Job event with no job on record: {:?}", event);
                continue;
            };
            if event.job_id() != job.id {
                continue;
            }

            match event {
                JobEvent::Progress { fraction, .. } => job.record_progress(fraction),
                JobEvent::Succeeded { output_duration, .. } => job.succeed(output_duration),
                JobEvent::Failed { message, .. } => job.fail(message),
                JobEvent::Cancelled { .. } => job.cancel(),
            }

            if job.status.is_terminal() {
                self.finish_job();
            }
        }
    }

    fn finish_job(&mut self) {
        let Some(job) = self.current_job.take() else {
            return;
        };

        match job.status {
            JobStatus::Succeeded => {
                let length = job.output_duration.unwrap_or_else(|| job.request.length());
                self.status_message = format!("Saved {}", job.destination_name());
                self.notices.push_back(Notice::new(
                    NoticeLevel::Info,
                    "Success",
                    format!(
                        "Video trimmed and saved successfully!\n\nLocation: {}\nDuration: {}",
                        job.request.destination.display(),
                        format_time(length)
                    ),
                ));
            }
            JobStatus::Failed => {
                let message = job.error.clone().unwrap_or_default();
                self.status_message = "Trim failed".to_string();
                self.notices.push_back(classify_failure(&message));
            }
            JobStatus::Cancelled => {
                self.status_message = TrimError::Cancelled.to_string();
            }
            JobStatus::Pending | JobStatus::Running => {}
        }

        if let Some(elapsed) = job.elapsed_seconds() {
            log::info!("Trim job {} ended as {:?} after {:.1}s", job.id, job.status, elapsed);
        }
    }

    fn persist_config(&self) {
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save_to(path) {
                log::warn!("Failed to save config: {}", e);
            }
        }
    }
}

fn check_openable(path: &Path) -> Result<(), TrimError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(TrimError::unreadable(path, "not a file")),
        Err(e) => Err(TrimError::unreadable(path, e)),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Clamp to the video and keep off the very end, where ffmpeg has no frame
/// left to decode.
fn frame_time(source: &MediaSource, t: f64) -> f64 {
    let t = if t.is_finite() { t } else { 0.0 };
    let frame = 1.0 / source.frame_rate.max(1.0);
    let last = (source.duration - frame).max(0.0);
    t.clamp(0.0, last)
}

/// Turn an encoder failure into a notice the user can act on.
pub fn classify_failure(message: &str) -> Notice {
    let lower = message.to_lowercase();
    if lower.contains("permission denied") || lower.contains("access is denied") {
        Notice::new(
            NoticeLevel::Error,
            "Permission Error",
            "Cannot write to the selected location. Please choose a different location or check file permissions.",
        )
    } else if lower.contains("not found. please install ffmpeg") {
        Notice::new(
            NoticeLevel::Error,
            "FFmpeg Error",
            "Video processing failed. Please ensure FFmpeg is properly installed.",
        )
    } else if lower.contains("no such file or directory") || lower.contains("cannot find the path") {
        Notice::new(
            NoticeLevel::Error,
            "File Error",
            "Output directory not found. Please select a valid location.",
        )
    } else if lower.contains("codec") || lower.contains("encoder") {
        Notice::new(
            NoticeLevel::Error,
            "Codec Error",
            "Video encoding failed. This might be due to an unsupported video format or codec issue.",
        )
    } else if lower.contains("memory") {
        Notice::new(
            NoticeLevel::Error,
            "Memory Error",
            "Not enough memory to process this video. Try trimming a shorter segment.",
        )
    } else {
        Notice::new(
            NoticeLevel::Error,
            "Error",
            TrimError::Encode(message.to_string()).to_string(),
        )
    }
}
