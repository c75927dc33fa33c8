#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use image::RgbaImage;
    use tempfile::TempDir;
    use crate::core::{AppConfig, MediaSource, TrimError, TrimRequest};
    use crate::gui::controller::{classify_failure, NoticeLevel, UiController};
    use crate::video::{EncodeError, Encoder, FileDialogs, FrameDecoder, MediaProber};

    /// 30 second video, unless the file name says otherwise.
    struct FakeProber;

    impl MediaProber for FakeProber {
        fn probe(&self, path: &Path) -> anyhow::Result<MediaSource> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            if name.starts_with("broken") {
                return Err(anyhow::anyhow!("moov atom not found"));
            }
            let duration = if name.starts_with("empty") {
                0.0
            } else if name.contains("--trimmothy") {
                10.0
            } else {
                30.0
            };
            Ok(MediaSource {
                path: path.to_path_buf(),
                duration,
                frame_rate: 25.0,
                width: 320,
                height: 240,
                frame_count: (duration * 25.0) as u64,
                video_codec: "h264".to_string(),
                audio_codec: Some("aac".to_string()),
                container: "mp4".to_string(),
            })
        }
    }

    struct FakeDecoder;

    impl FrameDecoder for FakeDecoder {
        fn frame_at(&self, _path: &Path, _seconds: f64, max_width: u32, max_height: u32) -> anyhow::Result<RgbaImage> {
            Ok(RgbaImage::new(max_width.min(8), max_height.min(8)))
        }
    }

    /// Runs until `release` is set or the job is cancelled, then succeeds or
    /// fails with `fail_with`.
    struct FakeEncoder {
        release: Arc<AtomicBool>,
        fail_with: Option<String>,
    }

    impl Encoder for FakeEncoder {
        fn trim(
            &self,
            request: &TrimRequest,
            on_progress: &mut dyn FnMut(f64),
            cancel: &AtomicBool,
        ) -> Result<PathBuf, EncodeError> {
            on_progress(0.3);
            let deadline = Instant::now() + Duration::from_secs(10);
            while !self.release.load(Ordering::SeqCst) && Instant::now() < deadline {
                if cancel.load(Ordering::Relaxed) {
                    return Err(EncodeError::Cancelled);
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            on_progress(0.6);
            match &self.fail_with {
                Some(message) => Err(EncodeError::Failed(message.clone())),
                None => Ok(request.destination.clone()),
            }
        }
    }

    struct FakeDialogs {
        open: Option<PathBuf>,
        save: Option<PathBuf>,
    }

    impl FileDialogs for FakeDialogs {
        fn choose_open_path(&self, _initial_dir: Option<&Path>) -> Option<PathBuf> {
            self.open.clone()
        }

        fn choose_save_path(&self, default_name: &str, initial_dir: Option<&Path>) -> Option<PathBuf> {
            assert!(default_name.contains("--trimmothy"));
            assert!(initial_dir.is_some());
            self.save.clone()
        }
    }

    struct Fixture {
        dir: TempDir,
        release: Arc<AtomicBool>,
        controller: UiController,
    }

    impl Fixture {
        /// Create an (empty) file the prober will be asked about.
        fn video(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, b"not really a video").unwrap();
            path
        }

        fn save_to(&self, name: &str) -> FakeDialogs {
            FakeDialogs {
                open: None,
                save: Some(self.dir.path().join(name)),
            }
        }
    }

    // Test helper to create a controller wired to fakes
    fn create_test_controller(fail_with: Option<&str>) -> Fixture {
        let release = Arc::new(AtomicBool::new(false));
        let encoder = Arc::new(FakeEncoder {
            release: release.clone(),
            fail_with: fail_with.map(str::to_string),
        });
        let controller = UiController::new(
            AppConfig::default(),
            Arc::new(FakeProber),
            Arc::new(FakeDecoder),
            encoder,
        )
        .unwrap();
        Fixture {
            dir: tempfile::tempdir().unwrap(),
            release,
            controller,
        }
    }

    fn wait_until(controller: &mut UiController, done: impl Fn(&UiController) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            controller.tick(Instant::now());
            if done(controller) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_open_resets_selection_and_cursor() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");

        let source = fx.controller.open_source(&path).unwrap();
        assert_eq!(source.duration, 30.0);

        let selection = fx.controller.selection().unwrap();
        assert_eq!((selection.start(), selection.end()), (0.0, 30.0));
        assert_eq!(fx.controller.cursor(), 0.0);
        assert_eq!(fx.controller.start_text, "00:00:00");
        assert_eq!(fx.controller.end_text, "00:00:30");
        assert_eq!(fx.controller.thumbnails().len(), 10);

        assert!(wait_until(&mut fx.controller, |c| c.preview_frame().is_some()));
        assert_eq!(fx.controller.preview_frame().unwrap().seconds, 0.0);
        assert!(wait_until(&mut fx.controller, |c| c
            .thumbnails()
            .iter()
            .all(|slot| slot.frame.is_some())));
    }

    #[test]
    fn test_failed_open_keeps_previous_video() {
        let mut fx = create_test_controller(None);
        let good = fx.video("match.mp4");
        fx.controller.open_source(&good).unwrap();
        fx.controller.set_selection_start(5.0).unwrap();
        let before = fx.controller.selection();

        let missing = fx.dir.path().join("missing.mp4");
        let err = fx.controller.open_source(&missing).unwrap_err();
        assert!(matches!(err, TrimError::FileUnreadable { .. }));

        let broken = fx.video("broken.mp4");
        assert!(fx.controller.open_source(&broken).is_err());

        assert_eq!(fx.controller.source().unwrap().path, good);
        assert_eq!(fx.controller.selection(), before);
        assert_eq!(fx.controller.notice().unwrap().level, NoticeLevel::Error);
        assert!(fx.controller.dismiss_notice().is_some());
        assert!(fx.controller.dismiss_notice().is_some());
        assert!(fx.controller.notice().is_none());
    }

    #[test]
    fn test_zero_length_video_is_rejected() {
        let mut fx = create_test_controller(None);
        let empty = fx.video("empty.mp4");
        assert!(matches!(
            fx.controller.open_source(&empty),
            Err(TrimError::FileUnreadable { .. })
        ));
        assert!(fx.controller.source().is_none());
    }

    #[test]
    fn test_background_open_applies_result() {
        let mut fx = create_test_controller(None);
        let path = fx.video("clip.mkv");

        fx.controller.request_open(path.clone()).unwrap();
        assert!(fx.controller.is_loading());
        assert!(wait_until(&mut fx.controller, |c| c.source().is_some()));
        assert!(!fx.controller.is_loading());
        assert_eq!(fx.controller.source().unwrap().path, path);

        let missing = fx.dir.path().join("gone.mp4");
        assert!(fx.controller.request_open(missing).is_err());
        assert!(!fx.controller.is_loading());
    }

    #[test]
    fn test_open_dialog_cancel_does_nothing() {
        let mut fx = create_test_controller(None);
        let dialogs = FakeDialogs { open: None, save: None };
        assert!(fx.controller.open_with_dialog(&dialogs).is_ok());
        assert!(!fx.controller.is_loading());
        assert!(fx.controller.source().is_none());
    }

    #[test]
    fn test_selection_requires_video() {
        let mut fx = create_test_controller(None);
        assert_eq!(fx.controller.set_selection_start(1.0), Err(TrimError::NoSourceLoaded));
        assert_eq!(fx.controller.commit_end_text(), Err(TrimError::NoSourceLoaded));
    }

    #[test]
    fn test_selection_edits_keep_text_in_sync() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        fx.controller.set_selection_start(75.0 / 5.0).unwrap();
        assert_eq!(fx.controller.start_text, "00:00:15");

        // Moving the end before the start drags the start along
        fx.controller.set_selection_end(10.0).unwrap();
        let selection = fx.controller.selection().unwrap();
        assert_eq!(selection.end(), 10.0);
        assert!(selection.start() < selection.end());
        assert_eq!(fx.controller.end_text, "00:00:10");

        assert!(matches!(
            fx.controller.set_selection_end(31.0),
            Err(TrimError::InvalidSelection(_))
        ));
        assert!(fx.controller.set_selection_start(f64::NAN).is_err());
        assert_eq!(fx.controller.selection().unwrap(), selection);
    }

    #[test]
    fn test_bad_time_text_is_rejected_without_changes() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();
        let before = fx.controller.selection();

        for bad in ["1:30", "00:61:00", "aa:bb:cc", "00:00:-1", ""] {
            fx.controller.start_text = bad.to_string();
            assert!(fx.controller.commit_start_text().is_err(), "{:?}", bad);
            assert_eq!(fx.controller.selection(), before);
            assert_eq!(fx.controller.start_text, "00:00:00");
        }

        fx.controller.end_text = "00:01:00".to_string();
        assert!(matches!(
            fx.controller.commit_end_text(),
            Err(TrimError::InvalidSelection(_))
        ));
        assert_eq!(fx.controller.end_text, "00:00:30");
        assert_eq!(fx.controller.selection(), before);
    }

    #[test]
    fn test_time_text_commits() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        fx.controller.start_text = " 00:00:12 ".to_string();
        fx.controller.commit_start_text().unwrap();
        fx.controller.end_text = "00:00:20".to_string();
        fx.controller.commit_end_text().unwrap();

        let selection = fx.controller.selection().unwrap();
        assert_eq!((selection.start(), selection.end()), (12.0, 20.0));
        assert_eq!(fx.controller.start_text, "00:00:12");
    }

    #[test]
    fn test_preview_requests_do_not_touch_selection() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();
        let before = fx.controller.selection();

        fx.controller.request_preview_frame(12.0);
        fx.controller.request_preview_frame(-3.0);
        fx.controller.request_preview_frame(500.0);
        assert!(wait_until(&mut fx.controller, |c| c
            .preview_frame()
            .map_or(false, |frame| frame.seconds > 29.0)));
        // Never past the last frame
        assert!(fx.controller.preview_frame().unwrap().seconds < 30.0);
        assert_eq!(fx.controller.selection(), before);
    }

    #[test]
    fn test_playback_stops_on_seek_and_at_end() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        fx.controller.toggle_playback();
        assert!(fx.controller.is_playing());
        fx.controller.advance_playback(Duration::from_secs(2));
        assert_eq!(fx.controller.cursor(), 2.0);

        fx.controller.seek(20.0);
        assert!(!fx.controller.is_playing());
        assert_eq!(fx.controller.cursor(), 20.0);

        fx.controller.toggle_playback();
        fx.controller.advance_playback(Duration::from_secs(15));
        assert!(!fx.controller.is_playing());
        assert_eq!(fx.controller.cursor(), 0.0);
    }

    #[test]
    fn test_preview_selection_stops_at_selection_end() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();
        fx.controller.set_selection_start(4.0).unwrap();
        fx.controller.set_selection_end(6.0).unwrap();

        fx.controller.preview_selection();
        assert_eq!(fx.controller.cursor(), 4.0);
        fx.controller.advance_playback(Duration::from_secs(1));
        assert!(fx.controller.is_playing());
        fx.controller.advance_playback(Duration::from_secs(5));
        assert!(!fx.controller.is_playing());
        assert_eq!(fx.controller.cursor(), 6.0);
    }

    #[test]
    fn test_thumbnail_click_seeks() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        fx.controller.select_thumbnail(2);
        assert_eq!(fx.controller.cursor(), 7.5);
        fx.controller.select_thumbnail(99);
        assert_eq!(fx.controller.cursor(), 7.5);
    }

    #[test]
    fn test_export_without_video() {
        let mut fx = create_test_controller(None);
        let dialogs = fx.save_to("out.mp4");
        assert_eq!(
            fx.controller.submit_trim_job(&dialogs),
            Err(TrimError::NoSourceLoaded)
        );
        assert!(fx.controller.notice().is_some());
    }

    #[test]
    fn test_export_dialog_cancel() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        let dialogs = FakeDialogs { open: None, save: None };
        assert_eq!(fx.controller.submit_trim_job(&dialogs), Ok(None));
        assert!(fx.controller.current_job().is_none());
        assert!(fx.controller.can_export());
    }

    #[test]
    fn test_export_runs_to_success() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();
        fx.controller.set_selection_start(10.0).unwrap();
        fx.controller.set_selection_end(20.0).unwrap();

        let dialogs = fx.save_to("match--trimmothy");
        let id = fx.controller.submit_trim_job(&dialogs).unwrap().unwrap();
        assert!(!fx.controller.can_export());

        let job = fx.controller.current_job().unwrap();
        assert_eq!(job.id, id);
        assert_eq!((job.request.start, job.request.end), (10.0, 20.0));
        // no extension given, the source's is used
        assert_eq!(job.request.destination, fx.dir.path().join("match--trimmothy.mp4"));

        assert!(wait_until(&mut fx.controller, |c| c
            .current_job()
            .map_or(false, |job| job.progress > 0.0)));
        fx.release.store(true, Ordering::SeqCst);
        assert!(wait_until(&mut fx.controller, |c| c.current_job().is_none()));

        assert!(fx.controller.can_export());
        let notice = fx.controller.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert!(notice.body.contains("Duration: 00:00:10"));
    }

    #[test]
    fn test_second_export_is_rejected_while_running() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        let dialogs = fx.save_to("a.mp4");
        let first = fx.controller.submit_trim_job(&dialogs).unwrap().unwrap();
        let selection = fx.controller.selection();

        let other = fx.save_to("b.mp4");
        assert_eq!(
            fx.controller.submit_trim_job(&other),
            Err(TrimError::JobAlreadyRunning)
        );
        assert_eq!(fx.controller.current_job().unwrap().id, first);
        assert_eq!(fx.controller.selection(), selection);

        fx.release.store(true, Ordering::SeqCst);
        assert!(wait_until(&mut fx.controller, |c| c.current_job().is_none()));
    }

    #[test]
    fn test_export_failure_shows_classified_notice() {
        let mut fx = create_test_controller(Some("ffmpeg exited with exit status: 1: Unknown encoder 'libx264'"));
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        let dialogs = fx.save_to("out.mp4");
        fx.controller.submit_trim_job(&dialogs).unwrap();
        fx.release.store(true, Ordering::SeqCst);
        assert!(wait_until(&mut fx.controller, |c| c.current_job().is_none()));

        let notice = fx.controller.notice().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.title, "Codec Error");
        assert!(fx.controller.can_export());
    }

    #[test]
    fn test_cancel_export() {
        let mut fx = create_test_controller(None);
        let path = fx.video("match.mp4");
        fx.controller.open_source(&path).unwrap();

        let dialogs = fx.save_to("out.mp4");
        fx.controller.submit_trim_job(&dialogs).unwrap();
        fx.controller.cancel_trim_job();
        assert!(wait_until(&mut fx.controller, |c| c.current_job().is_none()));
        assert_eq!(fx.controller.status(), "Trim cancelled");
        assert!(fx.controller.notice().is_none());
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(classify_failure("Permission denied").title, "Permission Error");
        assert_eq!(
            classify_failure("ffmpeg was not found. Please install FFmpeg or set its path in the config file").title,
            "FFmpeg Error"
        );
        assert_eq!(
            classify_failure("/nope/out.mp4: No such file or directory").title,
            "File Error"
        );
        assert_eq!(classify_failure("Cannot allocate memory").title, "Memory Error");

        let generic = classify_failure("something odd");
        assert_eq!(generic.title, "Error");
        assert_eq!(generic.body, "Failed to trim video: something odd");
    }
}
