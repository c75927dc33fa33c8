use std::time::Duration;

/// What a call to `Playback::advance` did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackTick {
    /// Not playing; nothing moved.
    Idle,
    /// The cursor moved. `frame_due` is set once per preview interval.
    Advanced { frame_due: bool },
    /// Playback reached its stop point this tick.
    Stopped,
}

/// Timer-driven playback cursor.
///
/// There is no real decoder behind it: the cursor moves with wall time and
/// the controller fetches a still frame whenever one is due.
#[derive(Debug, Clone)]
pub struct Playback {
    cursor: f64,
    duration: f64,
    is_playing: bool,
    stop_at: Option<f64>,
    frame_interval: Duration,
    since_last_frame: Duration,
}

impl Playback {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            cursor: 0.0,
            duration: 0.0,
            is_playing: false,
            stop_at: None,
            frame_interval,
            since_last_frame: Duration::ZERO,
        }
    }

    /// New video loaded: stop and rewind.
    pub fn reset(&mut self, duration: f64) {
        self.pause();
        self.duration = duration.max(0.0);
        self.cursor = 0.0;
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn play(&mut self) {
        if self.duration <= 0.0 || self.is_playing {
            return;
        }
        if self.cursor >= self.duration {
            self.cursor = 0.0;
        }
        self.is_playing = true;
        self.stop_at = None;
        self.since_last_frame = Duration::ZERO;
        log::info!("Started playback at {:.3}s", self.cursor);
    }

    /// Play `[start, end]` and stop at `end`.
    pub fn play_range(&mut self, start: f64, end: f64) {
        self.pause();
        self.cursor = start.clamp(0.0, self.duration);
        self.play();
        if self.is_playing {
            self.stop_at = Some(end.clamp(self.cursor, self.duration));
        }
    }

    pub fn pause(&mut self) {
        if self.is_playing {
            log::info!("Stopped playback at {:.3}s", self.cursor);
        }
        self.is_playing = false;
        self.stop_at = None;
    }

    pub fn toggle(&mut self) {
        if self.is_playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Manual seek. Always stops playback. Returns the clamped position.
    pub fn seek(&mut self, time: f64) -> f64 {
        self.pause();
        self.cursor = if time.is_finite() {
            time.clamp(0.0, self.duration)
        } else {
            0.0
        };
        self.cursor
    }

    pub fn advance(&mut self, elapsed: Duration) -> PlaybackTick {
        if !self.is_playing {
            return PlaybackTick::Idle;
        }

        self.cursor += elapsed.as_secs_f64();

        if let Some(stop_at) = self.stop_at {
            if self.cursor >= stop_at {
                self.cursor = stop_at;
                self.pause();
                return PlaybackTick::Stopped;
            }
        }

        if self.cursor >= self.duration {
            // End of video rewinds, like a finished player would
            self.pause();
            self.cursor = 0.0;
            return PlaybackTick::Stopped;
        }

        self.since_last_frame += elapsed;
        let frame_due = self.since_last_frame >= self.frame_interval;
        if frame_due {
            self.since_last_frame = Duration::ZERO;
        }
        PlaybackTick::Advanced { frame_due }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing(duration: f64) -> Playback {
        let mut playback = Playback::new(Duration::from_millis(200));
        playback.reset(duration);
        playback.play();
        playback
    }

    #[test]
    fn test_cursor_follows_elapsed_time() {
        let mut playback = playing(10.0);
        assert_eq!(
            playback.advance(Duration::from_millis(100)),
            PlaybackTick::Advanced { frame_due: false }
        );
        assert_eq!(
            playback.advance(Duration::from_millis(100)),
            PlaybackTick::Advanced { frame_due: true }
        );
        assert!((playback.cursor() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_end_of_video_stops_and_rewinds() {
        let mut playback = playing(1.0);
        playback.seek(0.9);
        playback.play();
        assert_eq!(playback.advance(Duration::from_millis(300)), PlaybackTick::Stopped);
        assert!(!playback.is_playing());
        assert_eq!(playback.cursor(), 0.0);
    }

    #[test]
    fn test_seek_stops_playback() {
        let mut playback = playing(10.0);
        assert_eq!(playback.seek(42.0), 10.0);
        assert!(!playback.is_playing());
        assert_eq!(playback.advance(Duration::from_secs(1)), PlaybackTick::Idle);
        assert_eq!(playback.seek(f64::NAN), 0.0);
    }

    #[test]
    fn test_range_playback_stops_at_range_end() {
        let mut playback = Playback::new(Duration::from_millis(200));
        playback.reset(30.0);
        playback.play_range(5.0, 5.5);
        assert_eq!(playback.cursor(), 5.0);
        playback.advance(Duration::from_millis(300));
        assert!(playback.is_playing());
        assert_eq!(playback.advance(Duration::from_millis(300)), PlaybackTick::Stopped);
        assert_eq!(playback.cursor(), 5.5);
        assert!(!playback.is_playing());
    }

    #[test]
    fn test_nothing_plays_without_a_video() {
        let mut playback = Playback::new(Duration::from_millis(200));
        playback.play();
        assert!(!playback.is_playing());
        playback.toggle();
        assert!(!playback.is_playing());
    }
}
