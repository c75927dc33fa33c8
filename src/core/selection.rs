use crate::core::TrimError;

/// Shortest range that can be exported.
pub const MIN_SELECTION_SECONDS: f64 = 0.1;

/// The user's trim range inside a loaded video.
///
/// Invariant: `0 <= start < end <= duration`, and the range is never shorter
/// than `MIN_SELECTION_SECONDS` (or the whole video, if that is shorter).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    start: f64,
    end: f64,
    duration: f64,
}

impl Selection {
    /// Selection covering the whole video. `duration` must be positive.
    pub fn full(duration: f64) -> Self {
        Self {
            start: 0.0,
            end: duration,
            duration,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }

    fn min_gap(&self) -> f64 {
        MIN_SELECTION_SECONDS.min(self.duration)
    }

    fn check_bounds(&self, t: f64) -> Result<(), TrimError> {
        if !t.is_finite() || t < 0.0 || t > self.duration {
            return Err(TrimError::InvalidSelection(format!(
                "{:.3}s is outside the video (0 - {:.3}s)",
                t, self.duration
            )));
        }
        Ok(())
    }

    /// Move the start. Pushes the end forward if they would cross; a start at
    /// the very end of the video is pulled back by the minimum gap.
    pub fn set_start(&mut self, t: f64) -> Result<(), TrimError> {
        self.check_bounds(t)?;
        let gap = self.min_gap();
        self.start = t.min(self.duration - gap);
        if self.end - self.start < gap {
            self.end = (self.start + gap).min(self.duration);
        }
        Ok(())
    }

    /// Move the end. Pulls the start back if they would cross.
    pub fn set_end(&mut self, t: f64) -> Result<(), TrimError> {
        self.check_bounds(t)?;
        let gap = self.min_gap();
        self.end = t.max(gap);
        if self.end - self.start < gap {
            self.start = (self.end - gap).max(0.0);
        }
        Ok(())
    }

    /// Final check before a range is handed to the encoder.
    pub fn validate_for_export(&self) -> Result<(), TrimError> {
        if self.start < 0.0 || self.end > self.duration {
            return Err(TrimError::InvalidSelection(
                "selection is outside video bounds".to_string(),
            ));
        }
        if self.start >= self.end {
            return Err(TrimError::InvalidSelection(
                "start time must be before end time".to_string(),
            ));
        }
        if self.length() + 1e-9 < MIN_SELECTION_SECONDS {
            return Err(TrimError::InvalidSelection(format!(
                "trim duration too short (minimum {} seconds)",
                MIN_SELECTION_SECONDS
            )));
        }
        Ok(())
    }
}
