use chrono::{DateTime, Local};
use std::path::PathBuf;
use uuid::Uuid;

pub type JobId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// What the encoder needs to cut one range out of a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrimRequest {
    pub source: PathBuf,
    pub start: f64,
    pub end: f64,
    pub destination: PathBuf,
}

impl TrimRequest {
    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// One export, from the moment the user confirms the save path until its
/// terminal status has been shown.
#[derive(Debug, Clone)]
pub struct TrimJob {
    pub id: JobId,
    pub request: TrimRequest,
    pub status: JobStatus,
    pub progress: f64,
    pub error: Option<String>,
    pub output_duration: Option<f64>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
}

impl TrimJob {
    pub fn new(request: TrimRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            request,
            status: JobStatus::Pending,
            progress: 0.0,
            error: None,
            output_duration: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Local::now());
    }

    /// Progress never moves backwards and stays within [0, 1].
    pub fn record_progress(&mut self, fraction: f64) {
        if self.status == JobStatus::Running && fraction.is_finite() {
            self.progress = self.progress.max(fraction.clamp(0.0, 1.0));
        }
    }

    pub fn succeed(&mut self, output_duration: Option<f64>) {
        if self.finish(JobStatus::Succeeded) {
            self.progress = 1.0;
            self.output_duration = output_duration;
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        if self.finish(JobStatus::Failed) {
            self.error = Some(message.into());
        }
    }

    pub fn cancel(&mut self) {
        self.finish(JobStatus::Cancelled);
    }

    fn finish(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.finished_at = Some(Local::now());
        true
    }

    pub fn elapsed_seconds(&self) -> Option<f64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds() as f64 / 1000.0),
            _ => None,
        }
    }

    pub fn destination_name(&self) -> String {
        self.request
            .destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.request.destination.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TrimRequest {
        TrimRequest {
            source: PathBuf::from("/videos/in.mp4"),
            start: 10.0,
            end: 20.0,
            destination: PathBuf::from("/videos/in--trimmothy.mp4"),
        }
    }

    #[test]
    fn test_job_lifecycle() {
        let mut job = TrimJob::new(request());
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.request.length(), 10.0);

        job.mark_running();
        job.record_progress(0.4);
        job.record_progress(0.2);
        assert_eq!(job.progress, 0.4);
        job.record_progress(7.0);
        assert_eq!(job.progress, 1.0);

        job.succeed(Some(10.0));
        assert_eq!(job.status, JobStatus::Succeeded);
        assert!(job.elapsed_seconds().is_some());
        assert_eq!(job.destination_name(), "in--trimmothy.mp4");
    }

    #[test]
    fn test_terminal_status_is_final() {
        let mut job = TrimJob::new(request());
        job.mark_running();
        job.fail("disk full");
        job.cancel();
        job.succeed(None);
        assert_eq!(job.status, JobStatus::Failed);
        assert_ne!(job.progress, 1.0);
        assert_eq!(job.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_progress_ignored_unless_running() {
        let mut job = TrimJob::new(request());
        job.record_progress(0.5);
        assert_eq!(job.progress, 0.0);
    }
}
