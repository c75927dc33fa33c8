use crate::core::{JobId, JobStatus};
use std::path::PathBuf;

/// Status updates posted by the trim worker for the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress {
        job: JobId,
        fraction: f64,
    },
    Succeeded {
        job: JobId,
        destination: PathBuf,
        /// Duration of the written file as reported by the prober.
        output_duration: Option<f64>,
    },
    Failed {
        job: JobId,
        message: String,
    },
    Cancelled {
        job: JobId,
    },
}

impl JobEvent {
    pub fn job_id(&self) -> JobId {
        match self {
            JobEvent::Progress { job, .. }
            | JobEvent::Succeeded { job, .. }
            | JobEvent::Failed { job, .. }
            | JobEvent::Cancelled { job } => *job,
        }
    }

    /// Status the job is in once this event has been applied.
    pub fn status(&self) -> JobStatus {
        match self {
            JobEvent::Progress { .. } => JobStatus::Running,
            JobEvent::Succeeded { .. } => JobStatus::Succeeded,
            JobEvent::Failed { .. } => JobStatus::Failed,
            JobEvent::Cancelled { .. } => JobStatus::Cancelled,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }
}
