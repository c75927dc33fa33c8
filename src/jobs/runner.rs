use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use crate::core::{JobId, TrimError, TrimJob, TrimRequest};
use crate::jobs::JobEvent;
use crate::video::{EncodeError, Encoder, MediaProber};

/// Room for progress updates between two UI polls. When full, intermediate
/// progress is dropped; terminal events always get through.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Intermediate progress stops here so that 1.0 is only ever reported for a
/// finished file.
const PROGRESS_CEILING: f64 = 0.99;

struct ActiveJob {
    id: JobId,
    cancel: Arc<AtomicBool>,
    events: mpsc::Receiver<JobEvent>,
    worker: thread::JoinHandle<()>,
}

/// Runs at most one trim at a time on a dedicated worker thread.
///
/// The active-job slot is only touched from the owning (UI) thread. The
/// worker writes to the event channel and reads the cancel flag, nothing
/// else.
pub struct TrimJobRunner {
    encoder: Arc<dyn Encoder>,
    prober: Option<Arc<dyn MediaProber>>,
    active: Option<ActiveJob>,
}

impl TrimJobRunner {
    /// `prober`, when given, is used to report the duration of each written
    /// file.
    pub fn new(encoder: Arc<dyn Encoder>, prober: Option<Arc<dyn MediaProber>>) -> Self {
        Self {
            encoder,
            prober,
            active: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn active_job(&self) -> Option<JobId> {
        self.active.as_ref().map(|active| active.id)
    }

    /// Start `job` on a worker thread. Fails fast if another job is still
    /// active; the active job is not affected.
    pub fn submit(&mut self, job: &mut TrimJob) -> Result<JobId, TrimError> {
        if let Some(active) = &self.active {
            log::warn!("Rejecting trim job {}: job {} is still running", job.id, active.id);
            return Err(TrimError::JobAlreadyRunning);
        }

        let (event_tx, event_rx) = mpsc::sync_channel(EVENT_CHANNEL_CAPACITY);
        let cancel = Arc::new(AtomicBool::new(false));

        let id = job.id;
        let request = job.request.clone();
        let encoder = self.encoder.clone();
        let prober = self.prober.clone();
        let worker_cancel = cancel.clone();

        let worker = thread::Builder::new()
            .name("trim-worker".to_string())
            .spawn(move || {
                run_job(id, request, encoder, prober, worker_cancel, event_tx);
            })
            .map_err(|e| TrimError::Encode(format!("could not start trim worker: {}", e)))?;

        job.mark_running();
        log::info!(
            "Started trim job {}: {} [{:.3}s - {:.3}s] -> {}",
            id,
            job.request.source.display(),
            job.request.start,
            job.request.end,
            job.request.destination.display()
        );

        self.active = Some(ActiveJob {
            id,
            cancel,
            events: event_rx,
            worker,
        });
        Ok(id)
    }

    /// Ask the active job to stop. Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        match &self.active {
            Some(active) => {
                log::info!("Cancellation requested for trim job {}", active.id);
                active.cancel.store(true, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Drain pending events without blocking. The active slot is freed once
    /// a terminal event has been handed out.
    pub fn poll(&mut self) -> Vec<JobEvent> {
        let Some(active) = &self.active else {
            return Vec::new();
        };

        let mut events = Vec::new();
        let mut finished = false;
        loop {
            match active.events.try_recv() {
                Ok(event) => {
                    finished = event.is_terminal();
                    events.push(event);
                    if finished {
                        break;
                    }
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => {
                    log::error!("Trim worker for job {} exited without a result", active.id);
                    events.push(JobEvent::Failed {
                        job: active.id,
                        message: "Trim worker stopped unexpectedly".to_string(),
                    });
                    finished = true;
                    break;
                }
            }
        }

        if finished {
            if let Some(active) = self.active.take() {
                // The worker has sent its last event, so this returns at once
                let _ = active.worker.join();
            }
        }
        events
    }
}

impl Drop for TrimJobRunner {
    /// Cancels the active job and waits for its worker, so ffmpeg is gone
    /// and its partial file removed before the process exits.
    fn drop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        log::info!("Stopping trim job {} before shutdown", active.id);
        active.cancel.store(true, Ordering::Relaxed);
        if active.worker.join().is_err() {
            log::warn!("Trim worker for job {} panicked during shutdown", active.id);
        }
    }
}

fn run_job(
    id: JobId,
    request: TrimRequest,
    encoder: Arc<dyn Encoder>,
    prober: Option<Arc<dyn MediaProber>>,
    cancel: Arc<AtomicBool>,
    events: mpsc::SyncSender<JobEvent>,
) {
    let mut reported = 0.0_f64;
    let mut on_progress = |fraction: f64| {
        if !fraction.is_finite() {
            return;
        }
        let fraction = fraction.clamp(0.0, PROGRESS_CEILING);
        if fraction > reported {
            reported = fraction;
            let _ = events.try_send(JobEvent::Progress { job: id, fraction });
        }
    };

    let result = encoder.trim(&request, &mut on_progress, &cancel);

    let terminal = match result {
        Ok(destination) => {
            let _ = events.send(JobEvent::Progress { job: id, fraction: 1.0 });
            let output_duration = probe_output(prober.as_deref(), &destination);
            log::info!("Trim job {} finished: {}", id, destination.display());
            JobEvent::Succeeded {
                job: id,
                destination,
                output_duration,
            }
        }
        Err(EncodeError::Cancelled) => {
            log::info!("Trim job {} cancelled", id);
            JobEvent::Cancelled { job: id }
        }
        Err(e) => {
            log::error!("Trim job {} failed: {}", id, e);
            JobEvent::Failed {
                job: id,
                message: e.to_string(),
            }
        }
    };

    if events.send(terminal).is_err() {
        log::warn!("Trim job {} finished but nobody is listening", id);
    }
}

fn probe_output(prober: Option<&dyn MediaProber>, destination: &Path) -> Option<f64> {
    let prober = prober?;
    match prober.probe(destination) {
        Ok(source) => Some(source.duration),
        Err(e) => {
            log::warn!("Could not probe trimmed file {}: {}", destination.display(), e);
            None
        }
    }
}
