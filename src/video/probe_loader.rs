use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use tokio::sync::mpsc;
use crate::core::MediaSource;
use crate::video::collaborators::MediaProber;

#[derive(Debug)]
struct ProbeRequest {
    file_path: PathBuf,
    request_id: u64,
}

/// Outcome of one `ProbeLoader::request`. The error is already a display
/// string, ready for a notice.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub request_id: u64,
    pub file_path: PathBuf,
    pub result: Result<MediaSource, String>,
}

/// Background media probing. Each probe is a blocking task on a private
/// one-worker runtime; `completed_results` never blocks.
pub struct ProbeLoader {
    request_sender: mpsc::UnboundedSender<ProbeRequest>,
    result_receiver: Arc<Mutex<mpsc::UnboundedReceiver<ProbeResult>>>,
    next_request_id: u64,
}

impl ProbeLoader {
    pub fn new(prober: Arc<dyn MediaProber>) -> anyhow::Result<Self> {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ProbeRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<ProbeResult>();

        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("trimmothy-probe")
            .enable_all()
            .build()?;

        thread::Builder::new()
            .name("trimmothy-probe-dispatch".to_string())
            .spawn(move || {
                rt.block_on(async {
                    while let Some(request) = request_rx.recv().await {
                        let result_tx = result_tx.clone();
                        let prober = prober.clone();

                        tokio::task::spawn_blocking(move || {
                            let started = std::time::Instant::now();
                            let result = prober.probe(&request.file_path).map_err(|e| e.to_string());
                            match &result {
                                Ok(source) => log::info!(
                                    "{} is {} ({}x{}, {:.2}s), probed in {} ms",
                                    request.file_path.display(),
                                    source.video_codec,
                                    source.width,
                                    source.height,
                                    source.duration,
                                    started.elapsed().as_millis()
                                ),
                                Err(e) => log::warn!("Cannot read {}: {}", request.file_path.display(), e),
                            }

                            // The loader is gone when the app is closing
                            let _ = result_tx.send(ProbeResult {
                                request_id: request.request_id,
                                file_path: request.file_path,
                                result,
                            });
                        });
                    }
                });
            })?;

        Ok(Self {
            request_sender: request_tx,
            result_receiver: Arc::new(Mutex::new(result_rx)),
            next_request_id: 0,
        })
    }

    /// Returns the id the outcome will carry, so a caller can ignore
    /// outcomes of files it no longer wants.
    pub fn request(&mut self, file_path: PathBuf) -> u64 {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        if self.request_sender.send(ProbeRequest { file_path, request_id }).is_err() {
            log::error!("Probe dispatcher has stopped, request {} dropped", request_id);
        }
        request_id
    }

    pub fn completed_results(&self) -> Vec<ProbeResult> {
        let Ok(mut receiver) = self.result_receiver.lock() else {
            return Vec::new();
        };
        std::iter::from_fn(|| receiver.try_recv().ok()).collect()
    }
}
