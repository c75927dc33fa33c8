use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use anyhow::Result;
use image::RgbaImage;
use lru::LruCache;
use crate::video::collaborators::FrameDecoder;

/// Decoded frames kept around for scrubbing back and forth.
const FRAME_CACHE_CAPACITY: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// The big preview. Only the most recent request matters.
    Preview,
    /// Slot in the timeline thumbnail strip. Every request is decoded, in order.
    Thumbnail(usize),
}

/// Cache key: path, time rounded to 0.1s, and the requested box.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FrameKey {
    path: PathBuf,
    tenths: u64,
    max_width: u32,
    max_height: u32,
}

impl FrameKey {
    fn new(path: &Path, seconds: f64, max_width: u32, max_height: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            tenths: (seconds.max(0.0) * 10.0).round() as u64,
            max_width,
            max_height,
        }
    }
}

#[derive(Debug)]
struct FrameJob {
    generation: u64,
    kind: FrameKind,
    key: FrameKey,
    seconds: f64,
}

/// A finished decode, delivered to the UI thread.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub generation: u64,
    pub kind: FrameKind,
    pub seconds: f64,
    pub image: Result<Arc<RgbaImage>, String>,
}

/// Background frame decoder with LRU caching.
///
/// Each opened video gets a new generation; jobs and results from older
/// generations are dropped.
pub struct FrameLoader {
    job_sender: mpsc::Sender<FrameJob>,
    result_receiver: mpsc::Receiver<FrameResult>,
    cache: Arc<Mutex<LruCache<FrameKey, Arc<RgbaImage>>>>,
    generation: Arc<AtomicU64>,
}

impl FrameLoader {
    pub fn new(decoder: Arc<dyn FrameDecoder>) -> Result<Self> {
        let capacity = NonZeroUsize::new(FRAME_CACHE_CAPACITY)
            .ok_or_else(|| anyhow::anyhow!("frame cache capacity must be positive"))?;
        let cache = Arc::new(Mutex::new(LruCache::new(capacity)));
        let generation = Arc::new(AtomicU64::new(0));

        let (job_sender, job_receiver) = mpsc::channel::<FrameJob>();
        let (result_sender, result_receiver) = mpsc::channel::<FrameResult>();

        let worker_cache = cache.clone();
        let worker_generation = generation.clone();
        thread::Builder::new()
            .name("frame-loader".to_string())
            .spawn(move || {
                Self::frame_worker(decoder, job_receiver, result_sender, worker_cache, worker_generation);
            })?;

        Ok(Self {
            job_sender,
            result_receiver,
            cache,
            generation,
        })
    }

    /// Start a new generation (a new video was opened). Returns its number.
    pub fn begin_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the frame right away if it is cached, otherwise queues a
    /// decode whose result shows up in `completed`.
    pub fn request(
        &self,
        kind: FrameKind,
        path: &Path,
        seconds: f64,
        max_width: u32,
        max_height: u32,
    ) -> Option<Arc<RgbaImage>> {
        let key = FrameKey::new(path, seconds, max_width, max_height);

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(image) = cache.get(&key) {
                return Some(image.clone());
            }
        }

        let job = FrameJob {
            generation: self.generation(),
            kind,
            key,
            seconds,
        };
        if self.job_sender.send(job).is_err() {
            log::error!("Frame loader thread is gone, cannot decode frame at {:.2}s", seconds);
        }
        None
    }

    /// Finished decodes for the current generation (non-blocking).
    pub fn completed(&self) -> Vec<FrameResult> {
        let current = self.generation();
        let mut results = Vec::new();
        loop {
            match self.result_receiver.try_recv() {
                Ok(result) if result.generation == current => results.push(result),
                Ok(_) => {} // stale
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => break,
            }
        }
        results
    }

    fn frame_worker(
        decoder: Arc<dyn FrameDecoder>,
        job_receiver: mpsc::Receiver<FrameJob>,
        result_sender: mpsc::Sender<FrameResult>,
        cache: Arc<Mutex<LruCache<FrameKey, Arc<RgbaImage>>>>,
        generation: Arc<AtomicU64>,
    ) {
        let mut latest_preview: Option<FrameJob> = None;
        let mut thumbnails: VecDeque<FrameJob> = VecDeque::new();

        fn stash(job: FrameJob, latest: &mut Option<FrameJob>, queue: &mut VecDeque<FrameJob>) {
            match job.kind {
                FrameKind::Preview => *latest = Some(job),
                FrameKind::Thumbnail(_) => queue.push_back(job),
            }
        }

        loop {
            if latest_preview.is_none() && thumbnails.is_empty() {
                match job_receiver.recv() {
                    Ok(job) => stash(job, &mut latest_preview, &mut thumbnails),
                    Err(_) => break, // loader dropped
                }
            }
            while let Ok(job) = job_receiver.try_recv() {
                stash(job, &mut latest_preview, &mut thumbnails);
            }

            let Some(job) = latest_preview.take().or_else(|| thumbnails.pop_front()) else {
                continue;
            };
            if job.generation != generation.load(Ordering::SeqCst) {
                continue;
            }

            let image = match decoder.frame_at(&job.key.path, job.seconds, job.key.max_width, job.key.max_height) {
                Ok(image) => {
                    let image = Arc::new(image);
                    if let Ok(mut cache) = cache.lock() {
                        cache.put(job.key.clone(), image.clone());
                    }
                    log::debug!("Decoded {:?} frame at {:.2}s", job.kind, job.seconds);
                    Ok(image)
                }
                Err(e) => {
                    log::warn!("Frame decode failed at {:.2}s: {}", job.seconds, e);
                    Err(e.to_string())
                }
            };

            let result = FrameResult {
                generation: job.generation,
                kind: job.kind,
                seconds: job.seconds,
                image,
            };
            if result_sender.send(result).is_err() {
                break; // UI dropped the receiver
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    struct CountingDecoder {
        calls: AtomicUsize,
    }

    impl FrameDecoder for CountingDecoder {
        fn frame_at(&self, path: &Path, seconds: f64, max_width: u32, max_height: u32) -> Result<RgbaImage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if path.ends_with("corrupt.mp4") {
                return Err(anyhow::anyhow!("invalid data found when processing input"));
            }
            let shade = (seconds as u32 % 256) as u8;
            Ok(RgbaImage::from_pixel(max_width.min(4), max_height.min(4), image::Rgba([shade, 0, 0, 255])))
        }
    }

    fn wait_for(loader: &FrameLoader, count: usize) -> Vec<FrameResult> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut results = Vec::new();
        while results.len() < count && Instant::now() < deadline {
            results.extend(loader.completed());
            std::thread::sleep(Duration::from_millis(5));
        }
        results
    }

    #[test]
    fn test_decoded_frames_are_cached() {
        let decoder = Arc::new(CountingDecoder { calls: AtomicUsize::new(0) });
        let loader = FrameLoader::new(decoder.clone()).unwrap();
        loader.begin_generation();
        let path = Path::new("/v/a.mp4");

        assert!(loader.request(FrameKind::Preview, path, 3.0, 64, 64).is_none());
        let results = wait_for(&loader, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].kind, FrameKind::Preview);
        assert!(results[0].image.is_ok());

        // 3.04 rounds to the same 0.1s bucket
        let cached = loader.request(FrameKind::Preview, path, 3.04, 64, 64);
        assert!(cached.is_some());
        assert_eq!(decoder.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_thumbnails_are_all_delivered_and_errors_reported() {
        let decoder = Arc::new(CountingDecoder { calls: AtomicUsize::new(0) });
        let loader = FrameLoader::new(decoder).unwrap();
        loader.begin_generation();

        for i in 0..4 {
            loader.request(FrameKind::Thumbnail(i), Path::new("/v/a.mp4"), i as f64 * 2.0, 16, 16);
        }
        loader.request(FrameKind::Preview, Path::new("/v/corrupt.mp4"), 1.0, 16, 16);

        let results = wait_for(&loader, 5);
        let thumbs: Vec<_> = results.iter().filter(|r| matches!(r.kind, FrameKind::Thumbnail(_))).collect();
        assert_eq!(thumbs.len(), 4);
        let preview = results.iter().find(|r| r.kind == FrameKind::Preview).unwrap();
        assert!(preview.image.is_err());
    }

    #[test]
    fn test_results_from_previous_generation_are_dropped() {
        let decoder = Arc::new(CountingDecoder { calls: AtomicUsize::new(0) });
        let loader = FrameLoader::new(decoder).unwrap();
        loader.begin_generation();

        loader.request(FrameKind::Thumbnail(0), Path::new("/v/old.mp4"), 1.0, 16, 16);
        std::thread::sleep(Duration::from_millis(200));
        let new_generation = loader.begin_generation();

        loader.request(FrameKind::Thumbnail(0), Path::new("/v/new.mp4"), 1.0, 16, 16);
        let results = wait_for(&loader, 1);
        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.generation == new_generation));
    }
}
