use crate::core::{MediaSource, TrimRequest};
use crate::video::collaborators::{EncodeError, Encoder, FrameDecoder, MediaProber};
use crate::video::ffmpeg_tools::FfmpegTools;
use image::RgbaImage;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Lines of ffmpeg stderr kept for error messages.
const STDERR_TAIL_LINES: usize = 8;

/// Longest a running ffmpeg goes unchecked for cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// ffmpeg/ffprobe backed prober, frame decoder and encoder.
pub struct VideoProcessor {
    tools: FfmpegTools,
}

impl VideoProcessor {
    pub fn new(tools: FfmpegTools) -> Self {
        Self { tools }
    }

    fn run_strategy(
        &self,
        strategy: EncodeStrategy,
        request: &TrimRequest,
        output: &Path,
        on_progress: &mut dyn FnMut(f64),
        cancel: &AtomicBool,
    ) -> Result<(), EncodeError> {
        let length = request.length();

        let mut cmd = self.tools.ffmpeg_command();
        cmd.args(["-y", "-hide_banner", "-v", "error", "-nostats", "-progress", "pipe:1"])
            .arg("-ss")
            .arg(format!("{:.3}", request.start))
            .arg("-i")
            .arg(&request.source)
            .arg("-t")
            .arg(format!("{:.3}", length))
            .args(strategy.codec_args())
            .arg(output)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        log::debug!("Running {} strategy: {:?}", strategy.name(), cmd);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EncodeError::ToolMissing(self.tools.ffmpeg.clone())
            } else {
                EncodeError::Io(e)
            }
        })?;

        // Drain stderr on its own thread so a chatty ffmpeg cannot fill the
        // pipe while the progress loop runs.
        let stderr = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            text
        });

        // Progress lines arrive on a channel so the cancel flag is checked
        // even while ffmpeg prints nothing.
        let (progress_tx, progress_rx) = mpsc::channel();
        let stdout = child.stdout.take();
        let stdout_reader = thread::spawn(move || {
            let Some(stdout) = stdout else { return };
            for line in BufReader::new(stdout).lines().map_while(Result::ok) {
                if let Some(fraction) = parse_progress_line(&line, length) {
                    if progress_tx.send(fraction).is_err() {
                        break;
                    }
                }
            }
        });

        let status = loop {
            if cancel.load(Ordering::Relaxed) {
                log::info!("Cancelling ffmpeg ({} strategy)", strategy.name());
                let _ = child.kill();
                let _ = child.wait();
                return Err(EncodeError::Cancelled);
            }
            match progress_rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(fraction) => on_progress(fraction),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    // stdout is closed, wait for the exit without blocking
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    thread::sleep(CANCEL_POLL_INTERVAL);
                }
            }
        };
        let _ = stdout_reader.join();
        let stderr_text = stderr_reader.join().unwrap_or_default();

        if cancel.load(Ordering::Relaxed) {
            return Err(EncodeError::Cancelled);
        }
        if !status.success() {
            return Err(EncodeError::Failed(format!(
                "ffmpeg exited with {}: {}",
                status,
                stderr_tail(&stderr_text)
            )));
        }
        Ok(())
    }
}

impl MediaProber for VideoProcessor {
    fn probe(&self, path: &Path) -> anyhow::Result<MediaSource> {
        let mut cmd = self.tools.ffprobe_command();
        cmd.arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path);

        let output = self.tools.run(cmd)?;
        let json_str = String::from_utf8(output.stdout)?;
        parse_probe_output(path, &json_str)
    }
}

impl FrameDecoder for VideoProcessor {
    fn frame_at(&self, path: &Path, seconds: f64, max_width: u32, max_height: u32) -> anyhow::Result<RgbaImage> {
        let mut cmd = self.tools.ffmpeg_command();
        cmd.arg("-v").arg("error")
            .arg("-ss").arg(format!("{:.3}", seconds.max(0.0))) // seek before input, much faster
            .arg("-i").arg(path)
            .arg("-frames:v").arg("1")
            .arg("-vf").arg(format!(
                "scale={}:{}:force_original_aspect_ratio=decrease",
                max_width, max_height
            ))
            .arg("-f").arg("image2pipe")
            .arg("-vcodec").arg("png")
            .arg("-");

        let output = self.tools.run(cmd)?;
        if output.stdout.is_empty() {
            return Err(anyhow::anyhow!("No frame decoded at {:.3}s", seconds));
        }

        let img = image::load_from_memory(&output.stdout)?;
        Ok(img.to_rgba8())
    }
}

impl Encoder for VideoProcessor {
    fn trim(
        &self,
        request: &TrimRequest,
        on_progress: &mut dyn FnMut(f64),
        cancel: &AtomicBool,
    ) -> Result<PathBuf, EncodeError> {
        if let Some(parent) = request.destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let partial = partial_output_path(&request.destination);
        let mut last_error = None;

        for strategy in EncodeStrategy::ALL {
            if cancel.load(Ordering::Relaxed) {
                remove_partial(&partial);
                return Err(EncodeError::Cancelled);
            }

            log::info!(
                "Trimming {} [{:.3}s - {:.3}s] with {} strategy",
                request.source.display(),
                request.start,
                request.end,
                strategy.name()
            );

            match self.run_strategy(strategy, request, &partial, on_progress, cancel) {
                Ok(()) => {
                    if let Err(e) = std::fs::rename(&partial, &request.destination) {
                        remove_partial(&partial);
                        return Err(EncodeError::Io(e));
                    }
                    log::info!("Trim written to {}", request.destination.display());
                    return Ok(request.destination.clone());
                }
                Err(EncodeError::Failed(message)) => {
                    log::warn!("Strategy {} failed: {}", strategy.name(), message);
                    remove_partial(&partial);
                    last_error = Some(EncodeError::Failed(message));
                }
                Err(other) => {
                    remove_partial(&partial);
                    return Err(other);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| EncodeError::Failed("Video processing failed".to_string())))
    }
}

/// Ways of producing the output, fastest first. Each one is tried until
/// ffmpeg accepts it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStrategy {
    StreamCopy,
    CopyVideoReencodeAudio,
    FastReencode,
    CompatibleReencode,
}

impl EncodeStrategy {
    pub const ALL: [EncodeStrategy; 4] = [
        EncodeStrategy::StreamCopy,
        EncodeStrategy::CopyVideoReencodeAudio,
        EncodeStrategy::FastReencode,
        EncodeStrategy::CompatibleReencode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EncodeStrategy::StreamCopy => "stream copy",
            EncodeStrategy::CopyVideoReencodeAudio => "video copy",
            EncodeStrategy::FastReencode => "fast re-encode",
            EncodeStrategy::CompatibleReencode => "compatible re-encode",
        }
    }

    pub fn codec_args(self) -> &'static [&'static str] {
        match self {
            EncodeStrategy::StreamCopy => &["-c", "copy", "-avoid_negative_ts", "make_zero"],
            EncodeStrategy::CopyVideoReencodeAudio => &[
                "-c:v", "copy", "-c:a", "aac", "-b:a", "128k", "-avoid_negative_ts", "make_zero",
            ],
            EncodeStrategy::FastReencode => &[
                "-c:v", "libx264", "-preset", "veryfast", "-crf", "23", "-c:a", "aac", "-b:a", "128k",
            ],
            EncodeStrategy::CompatibleReencode => &[
                "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-c:a", "aac", "-b:a", "128k",
                "-movflags", "+faststart",
            ],
        }
    }
}

/// Hidden sibling the encoder writes to before the final rename, e.g.
/// `/out/.clip.trimmothy-partial.mp4`. The extension is kept so ffmpeg can
/// still pick the muxer from it.
pub fn partial_output_path(destination: &Path) -> PathBuf {
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match destination.extension() {
        Some(ext) => format!(".{}.trimmothy-partial.{}", stem, ext.to_string_lossy()),
        None => format!(".{}.trimmothy-partial", stem),
    };
    destination.with_file_name(name)
}

fn remove_partial(partial: &Path) {
    if partial.exists() {
        if let Err(e) = std::fs::remove_file(partial) {
            log::warn!("Failed to remove partial output {}: {}", partial.display(), e);
        }
    }
}

/// Turn one `-progress pipe:1` line into a completion fraction.
pub fn parse_progress_line(line: &str, length: f64) -> Option<f64> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // out_time_ms is also microseconds, despite the name
        "out_time_us" | "out_time_ms" => {
            let micros = value.trim().parse::<i64>().ok()?;
            if length <= 0.0 {
                return None;
            }
            Some((micros.max(0) as f64 / 1_000_000.0 / length).clamp(0.0, 1.0))
        }
        "progress" if value.trim() == "end" => Some(1.0),
        _ => None,
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "no error output".to_string();
    }
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Parse `ffprobe -print_format json -show_format -show_streams` output.
pub fn parse_probe_output(path: &Path, json_str: &str) -> anyhow::Result<MediaSource> {
    let info: serde_json::Value = serde_json::from_str(json_str)?;

    let empty_vec = vec![];
    let streams = info["streams"].as_array().unwrap_or(&empty_vec);

    let video = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("video"))
        .ok_or_else(|| anyhow::anyhow!("No video stream found"))?;
    let audio = streams
        .iter()
        .find(|s| s["codec_type"].as_str() == Some("audio"));

    let duration = json_f64(&info["format"]["duration"])
        .or_else(|| json_f64(&video["duration"]))
        .ok_or_else(|| anyhow::anyhow!("Could not determine video duration"))?;
    if duration <= 0.0 {
        return Err(anyhow::anyhow!("Video has no duration"));
    }

    let frame_rate = video["r_frame_rate"]
        .as_str()
        .and_then(parse_frame_rate)
        .or_else(|| video["avg_frame_rate"].as_str().and_then(parse_frame_rate))
        .unwrap_or(30.0);

    let width = video["width"].as_u64().unwrap_or(0) as u32;
    let height = video["height"].as_u64().unwrap_or(0) as u32;

    let frame_count = json_f64(&video["nb_frames"])
        .map(|n| n as u64)
        .unwrap_or_else(|| (duration * frame_rate).round() as u64);

    Ok(MediaSource {
        path: path.to_path_buf(),
        duration,
        frame_rate,
        width,
        height,
        frame_count,
        video_codec: video["codec_name"].as_str().unwrap_or("unknown").to_string(),
        audio_codec: audio.and_then(|a| a["codec_name"].as_str()).map(str::to_string),
        container: info["format"]["format_name"].as_str().unwrap_or("unknown").to_string(),
    })
}

/// ffprobe reports numbers as strings ("12.345") in most places.
fn json_f64(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .filter(|v| v.is_finite())
}

/// "30000/1001" -> 29.97; "0/0" and garbage -> None.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse::<f64>().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}
