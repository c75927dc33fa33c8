pub mod collaborators;
pub mod ffmpeg_tools;
pub mod frame_loader;
pub mod probe_loader;
pub mod processor;

pub use collaborators::*;
pub use ffmpeg_tools::FfmpegTools;
pub use frame_loader::{FrameKind, FrameLoader};
pub use probe_loader::ProbeLoader;
pub use processor::VideoProcessor;
