mod tools;

pub use tools::ToolPaths;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Bytes per pixel of the raw `rgb24` stream the decoder emits.
pub const BYTES_PER_PIXEL: usize = 3;

/// Fixed frame size every decoded frame is scaled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigError> {
        if width == 0 || height == 0 {
            return Err(ConfigError::EmptyGeometry { width, height });
        }
        Ok(Self { width, height })
    }

    /// Byte length of one raw frame buffer.
    pub fn frame_size(&self) -> usize {
        self.width as usize * self.height as usize * BYTES_PER_PIXEL
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 704,
        }
    }
}

/// Parameters for one frame extraction run. Read-only once the run starts.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source video.
    pub input: PathBuf,
    /// Directory that receives `output-NNN.png`. Wiped at the start of a run.
    pub output_dir: PathBuf,
    pub geometry: FrameGeometry,
    /// Seek position passed to the decoder (`-ss`), in ffmpeg time syntax.
    pub start_offset: String,
    /// Frame rate of the reassembled video. Also used for frame timestamps in logs.
    pub fps: f64,
    /// Stop after this many frames, or None for the entire stream.
    pub max_frames: Option<u32>,
    /// Directory to write mask debug images, or None to skip.
    pub debug_masks_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("public/input.mp4"),
            output_dir: PathBuf::from("public/frames"),
            geometry: FrameGeometry::default(),
            start_offset: "10".to_string(),
            fps: 30.0,
            max_frames: None,
            debug_masks_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Start offset in seconds when it is a plain number, used for timestamps only.
    pub fn start_seconds(&self) -> f64 {
        self.start_offset.trim().parse().unwrap_or(0.0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        FrameGeometry::new(self.geometry.width, self.geometry.height)?;
        if self.fps.is_nan() || self.fps <= 0.0 {
            return Err(ConfigError::InvalidFps(self.fps));
        }
        if !self.input.exists() {
            return Err(ConfigError::MissingInput(self.input.clone()));
        }
        Ok(())
    }
}
