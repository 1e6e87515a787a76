use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Problems detected before any frame work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("input video does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("ffmpeg executable not found: {}", .0.display())]
    MissingExecutable(PathBuf),

    #[error("frames directory does not exist: {}", .0.display())]
    MissingFramesDir(PathBuf),

    #[error("frame geometry must be non-zero, got {width}x{height}")]
    EmptyGeometry { width: u32, height: u32 },

    #[error("fps must be positive, got {0}")]
    InvalidFps(f64),
}

/// A fault while reading the raw frame stream. A short read is not a fault.
#[derive(Debug, Error)]
pub enum DemuxError {
    #[error("failed to read frame {index} from the raw stream")]
    Read {
        index: u32,
        #[source]
        source: io::Error,
    },

    #[error("frame {index} buffer of {len} bytes does not fit {width}x{height} rgb24")]
    Layout {
        index: u32,
        len: usize,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("mask is {mask_w}x{mask_h} but image is {image_w}x{image_h}")]
    MaskSizeMismatch {
        image_w: u32,
        image_h: u32,
        mask_w: u32,
        mask_h: u32,
    },

    #[error("unexpected model output shape {0:?}, expected [1, C, H, W]")]
    OutputShape(Vec<usize>),
}
