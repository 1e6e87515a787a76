use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use tracing::{debug, info};

/// printf-style pattern matching [`frame_file_name`], as the encoder expects it.
pub const FRAME_FILE_PATTERN: &str = "output-%03d.png";

/// `output-000.png`, `output-001.png`, … Indices past 999 simply widen.
pub fn frame_file_name(index: u32) -> String {
    format!("output-{index:03}.png")
}

/// Remove `dir` if it exists, then create it with its parents.
pub fn recreate_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        info!(?dir, "removing previous directory contents");
        fs::remove_dir_all(dir).with_context(|| format!("failed to remove {}", dir.display()))?;
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))
}

/// Persists segmented frames as numbered PNGs in a directory owned by one run.
pub struct FrameSink {
    dir: PathBuf,
    written: u32,
}

impl FrameSink {
    /// Remove `dir` if it exists, then create it, so a run never mixes frames
    /// with a previous one.
    pub fn prepare(dir: &Path) -> Result<Self> {
        recreate_dir(dir)?;
        info!(?dir, "output directory ready");

        Ok(Self {
            dir: dir.to_path_buf(),
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of frames written by this sink.
    pub fn written(&self) -> u32 {
        self.written
    }

    pub fn frame_path(&self, index: u32) -> PathBuf {
        self.dir.join(frame_file_name(index))
    }

    /// Write `image` as PNG under the name for `index`, replacing any existing file.
    ///
    /// The PNG is encoded into a temporary file and renamed into place, so
    /// `output-NNN.png` is either absent or complete.
    pub fn write(&mut self, image: &RgbaImage, index: u32) -> Result<PathBuf> {
        let path = self.frame_path(index);
        let tmp = path.with_extension("png.tmp");

        let saved = image
            .save_with_format(&tmp, ImageFormat::Png)
            .with_context(|| format!("failed to save frame to {}", tmp.display()))
            .and_then(|()| {
                fs::rename(&tmp, &path)
                    .with_context(|| format!("failed to move frame into {}", path.display()))
            });
        if let Err(e) = saved {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                debug!(?tmp, %cleanup, "no partial frame to remove");
            }
            return Err(e);
        }
        self.written += 1;

        debug!(?path, index, "saved frame");
        Ok(path)
    }
}
